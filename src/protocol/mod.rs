//! WebSocket protocol core implementation (RFC 6455).
//!
//! Everything here is independent of sockets: handshake parsing and
//! response building, frame encoding and decoding, and the frame assembly
//! state machine.

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;
pub mod reader;

pub use frame::{
    FrameHeader, FrameStatus, InputFrame, make_frame, make_masked_frame, parse_input_frame,
    write_frame,
};
pub use handshake::{
    Handshake, HandshakeStatus, WS_GUID, build_handshake_response, compute_accept_key,
    parse_handshake, write_handshake_response,
};
pub use mask::{apply_mask, apply_mask_fast, random_mask};
pub use opcode::OpCode;
pub use reader::{MessageReader, ReadStep, read_message};
