//! # wslite - Compact server-side WebSocket engine
//!
//! `wslite` implements the server half of RFC 6455 for blocking
//! transports: it parses the client's opening handshake, answers it, and
//! turns the byte stream that follows into whole messages.
//!
//! ## Features
//!
//! - **Sans-IO protocol core**: handshake and frame codecs work on byte
//!   slices; the frame reader is a state machine any transport can drive
//! - **Transparent control frames**: Pings are answered and Pongs dropped
//!   before the caller sees a message
//! - **Strict validation** of masking, reserved bits and length encodings
//! - **TLS** through rustls (feature `tls-rustls`)
//! - **Async driver** for tokio streams (feature `async-tokio`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wslite::{Config, Server};
//!
//! let server = Server::bind("0.0.0.0:9001", Config::default())?;
//! let mut ws = server.accept()?;
//! ws.handshake(&["/echo"])?;
//! while let Ok(msg) = ws.recv() {
//!     ws.send(msg)?;
//! }
//! ```
//!
//! The building blocks are available on their own:
//!
//! ```rust
//! use wslite::{HandshakeStatus, build_handshake_response, parse_handshake};
//!
//! let request = b"GET /chat HTTP/1.1\r\n\
//!     Host: example.com\r\n\
//!     Upgrade: websocket\r\n\
//!     Connection: Upgrade\r\n\
//!     Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
//!     Sec-WebSocket-Version: 13\r\n\r\n";
//!
//! let handshake = parse_handshake(request);
//! assert_eq!(handshake.frame_type, HandshakeStatus::Opening);
//! let response = build_handshake_response(&handshake);
//! assert!(response.starts_with(b"HTTP/1.1 101"));
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;
pub mod server;
pub mod transport;

#[cfg(feature = "async-tokio")]
pub mod codec;

#[cfg(feature = "tls-rustls")]
pub mod tls;

pub use config::{Config, Limits, Timeouts};
pub use connection::{ConnectionState, WebSocket};
pub use error::{Error, Result};
pub use message::Message;
pub use protocol::{
    FrameStatus, Handshake, HandshakeStatus, InputFrame, MessageReader, OpCode, WS_GUID,
    build_handshake_response, compute_accept_key, make_frame, parse_handshake, parse_input_frame,
    read_message, write_frame, write_handshake_response,
};
pub use server::{Server, Stream};
pub use transport::Transport;

#[cfg(feature = "async-tokio")]
pub use codec::WebSocketCodec;
