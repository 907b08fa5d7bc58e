//! Property-based tests for frame and handshake parsing.
//!
//! These tests use proptest to fuzz the codecs and find edge cases.

use proptest::prelude::*;
use wslite::protocol::frame::{MIN_HEADER_LEN, frame_wire_size};
use wslite::protocol::{
    FrameStatus, HandshakeStatus, MessageReader, OpCode, apply_mask, make_frame,
    make_masked_frame, parse_handshake, parse_input_frame,
};
use wslite::{Config, Error, Message};

fn data_opcode_strategy() -> impl Strategy<Value = OpCode> {
    prop_oneof![Just(OpCode::Text), Just(OpCode::Binary)]
}

fn any_opcode_strategy() -> impl Strategy<Value = OpCode> {
    prop_oneof![
        Just(OpCode::Text),
        Just(OpCode::Binary),
        Just(OpCode::Close),
        Just(OpCode::Ping),
        Just(OpCode::Pong),
    ]
}

fn decode(buf: &mut [u8]) -> (OpCode, Vec<u8>, usize) {
    match parse_input_frame(buf).unwrap() {
        FrameStatus::Complete(frame) => (frame.opcode, frame.payload.to_vec(), frame.len),
        FrameStatus::Incomplete { needed } => panic!("incomplete, need {}", needed),
    }
}

proptest! {
    // =========================================================================
    // Round trip: a masked client frame decodes to the original payload
    // =========================================================================
    #[test]
    fn test_roundtrip_masked(
        opcode in data_opcode_strategy(),
        payload in prop::collection::vec(any::<u8>(), 0..1000),
        mask in any::<[u8; 4]>()
    ) {
        let mut wire = make_masked_frame(&payload, opcode, mask);
        prop_assert_eq!(wire.len(), frame_wire_size(payload.len(), true));

        let (parsed_opcode, parsed_payload, consumed) = decode(&mut wire);
        prop_assert_eq!(parsed_opcode, opcode);
        prop_assert_eq!(parsed_payload, payload);
        prop_assert_eq!(consumed, wire.len());
    }

    // =========================================================================
    // Server frames: header byte, length field and unmodified payload
    // =========================================================================
    #[test]
    fn test_server_frame_layout(
        opcode in any_opcode_strategy(),
        payload in prop::collection::vec(any::<u8>(), 0..70000)
    ) {
        let wire = make_frame(&payload, opcode);
        prop_assert_eq!(wire[0], 0x80 | opcode.as_u8());
        prop_assert_eq!(wire[1] & 0x80, 0);

        let header_len = match payload.len() {
            0..=125 => {
                prop_assert_eq!(wire[1] as usize, payload.len());
                2
            }
            126..=65535 => {
                prop_assert_eq!(wire[1], 126);
                prop_assert_eq!(u16::from_be_bytes([wire[2], wire[3]]) as usize, payload.len());
                4
            }
            _ => {
                prop_assert_eq!(wire[1], 127);
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&wire[2..10]);
                prop_assert_eq!(u64::from_be_bytes(raw), payload.len() as u64);
                10
            }
        };
        prop_assert_eq!(&wire[header_len..], &payload[..]);
    }

    // =========================================================================
    // Masking is reversible (XOR is self-inverse)
    // =========================================================================
    #[test]
    fn test_mask_reversible(
        data in prop::collection::vec(any::<u8>(), 0..2000),
        mask in any::<[u8; 4]>()
    ) {
        let mut masked = data.clone();
        apply_mask(&mut masked, mask);
        apply_mask(&mut masked, mask);
        prop_assert_eq!(data, masked);
    }

    // =========================================================================
    // Any prefix of a valid frame is reported as incomplete, never an error
    // =========================================================================
    #[test]
    fn test_prefix_is_incomplete(
        payload in prop::collection::vec(any::<u8>(), 0..400),
        mask in any::<[u8; 4]>(),
        cut in any::<prop::sample::Index>()
    ) {
        let wire = make_masked_frame(&payload, OpCode::Binary, mask);
        let cut = MIN_HEADER_LEN + cut.index(wire.len() - MIN_HEADER_LEN);
        let mut prefix = wire[..cut].to_vec();

        match parse_input_frame(&mut prefix) {
            Ok(FrameStatus::Incomplete { needed }) => prop_assert!(cut + needed <= wire.len()),
            other => prop_assert!(false, "expected Incomplete, got {:?}", other),
        }
    }

    // =========================================================================
    // Reserved bits and a clear FIN bit are always rejected
    // =========================================================================
    #[test]
    fn test_reserved_bits_rejected(
        rsv in 1u8..8,
        payload in prop::collection::vec(any::<u8>(), 0..100),
        mask in any::<[u8; 4]>()
    ) {
        let mut wire = make_masked_frame(&payload, OpCode::Text, mask);
        wire[0] |= rsv << 4;
        prop_assert_eq!(parse_input_frame(&mut wire), Err(Error::ReservedBitsSet));
    }

    #[test]
    fn test_non_final_rejected(
        opcode in data_opcode_strategy(),
        payload in prop::collection::vec(any::<u8>(), 0..100),
        mask in any::<[u8; 4]>()
    ) {
        let mut wire = make_masked_frame(&payload, opcode, mask);
        wire[0] &= 0x7F;
        prop_assert_eq!(parse_input_frame(&mut wire), Err(Error::FragmentedFrame));
    }

    // =========================================================================
    // Robustness: arbitrary bytes never panic the decoders
    // =========================================================================
    #[test]
    fn test_parse_arbitrary_bytes_no_panic(
        data in prop::collection::vec(any::<u8>(), 0..200)
    ) {
        let mut data = data;
        let _ = parse_input_frame(&mut data);
    }

    #[test]
    fn test_handshake_arbitrary_bytes_no_panic(
        data in prop::collection::vec(any::<u8>(), 0..500)
    ) {
        let handshake = parse_handshake(&data);
        if handshake.frame_type == HandshakeStatus::Opening {
            prop_assert!(handshake.key.is_some());
            prop_assert!(handshake.host.is_some());
        }
    }

    // =========================================================================
    // Chunking: message assembly does not depend on how bytes arrive
    // =========================================================================
    #[test]
    fn test_reader_independent_of_chunking(
        payload in prop::collection::vec(any::<u8>(), 0..3000),
        mask in any::<[u8; 4]>(),
        chunk in 1usize..64
    ) {
        let wire = make_masked_frame(&payload, OpCode::Binary, mask);
        let mut transport = Chunked { data: wire, pos: 0, chunk, written: Vec::new() };

        let msg = MessageReader::new(&Config::default()).read_message(&mut transport);
        prop_assert_eq!(msg, Ok(Message::binary(payload)));
        prop_assert!(transport.written.is_empty());
    }
}

struct Chunked {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
    written: Vec<u8>,
}

impl wslite::Transport for Chunked {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }
}

// =========================================================================
// Length-field boundaries
// =========================================================================

#[test]
fn test_length_boundaries() {
    for (len, header_len) in [(125, 2), (126, 4), (65535, 4), (65536, 10)] {
        let payload = vec![0x42; len];
        let wire = make_frame(&payload, OpCode::Binary);
        assert_eq!(wire.len(), header_len + len, "length {}", len);

        let mut masked = make_masked_frame(&payload, OpCode::Binary, [1, 2, 3, 4]);
        let (_, decoded, _) = decode(&mut masked);
        assert_eq!(decoded.len(), len);
    }
}

#[test]
fn test_ping_then_text_single_pong() {
    let mut wire = make_masked_frame(b"", OpCode::Ping, [5, 6, 7, 8]);
    wire.extend_from_slice(&make_masked_frame(b"hi", OpCode::Text, [5, 6, 7, 8]));
    let mut transport = Chunked {
        data: wire,
        pos: 0,
        chunk: 1024,
        written: Vec::new(),
    };

    let msg = MessageReader::new(&Config::default()).read_message(&mut transport);
    assert_eq!(msg, Ok(Message::text("hi")));
    assert_eq!(transport.written, vec![0x8A, 0x00]);
}
