//! Minimal blocking WebSocket client used by the integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};

use wslite::OpCode;
use wslite::protocol::make_masked_frame;

pub const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
pub const ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

pub fn upgrade_request(resource: &str) -> String {
    format!(
        "GET {} HTTP/1.1\r\n\
         Host: localhost\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n",
        resource, KEY
    )
}

/// Read an HTTP response head, up to and including the blank line.
pub fn read_response_head<S: Read>(stream: &mut S) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte).unwrap() == 0 {
            break;
        }
        head.push(byte[0]);
    }
    String::from_utf8(head).unwrap()
}

pub fn send_frame<S: Write>(stream: &mut S, payload: &[u8], opcode: OpCode) {
    let frame = make_masked_frame(payload, opcode, wslite::protocol::random_mask());
    stream.write_all(&frame).unwrap();
    stream.flush().unwrap();
}

/// Read one unmasked server frame, returning its first byte and payload.
pub fn read_frame<S: Read>(stream: &mut S) -> (u8, Vec<u8>) {
    let mut head = [0u8; 2];
    stream.read_exact(&mut head).unwrap();
    assert_eq!(head[1] & 0x80, 0, "server frames must not be masked");

    let len = match head[1] & 0x7F {
        126 => {
            let mut ext = [0u8; 2];
            stream.read_exact(&mut ext).unwrap();
            u16::from_be_bytes(ext) as usize
        }
        127 => {
            let mut ext = [0u8; 8];
            stream.read_exact(&mut ext).unwrap();
            u64::from_be_bytes(ext) as usize
        }
        short => short as usize,
    };

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).unwrap();
    (head[0], payload)
}
