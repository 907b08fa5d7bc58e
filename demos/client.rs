//! Simple WebSocket client example.
//!
//! Run the echo server first: cargo run --example echo_server
//! Then run: cargo run --example client

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::error::Error;
use std::io::{Read, Write};
use std::net::TcpStream;
use wslite::protocol::{make_masked_frame, random_mask};
use wslite::{OpCode, compute_accept_key};

const SERVER_ADDR: &str = "127.0.0.1:9001";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    println!("Connecting to ws://{}/echo", SERVER_ADDR);

    let mut stream = TcpStream::connect(SERVER_ADDR)?;

    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)?;
    let key = STANDARD.encode(nonce);

    let request = format!(
        "GET /echo HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n",
        SERVER_ADDR, key
    );
    stream.write_all(request.as_bytes())?;

    let response = read_response_head(&mut stream)?;
    if !response.starts_with("HTTP/1.1 101") {
        return Err(format!("upgrade refused: {}", response.lines().next().unwrap_or("")).into());
    }
    let expected = format!("Sec-WebSocket-Accept: {}\r\n", compute_accept_key(&key));
    if !response.contains(&expected) {
        return Err("Invalid Sec-WebSocket-Accept".into());
    }
    println!("Handshake complete");

    for text in ["Hello, WebSocket!", "How are you?"] {
        stream.write_all(&make_masked_frame(text.as_bytes(), OpCode::Text, random_mask()))?;
        let (opcode, payload) = read_frame(&mut stream)?;
        println!("Received {:?}: {}", opcode, String::from_utf8_lossy(&payload));
    }

    stream.write_all(&make_masked_frame(b"are you there", OpCode::Ping, random_mask()))?;
    let (opcode, _) = read_frame(&mut stream)?;
    println!("Received {:?} in answer to ping", opcode);

    stream.write_all(&make_masked_frame(&[], OpCode::Close, random_mask()))?;
    let (opcode, _) = read_frame(&mut stream)?;
    println!("Received {:?}, connection closed", opcode);

    Ok(())
}

fn read_response_head(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte)?;
        head.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

fn read_frame(stream: &mut TcpStream) -> Result<(OpCode, Vec<u8>), Box<dyn Error>> {
    let mut head = [0u8; 2];
    stream.read_exact(&mut head)?;

    let len = match head[1] & 0x7F {
        126 => {
            let mut ext = [0u8; 2];
            stream.read_exact(&mut ext)?;
            u16::from_be_bytes(ext) as usize
        }
        127 => {
            let mut ext = [0u8; 8];
            stream.read_exact(&mut ext)?;
            usize::try_from(u64::from_be_bytes(ext))?
        }
        short => short as usize,
    };

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload)?;
    Ok((OpCode::from_u8(head[0] & 0x0F)?, payload))
}
