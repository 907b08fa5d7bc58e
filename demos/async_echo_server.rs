//! Echo server on tokio, using the protocol functions for the handshake and
//! `WebSocketCodec` for messages.
//!
//! Run with: cargo run --example async_echo_server --features async-tokio

use log::{error, info};
use std::error::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wslite::protocol::handshake::{BAD_REQUEST_RESPONSE, Handshake, HandshakeStatus};
use wslite::{Config, WebSocketCodec, build_handshake_response};

const ADDR: &str = "127.0.0.1:9002";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let listener = TcpListener::bind(ADDR).await?;
    info!("async echo server listening on {}", ADDR);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("new connection from {}", addr);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream).await {
                error!("connection error from {}: {}", addr, e);
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream) -> wslite::Result<()> {
    let config = Config::default();
    let mut request = Vec::new();
    let mut chunk = vec![0u8; config.handshake_buffer_size];
    let mut handshake = Handshake::new();

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(wslite::Error::ConnectionClosed);
        }
        request.extend_from_slice(&chunk[..n]);
        config.limits.check_handshake_size(request.len())?;

        match handshake.parse(&request) {
            HandshakeStatus::Incomplete => continue,
            HandshakeStatus::Opening => break,
            _ => {
                stream.write_all(BAD_REQUEST_RESPONSE).await?;
                return Err(wslite::Error::InvalidHandshake("rejected".into()));
            }
        }
    }
    stream.write_all(&build_handshake_response(&handshake)).await?;

    let mut codec = WebSocketCodec::new(stream, config);
    loop {
        match codec.read_message().await {
            Ok(msg) => {
                codec.write_message(&msg).await?;
                codec.flush().await?;
            }
            Err(wslite::Error::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}
