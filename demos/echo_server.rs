//! Simple WebSocket echo server example.
//!
//! Run with: RUST_LOG=debug cargo run --example echo_server
//! Then connect with: cargo run --example client

use log::{error, info};
use std::error::Error;
use std::thread;
use std::time::Duration;
use wslite::{Config, Message, Server, Stream, Timeouts, WebSocket};

const ADDR: &str = "127.0.0.1:9001";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = Config::new().with_timeouts(Timeouts::new(
        Duration::from_secs(300),
        Duration::from_secs(10),
    ));
    let server = Server::bind(ADDR, config)?;
    info!("WebSocket echo server listening on {}", ADDR);

    loop {
        let ws = match server.accept() {
            Ok(ws) => ws,
            Err(e) => {
                error!("accept failed: {}", e);
                continue;
            }
        };

        thread::spawn(move || {
            if let Err(e) = handle_connection(ws) {
                error!("connection error: {}", e);
            }
        });
    }
}

fn handle_connection(mut ws: WebSocket<Stream>) -> wslite::Result<()> {
    let peer = ws.get_ref().peer_addr()?;
    let resource = ws.handshake(&["/", "/echo"])?;
    info!("{} opened {}", peer, resource);

    loop {
        match ws.recv() {
            Ok(Message::Text(text)) => {
                info!("{} sent text: {}", peer, text);
                ws.send_text(&text)?;
            }
            Ok(Message::Binary(data)) => {
                info!("{} sent {} binary bytes", peer, data.len());
                ws.send_binary(&data)?;
            }
            Err(wslite::Error::ConnectionClosed) => {
                info!("{} closed the connection", peer);
                break;
            }
            Err(e) => {
                ws.close()?;
                return Err(e);
            }
        }
    }

    let _ = ws.get_mut().shutdown();
    Ok(())
}
