//! Secure WebSocket (wss://) echo server.
//!
//! The PEM file holds the certificate chain followed by the private key.
//!
//! Run with: cargo run --example wss_server --features tls-rustls -- server.pem

use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::thread;
use wslite::tls::TlsAcceptor;
use wslite::{Config, Server};

const ADDR: &str = "127.0.0.1:9443";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let pem = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("server.pem"));
    let acceptor = TlsAcceptor::from_pem_file(&pem)?;

    let server = Server::bind(ADDR, Config::default())?.with_tls(acceptor);
    info!("wss echo server listening on {}", ADDR);

    loop {
        let mut ws = match server.accept() {
            Ok(ws) => ws,
            Err(e) => {
                error!("accept failed: {}", e);
                continue;
            }
        };

        thread::spawn(move || {
            if let Err(e) = ws.handshake(&[]) {
                error!("handshake failed: {}", e);
                return;
            }
            while let Ok(msg) = ws.recv() {
                if ws.send(msg).is_err() {
                    break;
                }
            }
            let _ = ws.get_mut().shutdown();
        });
    }
}
