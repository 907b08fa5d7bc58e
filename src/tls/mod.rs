//! TLS support for secure WebSocket (wss://) servers.
//!
//! Built on rustls with blocking streams: the TLS session is driven to
//! completion in [`TlsAcceptor::accept`], after which the returned stream
//! is an ordinary `Read + Write` transport.

mod rustls_impl;

pub use rustls_impl::{
    TlsAcceptor, TlsError, TlsStream, load_certs_from_file, load_private_key_from_file,
    server_config,
};
