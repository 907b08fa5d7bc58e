//! WebSocket codec for async I/O.
//!
//! Message-level reading and writing over tokio streams.

mod framed;

pub use framed::WebSocketCodec;
