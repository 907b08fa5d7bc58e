//! Server-side WebSocket connections.
//!
//! ## Connection Lifecycle
//!
//! 1. **Connecting** - Accepted, opening handshake not yet answered
//! 2. **Open** - Handshake accepted; messages flow both ways
//! 3. **Closed** - Closed by either side or torn down after an error

mod state;

pub use state::ConnectionState;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::WebSocket;
