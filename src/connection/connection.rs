use log::{debug, trace};
use std::io::ErrorKind;

use crate::config::Config;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::OpCode;
use crate::protocol::frame::make_frame;
use crate::protocol::handshake::{
    BAD_REQUEST_RESPONSE, Handshake, HandshakeStatus, NOT_FOUND_RESPONSE,
    build_handshake_response, request_len,
};
use crate::protocol::reader::MessageReader;
use crate::transport::Transport;

/// A server-side WebSocket connection over a blocking transport.
///
/// Starts in [`ConnectionState::Connecting`]; [`WebSocket::handshake`]
/// opens it, and any read failure, peer Close or local
/// [`WebSocket::close`] moves it to [`ConnectionState::Closed`].
///
/// ## Example
///
/// ```rust,ignore
/// use wslite::{Config, Message, WebSocket};
///
/// let (stream, _) = listener.accept()?;
/// let mut ws = WebSocket::new(stream, Config::default());
/// let resource = ws.handshake(&["/echo"])?;
///
/// while let Ok(msg) = ws.recv() {
///     ws.send(msg)?;
/// }
/// ```
pub struct WebSocket<S> {
    stream: S,
    reader: MessageReader,
    state: ConnectionState,
    config: Config,
}

impl<S> WebSocket<S> {
    /// Wrap a freshly accepted stream. No bytes are exchanged yet.
    pub fn new(stream: S, config: Config) -> Self {
        Self {
            stream,
            reader: MessageReader::new(&config),
            state: ConnectionState::Connecting,
            config,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if the connection is in an open state.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Give back the stream. Buffered but unread frame bytes are dropped.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Transport> WebSocket<S> {
    /// Run the server side of the opening handshake.
    ///
    /// Reads until the request's blank line arrives, then answers it. An
    /// empty `routes` slice accepts every resource. Returns the requested
    /// resource on success.
    ///
    /// ## Errors
    ///
    /// - `Error::ResourceNotFound` after answering 404 for an unrouted resource
    /// - `Error::InvalidHandshake` after answering 400 for a malformed request
    /// - `Error::HandshakeTooLarge` if the request outgrows
    ///   `limits.max_handshake_size`
    /// - `Error::ConnectionClosed` if the stream ends before the request does
    /// - `Error::Io` if a response cannot be written
    pub fn handshake(&mut self, routes: &[&str]) -> Result<String> {
        if self.state != ConnectionState::Connecting {
            return Err(Error::InvalidHandshake(format!(
                "handshake attempted in state {}",
                self.state
            )));
        }

        let mut request = Vec::with_capacity(self.config.handshake_buffer_size);
        let mut chunk = vec![0u8; self.config.handshake_buffer_size.max(1)];
        let mut handshake = Handshake::new();

        loop {
            let n = match self.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!("stream ended during handshake");
                    self.state = ConnectionState::Closed;
                    return Err(Error::ConnectionClosed);
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("handshake read failed: {}", e);
                    self.state = ConnectionState::Closed;
                    return Err(Error::ConnectionClosed);
                }
            };
            request.extend_from_slice(&chunk[..n]);

            if let Err(e) = self.config.limits.check_handshake_size(request.len()) {
                return self.reject(BAD_REQUEST_RESPONSE, e);
            }

            match handshake.try_parse(&request) {
                Ok(HandshakeStatus::Incomplete) => {}
                Ok(HandshakeStatus::Opening) => break,
                Ok(status) => {
                    let e = Error::InvalidHandshake(format!("unexpected status {:?}", status));
                    return self.reject(BAD_REQUEST_RESPONSE, e);
                }
                Err(e) => {
                    debug!("rejecting handshake: {}", e);
                    return self.reject(BAD_REQUEST_RESPONSE, e);
                }
            }
        }

        let resource = handshake.resource.clone().unwrap_or_default();
        if !routes.is_empty() && !routes.contains(&resource.as_str()) {
            debug!("no route for resource {}", resource);
            return self.reject(NOT_FOUND_RESPONSE, Error::ResourceNotFound(resource));
        }

        self.stream.write_all(&build_handshake_response(&handshake))?;
        if let Some(end) = request_len(&request) {
            self.reader.extend_from_slice(&request[end..]);
        }
        self.state = ConnectionState::Open;
        debug!("handshake complete for {}", resource);
        Ok(resource)
    }

    fn reject<T>(&mut self, response: &[u8], error: Error) -> Result<T> {
        self.state = ConnectionState::Closed;
        if let Err(e) = self.stream.write_all(response) {
            debug!("failed to write handshake rejection: {}", e);
        }
        Err(error)
    }

    /// Receive the next data message.
    ///
    /// Ping and Pong frames are handled internally and never returned.
    ///
    /// ## Errors
    ///
    /// - `Error::ConnectionClosed` if the connection is not open, the peer
    ///   closed it, or the stream failed
    /// - Protocol errors for malformed frames; the connection is closed
    pub fn recv(&mut self) -> Result<Message> {
        if !self.state.can_receive() {
            return Err(Error::ConnectionClosed);
        }
        let result = self.reader.read_message(&mut self.stream);
        if result.is_err() {
            self.state = ConnectionState::Closed;
        }
        result
    }

    /// Send a message as a single unmasked frame.
    ///
    /// ## Errors
    ///
    /// - `Error::ConnectionClosed` if the connection is not open
    /// - `Error::Io` if the write fails; the connection is closed
    pub fn send(&mut self, message: Message) -> Result<()> {
        self.send_frame(message.payload(), message.opcode())
    }

    /// Send a text message.
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_frame(text.as_bytes(), OpCode::Text)
    }

    /// Send a binary message.
    pub fn send_binary(&mut self, data: &[u8]) -> Result<()> {
        self.send_frame(data, OpCode::Binary)
    }

    fn send_frame(&mut self, payload: &[u8], opcode: OpCode) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::ConnectionClosed);
        }
        trace!("sending {} frame, {} payload bytes", opcode, payload.len());
        if let Err(e) = self.stream.write_all(&make_frame(payload, opcode)) {
            self.state = ConnectionState::Closed;
            return Err(e.into());
        }
        Ok(())
    }

    /// Send an empty Close frame and mark the connection closed.
    ///
    /// Closing a connection that is not open is a no-op.
    ///
    /// ## Errors
    ///
    /// `Error::Io` if the Close frame cannot be written.
    pub fn close(&mut self) -> Result<()> {
        if self.state != ConnectionState::Open {
            self.state = ConnectionState::Closed;
            return Ok(());
        }
        self.state = ConnectionState::Closed;
        debug!("closing connection");
        self.stream.write_all(&make_frame(&[], OpCode::Close))?;
        Ok(())
    }
}

impl<S> std::fmt::Debug for WebSocket<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("state", &self.state)
            .field("buffered", &self.reader.buffered())
            .finish_non_exhaustive()
    }
}
