//! Frame assembly: turning a byte stream into whole messages.
//!
//! [`MessageReader`] owns the read buffer and decides what has to happen
//! next through [`MessageReader::poll_step`], without doing any I/O itself.
//! [`MessageReader::read_message`] drives it over a blocking [`Transport`];
//! the async codec drives the same state machine over tokio streams.
//!
//! Control frames never reach the caller. A Ping is answered with an empty
//! Pong, an unsolicited Pong is dropped, and a Close is answered with a
//! Close before the reader reports [`Error::ConnectionClosed`].

use bytes::{Buf, BytesMut};
use log::{debug, trace, warn};
use std::io::ErrorKind;

use crate::config::{Config, Limits};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::OpCode;
use crate::protocol::frame::{
    FrameHeader, FrameStatus, MIN_HEADER_LEN, make_frame, parse_input_frame,
};
use crate::transport::Transport;

/// Size of the scratch chunk each transport read fills.
pub const READ_CHUNK: usize = 4096;

/// What the driver has to do before polling again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    /// Read more bytes; at least this many are still missing.
    NeedBytes(usize),
    /// Write this control frame, then poll again.
    SendControl(Vec<u8>),
    /// The peer sent Close: write this reply, then stop reading.
    PeerClosed(Vec<u8>),
    /// A complete data message.
    Message(Message),
}

/// Per-connection read buffer and frame classifier.
#[derive(Debug)]
pub struct MessageReader {
    buf: BytesMut,
    chunk: Box<[u8]>,
    initial_capacity: usize,
    limits: Limits,
}

impl MessageReader {
    /// Create a reader with the buffer size and limits from `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.read_buffer_size),
            chunk: vec![0u8; READ_CHUNK].into_boxed_slice(),
            initial_capacity: config.read_buffer_size,
            limits: config.limits.clone(),
        }
    }

    /// Bytes received but not yet consumed.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Current capacity of the read buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Classify the buffered bytes.
    ///
    /// Consumes at most one frame per call. Pongs are dropped internally, so
    /// a call may consume several frames when Pongs are queued up.
    ///
    /// # Errors
    ///
    /// Any decode error from the frame codec, `Error::FrameTooLarge` for
    /// frames beyond [`Limits::max_frame_size`], and `Error::InvalidUtf8`
    /// for text payloads that are not UTF-8.
    pub fn poll_step(&mut self) -> Result<ReadStep> {
        loop {
            if self.buf.len() < MIN_HEADER_LEN {
                return Ok(ReadStep::NeedBytes(MIN_HEADER_LEN - self.buf.len()));
            }

            let header = match FrameHeader::parse(&self.buf) {
                Ok(header) => header,
                Err(Error::IncompleteFrame { needed }) => return Ok(ReadStep::NeedBytes(needed)),
                Err(e) => {
                    warn!("rejecting frame: {}", e);
                    return Err(e);
                }
            };
            self.limits.check_frame_size(header.payload_len)?;

            let total = header.frame_len()?;
            if self.buf.len() < total {
                self.grow_to(total);
                return Ok(ReadStep::NeedBytes(total - self.buf.len()));
            }

            let (opcode, consumed, message) = match parse_input_frame(&mut self.buf)? {
                FrameStatus::Complete(frame) => {
                    trace!(
                        "decoded {} frame, {} payload bytes",
                        frame.opcode,
                        frame.payload.len()
                    );
                    let message = frame
                        .opcode
                        .is_data()
                        .then(|| Message::from_frame(frame.opcode, frame.payload));
                    (frame.opcode, frame.len, message)
                }
                FrameStatus::Incomplete { needed } => return Ok(ReadStep::NeedBytes(needed)),
            };
            self.consume(consumed);

            match opcode {
                OpCode::Ping => {
                    debug!("answering ping");
                    return Ok(ReadStep::SendControl(make_frame(&[], OpCode::Pong)));
                }
                OpCode::Pong => {
                    trace!("dropping unsolicited pong");
                }
                OpCode::Close => {
                    debug!("peer sent close");
                    return Ok(ReadStep::PeerClosed(make_frame(&[], OpCode::Close)));
                }
                OpCode::Text | OpCode::Binary => {
                    if let Some(message) = message {
                        return message.map(ReadStep::Message);
                    }
                }
            }
        }
    }

    /// Read frames from `transport` until a data message arrives.
    ///
    /// Pings are answered and Pongs dropped on the way; neither is visible
    /// to the caller. Bytes that arrive after the returned message stay
    /// buffered for the next call.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` when the transport ends, fails, or the
    ///   peer sends Close (after the Close reply has been written).
    /// - Any protocol error from [`MessageReader::poll_step`].
    pub fn read_message<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<Message> {
        loop {
            match self.poll_step()? {
                ReadStep::NeedBytes(_) => self.fill_from(transport)?,
                ReadStep::SendControl(frame) => {
                    if let Err(e) = transport.write_all(&frame) {
                        debug!("control reply failed: {}", e);
                        return Err(Error::ConnectionClosed);
                    }
                }
                ReadStep::PeerClosed(reply) => {
                    if let Err(e) = transport.write_all(&reply) {
                        debug!("close reply failed: {}", e);
                    }
                    return Err(Error::ConnectionClosed);
                }
                ReadStep::Message(message) => return Ok(message),
            }
        }
    }

    fn fill_from<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        loop {
            match transport.read(self.read_window()) {
                Ok(0) => {
                    debug!("transport reached end of stream");
                    return Err(Error::ConnectionClosed);
                }
                Ok(n) => {
                    self.commit(n);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("transport read failed: {}", e);
                    return Err(Error::ConnectionClosed);
                }
            }
        }
    }

    /// Queue bytes that were read ahead of the reader, such as frames the
    /// client pipelined behind its handshake.
    pub(crate) fn extend_from_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Scratch space for the next transport read. Always [`READ_CHUNK`]
    /// bytes; it is reused between reads and never re-zeroed.
    pub(crate) fn read_window(&mut self) -> &mut [u8] {
        &mut self.chunk
    }

    /// Append the first `n` bytes of the read window to the buffer.
    pub(crate) fn commit(&mut self, n: usize) {
        self.buf.extend_from_slice(&self.chunk[..n]);
    }

    fn grow_to(&mut self, frame_len: usize) {
        if self.buf.capacity() < frame_len {
            trace!("growing read buffer to {} bytes", frame_len);
            self.buf.reserve(frame_len - self.buf.len());
        }
    }

    fn consume(&mut self, n: usize) {
        self.buf.advance(n);
        if self.buf.is_empty() && self.buf.capacity() > self.initial_capacity.saturating_mul(4) {
            self.buf = BytesMut::with_capacity(self.initial_capacity);
        }
    }
}

/// Read one message from `transport` with a fresh default-sized buffer.
///
/// Bytes read past the end of the message are discarded; connections that
/// read repeatedly should keep a [`MessageReader`] instead.
///
/// # Errors
///
/// Same as [`MessageReader::read_message`].
pub fn read_message<T: Transport + ?Sized>(transport: &mut T) -> Result<Message> {
    MessageReader::new(&Config::default()).read_message(transport)
}
