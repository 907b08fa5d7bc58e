use bytes::BytesMut;
use log::debug;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::OpCode;
use crate::protocol::frame::{frame_wire_size, write_frame};
use crate::protocol::reader::{MessageReader, ReadStep};

/// Server-side message codec over an async stream.
///
/// Drives the same frame assembly as the blocking connection: Pings are
/// answered, Pongs dropped, and a Close is answered before
/// `Error::ConnectionClosed` is returned.
pub struct WebSocketCodec<T> {
    io: T,
    reader: MessageReader,
    write_buf: BytesMut,
    config: Config,
}

impl<T> WebSocketCodec<T> {
    /// Wrap a stream whose opening handshake has already completed.
    #[must_use]
    pub fn new(io: T, config: Config) -> Self {
        Self {
            io,
            reader: MessageReader::new(&config),
            write_buf: BytesMut::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> WebSocketCodec<T> {
    /// Read the next data message.
    ///
    /// # Errors
    ///
    /// `Error::ConnectionClosed` when the stream ends or fails, or after the
    /// peer's Close has been answered. Protocol violations are returned as
    /// decoded.
    pub async fn read_message(&mut self) -> Result<Message> {
        loop {
            match self.reader.poll_step()? {
                ReadStep::NeedBytes(_) => self.fill().await?,
                ReadStep::SendControl(frame) => {
                    if let Err(e) = self.io.write_all(&frame).await {
                        debug!("control reply failed: {}", e);
                        return Err(Error::ConnectionClosed);
                    }
                }
                ReadStep::PeerClosed(reply) => {
                    if let Err(e) = self.io.write_all(&reply).await {
                        debug!("close reply failed: {}", e);
                    }
                    let _ = self.io.flush().await;
                    return Err(Error::ConnectionClosed);
                }
                ReadStep::Message(message) => return Ok(message),
            }
        }
    }

    async fn fill(&mut self) -> Result<()> {
        loop {
            match self.io.read(self.reader.read_window()).await {
                Ok(0) => {
                    debug!("stream reached end");
                    return Err(Error::ConnectionClosed);
                }
                Ok(n) => {
                    self.reader.commit(n);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("stream read failed: {}", e);
                    return Err(Error::ConnectionClosed);
                }
            }
        }
    }

    /// Send a message as a single unmasked frame.
    ///
    /// # Errors
    ///
    /// `Error::Io` if the stream rejects the write.
    pub async fn write_message(&mut self, message: &Message) -> Result<()> {
        self.write_frame(message.payload(), message.opcode()).await
    }

    /// Send an empty Close frame.
    ///
    /// # Errors
    ///
    /// `Error::Io` if the stream rejects the write.
    pub async fn close(&mut self) -> Result<()> {
        self.write_frame(&[], OpCode::Close).await?;
        self.flush().await
    }

    async fn write_frame(&mut self, payload: &[u8], opcode: OpCode) -> Result<()> {
        self.write_buf.clear();
        self.write_buf.resize(frame_wire_size(payload.len(), false), 0);
        let written = write_frame(payload, opcode, &mut self.write_buf)?;
        self.io.write_all(&self.write_buf[..written]).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.io.flush().await?;
        Ok(())
    }
}
