//! Byte-stream transport consumed by the protocol core.
//!
//! The core never touches sockets or TLS sessions directly. Anything that
//! can read and write bytes is a transport; every `std::io::Read + Write`
//! type qualifies through the blanket implementation.

use std::io::{self, ErrorKind, Read, Write};

/// Blocking byte transport.
pub trait Transport {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write some prefix of `buf`, returning how much was written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Flush buffered output, if the transport buffers.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Write all of `buf`, retrying short and interrupted writes.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::WriteZero,
                        "transport accepted no bytes",
                    ));
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        self.flush()
    }
}

impl<T: Read + Write> Transport for T {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(self)
    }
}
