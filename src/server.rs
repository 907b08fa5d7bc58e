//! Blocking TCP listener that hands out WebSocket connections.
//!
//! ```rust,ignore
//! use wslite::{Config, Server};
//!
//! let server = Server::bind("127.0.0.1:9001", Config::default())?;
//! loop {
//!     let mut ws = server.accept()?;
//!     std::thread::spawn(move || {
//!         if ws.handshake(&["/echo"]).is_ok() {
//!             while let Ok(msg) = ws.recv() {
//!                 if ws.send(msg).is_err() {
//!                     break;
//!                 }
//!             }
//!         }
//!     });
//! }
//! ```

use log::debug;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use crate::config::Config;
use crate::connection::WebSocket;
use crate::error::Result;

#[cfg(feature = "tls-rustls")]
use crate::tls::{TlsAcceptor, TlsStream};

/// An accepted socket, optionally wrapped in TLS.
pub enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls-rustls")]
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    /// The underlying TCP socket.
    pub fn tcp(&self) -> &TcpStream {
        match self {
            Stream::Plain(s) => s,
            #[cfg(feature = "tls-rustls")]
            Stream::Tls(s) => &s.sock,
        }
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.tcp().peer_addr()
    }

    pub fn is_tls(&self) -> bool {
        !matches!(self, Stream::Plain(_))
    }

    /// Shut the socket down in both directions, sending TLS close_notify
    /// first when the stream is encrypted.
    pub fn shutdown(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.shutdown(Shutdown::Both),
            #[cfg(feature = "tls-rustls")]
            Stream::Tls(s) => {
                s.conn.send_close_notify();
                if let Err(e) = s.flush() {
                    debug!("failed to flush close_notify: {}", e);
                }
                s.sock.shutdown(Shutdown::Both)
            }
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            #[cfg(feature = "tls-rustls")]
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            #[cfg(feature = "tls-rustls")]
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            #[cfg(feature = "tls-rustls")]
            Stream::Tls(s) => s.flush(),
        }
    }
}

#[cfg(unix)]
impl std::os::unix::io::AsRawFd for Stream {
    fn as_raw_fd(&self) -> std::os::unix::io::RawFd {
        self.tcp().as_raw_fd()
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_tls() { "Tls" } else { "Plain" };
        f.debug_tuple(kind).field(self.tcp()).finish()
    }
}

/// Listening socket producing [`WebSocket`] connections.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: Config,
    #[cfg(feature = "tls-rustls")]
    tls: Option<TlsAcceptor>,
}

impl Server {
    /// Bind a listener to `addr`.
    ///
    /// # Errors
    ///
    /// `Error::Io` if the address cannot be bound.
    pub fn bind<A: ToSocketAddrs>(addr: A, config: Config) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        debug!("listening on {:?}", listener.local_addr().ok());
        Ok(Self {
            listener,
            config,
            #[cfg(feature = "tls-rustls")]
            tls: None,
        })
    }

    /// Serve wss:// by running a TLS handshake on every accepted socket.
    #[cfg(feature = "tls-rustls")]
    #[must_use]
    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accept the next client.
    ///
    /// Configured timeouts are applied to the socket and the TLS handshake
    /// runs here when TLS is enabled. The WebSocket handshake does not; call
    /// [`WebSocket::handshake`] on the result.
    ///
    /// # Errors
    ///
    /// - `Error::Io` if accepting or configuring the socket fails
    /// - `Error::Tls` if the TLS handshake fails
    pub fn accept(&self) -> Result<WebSocket<Stream>> {
        let (tcp, peer) = self.listener.accept()?;
        debug!("accepted connection from {}", peer);

        if let Some(timeouts) = &self.config.timeouts {
            tcp.set_read_timeout(Some(timeouts.read))?;
            tcp.set_write_timeout(Some(timeouts.write))?;
        }

        let stream = self.wrap(tcp)?;
        Ok(WebSocket::new(stream, self.config.clone()))
    }

    #[cfg(feature = "tls-rustls")]
    fn wrap(&self, tcp: TcpStream) -> Result<Stream> {
        match &self.tls {
            Some(acceptor) => Ok(Stream::Tls(Box::new(acceptor.accept(tcp)?))),
            None => Ok(Stream::Plain(tcp)),
        }
    }

    #[cfg(not(feature = "tls-rustls"))]
    fn wrap(&self, tcp: TcpStream) -> Result<Stream> {
        Ok(Stream::Plain(tcp))
    }
}

#[cfg(unix)]
impl std::os::unix::io::AsRawFd for Server {
    fn as_raw_fd(&self) -> std::os::unix::io::RawFd {
        self.listener.as_raw_fd()
    }
}
