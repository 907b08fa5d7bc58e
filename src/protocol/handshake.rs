//! WebSocket opening handshake (RFC 6455 Section 4).
//!
//! Server side only: [`Handshake`] parses a client's HTTP upgrade request
//! and [`build_handshake_response`] produces the `101 Switching Protocols`
//! answer for an accepted request.

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use log::debug;
use sha1::{Digest, Sha1};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this server speaks.
pub const WS_VERSION: &str = "13";

/// Length of every 101 response: the accept token is always 28 characters.
pub const HANDSHAKE_RESPONSE_LEN: usize = 129;

/// Response for a well-formed request to a resource nobody serves.
pub const NOT_FOUND_RESPONSE: &[u8] = b"HTTP/1.1 404 Not Found\r\n\r\n";

/// Response for a malformed or unsupported upgrade request.
pub const BAD_REQUEST_RESPONSE: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nSec-WebSocket-Version: 13\r\n\r\n";

const HOST_FIELD: &str = "Host";
const ORIGIN_FIELD: &str = "Origin";
const KEY_FIELD: &str = "Sec-WebSocket-Key";
const PROTOCOL_FIELD: &str = "Sec-WebSocket-Protocol";
const VERSION_FIELD: &str = "Sec-WebSocket-Version";
const CONNECTION_FIELD: &str = "Connection";
const UPGRADE_FIELD: &str = "Upgrade";

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Classification of a handshake parse attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HandshakeStatus {
    /// Nothing has been parsed yet.
    #[default]
    Empty,
    /// The request is not terminated by a blank line yet.
    Incomplete,
    /// The request is malformed or asks for something unsupported.
    Error,
    /// A valid opening handshake.
    Opening,
}

/// A client's upgrade request.
///
/// String fields are `None` until a parse finds the matching header. Each
/// parse starts from a clean slate, so values from an earlier request never
/// leak into the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    /// The Host header value.
    pub host: Option<String>,
    /// The Origin header value.
    pub origin: Option<String>,
    /// The Sec-WebSocket-Key header value.
    pub key: Option<String>,
    /// The request path (e.g. "/chat").
    pub resource: Option<String>,
    /// Outcome of the last parse.
    pub frame_type: HandshakeStatus,
}

/// Header facts that decide acceptance but are not kept on [`Handshake`].
#[derive(Debug, Default)]
struct RequestFlags {
    connection_upgrade: bool,
    upgrade_websocket: bool,
    subprotocol: bool,
    version: Option<String>,
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Length of the request header block including its blank line, once the
/// blank line has arrived.
pub(crate) fn request_len(data: &[u8]) -> Option<usize> {
    find_subsequence(data, HEADER_TERMINATOR).map(|end| end + HEADER_TERMINATOR.len())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl Handshake {
    /// Create an empty handshake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all parsed values and return to [`HandshakeStatus::Empty`].
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the last parse produced a valid opening handshake.
    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.frame_type == HandshakeStatus::Opening
    }

    /// Parse `data` and classify it.
    ///
    /// `data` may be a partial read; on [`HandshakeStatus::Incomplete`] the
    /// caller appends more bytes and parses the whole buffer again.
    pub fn parse(&mut self, data: &[u8]) -> HandshakeStatus {
        match self.try_parse(data) {
            Ok(status) => status,
            Err(e) => {
                debug!("rejecting handshake: {}", e);
                HandshakeStatus::Error
            }
        }
    }

    /// Parse `data`, reporting why a request was rejected.
    ///
    /// Returns `Ok(Incomplete)` or `Ok(Opening)`; `self.frame_type` is set
    /// to `Error` whenever this returns an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The header block is not valid UTF-8.
    /// - The request line is not `GET <resource> HTTP/1.1`.
    /// - `Host` or `Sec-WebSocket-Key` is missing or empty.
    /// - `Connection` does not list `upgrade` or `Upgrade` is not `websocket`.
    /// - A `Sec-WebSocket-Protocol` header is present.
    /// - `Sec-WebSocket-Version` is missing or not `13`.
    pub fn try_parse(&mut self, data: &[u8]) -> Result<HandshakeStatus> {
        self.reset();

        let Some(end) = find_subsequence(data, HEADER_TERMINATOR) else {
            self.frame_type = HandshakeStatus::Incomplete;
            return Ok(HandshakeStatus::Incomplete);
        };

        self.frame_type = HandshakeStatus::Error;
        // Keep the CRLF of the last header line, drop the blank line.
        let head = std::str::from_utf8(&data[..end + 2])
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;
        self.parse_head(head)?;

        self.frame_type = HandshakeStatus::Opening;
        Ok(HandshakeStatus::Opening)
    }

    fn parse_head(&mut self, head: &str) -> Result<()> {
        let mut lines = head.split_terminator("\r\n");

        let request_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty request".into()))?;
        self.resource = Some(parse_request_line(request_line)?);

        let mut flags = RequestFlags::default();
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();

            if name.eq_ignore_ascii_case(HOST_FIELD) {
                self.host = non_empty(value);
            } else if name.eq_ignore_ascii_case(ORIGIN_FIELD) {
                self.origin = non_empty(value);
            } else if name.eq_ignore_ascii_case(KEY_FIELD) {
                self.key = non_empty(value);
            } else if name.eq_ignore_ascii_case(PROTOCOL_FIELD) {
                flags.subprotocol = true;
            } else if name.eq_ignore_ascii_case(VERSION_FIELD) {
                flags.version = Some(value.to_string());
            } else if name.eq_ignore_ascii_case(CONNECTION_FIELD) {
                flags.connection_upgrade = value
                    .split(',')
                    .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
            } else if name.eq_ignore_ascii_case(UPGRADE_FIELD) {
                flags.upgrade_websocket = value.eq_ignore_ascii_case("websocket");
            }
        }

        if self.host.is_none() {
            return Err(Error::InvalidHandshake("Missing Host header".into()));
        }
        if self.key.is_none() {
            return Err(Error::InvalidHandshake(
                "Missing Sec-WebSocket-Key header".into(),
            ));
        }
        if !flags.connection_upgrade {
            return Err(Error::InvalidHandshake(
                "Connection header does not request an upgrade".into(),
            ));
        }
        if !flags.upgrade_websocket {
            return Err(Error::InvalidHandshake(
                "Upgrade header is not websocket".into(),
            ));
        }
        if flags.subprotocol {
            return Err(Error::InvalidHandshake(
                "Subprotocols are not supported".into(),
            ));
        }
        match flags.version.as_deref() {
            Some(WS_VERSION) => Ok(()),
            Some(other) => Err(Error::InvalidHandshake(format!(
                "Unsupported WebSocket version: {} (expected {})",
                other, WS_VERSION
            ))),
            None => Err(Error::InvalidHandshake(
                "Missing Sec-WebSocket-Version header".into(),
            )),
        }
    }
}

/// Extract the resource from `GET <resource> HTTP/1.1`.
fn parse_request_line(line: &str) -> Result<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["GET", resource, "HTTP/1.1"] => Ok((*resource).to_string()),
        [method, _, "HTTP/1.1"] => Err(Error::InvalidHandshake(format!(
            "Expected GET method, got {}",
            method
        ))),
        [_, _, version] => Err(Error::InvalidHandshake(format!(
            "Expected HTTP/1.1, got {}",
            version
        ))),
        _ => Err(Error::InvalidHandshake("Invalid request line".into())),
    }
}

/// Parse a handshake request into a fresh [`Handshake`].
#[must_use]
pub fn parse_handshake(data: &[u8]) -> Handshake {
    let mut handshake = Handshake::new();
    handshake.parse(data);
    handshake
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use wslite::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Build the `101 Switching Protocols` response for an accepted request.
///
/// # Panics
///
/// If `handshake` is not an opening handshake. Answering a request that
/// failed to parse is a bug in the caller, not a runtime condition.
#[must_use]
pub fn build_handshake_response(handshake: &Handshake) -> Vec<u8> {
    assert!(
        handshake.is_opening(),
        "handshake response requested for a {:?} handshake",
        handshake.frame_type
    );
    let Some(key) = handshake.key.as_deref() else {
        panic!("opening handshake without Sec-WebSocket-Key");
    };

    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        compute_accept_key(key)
    )
    .into_bytes()
}

/// Write the `101 Switching Protocols` response into `out`.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// `Error::BufferTooSmall` if `out` is shorter than the response.
///
/// # Panics
///
/// Same precondition as [`build_handshake_response`].
pub fn write_handshake_response(handshake: &Handshake, out: &mut [u8]) -> Result<usize> {
    let response = build_handshake_response(handshake);
    if response.len() > out.len() {
        return Err(Error::BufferTooSmall {
            needed: response.len(),
            capacity: out.len(),
        });
    }
    out[..response.len()].copy_from_slice(&response);
    Ok(response.len())
}
