//! WebSocket frame encoding and decoding (RFC 6455).
//!
//! Server-side codec: outgoing frames are never masked, incoming frames must
//! be masked, unfragmented and free of reserved bits. Decoding unmasks the
//! payload in place inside the caller's buffer.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |                         Masking key (if present)              |
//! +---------------------------------------------------------------+
//! |                     Payload data                              |
//! +---------------------------------------------------------------+
//! ```

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::{apply_mask, apply_mask_fast};

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Smallest possible frame header.
pub const MIN_HEADER_LEN: usize = 2;

const MASK_KEY_LEN: usize = 4;

/// Decoded header of a client-to-server frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key sent by the client.
    pub mask: [u8; 4],
    /// Declared payload length.
    pub payload_len: usize,
    /// Header length including extended length and masking key.
    pub header_len: usize,
}

impl FrameHeader {
    /// Decode and validate a frame header.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if the header itself is not fully buffered
    /// - `Error::ReservedBitsSet` if any of RSV1-3 is set
    /// - `Error::FragmentedFrame` if FIN is clear or the opcode is continuation
    /// - `Error::UnmaskedClientFrame` if the MASK bit is clear
    /// - `Error::ReservedOpcode` for reserved opcodes
    /// - `Error::InvalidFrame` if a 64-bit length has its top bit set
    /// - `Error::PayloadTooLargeForPlatform` if the length does not fit `usize`
    /// - `Error::ControlFrameTooLarge` for control payloads above 125 bytes
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < MIN_HEADER_LEN {
            return Err(Error::IncompleteFrame {
                needed: MIN_HEADER_LEN - buf.len(),
            });
        }

        let byte0 = buf[0];
        let byte1 = buf[1];

        if byte0 & 0x70 != 0 {
            return Err(Error::ReservedBitsSet);
        }
        if byte0 & 0x80 == 0 {
            return Err(Error::FragmentedFrame);
        }
        if byte1 & 0x80 == 0 {
            return Err(Error::UnmaskedClientFrame);
        }
        let opcode = OpCode::from_u8(byte0 & 0x0F)?;

        let (payload_len, len_field_end) = match byte1 & 0x7F {
            126 => {
                if buf.len() < 4 {
                    return Err(Error::IncompleteFrame {
                        needed: 4 - buf.len(),
                    });
                }
                (u16::from_be_bytes([buf[2], buf[3]]) as usize, 4)
            }
            127 => {
                if buf.len() < 10 {
                    return Err(Error::IncompleteFrame {
                        needed: 10 - buf.len(),
                    });
                }
                if buf[2] & 0x80 != 0 {
                    return Err(Error::InvalidFrame(
                        "64-bit payload length has its most significant bit set".into(),
                    ));
                }
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&buf[2..10]);
                let len_u64 = u64::from_be_bytes(raw);
                let len =
                    usize::try_from(len_u64).map_err(|_| Error::PayloadTooLargeForPlatform {
                        size: len_u64,
                        max: usize::MAX as u64,
                    })?;
                (len, 10)
            }
            short => (short as usize, 2),
        };

        if opcode.is_control() && payload_len > MAX_CONTROL_FRAME_PAYLOAD {
            return Err(Error::ControlFrameTooLarge(payload_len));
        }

        let header_len = len_field_end + MASK_KEY_LEN;
        if buf.len() < header_len {
            return Err(Error::IncompleteFrame {
                needed: header_len - buf.len(),
            });
        }

        let mut mask = [0u8; 4];
        mask.copy_from_slice(&buf[len_field_end..header_len]);

        Ok(Self {
            opcode,
            mask,
            payload_len,
            header_len,
        })
    }

    /// Total size of the frame on the wire.
    ///
    /// # Errors
    ///
    /// `Error::PayloadTooLargeForPlatform` if header plus payload overflows `usize`.
    pub fn frame_len(&self) -> Result<usize> {
        self.header_len
            .checked_add(self.payload_len)
            .ok_or(Error::PayloadTooLargeForPlatform {
                size: self.payload_len as u64,
                max: (usize::MAX - self.header_len) as u64,
            })
    }
}

/// A fully buffered, validated and unmasked input frame.
#[derive(Debug, PartialEq, Eq)]
pub struct InputFrame<'a> {
    /// Frame opcode.
    pub opcode: OpCode,
    /// Unmasked payload, borrowed from the decode buffer.
    pub payload: &'a [u8],
    /// Number of buffer bytes the frame occupied.
    pub len: usize,
}

/// Outcome of decoding the front of a buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameStatus<'a> {
    /// A complete frame was decoded.
    Complete(InputFrame<'a>),
    /// More bytes are required; `needed` is exact once the header is known
    /// and a lower bound before that.
    Incomplete {
        /// Additional bytes to read before retrying.
        needed: usize,
    },
}

/// Decode one client frame from the front of `buf`, unmasking it in place.
///
/// Trailing bytes beyond the frame are left untouched.
///
/// # Errors
///
/// Any header error from [`FrameHeader::parse`], plus `Error::InvalidFrame`
/// if fewer than two bytes are supplied.
pub fn parse_input_frame(buf: &mut [u8]) -> Result<FrameStatus<'_>> {
    if buf.len() < MIN_HEADER_LEN {
        return Err(Error::InvalidFrame(format!(
            "frame needs at least {} bytes, got {}",
            MIN_HEADER_LEN,
            buf.len()
        )));
    }

    let header = match FrameHeader::parse(buf) {
        Ok(header) => header,
        Err(Error::IncompleteFrame { needed }) => return Ok(FrameStatus::Incomplete { needed }),
        Err(e) => return Err(e),
    };

    let total = header.frame_len()?;
    if buf.len() < total {
        return Ok(FrameStatus::Incomplete {
            needed: total - buf.len(),
        });
    }

    let payload = &mut buf[header.header_len..total];
    apply_mask_fast(payload, header.mask);

    Ok(FrameStatus::Complete(InputFrame {
        opcode: header.opcode,
        payload,
        len: total,
    }))
}

/// Exact encoded size of a frame carrying `payload_len` bytes.
#[must_use]
pub const fn frame_wire_size(payload_len: usize, masked: bool) -> usize {
    let extended = if payload_len <= 125 {
        0
    } else if payload_len <= 65535 {
        2
    } else {
        8
    };
    let mask = if masked { MASK_KEY_LEN } else { 0 };
    2 + extended + mask + payload_len
}

fn encode_into(
    payload: &[u8],
    opcode: OpCode,
    mask: Option<[u8; 4]>,
    buf: &mut [u8],
) -> Result<usize> {
    let payload_len = payload.len();
    let total_size = frame_wire_size(payload_len, mask.is_some());

    if buf.len() < total_size {
        return Err(Error::BufferTooSmall {
            needed: total_size,
            capacity: buf.len(),
        });
    }

    encode_sized(payload, opcode, mask, &mut buf[..total_size]);
    Ok(total_size)
}

/// Encode into a buffer of exactly `frame_wire_size` bytes.
fn encode_sized(payload: &[u8], opcode: OpCode, mask: Option<[u8; 4]>, buf: &mut [u8]) {
    let payload_len = payload.len();
    debug_assert_eq!(buf.len(), frame_wire_size(payload_len, mask.is_some()));

    buf[0] = 0x80 | opcode.as_u8();

    let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
    let mut offset = 2;
    if payload_len <= 125 {
        buf[1] = mask_bit | payload_len as u8;
    } else if payload_len <= 65535 {
        buf[1] = mask_bit | 126;
        buf[2..4].copy_from_slice(&(payload_len as u16).to_be_bytes());
        offset += 2;
    } else {
        buf[1] = mask_bit | 127;
        buf[2..10].copy_from_slice(&(payload_len as u64).to_be_bytes());
        offset += 8;
    }

    if let Some(mask_key) = mask {
        buf[offset..offset + MASK_KEY_LEN].copy_from_slice(&mask_key);
        offset += MASK_KEY_LEN;
    }

    buf[offset..offset + payload_len].copy_from_slice(payload);

    if let Some(mask_key) = mask {
        apply_mask(&mut buf[offset..offset + payload_len], mask_key);
    }
}

/// Encode an unmasked server frame into `buf`, returning the bytes written.
///
/// # Errors
///
/// `Error::BufferTooSmall` if `buf` cannot hold the frame.
pub fn write_frame(payload: &[u8], opcode: OpCode, buf: &mut [u8]) -> Result<usize> {
    encode_into(payload, opcode, None, buf)
}

/// Encode a masked, client-style frame into `buf`, returning the bytes written.
///
/// # Errors
///
/// `Error::BufferTooSmall` if `buf` cannot hold the frame.
pub fn write_masked_frame(
    payload: &[u8],
    opcode: OpCode,
    mask: [u8; 4],
    buf: &mut [u8],
) -> Result<usize> {
    encode_into(payload, opcode, Some(mask), buf)
}

/// Encode an unmasked server frame.
#[must_use]
pub fn make_frame(payload: &[u8], opcode: OpCode) -> Vec<u8> {
    let mut buf = vec![0u8; frame_wire_size(payload.len(), false)];
    encode_sized(payload, opcode, None, &mut buf);
    buf
}

/// Encode a masked frame as a client would send it.
#[must_use]
pub fn make_masked_frame(payload: &[u8], opcode: OpCode, mask: [u8; 4]) -> Vec<u8> {
    let mut buf = vec![0u8; frame_wire_size(payload.len(), true)];
    encode_sized(payload, opcode, Some(mask), &mut buf);
    buf
}
