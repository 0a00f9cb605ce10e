//! Websocket data frame.
//!
//! [RFC-6455 Section5](https://datatracker.ietf.org/doc/html/rfc6455#section-5)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! :                     Payload Data continued ...                :
//! + - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - +
//! |                     Payload Data continued ...                |
//! +---------------------------------------------------------------+
//! ```
//!

pub mod flag;
pub mod close;
pub mod length;
pub mod mask;

pub use flag::{Fin, OpCode};
pub use length::PayloadLen;
pub use mask::Mask;

use crate::error::FrameError;

/// The largest possible frame head, 2 + 8 + 4.
pub const MAX_HEAD_LEN: usize = 14;

/// Websocket frame head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHead {
    pub fin: Fin,
    pub opcode: OpCode,
    pub mask: Mask,
    pub length: PayloadLen,
}

impl FrameHead {
    /// Constructor.
    #[inline]
    pub const fn new(fin: Fin, opcode: OpCode, mask: Mask, length: PayloadLen) -> Self {
        Self {
            fin,
            opcode,
            mask,
            length,
        }
    }

    /// Number of bytes the encoded head occupies.
    #[inline]
    pub const fn encoded_len(&self) -> usize {
        let key = match self.mask {
            Mask::Key(_) => 4,
            Mask::None => 0,
        };
        2 + self.length.extra_len() + key
    }

    /// Encode to provided buffer, returns the count of written bytes.
    /// The caller should ensure the buffer is large enough,
    /// otherwise a [`FrameError::NotEnoughCapacity`] error will be returned.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, FrameError> {
        let n = self.encoded_len();
        if buf.len() < n {
            return Err(FrameError::NotEnoughCapacity);
        }

        // fin, opcode
        buf[0] = self.fin as u8 | self.opcode as u8;

        // mask, payload length
        buf[1] = self.mask.to_flag() | self.length.to_flag();

        // extended payload length
        let mut pos = 2;
        match &self.length {
            PayloadLen::Standard(_) => {}
            PayloadLen::Extended1(v) => {
                buf[2..4].copy_from_slice(&v.to_be_bytes());
                pos = 4;
            }
            PayloadLen::Extended2(v) => {
                buf[2..10].copy_from_slice(&v.to_be_bytes());
                pos = 10;
            }
        };

        // mask key
        if let Mask::Key(k) = &self.mask {
            buf[pos..pos + 4].copy_from_slice(k);
        }

        Ok(n)
    }

    /// Append the encoded head to a growable buffer.
    pub fn encode_to_vec(&self, out: &mut Vec<u8>) {
        let mut buf = [0_u8; MAX_HEAD_LEN];
        // a MAX_HEAD_LEN buffer accommodates any kind of frame head
        if let Ok(n) = self.encode(&mut buf) {
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Parse from provided buffer, returns [`FrameHead`] and the count of read bytes
    /// if the parse succeeds.
    /// If there is not enough data to parse, a [`FrameError::NotEnoughData`] error
    /// will be returned.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), FrameError> {
        if buf.len() < 2 {
            return Err(FrameError::NotEnoughData);
        }

        let mut n: usize = 2;

        // fin, opcode
        let b1 = buf[0];

        // mask, payload length
        let b2 = buf[1];

        let fin = Fin::from_flag(b1)?;
        let opcode = OpCode::from_flag(b1)?;

        let masked = Mask::is_set(b2);
        let mut length = PayloadLen::from_flag(b2);

        match length {
            PayloadLen::Standard(_) => {}
            PayloadLen::Extended1(_) => {
                if buf.len() - n < 2 {
                    return Err(FrameError::NotEnoughData);
                }
                length = PayloadLen::from_byte2([buf[2], buf[3]]);
                n += 2;
            }
            PayloadLen::Extended2(_) => {
                if buf.len() - n < 8 {
                    return Err(FrameError::NotEnoughData);
                }
                let mut b8 = [0_u8; 8];
                b8.copy_from_slice(&buf[2..10]);
                length = PayloadLen::from_byte8(b8);
                n += 8;
            }
        };

        let mask = if masked {
            if buf.len() - n < 4 {
                return Err(FrameError::NotEnoughData);
            }
            let key = [buf[n], buf[n + 1], buf[n + 2], buf[n + 3]];
            n += 4;
            Mask::Key(key)
        } else {
            Mask::None
        };

        Ok((
            FrameHead {
                fin,
                opcode,
                mask,
                length,
            },
            n,
        ))
    }
}
