//! Payload length.

/// Payload length as carried on the wire.
///
/// The 7-bit field holds the length itself up to 125, otherwise it
/// announces a 16-bit (126) or 64-bit (127) big-endian extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLen {
    /// 0 - 125
    Standard(u8),
    /// 126 - 65535
    Extended1(u16),
    /// over 65536
    Extended2(u64),
}

impl PayloadLen {
    /// Smallest encoding for `n`.
    #[inline]
    pub const fn from_num(n: u64) -> Self {
        if n < 126 {
            PayloadLen::Standard(n as u8)
        } else if n < 65536 {
            PayloadLen::Extended1(n as u16)
        } else {
            PayloadLen::Extended2(n)
        }
    }

    /// Convert to number.
    #[inline]
    pub const fn to_num(self) -> u64 {
        use PayloadLen::*;
        match self {
            Standard(v) => v as u64,
            Extended1(v) => v as u64,
            Extended2(v) => v,
        }
    }

    /// Kind of length from the second header byte, mask bit ignored.
    ///
    /// Extended kinds carry 0 until the extension bytes are read.
    #[inline]
    pub const fn from_flag(b: u8) -> Self {
        match b & 0x7f {
            126 => PayloadLen::Extended1(0),
            127 => PayloadLen::Extended2(0),
            b => PayloadLen::Standard(b),
        }
    }

    /// The 7-bit field for this length.
    #[inline]
    pub const fn to_flag(&self) -> u8 {
        use PayloadLen::*;
        match self {
            Standard(b) => *b,
            Extended1(_) => 126,
            Extended2(_) => 127,
        }
    }

    /// Number of bytes following the flag byte.
    #[inline]
    pub const fn extra_len(&self) -> usize {
        use PayloadLen::*;
        match self {
            Standard(_) => 0,
            Extended1(_) => 2,
            Extended2(_) => 8,
        }
    }

    /// Read as 16-bit length.
    #[inline]
    pub const fn from_byte2(buf: [u8; 2]) -> Self { PayloadLen::Extended1(u16::from_be_bytes(buf)) }

    /// Read as 64-bit length.
    #[inline]
    pub const fn from_byte8(buf: [u8; 8]) -> Self { PayloadLen::Extended2(u64::from_be_bytes(buf)) }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boundaries() {
        let cases: [(u64, u8, usize); 7] = [
            (0, 0, 0),
            (125, 125, 0),
            (126, 126, 2),
            (65535, 126, 2),
            (65536, 127, 8),
            (0x8000000, 127, 8),
            (u64::MAX, 127, 8),
        ];

        for (n, flag, extra) in cases {
            let len = PayloadLen::from_num(n);
            assert_eq!(len.to_num(), n);
            assert_eq!(len.to_flag(), flag);
            assert_eq!(len.extra_len(), extra);

            let parsed = match PayloadLen::from_flag(flag) {
                PayloadLen::Extended1(_) => PayloadLen::from_byte2((n as u16).to_be_bytes()),
                PayloadLen::Extended2(_) => PayloadLen::from_byte8(n.to_be_bytes()),
                standard => standard,
            };
            assert_eq!(parsed, len);
        }
    }

    #[test]
    fn flag_ignores_mask_bit() {
        assert_eq!(PayloadLen::from_flag(0x80 | 5), PayloadLen::Standard(5));
        assert_eq!(PayloadLen::from_flag(0x80 | 127), PayloadLen::Extended2(0));
    }
}
