use std::fmt::{Display, Formatter};

use crate::frame::close;

#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    IllegalOpCode(u8),

    IllegalRsv,

    FragmentedControl,

    ControlTooLong,

    UnexpectedContinuation,

    UnfinishedMessage,

    TooLarge(u64),

    InvalidUtf8,

    NotEnoughData,

    NotEnoughCapacity,

    Closed,
}

impl FrameError {
    /// Close code sent to the peer before the connection is dropped.
    pub const fn close_code(&self) -> u16 {
        use FrameError::*;
        match self {
            TooLarge(_) => close::UNSUPPORTED,
            InvalidUtf8 => close::INVALID_PAYLOAD,
            _ => close::PROTOCOL_ERROR,
        }
    }
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use FrameError::*;
        match self {
            IllegalOpCode(op) => write!(f, "Illegal opcode value {:#x}", op),
            IllegalRsv => write!(f, "Reserved bits set without a negotiated extension"),
            FragmentedControl => write!(f, "Control frame is not final"),
            ControlTooLong => write!(f, "Control frame payload exceeds 125 bytes"),
            UnexpectedContinuation => write!(f, "Continuation frame without an open message"),
            UnfinishedMessage => write!(f, "New data frame while a fragmented message is open"),
            TooLarge(n) => write!(f, "Frame length {} exceeds the allowed maximum", n),
            InvalidUtf8 => write!(f, "Text payload is not valid utf-8"),
            NotEnoughData => write!(f, "Not enough data to parse"),
            NotEnoughCapacity => write!(f, "Not enough space to write to"),
            Closed => write!(f, "Close frame already sent"),
        }
    }
}

// use default impl
impl std::error::Error for FrameError {}
