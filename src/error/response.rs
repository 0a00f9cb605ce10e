use std::fmt::{Display, Formatter};

#[derive(Debug, PartialEq, Eq)]
pub enum ResponseError {
    // status line and headers are already on their way
    Flushed,

    // the body has been terminated
    Ended,

    // begin was called twice, or write before begin
    OutOfOrder,
}

impl Display for ResponseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use ResponseError::*;
        match self {
            Flushed => write!(f, "Response already flushed"),
            Ended => write!(f, "Response already ended"),
            OutOfOrder => write!(f, "Message output used out of order"),
        }
    }
}

// use default impl
impl std::error::Error for ResponseError {}
