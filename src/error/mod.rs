#![allow(missing_docs)]
//! Errors
//!
//! Everything below the application boundary either succeeds or fails with
//! a connection-level [`Error`]. Application errors are [`HttpError`]s and
//! never leave the filter chain.

mod frame;
mod handshake;
mod http;
mod message;
mod response;
mod route;

pub use frame::FrameError;
pub use handshake::HandshakeError;
pub use http::HttpError;
pub use message::MessageError;
pub use response::ResponseError;
pub use route::RouteError;

use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum Error {
    Frame(FrameError),

    Message(MessageError),

    Handshake(HandshakeError),

    Response(ResponseError),

    // reading from the channel failed
    Read(std::io::Error),

    // the channel broke while answering, never retried
    WriteFailed(std::io::Error),
}

impl Error {
    /// Whether we failed to answer, rather than the peer sending garbage.
    #[inline]
    pub const fn is_write_failure(&self) -> bool { matches!(self, Error::WriteFailed(_)) }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self { Error::Frame(e) }
}

impl From<MessageError> for Error {
    fn from(e: MessageError) -> Self { Error::Message(e) }
}

impl From<HandshakeError> for Error {
    fn from(e: HandshakeError) -> Self { Error::Handshake(e) }
}

impl From<ResponseError> for Error {
    fn from(e: ResponseError) -> Self { Error::Response(e) }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error { Error::Read(e) }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            Frame(e) => write!(f, "Frame error: {}", e),
            Message(e) => write!(f, "Message error: {}", e),
            Handshake(e) => write!(f, "Handshake error: {}", e),
            Response(e) => write!(f, "Response error: {}", e),
            Read(e) => write!(f, "Read failed: {}", e),
            WriteFailed(e) => write!(f, "Write failed: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use Error::*;

        match self {
            Frame(e) => Some(e),
            Message(e) => Some(e),
            Handshake(e) => Some(e),
            Response(e) => Some(e),
            Read(e) => Some(e),
            WriteFailed(e) => Some(e),
        }
    }
}
