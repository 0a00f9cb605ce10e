use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum MessageError {
    // request head
    Httparse(httparse::Error),

    HeadTooLarge,

    HttpVersion,

    Uri(url::ParseError),

    Host,

    // body framing
    ContentLength,

    ChunkSize,

    ChunkTerminator,

    BodyTooLarge,

    UnexpectedEof,
}

impl MessageError {
    /// Status of the best-effort diagnostic response.
    pub const fn status(&self) -> u16 {
        use MessageError::*;
        match self {
            HeadTooLarge => 431,
            HttpVersion => 505,
            BodyTooLarge => 413,
            _ => 400,
        }
    }
}

impl Display for MessageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use MessageError::*;
        match self {
            Httparse(e) => write!(f, "Http parse error: {}", e),
            HeadTooLarge => write!(f, "Request head exceeds the allowed size"),
            HttpVersion => write!(f, "Unsupported http version"),
            Uri(e) => write!(f, "Malformed request uri: {}", e),
            Host => write!(f, "Host header is not a plain authority"),
            ContentLength => write!(f, "Malformed content-length header"),
            ChunkSize => write!(f, "Malformed or missing chunk size line"),
            ChunkTerminator => write!(f, "Chunk data is not terminated by CRLF"),
            BodyTooLarge => write!(f, "Body exceeds the allowed size"),
            UnexpectedEof => write!(f, "Connection closed inside a message"),
        }
    }
}

impl From<httparse::Error> for MessageError {
    fn from(e: httparse::Error) -> Self { MessageError::Httparse(e) }
}

impl From<url::ParseError> for MessageError {
    fn from(e: url::ParseError) -> Self { MessageError::Uri(e) }
}

impl std::error::Error for MessageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MessageError::Httparse(e) => Some(e),
            MessageError::Uri(e) => Some(e),
            _ => None,
        }
    }
}
