use std::fmt::{Display, Formatter};

#[derive(Debug, PartialEq, Eq)]
pub enum HandshakeError {
    // http error
    HttpMethod,

    HttpVersion,

    // websocket error
    Upgrade,

    SecWebSocketKey,

    SecWebSocketVersion,

    // no listener for the requested path
    NoListener,
}

impl HandshakeError {
    /// Status of the response refusing the upgrade.
    pub const fn status(&self) -> u16 {
        use HandshakeError::*;
        match self {
            HttpMethod => 405,
            HttpVersion => 505,
            NoListener => 404,
            _ => 400,
        }
    }
}

impl Display for HandshakeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use HandshakeError::*;
        match self {
            // http error
            HttpMethod => write!(f, "Illegal http method"),

            HttpVersion => write!(f, "Illegal http version"),

            // websocket error
            Upgrade => write!(f, "Missing or illegal upgrade header"),

            SecWebSocketKey => write!(f, "Missing sec-websocket-key header"),

            SecWebSocketVersion => {
                write!(f, "Missing or illegal sec-websocket-version")
            }

            NoListener => write!(f, "No websocket listener for this path"),
        }
    }
}

// use default impl
impl std::error::Error for HandshakeError {}
