//! Websocket handshake.
//!
//! From [RFC-6455 Section 4.2](https://datatracker.ietf.org/doc/html/rfc6455#section-4.2):
//!
//! If the server chooses to accept the incoming connection, it MUST
//! reply with a valid HTTP response.
//!
//! Example:
//!
//! ```text
//! HTTP/1.1 101 Switching Protocols
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=
//! ```
//!

pub mod key;

pub use key::{new_sec_key, derive_accept_key};

use crate::error::{HandshakeError, ResponseError};
use crate::http::{Request, Response, Version};

/// 258EAFA5-E914-47DA-95CA-C5AB0DC85B11
pub const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// 13
pub const WEBSOCKET_VERSION: &str = "13";

/// Check an upgrade request, return the `sec-websocket-key`.
///
/// Header values are case insensitive.
/// ref: https://datatracker.ietf.org/doc/html/rfc6455#section-4.1
pub fn validate(req: &Request) -> Result<String, HandshakeError> {
    if req.method() != "GET" {
        return Err(HandshakeError::HttpMethod);
    }

    if req.version() < Version::Http11 {
        return Err(HandshakeError::HttpVersion);
    }

    let headers = req.headers();
    if !headers.has_token("upgrade", "websocket") || !headers.has_token("connection", "upgrade") {
        return Err(HandshakeError::Upgrade);
    }

    match headers.first("sec-websocket-version") {
        Some(v) if v.trim() == WEBSOCKET_VERSION => {}
        _ => return Err(HandshakeError::SecWebSocketVersion),
    }

    match headers.first("sec-websocket-key") {
        Some(k) if !k.trim().is_empty() => Ok(k.trim().to_string()),
        _ => Err(HandshakeError::SecWebSocketKey),
    }
}

/// Validate the request and answer `101 Switching Protocols`.
pub fn accept(req: &Request, res: &mut Response) -> Result<(), HandshakeError> {
    let sec_key = validate(req)?;

    // a fresh response is never flushed
    let _ = answer_switch(res, &derive_accept_key(sec_key.as_bytes()));
    Ok(())
}

fn answer_switch(res: &mut Response, sec_accept: &str) -> Result<(), ResponseError> {
    res.answer(101, "Switching Protocols")?;
    res.header("Upgrade", "websocket")?;
    res.header("Connection", "Upgrade")?;
    res.header("Sec-WebSocket-Accept", sec_accept)?;
    res.end()
}

/// Answer a refused handshake.
pub fn refuse(res: &mut Response, e: &HandshakeError) -> Result<(), ResponseError> {
    res.answer(e.status(), "")?;
    if *e == HandshakeError::SecWebSocketVersion {
        res.header("Sec-WebSocket-Version", WEBSOCKET_VERSION)?;
    }
    res.header("Connection", "close")?;
    res.send(format!("{}\n", e), "text/plain; charset=utf-8")
}

/// Client side upgrade request, as a browser would send it.
pub fn client_request(host: &str, path: &str, sec_key: &str) -> String {
    format!(
        "GET {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n",
        path, host, sec_key
    )
}
