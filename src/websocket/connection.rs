//! Websocket connection.

use super::FrameCodec;
use crate::error::FrameError;
use crate::frame::{OpCode, close};
use crate::http::{Headers, Request};
use crate::role::Server;

/// Stable identity of a socket, assigned by the event loop.
pub type SocketId = u64;

/// Server side of an established websocket connection.
///
/// Created when the handshake succeeds, carries what was negotiated and
/// the frame codec. Everything sent is queued and goes out on the next
/// flush.
#[derive(Debug)]
pub struct Connection {
    id: SocketId,
    uri: String,
    path: String,
    headers: Headers,
    codec: FrameCodec<Server>,
    close_code: Option<u16>,
}

impl Connection {
    pub fn new(id: SocketId, req: &Request, codec: FrameCodec<Server>) -> Self {
        Self {
            id,
            uri: req.uri().to_string(),
            path: req.path().to_string(),
            headers: req.headers().clone(),
            codec,
            close_code: None,
        }
    }

    #[inline]
    pub const fn id(&self) -> SocketId { self.id }

    /// Full URI of the handshake request.
    #[inline]
    pub fn uri(&self) -> &str { &self.uri }

    #[inline]
    pub fn path(&self) -> &str { &self.path }

    /// Handshake request header.
    #[inline]
    pub fn header(&self, name: &str) -> Option<String> { self.headers.get(name) }

    #[inline]
    pub fn headers(&self) -> &Headers { &self.headers }

    /// Queue a text message.
    pub fn send(&mut self, text: &str) -> Result<(), FrameError> {
        self.codec.transmit(OpCode::Text, text.as_bytes())
    }

    /// Queue a binary message.
    pub fn send_binary(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.codec.transmit(OpCode::Binary, data)
    }

    /// Queue a ping, at most 125 bytes.
    pub fn ping(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.codec.transmit(OpCode::Ping, data)
    }

    /// Queue a close frame; the connection is dropped once it is flushed.
    ///
    /// The reason is cut to fit a control frame.
    pub fn close(&mut self, code: u16, reason: &str) -> Result<(), FrameError> {
        let mut end = reason.len().min(123);
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        self.codec
            .transmit(OpCode::Close, &close::encode(code, &reason[..end]))?;
        self.close_code = Some(code);
        Ok(())
    }

    /// Whether a close frame has been queued.
    #[inline]
    pub const fn is_closing(&self) -> bool { self.codec.is_close_sent() }

    /// Code of the queued close frame.
    #[inline]
    pub const fn close_code(&self) -> Option<u16> { self.close_code }

    #[inline]
    pub fn codec(&mut self) -> &mut FrameCodec<Server> { &mut self.codec }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::websocket::MAX_FRAME_SIZE;

    fn conn() -> Connection {
        let req = Request::new("GET", "/chat/room?x=1")
            .unwrap()
            .with_header("Origin", "http://example.com");
        Connection::new(7, &req, FrameCodec::new(MAX_FRAME_SIZE, 1024))
    }

    #[test]
    fn negotiated() {
        let c = conn();
        assert_eq!(c.id(), 7);
        assert_eq!(c.path(), "/chat/room");
        assert_eq!(c.uri(), "http://localhost/chat/room?x=1");
        assert_eq!(c.header("origin").as_deref(), Some("http://example.com"));
    }

    #[test]
    fn send_then_close() {
        let mut c = conn();
        c.send("hi").unwrap();
        c.send_binary(&[1]).unwrap();
        c.ping(b"").unwrap();
        assert!(!c.is_closing());

        let reason = "é".repeat(100);
        c.close(close::GOING_AWAY, &reason).unwrap();
        assert!(c.is_closing());
        assert_eq!(c.close_code(), Some(close::GOING_AWAY));
        assert_eq!(c.close(close::NORMAL, ""), Err(FrameError::Closed));
        assert_eq!(c.close_code(), Some(close::GOING_AWAY));
        assert_eq!(c.send("late"), Err(FrameError::Closed));

        let out = c.codec().pending().to_vec();
        assert_eq!(&out[..4], &[0x81, 0x02, b'h', b'i']);
        assert_eq!(&out[4..7], &[0x82, 0x01, 0x01]);
        assert_eq!(&out[7..9], &[0x89, 0x00]);
        // 2 code bytes + 61 two-byte chars
        assert_eq!(&out[9..13], &[0x88, 124, 0x03, 0xe9]);
        assert_eq!(out.len(), 13 + 122);
    }
}
