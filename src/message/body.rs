//! Body framing.
//!
//! The decoding strategy is chosen from the message headers:
//!
//! - `Transfer-Encoding: chunked`, a series of `<hex size>\r\n<data>\r\n`
//!   ending with a zero-size chunk and optional trailers.
//! - `Content-Length: N`, exactly N bytes.
//! - neither, no body for a request; bytes until end of stream for a response.

use std::io::Read;
use std::task::{Poll, ready};

use super::MessageInput;
use crate::channel::ByteChannel;
use crate::error::{Error, MessageError};
use crate::http::{Headers, status};

/// How a message body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    None,
    Length(u64),
    Chunked,
    UntilEof,
}

fn content_length(headers: &Headers) -> Result<Option<u64>, MessageError> {
    let values = headers.get_all("content-length");
    let mut length = None;
    for v in values.iter().flat_map(|v| v.split(',')) {
        let v = v.trim();
        if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MessageError::ContentLength);
        }
        let n: u64 = v.parse().map_err(|_| MessageError::ContentLength)?;
        match length {
            Some(m) if m != n => return Err(MessageError::ContentLength),
            _ => length = Some(n),
        }
    }
    Ok(length)
}

impl BodyKind {
    /// Strategy for a request body.
    pub fn for_request(headers: &Headers) -> Result<Self, MessageError> {
        if headers.has_token("transfer-encoding", "chunked") {
            return Ok(BodyKind::Chunked);
        }
        Ok(match content_length(headers)? {
            Some(n) => BodyKind::Length(n),
            None => BodyKind::None,
        })
    }

    /// Strategy for a response body.
    pub fn for_response(status: u16, headers: &Headers) -> Result<Self, MessageError> {
        if status::is_bodiless(status) {
            return Ok(BodyKind::None);
        }
        if headers.has_token("transfer-encoding", "chunked") {
            return Ok(BodyKind::Chunked);
        }
        Ok(match content_length(headers)? {
            Some(n) => BodyKind::Length(n),
            None => BodyKind::UntilEof,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Length(u64),
    ChunkSize,
    ChunkData(u64),
    ChunkEnd,
    Trailer,
    UntilEof,
    Done,
}

/// Incremental body decoder.
///
/// All progress is kept in the decoder and the [`MessageInput`] buffer,
/// a suspended decode resumes without losing or repeating bytes.
#[derive(Debug)]
pub struct BodyDecoder {
    state: DecodeState,
    limit: u64,
    total: u64,
}

impl BodyDecoder {
    /// Constructor, `limit` caps the decoded size.
    pub fn new(kind: BodyKind, limit: u64) -> Result<Self, MessageError> {
        let state = match kind {
            BodyKind::None => DecodeState::Done,
            BodyKind::Length(n) if n > limit => return Err(MessageError::BodyTooLarge),
            BodyKind::Length(0) => DecodeState::Done,
            BodyKind::Length(n) => DecodeState::Length(n),
            BodyKind::Chunked => DecodeState::ChunkSize,
            BodyKind::UntilEof => DecodeState::UntilEof,
        };
        Ok(Self {
            state,
            limit,
            total: 0,
        })
    }

    #[inline]
    pub fn is_done(&self) -> bool { self.state == DecodeState::Done }

    /// Bytes decoded so far.
    #[inline]
    pub const fn decoded(&self) -> u64 { self.total }

    /// Bytes left for a length-bound body, if known.
    pub const fn remaining(&self) -> Option<u64> {
        match self.state {
            DecodeState::Length(n) => Some(n),
            DecodeState::Done => Some(0),
            _ => None,
        }
    }

    fn count(&mut self, n: usize) -> Result<(), MessageError> {
        self.total += n as u64;
        if self.total > self.limit {
            Err(MessageError::BodyTooLarge)
        } else {
            Ok(())
        }
    }

    /// Decode the next piece of body.
    ///
    /// Returns `None` once the body is complete.
    pub fn poll_next<C: ByteChannel + ?Sized>(
        &mut self,
        input: &mut MessageInput,
        chan: &mut C,
    ) -> Poll<Result<Option<Vec<u8>>, Error>> {
        loop {
            match self.state {
                DecodeState::Done => return Poll::Ready(Ok(None)),
                DecodeState::Length(n) => {
                    let data = ready!(input.read(chan, clamp(n)))?;
                    if data.is_empty() {
                        return Poll::Ready(Err(MessageError::UnexpectedEof.into()));
                    }
                    self.count(data.len())?;
                    let left = n - data.len() as u64;
                    self.state = if left == 0 {
                        DecodeState::Done
                    } else {
                        DecodeState::Length(left)
                    };
                    return Poll::Ready(Ok(Some(data)));
                }
                DecodeState::ChunkSize => {
                    let line = match ready!(input.read_line(chan))? {
                        Some(line) => line,
                        None => return Poll::Ready(Err(MessageError::UnexpectedEof.into())),
                    };
                    let size = parse_chunk_size(&line)?;
                    self.state = if size == 0 {
                        DecodeState::Trailer
                    } else {
                        DecodeState::ChunkData(size)
                    };
                }
                DecodeState::ChunkData(n) => {
                    let data = ready!(input.read(chan, clamp(n)))?;
                    if data.is_empty() {
                        return Poll::Ready(Err(MessageError::UnexpectedEof.into()));
                    }
                    self.count(data.len())?;
                    let left = n - data.len() as u64;
                    self.state = if left == 0 {
                        DecodeState::ChunkEnd
                    } else {
                        DecodeState::ChunkData(left)
                    };
                    return Poll::Ready(Ok(Some(data)));
                }
                DecodeState::ChunkEnd => {
                    match ready!(input.read_line(chan))? {
                        Some(line) if line.is_empty() => self.state = DecodeState::ChunkSize,
                        Some(_) => return Poll::Ready(Err(MessageError::ChunkTerminator.into())),
                        None => return Poll::Ready(Err(MessageError::UnexpectedEof.into())),
                    }
                }
                DecodeState::Trailer => {
                    // trailers are read and dropped
                    match ready!(input.read_line(chan))? {
                        Some(line) if line.is_empty() => self.state = DecodeState::Done,
                        Some(_) => {}
                        None => return Poll::Ready(Err(MessageError::UnexpectedEof.into())),
                    }
                }
                DecodeState::UntilEof => {
                    let data = ready!(input.read(chan, usize::MAX))?;
                    if data.is_empty() {
                        self.state = DecodeState::Done;
                        return Poll::Ready(Ok(None));
                    }
                    self.count(data.len())?;
                    return Poll::Ready(Ok(Some(data)));
                }
            }
        }
    }

    /// Decode everything that is left into `out`.
    pub fn poll_decode<C: ByteChannel + ?Sized>(
        &mut self,
        input: &mut MessageInput,
        chan: &mut C,
        out: &mut Vec<u8>,
    ) -> Poll<Result<(), Error>> {
        while let Some(data) = ready!(self.poll_next(input, chan))? {
            out.extend_from_slice(&data);
        }
        Poll::Ready(Ok(()))
    }
}

#[inline]
fn clamp(n: u64) -> usize { usize::try_from(n).unwrap_or(usize::MAX) }

fn parse_chunk_size(line: &[u8]) -> Result<u64, MessageError> {
    // chunk extensions are ignored
    let size = match line.iter().position(|b| *b == b';') {
        Some(i) => &line[..i],
        None => line,
    };
    let size = std::str::from_utf8(size)
        .map_err(|_| MessageError::ChunkSize)?
        .trim();
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MessageError::ChunkSize);
    }
    u64::from_str_radix(size, 16).map_err(|_| MessageError::ChunkSize)
}

/// Decoded message body.
///
/// Reads like a byte stream; [`available`](Self::available) reports the
/// bytes not read yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    data: Vec<u8>,
    pos: usize,
}

impl Body {
    pub const fn new(data: Vec<u8>) -> Self { Self { data, pos: 0 } }

    /// Bytes not read yet.
    #[inline]
    pub fn available(&self) -> usize { self.data.len() - self.pos }

    /// The whole body, regardless of what was read.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] { &self.data }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> { self.data }

    /// The whole body as text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> { std::str::from_utf8(&self.data) }

    #[inline]
    pub fn len(&self) -> usize { self.data.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.data.is_empty() }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.available());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::http::Version;
    use crate::message::{MessageOutput, Transfer};

    fn decode_all(kind: BodyKind, wire: &[u8], rlimit: usize) -> Result<Vec<u8>, Error> {
        let mut chan = MemoryChannel::with_limit(wire, rlimit, usize::MAX);
        chan.shutdown_read();
        let mut input = MessageInput::new(5);
        let mut decoder = BodyDecoder::new(kind, 1 << 20)?;
        let mut out = Vec::new();
        match decoder.poll_decode(&mut input, &mut chan, &mut out) {
            Poll::Ready(r) => r.map(|_| out),
            Poll::Pending => unreachable!("channel is shut down"),
        }
    }

    #[test]
    fn body_kind() {
        let h: Headers = [("Transfer-Encoding", "gzip, chunked"), ("Content-Length", "3")]
            .into_iter()
            .collect();
        assert_eq!(BodyKind::for_request(&h).unwrap(), BodyKind::Chunked);

        let h: Headers = [("Content-Length", "3")].into_iter().collect();
        assert_eq!(BodyKind::for_request(&h).unwrap(), BodyKind::Length(3));

        let h = Headers::new();
        assert_eq!(BodyKind::for_request(&h).unwrap(), BodyKind::None);
        assert_eq!(BodyKind::for_response(200, &h).unwrap(), BodyKind::UntilEof);
        assert_eq!(BodyKind::for_response(204, &h).unwrap(), BodyKind::None);

        let h: Headers = [("Content-Length", "3"), ("Content-Length", "4")].into_iter().collect();
        assert!(BodyKind::for_request(&h).is_err());
        let h: Headers = [("Content-Length", "x")].into_iter().collect();
        assert!(BodyKind::for_request(&h).is_err());

        for signed in ["+5", "-5", "5 5", ""] {
            let h: Headers = [("Content-Length", signed)].into_iter().collect();
            assert!(
                matches!(BodyKind::for_request(&h), Err(MessageError::ContentLength)),
                "{:?}",
                signed
            );
        }
    }

    #[test]
    fn chunked() {
        let wire = b"4\r\nWiki\r\n5;ext=1\r\npedia\r\nE\r\n in\r\n\r\nchunks.\r\n0\r\nX-Trailer: 1\r\n\r\n";
        for rlimit in 1..=wire.len() {
            let out = decode_all(BodyKind::Chunked, wire, rlimit).unwrap();
            assert_eq!(out, b"Wikipedia in\r\n\r\nchunks.");
        }
    }

    #[test]
    fn chunked_errors() {
        assert!(matches!(
            decode_all(BodyKind::Chunked, b"zz\r\nab\r\n0\r\n\r\n", 64),
            Err(Error::Message(MessageError::ChunkSize))
        ));
        assert!(matches!(
            decode_all(BodyKind::Chunked, b"\r\n", 64),
            Err(Error::Message(MessageError::ChunkSize))
        ));
        assert!(matches!(
            decode_all(BodyKind::Chunked, b"+a\r\n0123456789\r\n0\r\n\r\n", 64),
            Err(Error::Message(MessageError::ChunkSize))
        ));
        assert!(matches!(
            decode_all(BodyKind::Chunked, b"0x2\r\nab\r\n0\r\n\r\n", 64),
            Err(Error::Message(MessageError::ChunkSize))
        ));
        assert!(matches!(
            decode_all(BodyKind::Chunked, b"2\r\nabX\r\n0\r\n\r\n", 64),
            Err(Error::Message(MessageError::ChunkTerminator))
        ));
        assert!(matches!(
            decode_all(BodyKind::Chunked, b"5\r\nab", 64),
            Err(Error::Message(MessageError::UnexpectedEof))
        ));
    }

    #[test]
    fn length_bound() {
        let out = decode_all(BodyKind::Length(5), b"helloEXTRA", 2).unwrap();
        assert_eq!(out, b"hello");

        assert!(matches!(
            decode_all(BodyKind::Length(5), b"hel", 2),
            Err(Error::Message(MessageError::UnexpectedEof))
        ));
    }

    #[test]
    fn until_eof() {
        let out = decode_all(BodyKind::UntilEof, b"all of it", 4).unwrap();
        assert_eq!(out, b"all of it");
    }

    #[test]
    fn body_limit() {
        assert!(matches!(
            BodyDecoder::new(BodyKind::Length(10), 4),
            Err(MessageError::BodyTooLarge)
        ));

        let mut chan = MemoryChannel::new(b"a\r\n0123456789\r\n0\r\n\r\n");
        let mut input = MessageInput::default();
        let mut decoder = BodyDecoder::new(BodyKind::Chunked, 4).unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            decoder.poll_decode(&mut input, &mut chan, &mut out),
            Poll::Ready(Err(Error::Message(MessageError::BodyTooLarge)))
        ));
    }

    #[test]
    fn suspend_resume() {
        let mut chan = MemoryChannel::new(b"3\r\nab");
        let mut input = MessageInput::default();
        let mut decoder = BodyDecoder::new(BodyKind::Chunked, 1024).unwrap();
        let mut out = Vec::new();

        assert!(decoder.poll_decode(&mut input, &mut chan, &mut out).is_pending());
        chan.feed(b"c\r\n0\r");
        assert!(decoder.poll_decode(&mut input, &mut chan, &mut out).is_pending());
        chan.feed(b"\n\r\n");
        assert!(matches!(
            decoder.poll_decode(&mut input, &mut chan, &mut out),
            Poll::Ready(Ok(()))
        ));
        assert_eq!(out, b"abc");
        assert!(decoder.is_done());
        assert_eq!(decoder.decoded(), 3);
    }

    /// Encode `payload` as a 200 response, then decode it back through a
    /// 16-byte read chunk.
    fn round_trip(transfer: Transfer, payload: &[u8]) -> Vec<u8> {
        let headers: Headers = match transfer {
            Transfer::Chunked => [("Transfer-Encoding", "chunked")].into_iter().collect(),
            Transfer::Buffered => Headers::new(),
        };
        let mut out = MessageOutput::new(transfer);
        out.begin(Version::Http11, 200, "OK", &headers).unwrap();
        for piece in payload.chunks(7) {
            out.write(piece).unwrap();
        }
        out.finish().unwrap();
        let mut wire = MemoryChannel::new(b"");
        assert!(matches!(out.poll_flush(&mut wire), Poll::Ready(Ok(()))));

        let mut chan = MemoryChannel::with_limit(&wire.take_output(), 5, usize::MAX);
        chan.shutdown_read();
        let mut input = MessageInput::new(16);
        let head = match input.read_response_head(&mut chan, 1024) {
            Poll::Ready(Ok(Some(head))) => head,
            x => panic!("{:?}", x),
        };

        let kind = BodyKind::for_response(head.status, &head.headers).unwrap();
        match transfer {
            Transfer::Chunked => assert_eq!(kind, BodyKind::Chunked),
            Transfer::Buffered => {
                let length = payload.len().to_string();
                assert_eq!(head.headers.first("content-length"), Some(length.as_str()));
                assert_eq!(kind, BodyKind::Length(payload.len() as u64));
            }
        }

        let mut decoder = BodyDecoder::new(kind, u64::MAX).unwrap();
        let mut body = Vec::new();
        match decoder.poll_decode(&mut input, &mut chan, &mut body) {
            Poll::Ready(Ok(())) => {}
            x => panic!("{:?}", x),
        }
        assert!(decoder.is_done());
        body
    }

    #[test]
    fn framing_round_trip() {
        for transfer in [Transfer::Chunked, Transfer::Buffered] {
            for len in [0, 1, 2, 15, 16, 17, 31, 32, 33, 1000] {
                let payload: Vec<u8> = (0..len).map(|_| rand::random::<u8>()).collect();
                assert_eq!(round_trip(transfer, &payload), payload, "{:?} {}", transfer, len);
            }
        }
    }

    #[test]
    fn body_read() {
        let mut body = Body::new(b"hello".to_vec());
        let mut buf = [0_u8; 3];
        assert_eq!(body.available(), 5);
        assert_eq!(body.read(&mut buf).unwrap(), 3);
        assert_eq!(body.available(), 2);
        assert_eq!(body.read(&mut buf).unwrap(), 2);
        assert_eq!(body.read(&mut buf).unwrap(), 0);
        assert_eq!(body.text().unwrap(), "hello");
    }
}
