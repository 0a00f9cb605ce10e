//! Buffered message reader.
//!
//! Bytes are pulled from the channel into an internal buffer on demand.
//! Every operation returns [`Poll::Pending`] when the channel has nothing
//! to offer; all progress is kept in the buffer, so calling again after the
//! next readiness notification resumes where the last call stopped.

use std::io::ErrorKind;
use std::task::{Poll, ready};

use crate::channel::ByteChannel;
use crate::error::{Error, MessageError};
use crate::http::{Headers, Version};

/// Max number of headers in one message head.
pub const MAX_HEADERS: usize = 64;

/// Default size of a single read.
pub const DEFAULT_READ_CHUNK: usize = 8192;

/// Parsed request line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub version: Version,
    pub headers: Headers,
}

/// Parsed status line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: Version,
    pub status: u16,
    pub message: String,
    pub headers: Headers,
}

fn collect_headers(raw: &[httparse::Header<'_>]) -> Headers {
    let mut headers = Headers::new();
    for hdr in raw {
        headers.add(hdr.name, String::from_utf8_lossy(hdr.value));
    }
    headers
}

fn parse_request(buf: &[u8]) -> Result<Option<(RequestHead, usize)>, MessageError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut headers);

    let n = match request.parse(buf)? {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Ok(None),
    };

    // method, path and version are always present in a complete request
    let version = Version::from_minor(request.version.unwrap_or_default())?;
    let head = RequestHead {
        method: request.method.unwrap_or_default().to_string(),
        target: request.path.unwrap_or_default().to_string(),
        version,
        headers: collect_headers(request.headers),
    };
    Ok(Some((head, n)))
}

fn parse_response(buf: &[u8]) -> Result<Option<(ResponseHead, usize)>, MessageError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    let n = match response.parse(buf)? {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Ok(None),
    };

    let version = Version::from_minor(response.version.unwrap_or_default())?;
    let head = ResponseHead {
        version,
        status: response.code.unwrap_or_default(),
        message: response.reason.unwrap_or_default().to_string(),
        headers: collect_headers(response.headers),
    };
    Ok(Some((head, n)))
}

/// Message reader over a [`ByteChannel`].
#[derive(Debug)]
pub struct MessageInput {
    buf: Vec<u8>,
    pos: usize,
    read_chunk: usize,
    eof: bool,
}

impl Default for MessageInput {
    fn default() -> Self { Self::new(DEFAULT_READ_CHUNK) }
}

impl MessageInput {
    /// Constructor, take the size of a single read.
    pub fn new(read_chunk: usize) -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            read_chunk: read_chunk.max(1),
            eof: false,
        }
    }

    /// Constructor, start with bytes already read by someone else.
    pub fn with_data(read_chunk: usize, data: Vec<u8>) -> Self {
        let mut input = Self::new(read_chunk);
        input.buf = data;
        input
    }

    /// Bytes read from the channel but not consumed yet.
    #[inline]
    pub fn buffered(&self) -> &[u8] { &self.buf[self.pos..] }

    /// Mark `n` buffered bytes as consumed.
    #[inline]
    pub fn consume(&mut self, n: usize) { self.pos = (self.pos + n).min(self.buf.len()); }

    /// Take every unconsumed byte out.
    pub fn take_buffered(&mut self) -> Vec<u8> {
        let rest = self.buf.split_off(self.pos);
        self.buf.clear();
        self.pos = 0;
        rest
    }

    /// Whether the channel reported end of stream.
    #[inline]
    pub const fn is_eof(&self) -> bool { self.eof }

    /// Read once from the channel, return the number of new bytes.
    ///
    /// `Ready(Ok(0))` means end of stream.
    pub fn fill<C: ByteChannel + ?Sized>(&mut self, chan: &mut C) -> Poll<Result<usize, Error>> {
        if self.eof {
            return Poll::Ready(Ok(0));
        }

        // reclaim consumed space
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        } else if self.pos >= self.read_chunk {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }

        let start = self.buf.len();
        self.buf.resize(start + self.read_chunk, 0);

        loop {
            match chan.read(&mut self.buf[start..]) {
                Ok(n) => {
                    self.buf.truncate(start + n);
                    if n == 0 {
                        self.eof = true;
                    }
                    return Poll::Ready(Ok(n));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(start);
                    return if e.kind() == ErrorKind::WouldBlock {
                        Poll::Pending
                    } else {
                        Poll::Ready(Err(Error::Read(e)))
                    };
                }
            }
        }
    }

    /// Read one CRLF-delimited line, without the CRLF.
    ///
    /// Returns `None` at end of stream.
    pub fn read_line<C: ByteChannel + ?Sized>(
        &mut self,
        chan: &mut C,
    ) -> Poll<Result<Option<Vec<u8>>, Error>> {
        loop {
            let data = self.buffered();
            if let Some(i) = data.windows(2).position(|w| w == b"\r\n") {
                let line = data[..i].to_vec();
                self.consume(i + 2);
                return Poll::Ready(Ok(Some(line)));
            }

            if ready!(self.fill(chan))? == 0 {
                return Poll::Ready(Ok(None));
            }
        }
    }

    /// Read up to `n` bytes, refilling from the channel if nothing is buffered.
    ///
    /// Returns an empty buffer at end of stream.
    pub fn read<C: ByteChannel + ?Sized>(
        &mut self,
        chan: &mut C,
        n: usize,
    ) -> Poll<Result<Vec<u8>, Error>> {
        if self.buffered().is_empty() && n > 0 {
            ready!(self.fill(chan))?;
        }

        let data = self.buffered();
        let n = n.min(data.len());
        let out = data[..n].to_vec();
        self.consume(n);
        Poll::Ready(Ok(out))
    }

    /// Read a request line and its headers.
    ///
    /// Returns `None` if the channel closes before any byte of a new
    /// request arrived.
    pub fn read_request_head<C: ByteChannel + ?Sized>(
        &mut self,
        chan: &mut C,
        limit: usize,
    ) -> Poll<Result<Option<RequestHead>, Error>> {
        self.read_head_with(chan, limit, parse_request)
    }

    /// Read a status line and its headers.
    pub fn read_response_head<C: ByteChannel + ?Sized>(
        &mut self,
        chan: &mut C,
        limit: usize,
    ) -> Poll<Result<Option<ResponseHead>, Error>> {
        self.read_head_with(chan, limit, parse_response)
    }

    fn read_head_with<C, H, F>(
        &mut self,
        chan: &mut C,
        limit: usize,
        parse: F,
    ) -> Poll<Result<Option<H>, Error>>
    where
        C: ByteChannel + ?Sized,
        F: Fn(&[u8]) -> Result<Option<(H, usize)>, MessageError>,
    {
        loop {
            if let Some((head, n)) = parse(self.buffered())? {
                if n > limit {
                    return Poll::Ready(Err(MessageError::HeadTooLarge.into()));
                }
                self.consume(n);
                return Poll::Ready(Ok(Some(head)));
            }

            if self.buffered().len() >= limit {
                return Poll::Ready(Err(MessageError::HeadTooLarge.into()));
            }

            if ready!(self.fill(chan))? == 0 {
                return if self.buffered().is_empty() {
                    Poll::Ready(Ok(None))
                } else {
                    Poll::Ready(Err(MessageError::UnexpectedEof.into()))
                };
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::MemoryChannel;

    macro_rules! ready_ok {
        ($e: expr) => {
            match $e {
                Poll::Ready(Ok(x)) => x,
                Poll::Ready(Err(e)) => panic!("unexpected error: {}", e),
                Poll::Pending => panic!("unexpected pending"),
            }
        };
    }

    #[test]
    fn read_line_across_reads() {
        let mut chan = MemoryChannel::with_limit(b"first line\r\nsecond\r\n", 3, usize::MAX);
        chan.shutdown_read();
        let mut input = MessageInput::new(4);

        assert_eq!(ready_ok!(input.read_line(&mut chan)).unwrap(), b"first line");
        assert_eq!(ready_ok!(input.read_line(&mut chan)).unwrap(), b"second");
        assert!(ready_ok!(input.read_line(&mut chan)).is_none());
    }

    #[test]
    fn read_line_suspend() {
        let mut chan = MemoryChannel::new(b"GET / HT");
        let mut input = MessageInput::default();

        assert!(input.read_line(&mut chan).is_pending());
        chan.feed(b"TP/1.1\r\n");
        assert_eq!(ready_ok!(input.read_line(&mut chan)).unwrap(), b"GET / HTTP/1.1");
    }

    #[test]
    fn read_bounded() {
        let mut chan = MemoryChannel::new(b"0123456789");
        chan.shutdown_read();
        let mut input = MessageInput::new(4);

        assert_eq!(ready_ok!(input.read(&mut chan, 3)), b"012");
        assert_eq!(ready_ok!(input.read(&mut chan, 3)), b"3");
        assert_eq!(ready_ok!(input.read(&mut chan, 100)), b"4567");
        assert_eq!(ready_ok!(input.read(&mut chan, 100)), b"89");
        assert!(ready_ok!(input.read(&mut chan, 100)).is_empty());
    }

    #[test]
    fn request_head() {
        let data = b"POST /submit?x=1 HTTP/1.1\r\nHost: example.com\r\nX-A: 1\r\nx-a: 2\r\n\r\nbody";
        for limit in 1..=data.len() {
            let mut chan = MemoryChannel::with_limit(data, limit, usize::MAX);
            let mut input = MessageInput::new(7);

            let head = loop {
                match input.read_request_head(&mut chan, 1024) {
                    Poll::Ready(Ok(Some(head))) => break head,
                    Poll::Ready(x) => panic!("{:?}", x),
                    Poll::Pending => unreachable!("input is available"),
                }
            };

            assert_eq!(head.method, "POST");
            assert_eq!(head.target, "/submit?x=1");
            assert_eq!(head.version, Version::Http11);
            assert_eq!(head.headers.get("x-a").as_deref(), Some("1, 2"));
            assert_eq!(input.buffered().len() + chan.remaining().len(), 4);
        }
    }

    #[test]
    fn response_head() {
        let mut chan = MemoryChannel::new(b"HTTP/1.0 420 Custom\r\nContent-Length: 2\r\n\r\nok");
        let mut input = MessageInput::default();

        let head = ready_ok!(input.read_response_head(&mut chan, 1024)).unwrap();
        assert_eq!(head.version, Version::Http10);
        assert_eq!(head.status, 420);
        assert_eq!(head.message, "Custom");
        assert_eq!(input.buffered(), b"ok");
    }

    #[test]
    fn head_limits() {
        let mut chan = MemoryChannel::new(b"GET / HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaa");
        let mut input = MessageInput::default();
        match input.read_request_head(&mut chan, 16) {
            Poll::Ready(Err(Error::Message(MessageError::HeadTooLarge))) => {}
            x => panic!("{:?}", x),
        }

        let mut chan = MemoryChannel::new(b"GET / HTTP/1.1\r\nHost: a");
        chan.shutdown_read();
        let mut input = MessageInput::default();
        match input.read_request_head(&mut chan, 1024) {
            Poll::Ready(Err(Error::Message(MessageError::UnexpectedEof))) => {}
            x => panic!("{:?}", x),
        }

        let mut chan = MemoryChannel::new(b"");
        chan.shutdown_read();
        let mut input = MessageInput::default();
        assert!(ready_ok!(input.read_request_head(&mut chan, 1024)).is_none());

        let mut chan = MemoryChannel::new(b"GET / HTTP/2.0\r\n\r\n");
        let mut input = MessageInput::default();
        assert!(matches!(
            input.read_request_head(&mut chan, 1024),
            Poll::Ready(Err(_))
        ));
    }

    #[test]
    fn leftover() {
        let mut chan = MemoryChannel::new(b"GET / HTTP/1.1\r\n\r\n\x81\x00");
        let mut input = MessageInput::default();
        ready_ok!(input.read_request_head(&mut chan, 1024)).unwrap();
        assert_eq!(input.take_buffered(), b"\x81\x00");
        assert!(input.buffered().is_empty());
    }
}
