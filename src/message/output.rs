//! Message writer.
//!
//! `begin` must come first and only once, then any number of `write`,
//! then `finish`. Encoded bytes are queued and go out with
//! [`poll_flush`](MessageOutput::poll_flush), which suspends when the
//! channel does not accept more.

use std::io::{ErrorKind, Error as IoError};
use std::task::Poll;

use crate::channel::ByteChannel;
use crate::error::{Error, ResponseError};
use crate::http::{Headers, Version, status};

/// Body encoding, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Every write becomes one chunk.
    Chunked,
    /// Writes are accumulated, `finish` injects `Content-Length`.
    Buffered,
}

#[derive(Debug)]
struct Head {
    version: Version,
    status: u16,
    message: String,
    headers: Headers,
}

impl Head {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.version.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.status.to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.message.as_bytes());
        out.extend_from_slice(b"\r\n");
        self.headers.write_to(out);
        out.extend_from_slice(b"\r\n");
    }
}

/// Message writer over a [`ByteChannel`].
#[derive(Debug)]
pub struct MessageOutput {
    transfer: Transfer,
    head: Option<Head>,
    body: Vec<u8>,
    pending: Vec<u8>,
    flushed: usize,
    bodiless: bool,
    begun: bool,
    finished: bool,
}

impl MessageOutput {
    pub const fn new(transfer: Transfer) -> Self {
        Self {
            transfer,
            head: None,
            body: Vec::new(),
            pending: Vec::new(),
            flushed: 0,
            bodiless: false,
            begun: false,
            finished: false,
        }
    }

    #[inline]
    pub const fn transfer(&self) -> Transfer { self.transfer }

    #[inline]
    pub const fn is_begun(&self) -> bool { self.begun }

    #[inline]
    pub const fn is_finished(&self) -> bool { self.finished }

    /// Write the status line and headers.
    ///
    /// In buffered mode they are held back until `finish`.
    pub fn begin(
        &mut self,
        version: Version,
        status: u16,
        message: &str,
        headers: &Headers,
    ) -> Result<(), ResponseError> {
        if self.begun {
            return Err(ResponseError::OutOfOrder);
        }
        self.begun = true;
        self.bodiless = status::is_bodiless(status);

        let mut head = Head {
            version,
            status,
            message: message.to_string(),
            headers: headers.clone(),
        };

        match self.transfer {
            Transfer::Chunked => {
                if self.bodiless {
                    head.headers.remove("transfer-encoding");
                }
                head.encode(&mut self.pending);
            }
            Transfer::Buffered => self.head = Some(head),
        }
        Ok(())
    }

    /// Queue body bytes.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ResponseError> {
        if !self.begun {
            return Err(ResponseError::OutOfOrder);
        }
        if self.finished {
            return Err(ResponseError::Ended);
        }
        // an empty chunk would end the body
        if self.bodiless || data.is_empty() {
            return Ok(());
        }

        match self.transfer {
            Transfer::Chunked => {
                self.pending
                    .extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
                self.pending.extend_from_slice(data);
                self.pending.extend_from_slice(b"\r\n");
            }
            Transfer::Buffered => self.body.extend_from_slice(data),
        }
        Ok(())
    }

    /// Terminate the body.
    pub fn finish(&mut self) -> Result<(), ResponseError> {
        if !self.begun {
            return Err(ResponseError::OutOfOrder);
        }
        if self.finished {
            return Err(ResponseError::Ended);
        }
        self.finished = true;

        match self.transfer {
            Transfer::Chunked => {
                if !self.bodiless {
                    self.pending.extend_from_slice(b"0\r\n\r\n");
                }
            }
            Transfer::Buffered => {
                if let Some(mut head) = self.head.take() {
                    if self.bodiless {
                        head.headers.remove("content-length");
                    } else {
                        head.headers
                            .set("Content-Length", self.body.len().to_string());
                    }
                    head.encode(&mut self.pending);
                    self.pending.append(&mut self.body);
                }
            }
        }
        Ok(())
    }

    /// Queued bytes not yet accepted by the channel.
    #[inline]
    pub fn pending(&self) -> &[u8] { &self.pending[self.flushed..] }

    #[inline]
    pub fn has_pending(&self) -> bool { self.flushed < self.pending.len() }

    /// Push queued bytes into the channel.
    ///
    /// Any channel error other than `WouldBlock` is a
    /// [`Error::WriteFailed`], the connection is assumed broken.
    pub fn poll_flush<C: ByteChannel + ?Sized>(&mut self, chan: &mut C) -> Poll<Result<(), Error>> {
        while self.has_pending() {
            match chan.write(&self.pending[self.flushed..]) {
                Ok(0) => {
                    return Poll::Ready(Err(Error::WriteFailed(IoError::from(
                        ErrorKind::WriteZero,
                    ))))
                }
                Ok(n) => self.flushed += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Poll::Pending,
                Err(e) => return Poll::Ready(Err(Error::WriteFailed(e))),
            }
        }
        self.pending.clear();
        self.flushed = 0;
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::{ByteChannel, MemoryChannel};

    fn headers(pairs: &[(&str, &str)]) -> Headers { pairs.iter().copied().collect() }

    fn flush_all(out: &mut MessageOutput, chan: &mut MemoryChannel) {
        loop {
            match out.poll_flush(chan) {
                Poll::Ready(r) => return r.unwrap(),
                Poll::Pending => continue,
            }
        }
    }

    #[test]
    fn buffered() {
        let mut out = MessageOutput::new(Transfer::Buffered);
        out.begin(
            Version::Http10,
            420,
            "Custom",
            &headers(&[("Content-Type", "text/plain")]),
        )
        .unwrap();
        out.write(b"o").unwrap();
        out.write(b"k").unwrap();
        assert!(!out.has_pending());
        out.finish().unwrap();

        let mut chan = MemoryChannel::with_limit(b"", usize::MAX, 7);
        flush_all(&mut out, &mut chan);
        assert_eq!(
            chan.wbuf,
            b"HTTP/1.0 420 Custom\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nok"
        );
    }

    #[test]
    fn chunked() {
        let mut out = MessageOutput::new(Transfer::Chunked);
        out.begin(
            Version::Http11,
            200,
            "OK",
            &headers(&[("Transfer-Encoding", "chunked")]),
        )
        .unwrap();
        out.write(b"hello").unwrap();
        out.write(b"").unwrap();
        out.write(&[b'x'; 26]).unwrap();
        out.finish().unwrap();

        let mut chan = MemoryChannel::new(b"");
        flush_all(&mut out, &mut chan);

        let mut expect = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n1a\r\n".to_vec();
        expect.extend_from_slice(&[b'x'; 26]);
        expect.extend_from_slice(b"\r\n0\r\n\r\n");
        assert_eq!(chan.wbuf, expect);
    }

    #[test]
    fn bodiless() {
        let mut out = MessageOutput::new(Transfer::Buffered);
        out.begin(Version::Http11, 204, "No Content", &Headers::new())
            .unwrap();
        out.write(b"ignored").unwrap();
        out.finish().unwrap();
        assert_eq!(out.pending(), b"HTTP/1.1 204 No Content\r\n\r\n");
    }

    #[test]
    fn order() {
        let mut out = MessageOutput::new(Transfer::Chunked);
        assert_eq!(out.write(b"x"), Err(ResponseError::OutOfOrder));
        assert_eq!(out.finish(), Err(ResponseError::OutOfOrder));

        out.begin(Version::Http11, 200, "OK", &Headers::new()).unwrap();
        assert_eq!(
            out.begin(Version::Http11, 200, "OK", &Headers::new()),
            Err(ResponseError::OutOfOrder)
        );
        out.finish().unwrap();
        assert_eq!(out.write(b"x"), Err(ResponseError::Ended));
        assert_eq!(out.finish(), Err(ResponseError::Ended));
    }

    #[test]
    fn flush_suspend_and_fail() {
        let mut out = MessageOutput::new(Transfer::Buffered);
        out.begin(Version::Http11, 200, "OK", &Headers::new()).unwrap();
        out.finish().unwrap();

        let mut chan = MemoryChannel::with_limit(b"", usize::MAX, 4);
        chan.wblock = true;
        assert!(out.poll_flush(&mut chan).is_pending());
        flush_all(&mut out, &mut chan);
        assert_eq!(chan.wbuf, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

        let mut out = MessageOutput::new(Transfer::Buffered);
        out.begin(Version::Http11, 200, "OK", &Headers::new()).unwrap();
        out.finish().unwrap();
        chan.close().unwrap();
        match out.poll_flush(&mut chan) {
            Poll::Ready(Err(e)) => assert!(e.is_write_failure()),
            x => panic!("{:?}", x),
        }
    }
}
