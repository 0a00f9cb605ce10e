//! Byte channel.
//!
//! A connection that supports non-blocking reads and writes.
//! Suspension is left to the caller: a read or write that cannot make
//! progress fails with [`std::io::ErrorKind::WouldBlock`], and the caller
//! waits for the next readiness notification before trying again.
//! `Ok(0)` from a read means end of stream.

use std::io::{Read, Write, Result, Error, ErrorKind};
use std::net::{TcpStream, Shutdown};

/// Readable, writable, closable.
pub trait ByteChannel: Read + Write {
    /// Shut down both directions.
    fn close(&mut self) -> Result<()>;
}

impl ByteChannel for TcpStream {
    #[inline]
    fn close(&mut self) -> Result<()> { self.shutdown(Shutdown::Both) }
}

impl<T: ByteChannel + ?Sized> ByteChannel for &mut T {
    #[inline]
    fn close(&mut self) -> Result<()> { (**self).close() }
}

impl<T: ByteChannel + ?Sized> ByteChannel for Box<T> {
    #[inline]
    fn close(&mut self) -> Result<()> { (**self).close() }
}

#[inline]
pub(crate) fn would_block<T>() -> Result<T> { Err(Error::from(ErrorKind::WouldBlock)) }

/// In-memory channel.
///
/// Each read returns at most `rlimit` bytes and each write accepts at most
/// `wlimit` bytes. Once the input is drained, reads block until more
/// input is [fed](Self::feed), or return `Ok(0)` after [`shutdown_read`](Self::shutdown_read).
#[derive(Debug, Default)]
pub struct MemoryChannel {
    pub rbuf: Vec<u8>,
    pub wbuf: Vec<u8>,
    pub rlimit: usize,
    pub wlimit: usize,
    pub cursor: usize,
    /// Fail the next write with `WouldBlock`.
    pub wblock: bool,
    read_end: bool,
    closed: bool,
}

impl MemoryChannel {
    /// Constructor, no limits.
    pub fn new(input: &[u8]) -> Self { Self::with_limit(input, usize::MAX, usize::MAX) }

    /// Constructor, take read and write limits.
    pub fn with_limit(input: &[u8], rlimit: usize, wlimit: usize) -> Self {
        Self {
            rbuf: input.to_vec(),
            rlimit,
            wlimit,
            ..Default::default()
        }
    }

    /// Append more input.
    pub fn feed(&mut self, data: &[u8]) { self.rbuf.extend_from_slice(data); }

    /// Signal end of stream once the input is drained.
    pub fn shutdown_read(&mut self) { self.read_end = true; }

    /// Take everything written so far.
    pub fn take_output(&mut self) -> Vec<u8> { std::mem::take(&mut self.wbuf) }

    /// Whether [`close`](ByteChannel::close) has been called.
    #[inline]
    pub const fn is_closed(&self) -> bool { self.closed }

    /// Unread input.
    #[inline]
    pub fn remaining(&self) -> &[u8] { &self.rbuf[self.cursor..] }
}

impl Read for MemoryChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Ok(0);
        }
        let left_data = self.rbuf.len() - self.cursor;
        if left_data == 0 {
            return if self.read_end { Ok(0) } else { would_block() };
        }

        let n = buf.len().min(self.rlimit).min(left_data);
        buf[..n].copy_from_slice(&self.rbuf[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

impl Write for MemoryChannel {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::from(ErrorKind::BrokenPipe));
        }
        if self.wblock {
            self.wblock = false;
            return would_block();
        }
        let len = buf.len().min(self.wlimit);
        self.wbuf.extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn flush(&mut self) -> Result<()> { Ok(()) }
}

impl ByteChannel for MemoryChannel {
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
