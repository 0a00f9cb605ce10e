//! Http response.
//!
//! Status and headers can be changed until the response is flushed.
//! The transfer encoding is decided at that moment: buffered with an
//! injected `Content-Length` for HTTP/1.0, for bodiless statuses, or when
//! the length is already known; chunked otherwise.

use std::fmt::{Debug, Formatter};
use std::task::{Poll, ready};

use super::{Headers, Version, status};
use crate::channel::ByteChannel;
use crate::error::{Error, ResponseError};
use crate::message::{MessageOutput, Transfer};

/// Lazily produced body chunks.
pub type BodyStream = Box<dyn Iterator<Item = Vec<u8>>>;

/// Response under construction.
pub struct Response {
    version: Version,
    status: u16,
    message: String,
    headers: Headers,
    output: Option<MessageOutput>,
    stream: Option<BodyStream>,
    ended: bool,
}

impl Debug for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("version", &self.version)
            .field("status", &self.status)
            .field("message", &self.message)
            .field("headers", &self.headers)
            .field("flushed", &self.is_flushed())
            .field("ended", &self.ended)
            .finish()
    }
}

impl Default for Response {
    fn default() -> Self { Self::new(Version::Http11) }
}

impl Response {
    /// Constructor, `200 OK` answering a request of `version`.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            status: 200,
            message: status::reason(200).to_string(),
            headers: Headers::new(),
            output: None,
            stream: None,
            ended: false,
        }
    }

    #[inline]
    pub const fn version(&self) -> Version { self.version }

    #[inline]
    pub const fn status(&self) -> u16 { self.status }

    #[inline]
    pub fn message(&self) -> &str { &self.message }

    #[inline]
    pub fn headers(&self) -> &Headers { &self.headers }

    /// Whether status and headers are on their way.
    #[inline]
    pub const fn is_flushed(&self) -> bool { self.output.is_some() }

    /// Whether the body has been terminated.
    #[inline]
    pub const fn is_ended(&self) -> bool { self.ended }

    #[inline]
    fn check_mutable(&self) -> Result<(), ResponseError> {
        if self.is_flushed() {
            Err(ResponseError::Flushed)
        } else {
            Ok(())
        }
    }

    /// Set status and message, an empty message uses the standard reason.
    pub fn answer(&mut self, status: u16, message: &str) -> Result<(), ResponseError> {
        self.check_mutable()?;
        self.status = status;
        self.message = if message.is_empty() {
            status::reason(status).to_string()
        } else {
            message.to_string()
        };
        Ok(())
    }

    /// Set a header, replacing previous values.
    pub fn header(&mut self, name: &str, value: impl Into<String>) -> Result<(), ResponseError> {
        self.check_mutable()?;
        self.headers.set(name, value);
        Ok(())
    }

    /// Add a header, keeping previous values.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) -> Result<(), ResponseError> {
        self.check_mutable()?;
        self.headers.add(name, value);
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) -> Result<bool, ResponseError> {
        self.check_mutable()?;
        Ok(self.headers.remove(name))
    }

    /// Send a complete body and end the response.
    pub fn send(&mut self, body: impl AsRef<[u8]>, content_type: &str) -> Result<(), ResponseError> {
        let body = body.as_ref();
        self.header("Content-Type", content_type)?;
        self.header("Content-Length", body.len().to_string())?;
        self.write(body)?;
        self.end()
    }

    /// Write body bytes, flushing the head first if needed.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ResponseError> {
        if self.ended {
            return Err(ResponseError::Ended);
        }
        self.flush()?;
        match self.output.as_mut() {
            Some(out) => out.write(data),
            None => Err(ResponseError::OutOfOrder),
        }
    }

    /// Stream the body from an iterator and end the response once it is
    /// exhausted.
    ///
    /// Chunks are pulled one at a time, only after the previous one has
    /// been accepted by the channel.
    pub fn stream<I>(&mut self, chunks: I) -> Result<(), ResponseError>
    where
        I: IntoIterator<Item = Vec<u8>>,
        I::IntoIter: 'static,
    {
        if self.ended || self.stream.is_some() {
            return Err(ResponseError::Ended);
        }
        self.flush()?;
        self.stream = Some(Box::new(chunks.into_iter()));
        Ok(())
    }

    fn choose_transfer(&self) -> Transfer {
        if !self.version.supports_chunked()
            || status::is_bodiless(self.status)
            || self.headers.contains("content-length")
        {
            Transfer::Buffered
        } else {
            Transfer::Chunked
        }
    }

    /// Freeze status and headers and hand them to the message writer.
    ///
    /// Flushing twice is a no-op.
    pub fn flush(&mut self) -> Result<(), ResponseError> {
        if self.is_flushed() {
            return Ok(());
        }

        let transfer = self.choose_transfer();
        if transfer == Transfer::Chunked {
            self.headers.remove("content-length");
            self.headers.set("Transfer-Encoding", "chunked");
        }

        let mut out = MessageOutput::new(transfer);
        out.begin(self.version, self.status, &self.message, &self.headers)?;
        self.output = Some(out);
        Ok(())
    }

    /// Terminate the body.
    ///
    /// A pending stream is drained first, see [`poll_write`](Self::poll_write).
    pub fn end(&mut self) -> Result<(), ResponseError> {
        if self.ended {
            return Err(ResponseError::Ended);
        }
        self.flush()?;
        self.ended = true;
        if self.stream.is_none() {
            if let Some(out) = self.output.as_mut() {
                out.finish()?;
            }
        }
        Ok(())
    }

    /// End the response unless the handler already did.
    pub fn complete(&mut self) -> Result<(), ResponseError> {
        if self.ended {
            Ok(())
        } else {
            self.end()
        }
    }

    /// Whether there is nothing left to hand to the channel.
    pub fn is_done(&self) -> bool {
        self.ended
            && self.stream.is_none()
            && self.output.as_ref().map_or(true, |out| !out.has_pending())
    }

    /// Move the encoded response into the channel.
    ///
    /// Suspends when the channel is full. Stream chunks are encoded one at
    /// a time after the previous bytes went out. Returns `Ready(Ok(()))`
    /// once everything written so far has been accepted, which means the
    /// whole response if it has ended.
    pub fn poll_write<C: ByteChannel + ?Sized>(&mut self, chan: &mut C) -> Poll<Result<(), Error>> {
        let out = match self.output.as_mut() {
            Some(out) => out,
            None => return Poll::Ready(Ok(())),
        };

        loop {
            ready!(out.poll_flush(chan))?;

            let stream = match self.stream.as_mut() {
                Some(stream) => stream,
                None => return Poll::Ready(Ok(())),
            };

            match stream.next() {
                Some(chunk) => out.write(&chunk)?,
                None => {
                    self.stream = None;
                    self.ended = true;
                    out.finish()?;
                }
            }
        }
    }
}
