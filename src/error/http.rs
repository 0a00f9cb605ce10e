use std::fmt::{Debug, Display, Formatter};

use crate::http::status;

/// Application error carrying the status the client should see.
///
/// Handlers return it (usually through `anyhow`) to answer with a specific
/// status; anything else escaping a handler is turned into a 500 with the
/// original error kept as [`cause`](Self::cause).
pub struct HttpError {
    status: u16,
    message: String,
    cause: Option<anyhow::Error>,
}

impl HttpError {
    /// Constructor, take status and message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the error which led to this one.
    pub fn caused_by(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self { Self::new(404, message) }

    pub fn bad_request(message: impl Into<String>) -> Self { Self::new(400, message) }

    /// Wrap an arbitrary error as `500 Internal Server Error`.
    pub fn internal(cause: impl Into<anyhow::Error>) -> Self {
        let cause = cause.into();
        Self {
            status: 500,
            message: status::reason(500).to_string(),
            cause: Some(cause),
        }
    }

    /// Translate anything a handler or filter returned.
    ///
    /// An [`HttpError`] anywhere at the top of the chain keeps its status,
    /// everything else becomes a 500.
    pub fn from_anyhow(e: anyhow::Error) -> Self {
        match e.downcast::<HttpError>() {
            Ok(e) => e,
            Err(e) => HttpError::internal(e),
        }
    }

    #[inline]
    pub const fn status(&self) -> u16 { self.status }

    #[inline]
    pub fn message(&self) -> &str { &self.message }

    #[inline]
    pub fn cause(&self) -> Option<&anyhow::Error> { self.cause.as_ref() }
}

impl Debug for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpError")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "#{} {}: {}", self.status, self.message, cause),
            None => write!(f, "#{} {}", self.status, self.message),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keep_status_through_anyhow() {
        let e: anyhow::Error = HttpError::new(418, "I'm a teapot").into();
        let e = HttpError::from_anyhow(e);
        assert_eq!(e.status(), 418);
        assert_eq!(e.message(), "I'm a teapot");
        assert!(e.cause().is_none());
    }

    #[test]
    fn wrap_foreign_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let e = HttpError::from_anyhow(io.into());
        assert_eq!(e.status(), 500);
        assert_eq!(e.message(), "Internal Server Error");
        assert_eq!(e.cause().unwrap().to_string(), "disk on fire");
        assert_eq!(e.to_string(), "#500 Internal Server Error: disk on fire");
    }
}
