//! Application boundary.
//!
//! The only place where errors raised by filters and handlers are caught
//! and turned into a response.

use log::error;

use super::{Filter, Invocation, Router};
use crate::error::HttpError;
use crate::http::{Request, Response};

/// How a request was served.
#[derive(Debug)]
pub enum Served {
    /// The chain produced the response.
    Done,
    /// The chain failed, an error response was produced instead.
    Failed(HttpError),
    /// The chain failed after the response was flushed. It has been cut
    /// short, the connection cannot be reused.
    Broken(HttpError),
}

/// Filters around a router.
#[derive(Default)]
pub struct Application {
    filters: Vec<Box<dyn Filter>>,
    router: Router,
}

impl Application {
    pub fn new(router: Router) -> Self {
        Self {
            filters: Vec::new(),
            router,
        }
    }

    /// Add a filter, the first one added is the outermost.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Filter + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    #[inline]
    pub fn router(&self) -> &Router { &self.router }

    /// Run the chain, translating any error into an [`HttpError`].
    pub fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), HttpError> {
        Invocation::new(&self.filters, &self.router)
            .proceed(req, res)
            .map_err(HttpError::from_anyhow)
    }

    /// Run the chain and answer with the error if it fails.
    pub fn service(&self, req: &mut Request, res: &mut Response) -> Served {
        let e = match self.handle(req, res) {
            Ok(()) => return Served::Done,
            Err(e) => e,
        };

        if e.status() >= 500 {
            error!("{} {}: {}", req.method(), req.uri(), e);
        }

        if res.is_flushed() {
            // too late to change status, terminate what was started
            let _ = res.complete();
            return Served::Broken(e);
        }

        let rendered = render_error(res, &e);
        match rendered {
            Ok(()) => Served::Failed(e),
            Err(_) => Served::Broken(e),
        }
    }
}

fn render_error(res: &mut Response, e: &HttpError) -> Result<(), crate::error::ResponseError> {
    res.answer(e.status(), "")?;
    res.remove_header("Transfer-Encoding")?;
    let mut body = e.message().to_string();
    body.push('\n');
    res.send(body, "text/plain; charset=utf-8")
}
