//! Filter chain.
//!
//! Filters wrap the router like an onion: code before
//! [`Invocation::proceed`] runs before the handler, code after it runs
//! after. A filter that never proceeds short-circuits the chain.

use super::Router;
use crate::http::{Request, Response};

/// One layer around the router.
pub trait Filter {
    fn filter(
        &self,
        req: &mut Request,
        res: &mut Response,
        next: &mut Invocation<'_>,
    ) -> anyhow::Result<()>;
}

impl<F> Filter for F
where
    F: Fn(&mut Request, &mut Response, &mut Invocation<'_>) -> anyhow::Result<()>,
{
    #[inline]
    fn filter(
        &self,
        req: &mut Request,
        res: &mut Response,
        next: &mut Invocation<'_>,
    ) -> anyhow::Result<()> {
        self(req, res, next)
    }
}

/// Position in the chain for one request.
pub struct Invocation<'a> {
    filters: &'a [Box<dyn Filter>],
    offset: usize,
    router: &'a Router,
}

impl<'a> Invocation<'a> {
    pub fn new(filters: &'a [Box<dyn Filter>], router: &'a Router) -> Self {
        Self {
            filters,
            offset: 0,
            router,
        }
    }

    /// Filters not invoked yet.
    #[inline]
    pub fn remaining(&self) -> usize { self.filters.len() - self.offset }

    /// Run the next filter, or the router once all filters ran.
    pub fn proceed(&mut self, req: &mut Request, res: &mut Response) -> anyhow::Result<()> {
        let filters = self.filters;
        match filters.get(self.offset) {
            Some(filter) => {
                self.offset += 1;
                filter.filter(req, res, self)
            }
            None => self.router.service(req, res),
        }
    }
}
