//! Router and internal dispatch.
//!
//! Routes are tried in registration order, first match wins. A handler may
//! answer with [`Outcome::Dispatch`] to re-route the request internally;
//! only the top-level [`Router::service`] resolves it, nested routers hand
//! it back to their caller untouched.

use std::collections::HashSet;
use std::fmt::{Debug, Formatter};

use log::debug;

use super::matcher::{Matcher, PathMatcher};
use crate::error::{HttpError, RouteError};
use crate::http::{Request, Response};

/// Request for an internal re-route, never seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    uri: String,
}

impl Dispatch {
    pub fn to(uri: impl Into<String>) -> Self { Self { uri: uri.into() } }

    #[inline]
    pub fn uri(&self) -> &str { &self.uri }
}

/// What a handler did with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The response has been produced.
    Done,
    /// Route the request again, to another URI.
    Dispatch(Dispatch),
}

impl Outcome {
    /// Shorthand for `Outcome::Dispatch(Dispatch::to(uri))`.
    pub fn dispatch(uri: impl Into<String>) -> Self { Outcome::Dispatch(Dispatch::to(uri)) }
}

/// Something that answers requests.
pub trait Handler {
    fn handle(&self, req: &mut Request, res: &mut Response) -> anyhow::Result<Outcome>;
}

impl<F> Handler for F
where
    F: Fn(&mut Request, &mut Response) -> anyhow::Result<Outcome>,
{
    #[inline]
    fn handle(&self, req: &mut Request, res: &mut Response) -> anyhow::Result<Outcome> { self(req, res) }
}

struct Route {
    matcher: Box<dyn Matcher>,
    handler: Box<dyn Handler>,
}

/// Ordered routes plus an optional fallback.
///
/// Built once at startup, read-only while serving.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    fallback: Option<Box<dyn Handler>>,
}

impl Debug for Router {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field(
                "routes",
                &self.routes.iter().map(|r| &r.matcher).collect::<Vec<_>>(),
            )
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self { Self::default() }

    /// Add a route, see [`PathMatcher::parse`] for the definition format.
    pub fn route<H>(self, definition: &str, handler: H) -> Result<Self, RouteError>
    where
        H: Handler + 'static,
    {
        let matcher = PathMatcher::parse(definition)?;
        Ok(self.route_with(matcher, handler))
    }

    /// Add a route with a custom matcher.
    pub fn route_with<M, H>(mut self, matcher: M, handler: H) -> Self
    where
        M: Matcher + 'static,
        H: Handler + 'static,
    {
        self.routes.push(Route {
            matcher: Box::new(matcher),
            handler: Box::new(handler),
        });
        self
    }

    /// Handler used when no route matches.
    pub fn fallback<H>(mut self, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    #[inline]
    pub fn len(&self) -> usize { self.routes.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    /// Resolve the handler for a request.
    ///
    /// Captures of the matching route are added to the request's passed
    /// values. Fails with 404 if nothing matches and there is no fallback.
    pub fn target(&self, req: &mut Request) -> Result<&dyn Handler, HttpError> {
        for route in &self.routes {
            if let Some(captures) = route.matcher.matches(req) {
                for (name, value) in captures {
                    req.pass(name, value);
                }
                return Ok(route.handler.as_ref());
            }
        }

        match &self.fallback {
            Some(handler) => Ok(handler.as_ref()),
            None => Err(HttpError::not_found(format!(
                "Cannot route {} {}",
                req.method(),
                req.path()
            ))),
        }
    }

    /// Top-level entry, resolves internal dispatches.
    ///
    /// Each dispatch rewrites the request URI and routes again. Seeing the
    /// same URI twice for one request fails with 508.
    pub fn service(&self, req: &mut Request, res: &mut Response) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        seen.insert(req.uri().to_string());

        loop {
            let dispatch = match self.target(req)?.handle(req, res)? {
                Outcome::Done => return Ok(()),
                Outcome::Dispatch(dispatch) => dispatch,
            };

            req.rewrite(dispatch.uri())
                .map_err(HttpError::internal)?;
            debug!("dispatch to {}", req.uri());

            if !seen.insert(req.uri().to_string()) {
                return Err(HttpError::new(
                    508,
                    format!(
                        "Internal redirect loop caused by dispatch to `{}`",
                        dispatch.uri()
                    ),
                )
                .into());
            }
        }
    }
}

/// A nested router never resolves dispatches itself.
impl Handler for Router {
    fn handle(&self, req: &mut Request, res: &mut Response) -> anyhow::Result<Outcome> {
        self.target(req)?.handle(req, res)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn tag(name: &'static str) -> impl Handler {
        move |req: &mut Request, _: &mut Response| -> anyhow::Result<Outcome> {
            req.pass("handled_by", name);
            Ok(Outcome::Done)
        }
    }

    fn resolve(router: &Router, path: &str) -> Option<String> {
        let mut req = Request::new("GET", path).unwrap();
        let mut res = Response::default();
        router.service(&mut req, &mut res).ok()?;
        req.passed("handled_by").map(str::to_string)
    }

    #[test]
    fn precedence() {
        let router = Router::new()
            .route("/api", tag("A"))
            .unwrap()
            .route("/", tag("B"))
            .unwrap();

        assert_eq!(resolve(&router, "/api").as_deref(), Some("A"));
        assert_eq!(resolve(&router, "/api/v1").as_deref(), Some("A"));
        assert_eq!(resolve(&router, "/apiv1").as_deref(), Some("B"));
        assert_eq!(resolve(&router, "/").as_deref(), Some("B"));
    }

    #[test]
    fn not_found_and_fallback() {
        let router = Router::new().route("GET /only", tag("A")).unwrap();
        let mut req = Request::new("GET", "/other").unwrap();
        let e = router.target(&mut req).err().unwrap();
        assert_eq!(e.status(), 404);

        let router = router.fallback(tag("F"));
        assert_eq!(resolve(&router, "/other").as_deref(), Some("F"));
    }

    #[test]
    fn captures() {
        let router = Router::new().route("GET /users/{id}", tag("U")).unwrap();
        let mut req = Request::new("GET", "/users/42").unwrap();
        let mut res = Response::default();
        router.service(&mut req, &mut res).unwrap();
        assert_eq!(req.passed("id"), Some("42"));
    }

    #[test]
    fn dispatch() {
        let router = Router::new()
            .route("/old", |_: &mut Request, _: &mut Response| -> anyhow::Result<Outcome> {
                Ok(Outcome::dispatch("/new"))
            })
            .unwrap()
            .route("/new", tag("N"))
            .unwrap();

        let mut req = Request::new("GET", "/old?x=1").unwrap();
        let mut res = Response::default();
        router.service(&mut req, &mut res).unwrap();
        assert_eq!(req.path(), "/new");
        assert_eq!(req.passed("handled_by"), Some("N"));
    }

    #[test]
    fn redirect_loop() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let router = Router::new()
            .route("/self", move |_: &mut Request, _: &mut Response| -> anyhow::Result<Outcome> {
                counter.set(counter.get() + 1);
                Ok(Outcome::dispatch("/self"))
            })
            .unwrap();

        let mut req = Request::new("GET", "/self").unwrap();
        let mut res = Response::default();
        let e = HttpError::from_anyhow(router.service(&mut req, &mut res).unwrap_err());
        assert_eq!(e.status(), 508);
        assert_eq!(
            e.message(),
            "Internal redirect loop caused by dispatch to `/self`"
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn nested_passes_dispatch() {
        let inner = Router::new()
            .route("/api/old", |_: &mut Request, _: &mut Response| -> anyhow::Result<Outcome> {
                Ok(Outcome::dispatch("/home"))
            })
            .unwrap();

        let mut req = Request::new("GET", "/api/old").unwrap();
        let mut res = Response::default();
        assert_eq!(
            inner.handle(&mut req, &mut res).unwrap(),
            Outcome::dispatch("/home")
        );
        assert_eq!(req.path(), "/api/old");

        let outer = Router::new()
            .route("/api", inner)
            .unwrap()
            .route("/home", tag("H"))
            .unwrap();
        assert_eq!(resolve(&outer, "/api/old").as_deref(), Some("H"));
    }
}
