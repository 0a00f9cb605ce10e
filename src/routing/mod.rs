//! Request routing.
//!
//! [`Application`] runs the [`Filter`] chain around a [`Router`], which
//! resolves a request to a [`Handler`] and follows internal dispatches.

pub mod application;
pub mod filter;
pub mod matcher;
pub mod router;

pub use application::{Application, Served};
pub use filter::{Filter, Invocation};
pub use matcher::{Matcher, PathMatcher, PathPattern, HostMatcher, AndMatcher, Captures};
pub use router::{Router, Handler, Outcome, Dispatch};
