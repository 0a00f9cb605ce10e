//! Http value objects.

pub mod headers;
pub mod request;
pub mod response;
pub mod status;
pub mod version;

pub use headers::Headers;
pub use request::Request;
pub use response::{Response, BodyStream};
pub use version::Version;
