//! Http message codec.
//!
//! [`MessageInput`] turns channel bytes into message heads and bodies,
//! [`MessageOutput`] does the reverse. Neither blocks: both return
//! [`Poll::Pending`](std::task::Poll::Pending) when the channel is not ready.

pub mod input;
pub mod output;
pub mod body;

pub use input::{MessageInput, RequestHead, ResponseHead};
pub use output::{MessageOutput, Transfer};
pub use body::{Body, BodyDecoder, BodyKind};
