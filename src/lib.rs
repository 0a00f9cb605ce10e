// #![warn(missing_docs)]

//! Lightweight HTTP/1.x and websocket server engine.
//!
//! ## Features
//! - Sans-io, every codec works on a non-blocking [`ByteChannel`](channel::ByteChannel).
//! - Suspend and resume anywhere, without losing or repeating bytes.
//! - Chunked transfer encoding, streamed responses.
//! - Websocket on the same connection after an upgrade.
//!
//! ## High-level API
//!
//! - [`routing`]
//! - [`websocket`]
//! - [`protocol`]
//! - [`server`] (feature `async`)
//!
//! ```ignore
//! {
//!     let router = Router::new().route("GET /hello", |_: &mut Request, res: &mut Response| {
//!         res.send("hello", "text/plain")?;
//!         Ok(Outcome::Done)
//!     })?;
//!     let http = HttpProtocol::new(Application::new(router), Config::default());
//!     let ws = WebSocketProtocol::new(Listeners::new().on("/chat", chat)?, Config::default());
//!     let switch = ProtocolSwitch::new("http", http).register("websocket", ws);
//!
//!     // on every readiness notification
//!     match switch.data(id, &mut channel) {
//!         Wants::Read => ..,
//!         Wants::Write => ..,
//!         Wants::Close => ..,
//!     }
//! }
//! ```
//!
//! ## Low-level API
//!
//! - [`message`]
//! - [`frame`]
//! - [`handshake`]
//!
//! Message:
//!
//! ```ignore
//! {
//!     // read a request head, suspend if incomplete
//!     let head = ready!(input.read_request_head(&mut chan, limit))?;
//!
//!     // decode the body
//!     let mut decoder = BodyDecoder::new(BodyKind::for_request(&head.headers)?, limit)?;
//!     ready!(decoder.poll_decode(&mut input, &mut chan, &mut body))?;
//! }
//! ```
//!
//! Frame:
//!
//! ```ignore
//! {
//!     // encode a frame head
//!     let head = FrameHead::new(...);
//!     let offset = head.encode(&mut buf)?;
//!
//!     // decode a frame head
//!     let (head, offset) = FrameHead::decode(&buf)?;
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod http;
pub mod message;
pub mod protocol;
pub mod role;
pub mod routing;
pub mod websocket;

cfg_if::cfg_if! {
    if #[cfg(feature = "tokio")] {
        pub mod server;
    }
}

pub use config::Config;
