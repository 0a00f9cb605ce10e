//! Markers.
//!
//! Markers are used to apply different strategies as a client or server.
//! Both meet [`RoleHelper`], which tells how to mask outgoing payload data.
//!
//! `FrameCodec<Server>` is what a websocket connection uses on the server
//! side; `FrameCodec<Client>` produces masked frames, as a browser would.

mod client;
mod server;

pub use client::Client;
pub use server::Server;

use crate::frame::Mask;

/// Client or Server marker.
pub trait RoleHelper {
    /// Mask of the next outgoing frame.
    fn new_write_mask() -> Mask;
}
