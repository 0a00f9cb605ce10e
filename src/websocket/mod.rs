//! Websocket connections.
//!
//! After a successful handshake, frames are decoded by [`FrameCodec`] and
//! complete messages are handed to a [`Listener`] chosen by path.

pub mod codec;
pub mod connection;
pub mod listener;

pub use codec::{FrameCodec, Message, MAX_FRAME_SIZE, MAX_CONTROL_SIZE};
pub use connection::{Connection, SocketId};
pub use listener::{Listener, Listeners};
