//! Connection protocols.
//!
//! A [`ConnectionProtocol`] is a per-connection state machine driven by the
//! event loop. Each call to [`data`](ConnectionProtocol::data) makes as much
//! progress as the channel allows, then tells the caller what it waits for.
//!
//! [`ProtocolSwitch`] owns the registered protocols and re-homes a
//! connection when its current protocol asks to [`Switch`](Step::Switch),
//! e.g. from http to websocket after a handshake.

pub mod http;
pub mod switch;
pub mod websocket;

pub use self::http::HttpProtocol;
pub use switch::ProtocolSwitch;
pub use self::websocket::WebSocketProtocol;

use std::collections::HashMap;

use crate::channel::ByteChannel;
use crate::error::HandshakeError;
use crate::http::{Request, Response};
use crate::websocket::SocketId;

/// What a suspended connection waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
}

/// Result of driving a connection.
#[derive(Debug)]
pub enum Step {
    /// Call again once the channel is ready.
    Suspend(Interest),
    /// Done with the connection, it should be closed.
    Close,
    /// Hand the connection to another protocol.
    Switch(Upgrade),
}

/// What the event loop should do next with a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wants {
    Read,
    Write,
    Close,
}

impl From<Interest> for Wants {
    fn from(interest: Interest) -> Self {
        match interest {
            Interest::Read => Wants::Read,
            Interest::Write => Wants::Write,
        }
    }
}

/// A completed handshake.
#[derive(Debug)]
pub struct Upgrade {
    /// Registered name of the protocol taking over.
    pub protocol: String,
    /// The request which asked for it.
    pub request: Request,
    /// Bytes read past the request.
    pub leftover: Vec<u8>,
}

/// Per-connection protocol handling.
///
/// One instance serves every connection homed to it, keyed by socket id.
pub trait ConnectionProtocol {
    /// A connection was accepted.
    fn open(&self, _id: SocketId) {}

    /// Make progress on a connection.
    ///
    /// `upgrades` resolves protocols named by an `Upgrade` header.
    fn data(&self, id: SocketId, io: &mut dyn ByteChannel, upgrades: &dyn Upgrades) -> Step;

    /// The connection is gone, release its state.
    fn close(&self, _id: SocketId) {}

    /// Validate an upgrade request and answer it.
    ///
    /// Protocols which cannot be switched to refuse every request.
    fn handshake(&self, _req: &Request, _res: &mut Response) -> Result<(), HandshakeError> {
        Err(HandshakeError::Upgrade)
    }

    /// A connection was handed over after a successful handshake.
    fn switched(&self, _id: SocketId, _upgrade: Upgrade) {}
}

/// Lookup of protocols by upgrade name.
pub trait Upgrades {
    fn find(&self, name: &str) -> Option<&dyn ConnectionProtocol>;
}

impl Upgrades for HashMap<String, Box<dyn ConnectionProtocol>> {
    fn find(&self, name: &str) -> Option<&dyn ConnectionProtocol> {
        self.get(&name.trim().to_ascii_lowercase()).map(|p| p.as_ref())
    }
}

/// Upgrades available to a protocol which was itself switched to.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpgrades;

impl Upgrades for NoUpgrades {
    fn find(&self, _: &str) -> Option<&dyn ConnectionProtocol> { None }
}
