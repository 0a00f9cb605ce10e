//! Protocol switch.

use std::collections::HashMap;

use log::debug;

use super::{ConnectionProtocol, NoUpgrades, Step, Upgrades, Wants};
use crate::channel::ByteChannel;
use crate::websocket::SocketId;

/// Routes each connection to the protocol it is homed to.
///
/// New connections start with the default protocol. Protocol names are
/// case insensitive, they are what clients put in the `Upgrade` header.
pub struct ProtocolSwitch {
    protocols: HashMap<String, Box<dyn ConnectionProtocol>>,
    default: String,
    sockets: HashMap<SocketId, String>,
}

impl ProtocolSwitch {
    /// Constructor, take the protocol new connections speak.
    pub fn new<P>(name: &str, protocol: P) -> Self
    where
        P: ConnectionProtocol + 'static,
    {
        let default = name.to_ascii_lowercase();
        let mut protocols: HashMap<String, Box<dyn ConnectionProtocol>> = HashMap::new();
        protocols.insert(default.clone(), Box::new(protocol));
        Self {
            protocols,
            default,
            sockets: HashMap::new(),
        }
    }

    /// Register a protocol connections may switch to.
    pub fn register<P>(mut self, name: &str, protocol: P) -> Self
    where
        P: ConnectionProtocol + 'static,
    {
        self.protocols
            .insert(name.to_ascii_lowercase(), Box::new(protocol));
        self
    }

    /// Protocol a connection is homed to.
    pub fn protocol_of(&self, id: SocketId) -> Option<&str> {
        self.sockets.get(&id).map(String::as_str)
    }

    /// Open connections.
    #[inline]
    pub fn len(&self) -> usize { self.sockets.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.sockets.is_empty() }

    /// A connection was accepted.
    pub fn open(&mut self, id: SocketId) {
        self.sockets.insert(id, self.default.clone());
        if let Some(protocol) = self.protocols.get(&self.default) {
            protocol.open(id);
        }
    }

    /// Make progress on a connection.
    ///
    /// The channel is closed before returning [`Wants::Close`].
    pub fn data(&mut self, id: SocketId, io: &mut dyn ByteChannel) -> Wants {
        let mut name = match self.sockets.get(&id) {
            Some(name) => name.clone(),
            None => {
                self.open(id);
                self.default.clone()
            }
        };

        loop {
            let protocol = match self.protocols.get(&name) {
                Some(protocol) => protocol,
                None => return self.shutdown(id, io),
            };

            // only the default protocol may switch
            let step = if name == self.default {
                protocol.data(id, io, &self.protocols)
            } else {
                protocol.data(id, io, &NoUpgrades)
            };

            match step {
                Step::Suspend(interest) => return interest.into(),
                Step::Close => return self.shutdown(id, io),
                Step::Switch(upgrade) => {
                    let next = upgrade.protocol.to_ascii_lowercase();
                    let target = match self.protocols.find(&next) {
                        Some(target) => target,
                        None => return self.shutdown(id, io),
                    };
                    debug!("socket {}: {} -> {}", id, name, next);
                    protocol.close(id);
                    target.switched(id, upgrade);
                    self.sockets.insert(id, next.clone());
                    name = next;
                }
            }
        }
    }

    /// The event loop dropped a connection.
    pub fn close(&mut self, id: SocketId) {
        if let Some(name) = self.sockets.remove(&id) {
            if let Some(protocol) = self.protocols.get(&name) {
                protocol.close(id);
            }
        }
    }

    fn shutdown(&mut self, id: SocketId, io: &mut dyn ByteChannel) -> Wants {
        self.close(id);
        if let Err(e) = io.close() {
            debug!("socket {}: close: {}", id, e);
        }
        Wants::Close
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::config::Config;
    use crate::frame::OpCode;
    use crate::handshake::client_request;
    use crate::http::{Request, Response};
    use crate::protocol::{HttpProtocol, WebSocketProtocol};
    use crate::role::Client;
    use crate::routing::{Application, Outcome, Router};
    use crate::websocket::{Connection, FrameCodec, Listener, Listeners, Message, MAX_FRAME_SIZE};

    struct Echo;

    impl Listener for Echo {
        fn message(&self, conn: &mut Connection, msg: Message) -> anyhow::Result<()> {
            conn.send_binary(&msg.payload)?;
            Ok(())
        }
    }

    fn switch() -> ProtocolSwitch {
        let router = Router::new()
            .route("/", |_: &mut Request, res: &mut Response| -> anyhow::Result<Outcome> {
                res.send("home", "text/plain")?;
                Ok(Outcome::Done)
            })
            .unwrap();
        let http = HttpProtocol::new(Application::new(router), Config::default());
        let ws = WebSocketProtocol::new(Listeners::new().on("/echo", Echo).unwrap(), Config::default());
        ProtocolSwitch::new("http", http).register("WebSocket", ws)
    }

    #[test]
    fn upgrade_in_place() {
        let mut switch = switch();
        let mut client = FrameCodec::<Client>::new(MAX_FRAME_SIZE, 1024);
        client.transmit(OpCode::Binary, &[1, 2, 3]).unwrap();

        // handshake and first frame in one read
        let mut wire = client_request("localhost", "/echo", "dGhlIHNhbXBsZSBub25jZQ==").into_bytes();
        wire.extend_from_slice(client.pending());
        let mut chan = MemoryChannel::new(&wire);

        switch.open(1);
        assert_eq!(switch.protocol_of(1), Some("http"));
        assert_eq!(switch.data(1, &mut chan), Wants::Read);
        assert_eq!(switch.protocol_of(1), Some("websocket"));

        let out = chan.take_output();
        let head = b"HTTP/1.1 101 Switching Protocols\r\n\
                     Upgrade: websocket\r\n\
                     Connection: Upgrade\r\n\
                     Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";
        assert_eq!(&out[..head.len()], &head[..]);
        assert_eq!(&out[head.len()..], &[0x82, 3, 1, 2, 3]);

        chan.shutdown_read();
        assert_eq!(switch.data(1, &mut chan), Wants::Close);
        assert!(chan.is_closed());
        assert!(switch.is_empty());
    }

    #[test]
    fn refused_upgrade() {
        let mut switch = switch();
        let wire = client_request("localhost", "/nobody", "dGhlIHNhbXBsZSBub25jZQ==");
        let mut chan = MemoryChannel::new(wire.as_bytes());

        switch.open(2);
        assert_eq!(switch.data(2, &mut chan), Wants::Close);
        let out = String::from_utf8(chan.take_output()).unwrap();
        assert!(out.starts_with("HTTP/1.1 404 Not Found\r\nConnection: close\r\n"));
        assert!(chan.is_closed());
        assert_eq!(switch.protocol_of(2), None);
    }

    #[test]
    fn unknown_upgrade_is_plain_http() {
        let mut switch = switch();
        let mut chan = MemoryChannel::new(b"GET / HTTP/1.1\r\nUpgrade: h2c\r\nConnection: Upgrade\r\n\r\n");

        assert_eq!(switch.data(3, &mut chan), Wants::Read);
        let out = String::from_utf8(chan.take_output()).unwrap();
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with("home"));

        switch.close(3);
        assert!(switch.is_empty());
    }
}
