//! Websocket connections after the handshake.

use std::cell::RefCell;
use std::collections::HashMap;
use std::task::Poll;

use log::{debug, warn};

use super::{ConnectionProtocol, Interest, Step, Upgrade, Upgrades};
use crate::channel::ByteChannel;
use crate::config::Config;
use crate::error::{Error, HandshakeError};
use crate::frame::{OpCode, close};
use crate::handshake;
use crate::http::{Request, Response};
use crate::websocket::{Connection, FrameCodec, Listener, Listeners, SocketId};

struct Socket {
    conn: Connection,
    listener: usize,
}

/// Websocket protocol, dispatching messages to [`Listeners`].
pub struct WebSocketProtocol {
    listeners: Listeners,
    config: Config,
    sockets: RefCell<HashMap<SocketId, Socket>>,
}

impl WebSocketProtocol {
    pub fn new(listeners: Listeners, config: Config) -> Self {
        Self {
            listeners,
            config,
            sockets: RefCell::new(HashMap::new()),
        }
    }

    /// Connections currently homed here.
    pub fn connections(&self) -> usize { self.sockets.borrow().len() }

    fn listener(&self, index: usize) -> Option<&dyn Listener> { self.listeners.get(index) }

    fn drive(&self, sock: &mut Socket, io: &mut dyn ByteChannel) -> Step {
        let id = sock.conn.id();
        loop {
            match sock.conn.codec().poll_flush(io) {
                Poll::Pending => return Step::Suspend(Interest::Write),
                Poll::Ready(Err(e)) => {
                    warn!("socket {}: {}", id, e);
                    return Step::Close;
                }
                Poll::Ready(Ok(())) => {}
            }

            // close frame is out
            if sock.conn.is_closing() {
                return Step::Close;
            }

            let msg = match sock.conn.codec().poll_receive(io) {
                Poll::Pending => return Step::Suspend(Interest::Read),
                Poll::Ready(Ok(Some(msg))) => msg,
                Poll::Ready(Ok(None)) => {
                    debug!("socket {}: disconnected", id);
                    return Step::Close;
                }
                Poll::Ready(Err(Error::Frame(e))) => {
                    debug!("socket {}: {}", id, e);
                    let _ = sock.conn.close(e.close_code(), "");
                    continue;
                }
                Poll::Ready(Err(e)) => {
                    warn!("socket {}: {}", id, e);
                    return Step::Close;
                }
            };

            match msg.opcode {
                OpCode::Ping => {
                    let _ = sock.conn.codec().transmit(OpCode::Pong, &msg.payload);
                }
                OpCode::Pong => {}
                OpCode::Close => {
                    let code = close::reply_code(&msg.payload);
                    debug!("socket {}: close received, replying {}", id, code);
                    let _ = sock.conn.close(code, "");
                }
                _ => {
                    let listener = match self.listener(sock.listener) {
                        Some(l) => l,
                        None => return Step::Close,
                    };
                    if let Err(e) = listener.message(&mut sock.conn, msg) {
                        warn!("socket {}: listener failed: {:#}", id, e);
                        if !sock.conn.is_closing() {
                            let _ = sock.conn.close(close::UNEXPECTED, "");
                        }
                    }
                }
            }
        }
    }

    fn finish(&self, mut sock: Socket) {
        let code = sock.conn.close_code().unwrap_or(close::ABNORMAL);
        debug!("socket {}: closed with {}", sock.conn.id(), code);
        if let Some(listener) = self.listener(sock.listener) {
            listener.close(&mut sock.conn, code);
        }
    }
}

impl ConnectionProtocol for WebSocketProtocol {
    fn data(&self, id: SocketId, io: &mut dyn ByteChannel, _: &dyn Upgrades) -> Step {
        let sock = self.sockets.borrow_mut().remove(&id);
        let mut sock = match sock {
            Some(sock) => sock,
            None => return Step::Close,
        };

        let step = self.drive(&mut sock, io);
        match step {
            Step::Suspend(_) => {
                self.sockets.borrow_mut().insert(id, sock);
            }
            _ => self.finish(sock),
        }
        step
    }

    fn close(&self, id: SocketId) {
        let sock = self.sockets.borrow_mut().remove(&id);
        if let Some(sock) = sock {
            self.finish(sock);
        }
    }

    fn handshake(&self, req: &Request, res: &mut Response) -> Result<(), HandshakeError> {
        handshake::validate(req)?;
        if self.listeners.find(req.path()).is_none() {
            return Err(HandshakeError::NoListener);
        }
        handshake::accept(req, res)
    }

    fn switched(&self, id: SocketId, upgrade: Upgrade) {
        let Upgrade {
            request, leftover, ..
        } = upgrade;

        let listener = match self.listeners.find(request.path()) {
            Some(index) => index,
            None => {
                debug!("socket {}: no listener for {}", id, request.path());
                return;
            }
        };

        let codec = FrameCodec::with_data(self.config.max_frame_size, self.config.read_chunk, leftover);
        let mut sock = Socket {
            conn: Connection::new(id, &request, codec),
            listener,
        };
        if let Some(l) = self.listener(listener) {
            l.open(&mut sock.conn);
        }
        self.sockets.borrow_mut().insert(id, sock);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::protocol::NoUpgrades;
    use crate::role::Client;
    use crate::websocket::{Message, MAX_FRAME_SIZE};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl Listener for Recorder {
        fn open(&self, conn: &mut Connection) {
            self.events.borrow_mut().push(format!("open {}", conn.path()));
        }

        fn message(&self, conn: &mut Connection, msg: Message) -> anyhow::Result<()> {
            let text = msg.text().unwrap_or("").to_string();
            if text == "fail" {
                anyhow::bail!("refused");
            }
            self.events.borrow_mut().push(format!("message {}", text));
            conn.send(&text)?;
            Ok(())
        }

        fn close(&self, _: &mut Connection, code: u16) {
            self.events.borrow_mut().push(format!("close {}", code));
        }
    }

    fn switched(recorder: &Recorder, leftover: Vec<u8>) -> WebSocketProtocol {
        let listeners = Listeners::new().on("/chat", recorder.clone()).unwrap();
        let ws = WebSocketProtocol::new(listeners, Config::default());
        let upgrade = Upgrade {
            protocol: "websocket".to_string(),
            request: Request::new("GET", "/chat").unwrap(),
            leftover,
        };
        ws.switched(1, upgrade);
        ws
    }

    fn client(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
        let mut codec = FrameCodec::<Client>::new(MAX_FRAME_SIZE, 1024);
        codec.transmit(opcode, payload).unwrap();
        codec.pending().to_vec()
    }

    fn events(recorder: &Recorder) -> Vec<String> { recorder.events.borrow().clone() }

    #[test]
    fn handshake_needs_listener() {
        let ws = WebSocketProtocol::new(Listeners::new().on("/chat", Recorder::default()).unwrap(), Config::default());
        let req = Request::new("GET", "/other")
            .unwrap()
            .with_header("Upgrade", "websocket")
            .with_header("Connection", "Upgrade")
            .with_header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .with_header("Sec-WebSocket-Version", "13");
        let mut res = Response::default();
        assert_eq!(ws.handshake(&req, &mut res), Err(HandshakeError::NoListener));

        let mut req = req;
        req.rewrite("/chat/room").unwrap();
        assert!(ws.handshake(&req, &mut res).is_ok());
        assert_eq!(res.status(), 101);
    }

    #[test]
    fn echo_then_close() {
        let recorder = Recorder::default();
        // first frame arrived along with the handshake
        let ws = switched(&recorder, client(OpCode::Text, b"hi"));
        let mut chan = MemoryChannel::new(&client(OpCode::Ping, b"p"));

        assert!(matches!(ws.data(1, &mut chan, &NoUpgrades), Step::Suspend(Interest::Read)));
        assert_eq!(chan.take_output(), b"\x81\x02hi\x8a\x01p");

        chan.feed(&client(OpCode::Close, &close::encode(3000, "bye")));
        assert!(matches!(ws.data(1, &mut chan, &NoUpgrades), Step::Close));
        assert_eq!(chan.take_output(), [0x88, 2, 0x0b, 0xb8]);
        assert_eq!(ws.connections(), 0);
        assert_eq!(events(&recorder), ["open /chat", "message hi", "close 3000"]);
    }

    #[test]
    fn protocol_error() {
        let recorder = Recorder::default();
        let ws = switched(&recorder, Vec::new());
        let mut chan = MemoryChannel::new(&client(OpCode::Continue, b"x"));

        assert!(matches!(ws.data(1, &mut chan, &NoUpgrades), Step::Close));
        assert_eq!(chan.take_output(), [0x88, 2, 0x03, 0xea]);
        assert_eq!(events(&recorder), ["open /chat", "close 1002"]);
    }

    #[test]
    fn listener_error() {
        let recorder = Recorder::default();
        let ws = switched(&recorder, Vec::new());
        let mut chan = MemoryChannel::new(&client(OpCode::Text, b"fail"));

        assert!(matches!(ws.data(1, &mut chan, &NoUpgrades), Step::Close));
        assert_eq!(chan.take_output(), [0x88, 2, 0x03, 0xf3]);
        assert_eq!(events(&recorder), ["open /chat", "close 1011"]);
    }

    #[test]
    fn vanished() {
        let recorder = Recorder::default();
        let ws = switched(&recorder, Vec::new());
        let mut chan = MemoryChannel::new(b"");

        assert!(matches!(ws.data(1, &mut chan, &NoUpgrades), Step::Suspend(Interest::Read)));
        chan.shutdown_read();
        assert!(matches!(ws.data(1, &mut chan, &NoUpgrades), Step::Close));
        assert_eq!(events(&recorder), ["open /chat", "close 1006"]);

        // closed by the event loop
        let recorder = Recorder::default();
        let ws = switched(&recorder, Vec::new());
        ws.close(1);
        assert_eq!(events(&recorder), ["open /chat", "close 1006"]);
        assert!(matches!(ws.data(1, &mut chan, &NoUpgrades), Step::Close));
    }
}
