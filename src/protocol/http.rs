//! Http exchanges.
//!
//! A connection reads a request head, decodes the body if there is one,
//! runs the application and writes the response, then starts over if the
//! connection is kept alive. An `Upgrade` header naming a registered
//! protocol replaces the application with that protocol's handshake.

use std::cell::RefCell;
use std::collections::HashMap;
use std::task::Poll;

use log::{debug, info, warn};

use super::{ConnectionProtocol, Interest, Step, Upgrade, Upgrades};
use crate::channel::ByteChannel;
use crate::config::Config;
use crate::error::{Error, MessageError, ResponseError};
use crate::handshake;
use crate::http::{Request, Response, Version};
use crate::message::{Body, BodyDecoder, BodyKind, MessageInput, RequestHead};
use crate::routing::{Application, Served};
use crate::websocket::SocketId;

enum Phase {
    Head,
    Body {
        req: Request,
        decoder: BodyDecoder,
        data: Vec<u8>,
    },
    Respond {
        res: Response,
        keep_alive: bool,
        upgrade: Option<(String, Request)>,
    },
}

enum Progress {
    Continue(Phase),
    Yield(Phase, Step),
}

struct Exchange {
    input: MessageInput,
    phase: Phase,
}

impl Exchange {
    fn new(read_chunk: usize) -> Self {
        Self {
            input: MessageInput::new(read_chunk),
            phase: Phase::Head,
        }
    }
}

/// Http/1.x on top of an [`Application`].
pub struct HttpProtocol {
    app: Application,
    config: Config,
    exchanges: RefCell<HashMap<SocketId, Exchange>>,
}

impl HttpProtocol {
    pub fn new(app: Application, config: Config) -> Self {
        Self {
            app,
            config,
            exchanges: RefCell::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config { &self.config }

    /// Connections currently homed here.
    pub fn connections(&self) -> usize { self.exchanges.borrow().len() }

    fn drive(
        &self,
        id: SocketId,
        ex: &mut Exchange,
        io: &mut dyn ByteChannel,
        upgrades: &dyn Upgrades,
    ) -> Step {
        loop {
            let phase = std::mem::replace(&mut ex.phase, Phase::Head);
            match self.advance(id, &mut ex.input, phase, io, upgrades) {
                Progress::Continue(next) => ex.phase = next,
                Progress::Yield(last, step) => {
                    ex.phase = last;
                    return step;
                }
            }
        }
    }

    fn advance(
        &self,
        id: SocketId,
        input: &mut MessageInput,
        phase: Phase,
        io: &mut dyn ByteChannel,
        upgrades: &dyn Upgrades,
    ) -> Progress {
        match phase {
            Phase::Head => match input.read_request_head(io, self.config.max_head_size) {
                Poll::Pending => Progress::Yield(Phase::Head, Step::Suspend(Interest::Read)),
                Poll::Ready(Ok(None)) => {
                    debug!("socket {}: closed by peer", id);
                    Progress::Yield(Phase::Head, Step::Close)
                }
                Poll::Ready(Ok(Some(head))) => match self.begin(head) {
                    Ok((req, None)) => Progress::Continue(self.dispatch(id, req, upgrades)),
                    Ok((req, Some(decoder))) => Progress::Continue(Phase::Body {
                        req,
                        decoder,
                        data: Vec::new(),
                    }),
                    Err(e) => self.fail(id, e.into()),
                },
                Poll::Ready(Err(e)) => self.fail(id, e),
            },
            Phase::Body {
                mut req,
                mut decoder,
                mut data,
            } => match decoder.poll_decode(input, io, &mut data) {
                Poll::Pending => Progress::Yield(
                    Phase::Body { req, decoder, data },
                    Step::Suspend(Interest::Read),
                ),
                Poll::Ready(Ok(())) => {
                    req.set_body(Some(Body::new(data)));
                    Progress::Continue(self.dispatch(id, req, upgrades))
                }
                Poll::Ready(Err(e)) => self.fail(id, e),
            },
            Phase::Respond {
                mut res,
                keep_alive,
                upgrade,
            } => match res.poll_write(io) {
                Poll::Pending => Progress::Yield(
                    Phase::Respond {
                        res,
                        keep_alive,
                        upgrade,
                    },
                    Step::Suspend(Interest::Write),
                ),
                Poll::Ready(Err(e)) => {
                    warn!("socket {}: {}", id, e);
                    Progress::Yield(Phase::Head, Step::Close)
                }
                Poll::Ready(Ok(())) => {
                    if let Some((protocol, request)) = upgrade {
                        let leftover = input.take_buffered();
                        let upgrade = Upgrade {
                            protocol,
                            request,
                            leftover,
                        };
                        return Progress::Yield(Phase::Head, Step::Switch(upgrade));
                    }
                    if !keep_alive {
                        return Progress::Yield(Phase::Head, Step::Close);
                    }
                    Progress::Continue(Phase::Head)
                }
            },
        }
    }

    fn begin(&self, head: RequestHead) -> Result<(Request, Option<BodyDecoder>), MessageError> {
        let req = Request::from_head(head, &self.config.default_host)?;
        let decoder = match BodyKind::for_request(req.headers())? {
            BodyKind::None => None,
            kind => Some(BodyDecoder::new(kind, self.config.max_body_size)?),
        };
        Ok((req, decoder))
    }

    /// Answer a format error, drop the connection on anything else.
    fn fail(&self, id: SocketId, e: Error) -> Progress {
        let e = match e {
            Error::Message(e) => e,
            e => {
                warn!("socket {}: {}", id, e);
                return Progress::Yield(Phase::Head, Step::Close);
            }
        };

        warn!("socket {}: bad request: {}", id, e);
        let mut res = Response::new(Version::Http11);
        // a fresh response is never flushed
        let _ = render_fatal(&mut res, &e);
        Progress::Continue(Phase::Respond {
            res,
            keep_alive: false,
            upgrade: None,
        })
    }

    fn dispatch(&self, id: SocketId, mut req: Request, upgrades: &dyn Upgrades) -> Phase {
        let mut res = Response::new(req.version());

        if let Some(name) = req.header("upgrade") {
            let name = name.trim().to_ascii_lowercase();
            if let Some(protocol) = upgrades.find(&name) {
                return self.upgrade(id, req, res, name, protocol);
            }
        }

        let mut keep_alive = self.config.keep_alive && req.wants_keep_alive();
        if req.headers().contains("connection") || (!keep_alive && req.version() == Version::Http11) {
            let value = if keep_alive { "keep-alive" } else { "close" };
            let _ = res.header("Connection", value);
        }

        if let Served::Broken(_) = self.app.service(&mut req, &mut res) {
            keep_alive = false;
        }
        if let Err(e) = res.complete() {
            warn!("socket {}: {}", id, e);
            keep_alive = false;
        }
        if res.headers().has_token("connection", "close") {
            keep_alive = false;
        }

        access(id, &req, &res);
        Phase::Respond {
            res,
            keep_alive,
            upgrade: None,
        }
    }

    fn upgrade(
        &self,
        id: SocketId,
        req: Request,
        mut res: Response,
        name: String,
        protocol: &dyn ConnectionProtocol,
    ) -> Phase {
        let upgrade = match protocol.handshake(&req, &mut res) {
            Ok(()) => {
                debug!("socket {}: switching to {}", id, name);
                let _ = res.complete();
                Some((name, req))
            }
            Err(e) => {
                debug!("socket {}: {} handshake refused: {}", id, name, e);
                let _ = handshake::refuse(&mut res, &e);
                access(id, &req, &res);
                None
            }
        };
        if let Some((_, req)) = upgrade.as_ref() {
            access(id, req, &res);
        }
        Phase::Respond {
            res,
            keep_alive: false,
            upgrade,
        }
    }
}

fn render_fatal(res: &mut Response, e: &MessageError) -> Result<(), ResponseError> {
    res.answer(e.status(), "")?;
    res.header("Connection", "close")?;
    res.send(format!("{}\n", e), "text/plain; charset=utf-8")
}

fn access(id: SocketId, req: &Request, res: &Response) {
    info!(
        "socket {}: \"{} {} {}\" {}",
        id,
        req.method(),
        req.target(),
        req.version(),
        res.status()
    );
}

impl ConnectionProtocol for HttpProtocol {
    fn open(&self, id: SocketId) {
        self.exchanges
            .borrow_mut()
            .insert(id, Exchange::new(self.config.read_chunk));
    }

    fn data(&self, id: SocketId, io: &mut dyn ByteChannel, upgrades: &dyn Upgrades) -> Step {
        let ex = self.exchanges.borrow_mut().remove(&id);
        let mut ex = ex.unwrap_or_else(|| Exchange::new(self.config.read_chunk));

        let step = self.drive(id, &mut ex, io, upgrades);
        if let Step::Suspend(_) = step {
            self.exchanges.borrow_mut().insert(id, ex);
        }
        step
    }

    fn close(&self, id: SocketId) { self.exchanges.borrow_mut().remove(&id); }
}
