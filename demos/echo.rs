//! Http and websocket echo server.
//!
//! ```text
//! cargo run --example echo -- 127.0.0.1:8080 [config.yaml]
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tokio::net::TcpListener;
use tokio::task::LocalSet;

use lightweb::config::Config;
use lightweb::error::HttpError;
use lightweb::http::{Request, Response};
use lightweb::protocol::{HttpProtocol, ProtocolSwitch, WebSocketProtocol};
use lightweb::routing::{Application, Invocation, Outcome, Router};
use lightweb::server::serve;
use lightweb::websocket::{Connection, Listener, Listeners, Message};

use log::info;

struct Echo;

impl Listener for Echo {
    fn open(&self, conn: &mut Connection) { info!("websocket {} open on {}", conn.id(), conn.path()); }

    fn message(&self, conn: &mut Connection, msg: Message) -> anyhow::Result<()> {
        match msg.text() {
            Some(text) => conn.send(text)?,
            None => conn.send_binary(&msg.payload)?,
        }
        Ok(())
    }

    fn close(&self, conn: &mut Connection, code: u16) { info!("websocket {} closed: {}", conn.id(), code); }
}

fn router() -> anyhow::Result<Router> {
    let router = Router::new()
        .route("POST /echo", |req: &mut Request, res: &mut Response| -> anyhow::Result<Outcome> {
            let body = req
                .body()
                .ok_or_else(|| HttpError::bad_request("Expected a body"))?;
            res.send(body.as_bytes(), "application/octet-stream")?;
            Ok(Outcome::Done)
        })?
        .route("GET /hello/{name}", |req: &mut Request, res: &mut Response| -> anyhow::Result<Outcome> {
            let name = req.passed("name").unwrap_or("world").to_string();
            res.send(format!("hello, {}\n", name), "text/plain")?;
            Ok(Outcome::Done)
        })?
        .route("GET /", |_: &mut Request, _: &mut Response| -> anyhow::Result<Outcome> {
            Ok(Outcome::dispatch("/hello/world"))
        })?;
    Ok(router)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| String::from("127.0.0.1:8080"));
    let config = match args.next() {
        Some(path) => Config::from_yaml(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    let app = Application::new(router()?).filter(
        |req: &mut Request, res: &mut Response, next: &mut Invocation<'_>| -> anyhow::Result<()> {
            res.header("Server", "lightweb")?;
            next.proceed(req, res)
        },
    );
    let listeners = Listeners::new().on("/ws", Echo)?;
    let switch = ProtocolSwitch::new("http", HttpProtocol::new(app, config.clone()))
        .register("websocket", WebSocketProtocol::new(listeners, config));

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    LocalSet::new()
        .run_until(serve(listener, Rc::new(RefCell::new(switch))))
        .await?;
    Ok(())
}
