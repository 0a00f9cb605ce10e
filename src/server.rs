//! Tokio event loop.
//!
//! Drives a [`ProtocolSwitch`] over tokio sockets on a single thread.
//! Sockets are read and written with `try_read` / `try_write`, readiness
//! is awaited as the switch asks for it.
//!
//! ```ignore
//! let switch = Rc::new(RefCell::new(ProtocolSwitch::new("http", http)));
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! LocalSet::new().run_until(serve(listener, switch)).await?;
//! ```

use std::cell::RefCell;
use std::io::{Read, Write, Result};
use std::rc::Rc;

use log::{debug, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::channel::ByteChannel;
use crate::protocol::{ProtocolSwitch, Wants};
use crate::websocket::SocketId;

/// Non-blocking [`ByteChannel`] over a tokio socket.
#[derive(Debug)]
pub struct TokioChannel {
    stream: TcpStream,
    closed: bool,
}

impl TokioChannel {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    #[inline]
    pub const fn get_ref(&self) -> &TcpStream { &self.stream }

    #[inline]
    pub fn into_inner(self) -> TcpStream { self.stream }

    /// Wait until the socket may be read from or written to.
    pub async fn ready(&self, wants: Wants) -> Result<()> {
        match wants {
            Wants::Read => self.stream.readable().await,
            Wants::Write => self.stream.writable().await,
            Wants::Close => Ok(()),
        }
    }
}

impl Read for TokioChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Ok(0);
        }
        self.stream.try_read(buf)
    }
}

impl Write for TokioChannel {
    fn write(&mut self, buf: &[u8]) -> Result<usize> { self.stream.try_write(buf) }

    fn flush(&mut self) -> Result<()> { Ok(()) }
}

impl ByteChannel for TokioChannel {
    // the socket is released on drop
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Accept connections forever.
///
/// Each connection is served by a task spawned with
/// [`spawn_local`](tokio::task::spawn_local), so this must run inside a
/// [`LocalSet`](tokio::task::LocalSet).
pub async fn serve(listener: TcpListener, switch: Rc<RefCell<ProtocolSwitch>>) -> Result<()> {
    let mut next_id: SocketId = 0;
    loop {
        let (stream, peer) = listener.accept().await?;
        next_id += 1;
        let id = next_id;
        debug!("socket {}: accepted from {}", id, peer);

        let switch = switch.clone();
        tokio::task::spawn_local(async move {
            if let Err(e) = connection(id, stream, &switch).await {
                warn!("socket {}: {}", id, e);
                switch.borrow_mut().close(id);
            }
        });
    }
}

/// Serve one connection until the switch closes it.
pub async fn connection(id: SocketId, stream: TcpStream, switch: &RefCell<ProtocolSwitch>) -> Result<()> {
    let _ = stream.set_nodelay(true);
    let mut chan = TokioChannel::new(stream);
    switch.borrow_mut().open(id);

    loop {
        let wants = switch.borrow_mut().data(id, &mut chan);
        if wants == Wants::Close {
            return Ok(());
        }
        chan.ready(wants).await?;
    }
}
