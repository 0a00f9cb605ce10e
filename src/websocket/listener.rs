//! Websocket listeners.

use super::{Connection, Message};
use crate::error::RouteError;
use crate::routing::PathPattern;

/// Application callbacks of a websocket endpoint.
pub trait Listener {
    /// The handshake succeeded.
    fn open(&self, _conn: &mut Connection) {}

    /// A complete text or binary message arrived.
    ///
    /// An error closes the connection with 1011.
    fn message(&self, conn: &mut Connection, msg: Message) -> anyhow::Result<()>;

    /// The connection is gone, `code` is the close code sent or received,
    /// 1006 if the peer vanished without one.
    fn close(&self, _conn: &mut Connection, _code: u16) {}
}

/// Listeners by path prefix, first registered match wins.
#[derive(Default)]
pub struct Listeners {
    entries: Vec<(PathPattern, Box<dyn Listener>)>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(p, _)| p))
            .finish()
    }
}

impl Listeners {
    pub fn new() -> Self { Self::default() }

    /// Register a listener for a path and everything below it.
    pub fn on<L>(mut self, path: &str, listener: L) -> Result<Self, RouteError>
    where
        L: Listener + 'static,
    {
        self.entries
            .push((PathPattern::parse(path)?, Box::new(listener)));
        Ok(self)
    }

    /// Index of the listener for a path.
    pub fn find(&self, path: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(pattern, _)| pattern.matches(path).is_some())
    }

    pub fn get(&self, index: usize) -> Option<&dyn Listener> {
        self.entries.get(index).map(|(_, l)| l.as_ref())
    }

    #[inline]
    pub fn len(&self) -> usize { self.entries.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Nop;

    impl Listener for Nop {
        fn message(&self, _: &mut Connection, _: Message) -> anyhow::Result<()> { Ok(()) }
    }

    #[test]
    fn by_prefix() {
        let listeners = Listeners::new()
            .on("/chat", Nop)
            .unwrap()
            .on("/", Nop)
            .unwrap();

        assert_eq!(listeners.find("/chat/room"), Some(0));
        assert_eq!(listeners.find("/chatty"), Some(1));
        assert_eq!(listeners.len(), 2);
        assert!(listeners.get(1).is_some());

        let only_chat = Listeners::new().on("/chat", Nop).unwrap();
        assert_eq!(only_chat.find("/other"), None);
        assert!(Listeners::new().on("chat", Nop).is_err());
    }
}
