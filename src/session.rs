//! Auth capability as seen by the sync engine: an authenticated flag and a
//! bearer token. Login/logout flows live elsewhere; they just push here.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub token: Option<String>,
}

impl Session {
    pub fn signed_in(token: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            token: Some(token.into()),
        }
    }

    /// Token usable for a request; blank tokens count as absent.
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(Session::default())
    }
}

impl SessionHandle {
    pub fn new(initial: Session) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn login(&self, token: impl Into<String>) {
        self.tx.send_replace(Session::signed_in(token));
        tracing::info!(target: "notify", "session authenticated");
    }

    pub fn logout(&self) {
        self.tx.send_replace(Session::default());
        tracing::info!(target: "notify", "session ended");
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }
}
