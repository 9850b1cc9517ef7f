//! Auth state change fan-out

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::session::Session;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

#[derive(Debug, Clone)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

/// Broadcast hub shared by an auth client and its subscribers
#[derive(Debug, Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthStateChange>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }
}

impl AuthEvents {
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn emit(&self, change: AuthStateChange) {
        log::debug!("auth state change: {:?}", change.event);
        // No subscribers is not an error
        let _ = self.tx.send(change);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Live subscription to auth state changes. Dropping it releases the
/// subscription.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthStateChange>,
}

impl AuthSubscription {
    /// Next change, or `None` once the auth client is gone. A subscriber that
    /// fell behind skips to the oldest change still buffered.
    pub async fn recv(&mut self) -> Option<AuthStateChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("auth subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}
