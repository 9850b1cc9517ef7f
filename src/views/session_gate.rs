//! Decides whether the organizer area shows the login form or the roster
//!
//! Two sources report the session: the auth state change stream and a
//! one-shot probe issued at mount. They race. Every signal takes a stamp from
//! one counter when it originates, and the shared state only accepts a
//! signal newer than the one it holds, so a slow probe can never overwrite a
//! sign in or sign out that happened after it was issued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::login::CompletionCallback;
use crate::backend::AuthBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    status: GateStatus,
    stamp: u64,
}

/// Authenticated flag with a stamped merge
#[derive(Debug)]
struct SessionFlag {
    clock: AtomicU64,
    state: watch::Sender<Snapshot>,
}

impl SessionFlag {
    fn new() -> Self {
        let (state, _) = watch::channel(Snapshot {
            status: GateStatus::Loading,
            stamp: 0,
        });
        Self {
            clock: AtomicU64::new(0),
            state,
        }
    }

    fn stamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `authenticated` unless a newer signal already landed
    fn apply(&self, stamp: u64, authenticated: bool) -> bool {
        let status = if authenticated {
            GateStatus::Authenticated
        } else {
            GateStatus::Unauthenticated
        };
        self.state.send_if_modified(|current| {
            if stamp <= current.stamp {
                return false;
            }
            let changed = current.status != status;
            *current = Snapshot { status, stamp };
            changed
        })
    }

    fn status(&self) -> GateStatus {
        self.state.borrow().status
    }
}

pub struct SessionGate {
    auth: Arc<dyn AuthBackend>,
    flag: Arc<SessionFlag>,
    listener: JoinHandle<()>,
    probe: JoinHandle<()>,
}

impl SessionGate {
    /// Subscribe to auth changes and probe the current session. Must be
    /// called inside a tokio runtime.
    pub fn mount(auth: Arc<dyn AuthBackend>) -> Self {
        let flag = Arc::new(SessionFlag::new());

        let mut subscription = auth.on_auth_state_change();
        let listener = {
            let flag = flag.clone();
            tokio::spawn(async move {
                while let Some(change) = subscription.recv().await {
                    let stamp = flag.stamp();
                    debug!(event = ?change.event, stamp, "auth state change");
                    flag.apply(stamp, change.session.is_some());
                }
            })
        };

        let probe = {
            let flag = flag.clone();
            let auth = auth.clone();
            let stamp = flag.stamp();
            tokio::spawn(async move {
                let session = auth.get_session().await;
                if !flag.apply(stamp, session.is_some()) {
                    debug!(stamp, "session probe superseded or unchanged");
                }
            })
        };

        Self {
            auth,
            flag,
            listener,
            probe,
        }
    }

    pub fn status(&self) -> GateStatus {
        self.flag.status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == GateStatus::Authenticated
    }

    /// Wait until either source has reported
    pub async fn ready(&self) -> GateStatus {
        let mut rx = self.flag.state.subscribe();
        let status = match rx.wait_for(|s| s.status != GateStatus::Loading).await {
            Ok(snapshot) => snapshot.status,
            // The sender lives in `self.flag`, so this cannot close first
            Err(_) => self.status(),
        };
        status
    }

    pub fn mark_signed_in(&self) {
        let stamp = self.flag.stamp();
        self.flag.apply(stamp, true);
    }

    /// Completion callback for the login form
    pub fn authenticator(&self) -> CompletionCallback {
        let flag = self.flag.clone();
        Arc::new(move || {
            let stamp = flag.stamp();
            flag.apply(stamp, true);
        })
    }

    /// Sign out on the backend, then drop to unauthenticated without waiting
    /// for the stream to confirm
    pub async fn sign_out(&self) {
        if let Err(e) = self.auth.sign_out().await {
            warn!(error = %e, "sign out failed on the backend");
        }
        let stamp = self.flag.stamp();
        self.flag.apply(stamp, false);
    }

    /// Release the subscription. Dropping the gate does the same.
    pub fn unmount(self) {}
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        self.listener.abort();
        self.probe.abort();
    }
}
