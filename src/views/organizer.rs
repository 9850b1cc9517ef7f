//! Organizer area: login form or roster, depending on the session

use std::sync::Arc;

use super::login::LoginView;
use super::roster::RosterManager;
use super::session_gate::{GateStatus, SessionGate};
use crate::backend::{AuthBackend, GuestStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Login,
    Roster,
}

/// One organizer console. Holds its own session, so build one per browser.
pub struct OrganizerArea {
    store: Arc<dyn GuestStore>,
    auth: Arc<dyn AuthBackend>,
    redirect_to: Option<String>,
    gate: SessionGate,
    login: LoginView,
    roster: Option<RosterManager>,
}

impl OrganizerArea {
    /// Mount the session gate. Must be called inside a tokio runtime.
    pub fn mount(
        store: Arc<dyn GuestStore>,
        auth: Arc<dyn AuthBackend>,
        redirect_to: Option<String>,
    ) -> Self {
        let gate = SessionGate::mount(auth.clone());
        let login = Self::login_view(&gate, &auth, &redirect_to);

        Self {
            store,
            auth,
            redirect_to,
            gate,
            login,
            roster: None,
        }
    }

    fn login_view(
        gate: &SessionGate,
        auth: &Arc<dyn AuthBackend>,
        redirect_to: &Option<String>,
    ) -> LoginView {
        LoginView::new(auth.clone())
            .with_redirect_to(redirect_to.clone())
            .on_success(gate.authenticator())
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn login(&self) -> &LoginView {
        &self.login
    }

    pub fn login_mut(&mut self) -> &mut LoginView {
        &mut self.login
    }

    pub fn roster(&self) -> Option<&RosterManager> {
        self.roster.as_ref()
    }

    pub fn roster_mut(&mut self) -> Option<&mut RosterManager> {
        self.roster.as_mut()
    }

    /// Bring the roster in line with the gate and say what to show. The
    /// roster is created and loaded on the first authenticated call and
    /// dropped as soon as the session is gone.
    pub async fn screen(&mut self) -> Screen {
        match self.gate.status() {
            GateStatus::Loading => Screen::Loading,
            GateStatus::Unauthenticated => {
                self.roster = None;
                Screen::Login
            }
            GateStatus::Authenticated => {
                if self.roster.is_none() {
                    let mut roster = RosterManager::new(self.store.clone());
                    roster.load().await;
                    self.roster = Some(roster);
                }
                Screen::Roster
            }
        }
    }

    /// Wait for the first session signal, then [`OrganizerArea::screen`]
    pub async fn ready(&mut self) -> Screen {
        self.gate.ready().await;
        self.screen().await
    }

    /// Sign out and start over with an empty login form
    pub async fn sign_out(&mut self) {
        self.gate.sign_out().await;
        self.roster = None;
        self.login = Self::login_view(&self.gate, &self.auth, &self.redirect_to);
    }
}
