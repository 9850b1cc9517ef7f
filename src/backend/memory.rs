use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use table_finder_auth::{
    AuthChangeEvent, AuthError, AuthEvents, AuthStateChange, AuthSubscription, Session,
    SignUpResponse, User,
};

use super::{AuthBackend, GuestStore};
use crate::error::{Error, Result};
use crate::guest::{Guest, GuestId, NewGuest};

/// Calls kept in the log; older ones are dropped first
pub const CALL_LOG_LIMIT: usize = 256;

/// One call that reached the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListGuests,
    FindGuest { surname: String, given_name: String },
    InsertGuest(NewGuest),
    UpdateGuest(GuestId, NewGuest),
    DeleteGuest(GuestId),
    SignIn { email: String },
    SignUp { email: String, redirect_to: Option<String> },
    SignOut,
    GetSession,
}

impl BackendCall {
    pub fn is_guest_write(&self) -> bool {
        matches!(
            self,
            BackendCall::InsertGuest(_) | BackendCall::UpdateGuest(..) | BackendCall::DeleteGuest(_)
        )
    }
}

#[derive(Debug)]
struct Account {
    id: String,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    guests: Vec<Guest>,
    next_id: u64,
    accounts: HashMap<String, Account>,
    calls: VecDeque<BackendCall>,
    fail_guests: bool,
    fail_auth: Option<String>,
}

/// In-process backend with the same observable behavior as the hosted one.
///
/// Clones share everything. [`MemoryBackend::console`] shares the guest table
/// and accounts but gets its own session, like a second browser would.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Mutex<Shared>>,
    session: Arc<Mutex<Option<Session>>>,
    events: AuthEvents,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn auth_error(status: u16, code: &str, message: &str) -> AuthError {
    AuthError::ApiError {
        status,
        code: Some(code.to_string()),
        message: message.to_string(),
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same data, separate session
    pub fn console(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            session: Arc::default(),
            events: AuthEvents::default(),
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }

    fn record(&self, call: BackendCall) {
        let mut shared = self.shared();
        if shared.calls.len() == CALL_LOG_LIMIT {
            shared.calls.pop_front();
        }
        shared.calls.push_back(call);
    }

    /// Add a guest directly, bypassing the call log
    pub fn seed_guest(&self, surname: &str, given_name: &str, table_number: Option<u32>) -> GuestId {
        let mut shared = self.shared();
        shared.next_id += 1;
        let id = GuestId::new(shared.next_id.to_string());
        shared.guests.push(Guest {
            id: id.clone(),
            surname: surname.to_string(),
            given_name: given_name.to_string(),
            table_number,
        });
        id
    }

    /// Register a confirmed organizer account
    pub fn with_account(self, email: &str, password: &str) -> Self {
        {
            let mut shared = self.shared();
            let id = format!("user-{}", shared.accounts.len() + 1);
            shared.accounts.insert(
                email.to_string(),
                Account {
                    id,
                    password: password.to_string(),
                    confirmed: true,
                },
            );
        }
        self
    }

    /// Mark an account as having clicked its confirmation link
    pub fn confirm_account(&self, email: &str) -> bool {
        match self.shared().accounts.get_mut(email) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Make every guest table call fail until switched off
    pub fn fail_guest_calls(&self, fail: bool) {
        self.shared().fail_guests = fail;
    }

    /// Make every auth call fail with `message` until cleared
    pub fn fail_auth_calls(&self, message: Option<&str>) {
        self.shared().fail_auth = message.map(str::to_string);
    }

    pub fn guests(&self) -> Vec<Guest> {
        self.shared().guests.clone()
    }

    /// The most recent calls, oldest first. Only the last
    /// [`CALL_LOG_LIMIT`] are kept.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.shared().calls.iter().cloned().collect()
    }

    /// Live auth state subscriptions on this console
    pub fn auth_subscribers(&self) -> usize {
        self.events.subscriber_count()
    }

    pub fn clear_calls(&self) {
        self.shared().calls.clear();
    }

    fn check_guest_failure(&self) -> Result<()> {
        if self.shared().fail_guests {
            return Err(Error::backend("guest table unavailable"));
        }
        Ok(())
    }

    fn check_auth_failure(&self) -> Result<(), AuthError> {
        match &self.shared().fail_auth {
            Some(message) => Err(auth_error(500, "unexpected_failure", message)),
            None => Ok(()),
        }
    }

    fn start_session(&self, user_id: &str, email: &str) -> Session {
        let session = Session {
            access_token: format!("memory-access-{}", uuid::Uuid::new_v4()),
            refresh_token: format!("memory-refresh-{}", uuid::Uuid::new_v4()),
            expires_in: 3600,
            expires_at: None,
            token_type: "bearer".to_string(),
            user: User {
                id: user_id.to_string(),
                email: Some(email.to_string()),
                phone: None,
                role: Some("authenticated".to_string()),
                email_confirmed_at: None,
                app_metadata: serde_json::Value::Null,
                user_metadata: serde_json::Value::Null,
                created_at: None,
            },
        };
        *lock(&self.session) = Some(session.clone());
        self.events.emit(AuthStateChange {
            event: AuthChangeEvent::SignedIn,
            session: Some(session.clone()),
        });
        session
    }
}

#[async_trait]
impl GuestStore for MemoryBackend {
    async fn list_guests(&self) -> Result<Vec<Guest>> {
        self.record(BackendCall::ListGuests);
        self.check_guest_failure()?;

        let mut guests = self.guests();
        guests.sort_by_key(|g| g.surname.to_lowercase());
        Ok(guests)
    }

    async fn find_guest(&self, surname: &str, given_name: &str) -> Result<Option<Guest>> {
        self.record(BackendCall::FindGuest {
            surname: surname.to_string(),
            given_name: given_name.to_string(),
        });
        self.check_guest_failure()?;

        let surname = surname.to_lowercase();
        let given_name = given_name.to_lowercase();
        Ok(self
            .shared()
            .guests
            .iter()
            .find(|g| g.surname.to_lowercase() == surname && g.given_name.to_lowercase() == given_name)
            .cloned())
    }

    async fn insert_guest(&self, guest: &NewGuest) -> Result<()> {
        self.record(BackendCall::InsertGuest(guest.clone()));
        self.check_guest_failure()?;

        self.seed_guest(&guest.surname, &guest.given_name, guest.table_number);
        Ok(())
    }

    async fn update_guest(&self, id: &GuestId, guest: &NewGuest) -> Result<()> {
        self.record(BackendCall::UpdateGuest(id.clone(), guest.clone()));
        self.check_guest_failure()?;

        // Like PostgREST, an update matching no row is not an error
        if let Some(stored) = self.shared().guests.iter_mut().find(|g| &g.id == id) {
            stored.surname = guest.surname.clone();
            stored.given_name = guest.given_name.clone();
            stored.table_number = guest.table_number;
        }
        Ok(())
    }

    async fn delete_guest(&self, id: &GuestId) -> Result<()> {
        self.record(BackendCall::DeleteGuest(id.clone()));
        self.check_guest_failure()?;

        self.shared().guests.retain(|g| &g.id != id);
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.record(BackendCall::SignIn {
            email: email.to_string(),
        });
        self.check_auth_failure()?;

        let user_id = {
            let shared = self.shared();
            match shared.accounts.get(email) {
                Some(account) if account.password == password => {
                    if !account.confirmed {
                        return Err(auth_error(400, "email_not_confirmed", "Email not confirmed"));
                    }
                    account.id.clone()
                }
                _ => {
                    return Err(auth_error(
                        400,
                        "invalid_credentials",
                        "Invalid login credentials",
                    ))
                }
            }
        };

        Ok(self.start_session(&user_id, email))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpResponse, AuthError> {
        self.record(BackendCall::SignUp {
            email: email.to_string(),
            redirect_to: redirect_to.map(str::to_string),
        });
        self.check_auth_failure()?;

        if password.chars().count() < 6 {
            return Err(auth_error(
                422,
                "weak_password",
                "Password should be at least 6 characters.",
            ));
        }

        let mut shared = self.shared();
        if shared.accounts.contains_key(email) {
            return Err(auth_error(422, "user_already_exists", "User already registered"));
        }
        let id = format!("user-{}", shared.accounts.len() + 1);
        shared.accounts.insert(
            email.to_string(),
            Account {
                id: id.clone(),
                password: password.to_string(),
                confirmed: false,
            },
        );

        Ok(SignUpResponse::User(User {
            id,
            email: Some(email.to_string()),
            phone: None,
            role: None,
            email_confirmed_at: None,
            app_metadata: serde_json::Value::Null,
            user_metadata: serde_json::Value::Null,
            created_at: None,
        }))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.record(BackendCall::SignOut);
        lock(&self.session).take();
        self.events.emit(AuthStateChange {
            event: AuthChangeEvent::SignedOut,
            session: None,
        });
        self.check_auth_failure()
    }

    async fn get_session(&self) -> Option<Session> {
        self.record(BackendCall::GetSession);
        lock(&self.session).clone()
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_is_sorted_by_surname() {
        let backend = MemoryBackend::new();
        backend.seed_guest("Ondo", "Marie", Some(2));
        backend.seed_guest("mba", "Paul", None);
        backend.seed_guest("Bongo", "Luc", Some(1));

        let surnames: Vec<_> = backend
            .list_guests()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.surname)
            .collect();
        assert_eq!(surnames, ["Bongo", "mba", "Ondo"]);
    }

    #[tokio::test]
    async fn consoles_share_guests_but_not_sessions() {
        let backend = MemoryBackend::new().with_account("maries@example.com", "secret123");
        let console = backend.console();

        console
            .sign_in_with_password("maries@example.com", "secret123")
            .await
            .unwrap();
        console
            .insert_guest(&NewGuest {
                surname: "Mba".to_string(),
                given_name: "Paul".to_string(),
                table_number: Some(5),
            })
            .await
            .unwrap();

        assert!(console.get_session().await.is_some());
        assert!(backend.get_session().await.is_none());
        assert_eq!(backend.guests().len(), 1);
    }

    #[tokio::test]
    async fn unconfirmed_account_cannot_sign_in() {
        let backend = MemoryBackend::new();
        backend
            .sign_up("maries@example.com", "secret123", None)
            .await
            .unwrap();

        let err = backend
            .sign_in_with_password("maries@example.com", "secret123")
            .await
            .unwrap_err();
        assert_eq!(err.api_message(), Some("Email not confirmed"));

        assert!(backend.confirm_account("maries@example.com"));
        assert!(backend
            .sign_in_with_password("maries@example.com", "secret123")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn call_log_keeps_only_the_latest_calls() {
        let backend = MemoryBackend::new();
        for _ in 0..CALL_LOG_LIMIT + 10 {
            backend.get_session().await;
        }
        backend.list_guests().await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), CALL_LOG_LIMIT);
        assert_eq!(calls.last(), Some(&BackendCall::ListGuests));
    }
}
