//! Organizer sign in / sign up form

use std::sync::Arc;
use tracing::{info, warn};

use table_finder_auth::AuthError;

use super::messages;
use crate::backend::AuthBackend;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

/// How a submit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    SignedIn,
    /// Account created, waiting for the email confirmation link
    ConfirmationSent,
    /// The backend refused; `error()` holds the text to show
    Rejected,
    /// Input failed local checks; nothing was sent
    Invalid,
}

/// Called once a sign in succeeds
pub type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

/// Text for an auth failure. Known server messages are translated, anything
/// else is shown as the server wrote it.
pub fn localize_auth_error(err: &AuthError) -> String {
    let message = err.to_string();
    match message.as_str() {
        "Invalid login credentials" => messages::INVALID_CREDENTIALS.to_string(),
        "Email not confirmed" => messages::EMAIL_NOT_CONFIRMED.to_string(),
        "" => messages::GENERIC_ERROR.to_string(),
        _ => message,
    }
}

/// Same acceptance as a browser `type=email` input: one `@`, something on
/// each side, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

pub struct LoginView {
    auth: Arc<dyn AuthBackend>,
    mode: AuthMode,
    email: String,
    password: String,
    loading: bool,
    error: Option<String>,
    message: Option<&'static str>,
    redirect_to: Option<String>,
    on_success: Option<CompletionCallback>,
}

impl LoginView {
    pub fn new(auth: Arc<dyn AuthBackend>) -> Self {
        Self {
            auth,
            mode: AuthMode::Login,
            email: String::new(),
            password: String::new(),
            loading: false,
            error: None,
            message: None,
            redirect_to: None,
            on_success: None,
        }
    }

    /// Where the sign-up confirmation link points
    pub fn with_redirect_to(mut self, redirect_to: Option<String>) -> Self {
        self.redirect_to = redirect_to;
        self
    }

    pub fn on_success(mut self, callback: CompletionCallback) -> Self {
        self.on_success = Some(callback);
        self
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Switch between sign in and sign up, dropping inputs and feedback
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        };
        self.email.clear();
        self.password.clear();
        self.error = None;
        self.message = None;
    }

    pub fn set_email(&mut self, value: &str) {
        self.email = value.to_string();
    }

    pub fn set_password(&mut self, value: &str) {
        self.password = value.to_string();
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message(&self) -> Option<&'static str> {
        self.message
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => "Connexion",
            AuthMode::Signup => "Inscription",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => "Accédez à la gestion des invités",
            AuthMode::Signup => "Créez votre compte",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match (self.loading, self.mode) {
            (true, _) => messages::LOADING,
            (false, AuthMode::Login) => "Se connecter",
            (false, AuthMode::Signup) => "S'inscrire",
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => "Pas encore de compte ? S'inscrire",
            AuthMode::Signup => "Déjà un compte ? Se connecter",
        }
    }

    fn check_inputs(&self) -> Result<(), &'static str> {
        if !is_valid_email(&self.email) {
            return Err(messages::INVALID_EMAIL);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(messages::PASSWORD_TOO_SHORT);
        }
        Ok(())
    }

    pub async fn submit(&mut self) -> LoginOutcome {
        self.error = None;
        self.message = None;

        if let Err(message) = self.check_inputs() {
            self.error = Some(message.to_string());
            return LoginOutcome::Invalid;
        }

        self.loading = true;
        let outcome = match self.mode {
            AuthMode::Login => self
                .auth
                .sign_in_with_password(&self.email, &self.password)
                .await
                .map(|_| LoginOutcome::SignedIn),
            AuthMode::Signup => self
                .auth
                .sign_up(&self.email, &self.password, self.redirect_to.as_deref())
                .await
                .map(|_| LoginOutcome::ConfirmationSent),
        };
        self.loading = false;

        match outcome {
            Ok(LoginOutcome::SignedIn) => {
                info!("organizer signed in");
                if let Some(callback) = &self.on_success {
                    callback();
                }
                LoginOutcome::SignedIn
            }
            Ok(outcome) => {
                self.message = Some(messages::CHECK_EMAIL);
                outcome
            }
            Err(e) => {
                warn!(error = %e, mode = ?self.mode, "authentication failed");
                self.error = Some(localize_auth_error(&e));
                LoginOutcome::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MemoryBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn email_shape() {
        assert!(is_valid_email("maries@example.com"));
        assert!(is_valid_email("a@b"));
        assert!(!is_valid_email("maries.example.com"));
        assert!(!is_valid_email("a@@b"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn unknown_errors_pass_through() {
        let err = AuthError::ApiError {
            status: 429,
            code: None,
            message: "Email rate limit exceeded".to_string(),
        };
        assert_eq!(localize_auth_error(&err), "Email rate limit exceeded");

        let err = AuthError::ApiError {
            status: 500,
            code: None,
            message: String::new(),
        };
        assert_eq!(localize_auth_error(&err), messages::GENERIC_ERROR);
    }

    #[tokio::test]
    async fn wrong_password_is_localized() {
        let backend = MemoryBackend::new().with_account("maries@example.com", "secret123");
        let signed_in = Arc::new(AtomicUsize::new(0));
        let counter = signed_in.clone();
        let mut view = LoginView::new(Arc::new(backend.clone())).on_success(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        view.set_email("maries@example.com");
        view.set_password("wrongpass");

        assert_eq!(view.submit().await, LoginOutcome::Rejected);
        assert_eq!(view.error(), Some(messages::INVALID_CREDENTIALS));
        assert_eq!(signed_in.load(Ordering::SeqCst), 0);

        view.set_password("secret123");
        assert_eq!(view.submit().await, LoginOutcome::SignedIn);
        assert_eq!(view.error(), None);
        assert_eq!(signed_in.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_password_is_checked_locally() {
        let backend = MemoryBackend::new();
        let mut view = LoginView::new(Arc::new(backend.clone()));
        view.set_email("maries@example.com");
        view.set_password("12345");

        assert_eq!(view.submit().await, LoginOutcome::Invalid);
        assert_eq!(view.error(), Some(messages::PASSWORD_TOO_SHORT));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn signup_asks_to_check_email() {
        let backend = MemoryBackend::new();
        let mut view = LoginView::new(Arc::new(backend.clone()))
            .with_redirect_to(Some("https://noces.example.com".to_string()));

        view.toggle_mode();
        assert_eq!(view.mode(), AuthMode::Signup);
        view.set_email("maries@example.com");
        view.set_password("secret123");

        assert_eq!(view.submit().await, LoginOutcome::ConfirmationSent);
        assert_eq!(view.message(), Some(messages::CHECK_EMAIL));
        assert_eq!(
            backend.calls(),
            [BackendCall::SignUp {
                email: "maries@example.com".to_string(),
                redirect_to: Some("https://noces.example.com".to_string()),
            }]
        );
        assert!(backend.get_session().await.is_none());

        view.toggle_mode();
        assert_eq!(view.mode(), AuthMode::Login);
        assert_eq!(view.message(), None);
        assert_eq!(view.email(), "");
    }

    #[tokio::test]
    async fn unconfirmed_email_is_localized() {
        let backend = MemoryBackend::new();
        backend.sign_up("maries@example.com", "secret123", None).await.unwrap();

        let mut view = LoginView::new(Arc::new(backend));
        view.set_email("maries@example.com");
        view.set_password("secret123");

        assert_eq!(view.submit().await, LoginOutcome::Rejected);
        assert_eq!(view.error(), Some(messages::EMAIL_NOT_CONFIRMED));
    }
}
