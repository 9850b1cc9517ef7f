//! GoTrue authentication client
//!
//! Email/password sign up and sign in, sign out, session lookup with token
//! refresh, and an auth state change stream for code that has to react when
//! the organizer signs in or out.

mod events;
mod session;

use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

pub use events::{AuthChangeEvent, AuthEvents, AuthStateChange, AuthSubscription};
pub use session::{Session, SignUpResponse, User};

#[derive(Error, Debug)]
pub enum AuthError {
    /// Rejected by the auth server. Displays the server's own message, which
    /// callers match on ("Invalid login credentials", "Email not confirmed").
    #[error("{message}")]
    ApiError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Missing session")]
    MissingSession,
}

impl AuthError {
    /// Server message for API errors, `None` for transport failures
    pub fn api_message(&self) -> Option<&str> {
        match self {
            AuthError::ApiError { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Client options
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub auto_refresh_token: bool,
    pub persist_session: bool,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
        }
    }
}

// GoTrue has answered errors in several shapes over its versions
#[derive(Deserialize, Default)]
struct ApiErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    error_code: Option<String>,
}

async fn check_status(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ApiErrorBody>(&error_text).unwrap_or_default();
    let code = body.error_code.clone().or_else(|| body.error.clone());
    let message = body
        .msg
        .or(body.message)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or(error_text);

    Err(AuthError::ApiError {
        status: status.as_u16(),
        code,
        message,
    })
}

/// GoTrue client holding at most one session
#[derive(Clone)]
pub struct Auth {
    url: String,
    key: String,
    http_client: Client,
    options: AuthOptions,
    current_session: Arc<RwLock<Option<Session>>>,
    events: AuthEvents,
}

impl Auth {
    pub fn new(url: &str, key: &str, http_client: Client, options: AuthOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            options,
            current_session: Arc::new(RwLock::new(None)),
            events: AuthEvents::default(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(Url::parse(&format!("{}/auth/v1{}", self.url, path))?)
    }

    async fn store_session(&self, session: &Session, event: AuthChangeEvent) {
        if self.options.persist_session {
            *self.current_session.write().await = Some(session.clone());
        }
        self.events.emit(AuthStateChange {
            event,
            session: Some(session.clone()),
        });
    }

    async fn clear_session(&self) -> Option<Session> {
        let previous = self.current_session.write().await.take();
        self.events.emit(AuthStateChange {
            event: AuthChangeEvent::SignedOut,
            session: None,
        });
        previous
    }

    /// Register a new account. With email confirmation enabled the server
    /// answers with the bare user and no session is stored.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpResponse, AuthError> {
        let mut url = self.endpoint("/signup")?;
        if let Some(redirect_to) = redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        }

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });

        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.key)
            .json(&payload)
            .send()
            .await?;

        let response = check_status(response).await?;
        let result: SignUpResponse = response.json().await?;

        if let SignUpResponse::Session(session) = &result {
            let session = session.clone().with_expiry();
            self.store_session(&session, AuthChangeEvent::SignedIn).await;
        }

        Ok(result)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = self.endpoint("/token?grant_type=password")?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });

        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.key)
            .json(&payload)
            .send()
            .await?;

        let response = check_status(response).await?;
        let session = response.json::<Session>().await?.with_expiry();
        log::debug!("signed in as {}", session.user.id);

        self.store_session(&session, AuthChangeEvent::SignedIn).await;
        Ok(session)
    }

    /// Current session. An expired session is refreshed first when
    /// `auto_refresh_token` is set, and dropped if the refresh fails.
    pub async fn get_session(&self) -> Option<Session> {
        let session = self.current_session.read().await.clone()?;
        if !session.is_expired() {
            return Some(session);
        }
        if !self.options.auto_refresh_token {
            return None;
        }

        match self.refresh_session().await {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("session refresh failed: {}", e);
                self.clear_session().await;
                None
            }
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.get_session().await.map(|s| s.access_token)
    }

    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .current_session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(AuthError::MissingSession)?;

        let url = self.endpoint("/token?grant_type=refresh_token")?;
        let payload = serde_json::json!({ "refresh_token": refresh_token });

        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.key)
            .json(&payload)
            .send()
            .await?;

        let response = check_status(response).await?;
        let session = response.json::<Session>().await?.with_expiry();

        self.store_session(&session, AuthChangeEvent::TokenRefreshed)
            .await;
        Ok(session)
    }

    /// Forget the local session, then revoke it server-side. The local state
    /// is cleared even when the revoke call fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.clear_session().await else {
            return Ok(());
        };

        let url = self.endpoint("/logout")?;
        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        // Already revoked or expired server-side
        if matches!(response.status().as_u16(), 401 | 403 | 404) {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    /// Subscribe to sign in/out and refresh events. Events emitted before the
    /// call are not replayed.
    pub fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "test_access_token",
            "refresh_token": "test_refresh_token",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": "test_user_id",
                "email": "maries@example.com",
                "app_metadata": {},
                "user_metadata": {},
                "created_at": "2025-01-01T00:00:00Z"
            }
        })
    }

    #[tokio::test]
    async fn test_sign_in_stores_session_and_emits() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(serde_json::json!({
                "email": "maries@example.com",
                "password": "secret123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&mock_server)
            .await;

        let auth = Auth::new(&mock_server.uri(), "test_key", Client::new(), AuthOptions::default());
        let mut subscription = auth.on_auth_state_change();

        let session = auth
            .sign_in_with_password("maries@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(session.access_token, "test_access_token");
        assert!(session.expires_at.is_some());

        let change = subscription.recv().await.unwrap();
        assert_eq!(change.event, AuthChangeEvent::SignedIn);
        assert!(auth.get_session().await.is_some());
    }

    #[tokio::test]
    async fn test_sign_in_error_message_is_extracted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 400,
                "error_code": "invalid_credentials",
                "msg": "Invalid login credentials"
            })))
            .mount(&mock_server)
            .await;

        let auth = Auth::new(&mock_server.uri(), "test_key", Client::new(), AuthOptions::default());
        let err = auth
            .sign_in_with_password("maries@example.com", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.api_message(), Some("Invalid login credentials"));
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(auth.get_session().await.is_none());
    }

    #[tokio::test]
    async fn test_legacy_error_description_is_extracted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Email not confirmed"
            })))
            .mount(&mock_server)
            .await;

        let auth = Auth::new(&mock_server.uri(), "test_key", Client::new(), AuthOptions::default());
        let err = auth
            .sign_in_with_password("maries@example.com", "secret123")
            .await
            .unwrap_err();

        match err {
            AuthError::ApiError { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("invalid_grant"));
                assert_eq!(message, "Email not confirmed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_local() {
        let auth = Auth::new("http://127.0.0.1:9", "test_key", Client::new(), AuthOptions::default());
        let mut subscription = auth.on_auth_state_change();

        auth.sign_out().await.unwrap();

        let change = subscription.recv().await.unwrap();
        assert_eq!(change.event, AuthChangeEvent::SignedOut);
        assert!(change.session.is_none());
    }
}
