use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tokio::task::JoinError;

use super::render;

/// Errors a request handler can end with
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("internal server error")]
    Internal(String),
}

impl From<JoinError> for AppError {
    fn from(e: JoinError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<tera::Error> for AppError {
    fn from(e: tera::Error) -> Self {
        AppError::Internal(format!("template: {e:?}"))
    }
}

impl From<crate::error::Error> for AppError {
    fn from(e: crate::error::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Page introuvable."),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Une erreur est survenue.")
            }
        };
        match render::error_page(message) {
            Ok(page) => (status, Html(page)).into_response(),
            Err(e) => {
                tracing::error!(error = ?e, "failed to render the error page");
                (status, message).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn not_found_returns_404() {
        let response = AppError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_detail_stays_in_the_log() {
        let response = AppError::Internal("connection reset by peer".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("Une erreur est survenue."));
        assert!(!body.contains("connection reset"));
    }
}
