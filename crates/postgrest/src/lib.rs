//! PostgREST client for the guest table
//!
//! A small query builder over the PostgREST HTTP API exposed by a Supabase
//! project. It covers what the guest directory and roster need:
//!
//! - Query API (`select`, `insert`, `update`, `delete`)
//! - Filtering (`eq`, `ilike`)
//! - Ordering and row limits
//! - Per-request bearer tokens (`with_auth`) so row level security sees the
//!   signed-in organizer

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Error body returned by PostgREST
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostgrestApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: PostgrestApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl PostgrestError {
    /// HTTP status of the failed request, when the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PostgrestError::ApiError { status, .. }
            | PostgrestError::UnparsedApiError { status, .. } => Some(*status),
            PostgrestError::NetworkError(e) => e.status(),
            _ => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// What PostgREST should send back after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPreference {
    Minimal,
    Representation,
}

impl ReturnPreference {
    fn header_value(&self) -> HeaderValue {
        match self {
            ReturnPreference::Minimal => HeaderValue::from_static("return=minimal"),
            ReturnPreference::Representation => HeaderValue::from_static("return=representation"),
        }
    }
}

/// Escape `%`, `_` and `\` so an `ilike` pattern only matches the literal
/// text, case-insensitively.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Request builder bound to one table
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    base_url: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    query_params: HashMap<String, String>,
    returning: ReturnPreference,
}

impl PostgrestClient {
    /// Create a client for `table`. The anon key is sent both as `apikey` and
    /// as the default bearer token, like supabase-js does.
    pub fn new(base_url: &str, api_key: &str, table: &str, http_client: Client) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(api_key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", api_key)) {
            headers.insert("Authorization", value);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            http_client,
            headers,
            query_params: HashMap::new(),
            returning: ReturnPreference::Minimal,
        }
    }

    /// Table this client targets
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, PostgrestError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header value for {}", key))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Send requests as the holder of `token` instead of the anon role
    pub fn with_auth(self, token: &str) -> Result<Self, PostgrestError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.query_params
            .insert("select".to_string(), columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("eq.{}", value));
        self
    }

    /// Case-insensitive pattern filter. Pass the value through [`escape_like`]
    /// for an exact, case-insensitive match.
    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("ilike.{}", pattern));
        self
    }

    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        let order_str = match order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        self.query_params
            .insert("order".to_string(), format!("{}.{}", column, order_str));
        self
    }

    pub fn limit(mut self, count: u32) -> Self {
        self.query_params
            .insert("limit".to_string(), count.to_string());
        self
    }

    /// Ask for the written rows back instead of an empty body
    pub fn returning(mut self, preference: ReturnPreference) -> Self {
        self.returning = preference;
        self
    }

    fn build_url(&self) -> Result<String, PostgrestError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;

        // Sorted so the request line is stable across runs
        let mut params: Vec<_> = self.query_params.iter().collect();
        params.sort();
        for (key, value) in params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(url.to_string())
    }

    fn write_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(
            HeaderName::from_static("prefer"),
            self.returning.header_value(),
        );
        headers
    }

    /// Run a GET with the accumulated filters
    pub async fn execute<T: for<'de> Deserialize<'de>>(&self) -> Result<Vec<T>, PostgrestError> {
        let url = self.build_url()?;
        log::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let response = check_status(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }

    /// Run the query and keep only the first row
    pub async fn execute_one<T: for<'de> Deserialize<'de>>(
        self,
    ) -> Result<Option<T>, PostgrestError> {
        let rows = self.limit(1).execute::<T>().await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<T: Serialize>(&self, values: &T) -> Result<Vec<serde_json::Value>, PostgrestError> {
        let url = self.build_url()?;
        log::debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.write_headers())
            .json(values)
            .send()
            .await?;

        read_rows(check_status(response).await?).await
    }

    /// PATCH every row matching the filters
    pub async fn update<T: Serialize>(&self, values: &T) -> Result<Vec<serde_json::Value>, PostgrestError> {
        if !self.has_filter() {
            return Err(PostgrestError::InvalidParameters(
                "update requires at least one filter".to_string(),
            ));
        }
        let url = self.build_url()?;
        log::debug!("PATCH {}", url);

        let response = self
            .http_client
            .patch(&url)
            .headers(self.write_headers())
            .json(values)
            .send()
            .await?;

        read_rows(check_status(response).await?).await
    }

    /// DELETE every row matching the filters
    pub async fn delete(&self) -> Result<Vec<serde_json::Value>, PostgrestError> {
        if !self.has_filter() {
            return Err(PostgrestError::InvalidParameters(
                "delete requires at least one filter".to_string(),
            ));
        }
        let url = self.build_url()?;
        log::debug!("DELETE {}", url);

        let response = self
            .http_client
            .delete(&url)
            .headers(self.write_headers())
            .send()
            .await?;

        read_rows(check_status(response).await?).await
    }

    fn has_filter(&self) -> bool {
        self.query_params
            .keys()
            .any(|k| !matches!(k.as_str(), "select" | "order" | "limit"))
    }
}

async fn check_status(response: Response) -> Result<Response, PostgrestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());

    match serde_json::from_str::<PostgrestApiErrorDetails>(&error_text) {
        Ok(details) => Err(PostgrestError::ApiError { details, status }),
        Err(_) => Err(PostgrestError::UnparsedApiError {
            message: error_text,
            status,
        }),
    }
}

// `return=minimal` answers 201/204 with an empty body
async fn read_rows(response: Response) -> Result<Vec<serde_json::Value>, PostgrestError> {
    let body_text = response.text().await.map_err(|e| {
        PostgrestError::DeserializationError(format!("Failed to read response body: {}", e))
    })?;

    if body_text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<serde_json::Value>(&body_text)? {
        serde_json::Value::Array(rows) => Ok(rows),
        serde_json::Value::Null => Ok(Vec::new()),
        row => Ok(vec![row]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn escape_like_only_touches_wildcards() {
        assert_eq!(escape_like("dupont"), "dupont");
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
        assert_eq!(escape_like("N'Dong-Mba"), "N'Dong-Mba");
    }

    #[test]
    fn build_url_is_sorted_and_encoded() {
        let client = PostgrestClient::new("http://localhost:54321/", "key", "invites", Client::new())
            .select("*")
            .ilike("nom", "le roux")
            .order("nom", SortOrder::Ascending);

        let url = client.build_url().unwrap();
        assert_eq!(
            url,
            "http://localhost:54321/rest/v1/invites?nom=ilike.le+roux&order=nom.asc&select=*"
        );
    }

    #[tokio::test]
    async fn test_select_with_filters() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/invites"))
            .and(query_param("select", "nom,prenom,numero_table"))
            .and(query_param("nom", "ilike.dupont"))
            .and(query_param("prenom", "ilike.jean"))
            .and(query_param("limit", "1"))
            .and(header("apikey", "fake-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "nom": "Dupont", "prenom": "Jean", "numero_table": 4 }
            ])))
            .mount(&mock_server)
            .await;

        let client = PostgrestClient::new(&mock_server.uri(), "fake-key", "invites", Client::new());
        let row = client
            .select("nom,prenom,numero_table")
            .ilike("nom", "dupont")
            .ilike("prenom", "jean")
            .execute_one::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(row.unwrap()["numero_table"], 4);
    }

    #[tokio::test]
    async fn test_insert_sends_bearer_and_prefer() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/invites"))
            .and(header("authorization", "Bearer user-token"))
            .and(header("prefer", "return=minimal"))
            .and(body_json(json!({ "nom": "Mba", "prenom": "Paul", "numero_table": 5 })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = PostgrestClient::new(&mock_server.uri(), "fake-key", "invites", Client::new())
            .with_auth("user-token")
            .unwrap();
        let rows = client
            .insert(&json!({ "nom": "Mba", "prenom": "Paul", "numero_table": 5 }))
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_details_are_parsed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/invites"))
            .and(query_param("id", "eq.42"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": "42501",
                "message": "permission denied for table invites",
                "details": null,
                "hint": null
            })))
            .mount(&mock_server)
            .await;

        let client = PostgrestClient::new(&mock_server.uri(), "fake-key", "invites", Client::new());
        let err = client
            .eq("id", "42")
            .update(&json!({ "numero_table": null }))
            .await
            .unwrap_err();

        match err {
            PostgrestError::ApiError { details, status } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(details.code.as_deref(), Some("42501"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_without_filter_is_rejected() {
        let client = PostgrestClient::new("http://127.0.0.1:9", "fake-key", "invites", Client::new());
        let err = client.delete().await.unwrap_err();
        assert!(matches!(err, PostgrestError::InvalidParameters(_)));
    }
}
