//! REST API client for the backend notification endpoints.
//!
//! Wraps the notification HTTP API (paginated fetch, mark-read, dismiss,
//! delete) using [`reqwest`]. Read failures are surfaced as errors here;
//! callers that want the dashboard's degrade-to-empty behaviour convert
//! them to [`Page::empty`](ladle_core::Page::empty) at the call site.

use ladle_core::{NotificationEvent, Page};

/// HTTP client for the notification endpoints of one backend instance.
pub struct NotificationsApi {
    client: reqwest::Client,
    api_url: String,
    auth_token_env: String,
}

/// Errors from the notification REST layer.
#[derive(Debug, thiserror::Error)]
pub enum NotificationsApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Notification API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl NotificationsApi {
    /// Create a new API client.
    ///
    /// * `api_url`        - Base URL, e.g. `http://host:8080/api`.
    /// * `auth_token_env` - Environment variable holding the bearer token.
    ///   The token is read per request so a rotated credential is picked up.
    pub fn new(api_url: String, auth_token_env: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            auth_token_env,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across API surfaces).
    pub fn with_client(client: reqwest::Client, api_url: String, auth_token_env: String) -> Self {
        Self {
            client,
            api_url,
            auth_token_env,
        }
    }

    /// Fetch one page of the default (non-dismissed) notification feed.
    ///
    /// Sends `GET /notifications?page={page}&size={size}`.
    pub async fn list(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Page<NotificationEvent>, NotificationsApiError> {
        let response = self
            .request(reqwest::Method::GET, "/notifications")
            .query(&[("page", page), ("size", size)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch one page of dismissed notifications.
    ///
    /// Sends `GET /notifications/dismissed?page={page}&size={size}`.
    pub async fn list_dismissed(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Page<NotificationEvent>, NotificationsApiError> {
        let response = self
            .request(reqwest::Method::GET, "/notifications/dismissed")
            .query(&[("page", page), ("size", size)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Mark one notification read.
    ///
    /// Sends `PUT /notifications/{id}/read`.
    pub async fn mark_read(&self, id: &str) -> Result<(), NotificationsApiError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/notifications/{id}/read"))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Mark every notification of the current user read.
    ///
    /// Sends `PUT /notifications/read-all`.
    pub async fn mark_all_read(&self) -> Result<(), NotificationsApiError> {
        let response = self
            .request(reqwest::Method::PUT, "/notifications/read-all")
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Hide one notification from the default feed.
    ///
    /// Sends `PUT /notifications/{id}/dismiss`.
    pub async fn dismiss(&self, id: &str) -> Result<(), NotificationsApiError> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/notifications/{id}/dismiss"),
            )
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Restore a dismissed notification to the default feed.
    ///
    /// Sends `PUT /notifications/{id}/unhide`.
    pub async fn unhide(&self, id: &str) -> Result<(), NotificationsApiError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/notifications/{id}/unhide"))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Hard-delete one notification.
    ///
    /// Sends `DELETE /notifications/{id}`.
    pub async fn delete(&self, id: &str) -> Result<(), NotificationsApiError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/notifications/{id}"))
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    /// Build a request for `path`, attaching the bearer credential when the
    /// configured environment variable carries one.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.api_url, path));
        if let Ok(token) = std::env::var(&self.auth_token_env) {
            if !token.is_empty() {
                builder = builder.bearer_auth(token);
            }
        }
        builder
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`NotificationsApiError::Api`] containing
    /// the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, NotificationsApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotificationsApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, NotificationsApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), NotificationsApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
