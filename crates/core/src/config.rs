/// Client configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Base URL of the REST API (default: `http://localhost:8080/api`).
    pub api_url: String,
    /// Base URL of the WebSocket endpoint (default: `ws://localhost:8080`).
    /// The transport appends `/ws` and a session id.
    pub ws_url: String,
    /// Name of the environment variable holding the bearer credential
    /// (default: `LADLE_AUTH_TOKEN`). The token itself is read lazily at
    /// connect time so a rotated credential is picked up.
    pub auth_token_env: String,
    /// Page size for paginated notification fetches (default: `20`).
    pub page_size: u32,
}

impl AdminConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                     |
    /// |------------------------|-----------------------------|
    /// | `LADLE_API_URL`        | `http://localhost:8080/api` |
    /// | `LADLE_WS_URL`         | `ws://localhost:8080`       |
    /// | `LADLE_AUTH_TOKEN_ENV` | `LADLE_AUTH_TOKEN`          |
    /// | `LADLE_PAGE_SIZE`      | `20`                        |
    pub fn from_env() -> Self {
        let api_url = std::env::var("LADLE_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api".into());

        let ws_url =
            std::env::var("LADLE_WS_URL").unwrap_or_else(|_| "ws://localhost:8080".into());

        let auth_token_env =
            std::env::var("LADLE_AUTH_TOKEN_ENV").unwrap_or_else(|_| "LADLE_AUTH_TOKEN".into());

        let page_size: u32 = std::env::var("LADLE_PAGE_SIZE")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("LADLE_PAGE_SIZE must be a valid u32");

        Self {
            api_url,
            ws_url,
            auth_token_env,
            page_size,
        }
    }
}
