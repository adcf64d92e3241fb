//! Blocking HTTP client bound to the backend's fixed local origin.

use reqwest::blocking::Client;
use thiserror::Error;
use tunebridge_core::json::extract_bool;
use tunebridge_core::BackendConfig;
use url::Url;

/// Characters of a response body kept in log lines.
pub(crate) const PREVIEW_CHARS: usize = 200;

/// Failures of a single backend request.
///
/// A zero-length body is reported as [`RequestError::EmptyBody`]: callers
/// treat it as a failed request, but it stays distinguishable from a
/// transport error.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid backend url {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("failed to build http client: {message}")]
    Client { message: String },
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("failed to read response from {endpoint}: {message}")]
    Body { endpoint: String, message: String },
    #[error("empty response from {endpoint}")]
    EmptyBody { endpoint: String },
}

/// Reusable client for `GET` requests against the backend.
///
/// Every call blocks until the response is read or the per-request timeout
/// elapses; there is no cancellation.
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    pub fn new(config: &BackendConfig) -> Result<Self, RequestError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| RequestError::InvalidUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .connect_timeout(config.request_timeout())
            .timeout(config.request_timeout())
            .user_agent(concat!("tunebridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RequestError::Client {
                message: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    /// Absolute URL for `endpoint` on the backend origin.
    pub fn url_for(&self, endpoint: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| RequestError::InvalidUrl {
                url: endpoint.to_string(),
                message: e.to_string(),
            })
    }

    /// Fetches `endpoint` and returns the body whatever the status code.
    ///
    /// The backend reports errors as JSON bodies (`{"detail": …}`) on non-2xx
    /// responses, so the status is only logged.
    pub fn get(&self, endpoint: &str) -> Result<String, RequestError> {
        let url = self.url_for(endpoint)?;
        let response = self.client.get(url).send().map_err(|e| {
            tracing::warn!(endpoint = %endpoint, error = %e, "backend request failed");
            RequestError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            tracing::warn!(endpoint = %endpoint, %status, error = %e, "failed to read backend response");
            RequestError::Body {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })?;

        tracing::debug!(
            endpoint = %endpoint,
            %status,
            bytes = body.len(),
            preview = %preview(&body, PREVIEW_CHARS),
            "backend response"
        );

        if body.is_empty() {
            tracing::warn!(endpoint = %endpoint, %status, "empty response from backend");
            return Err(RequestError::EmptyBody {
                endpoint: endpoint.to_string(),
            });
        }
        Ok(body)
    }

    /// `GET /` answers with an object carrying a `status` field.
    pub fn is_server_alive(&self) -> bool {
        let alive = self
            .get("/")
            .map(|body| body.contains("\"status\""))
            .unwrap_or(false);
        if alive {
            tracing::debug!("backend is alive");
        } else {
            tracing::debug!("backend not responding");
        }
        alive
    }

    /// `GET /auth_status` reports `authenticated`; any failure reads as `false`.
    pub fn is_authenticated(&self) -> bool {
        match self.get("/auth_status") {
            Ok(body) => {
                let authenticated = extract_bool(&body, "authenticated");
                tracing::info!(authenticated, "backend auth status");
                authenticated
            }
            Err(_) => false,
        }
    }
}

/// First `max_chars` characters of `body`, for diagnostics.
pub(crate) fn preview(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}
