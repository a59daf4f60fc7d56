pub mod endpoints;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ChirpConfig;
use crate::error::{ApiError, ChirpError, Result};

/// Auth routes never trigger the refresh-and-retry path.
const AUTH_PREFIX: &str = "/auth/";

/// HTTP client wrapper for the chirp REST API.
///
/// Session tokens live in cookies; the client keeps a cookie store so a
/// successful `login` authenticates every later call.
#[derive(Debug, Clone)]
pub struct ChirpHttpClient {
    client: Client,
    base_url: String,
    refresh: Arc<RefreshGate>,
}

/// Serializes token refreshes so a burst of 401s triggers one refresh.
#[derive(Debug, Default)]
struct RefreshGate {
    lock: Mutex<()>,
    /// Bumped after every successful refresh.
    epoch: AtomicU64,
}

impl ChirpHttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(&ChirpConfig {
            api_url: base_url.to_string(),
            ..Default::default()
        })
    }

    pub fn with_config(config: &ChirpConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            refresh: Arc::new(RefreshGate::default()),
        })
    }

    /// GET a JSON resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let data = self.execute(Method::GET, path, query, None).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Send a JSON body (or none) and decode the JSON response.
    pub async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let body = body.map(serde_json::to_value).transpose()?;
        let data = self.execute(method, path, &[], body.as_ref()).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Send a request whose response body is irrelevant.
    pub async fn send_unit(&self, method: Method, path: &str) -> Result<()> {
        self.execute(method, path, &[], None).await.map(|_| ())
    }

    /// Issue the request, refreshing the session once on 401.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let epoch = self.refresh.epoch.load(Ordering::Acquire);
        let mut resp = self.send_once(method.clone(), path, query, body).await?;

        if resp.status().as_u16() == 401 && !path.starts_with(AUTH_PREFIX) {
            debug!(path, "session rejected, refreshing tokens");
            self.refresh_tokens(epoch).await?;
            resp = self.send_once(method, path, query, body).await?;
        }

        read_response(resp).await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        Ok(req.send().await?)
    }

    /// POST `/auth/refresh`, unless another caller refreshed since `seen_epoch`.
    async fn refresh_tokens(&self, seen_epoch: u64) -> Result<()> {
        let _guard = self.refresh.lock.lock().await;
        if self.refresh.epoch.load(Ordering::Acquire) != seen_epoch {
            return Ok(());
        }

        let resp = self
            .send_once(Method::POST, "/auth/refresh", &[], None)
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            warn!(status, "token refresh failed");
            return Err(ApiError::new(status, Value::Null).into());
        }
        self.refresh.epoch.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Decode a body that may be empty, JSON, or plain text.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

async fn read_response(resp: Response) -> Result<Value> {
    let status = resp.status();
    let text = resp.text().await.map_err(ChirpError::Request)?;
    let data = parse_body(&text);
    if !status.is_success() {
        return Err(ApiError::new(status.as_u16(), data).into());
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_variants() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"ok\":true}"), serde_json::json!({ "ok": true }));
        assert_eq!(parse_body("Bad Gateway"), Value::String("Bad Gateway".into()));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ChirpHttpClient::new("http://localhost:3000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
    }
}
