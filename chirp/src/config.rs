use std::time::Duration;

use crate::error::{ChirpError, Result};

/// Default API base URL (the web app proxies `/api` to the backend).
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Configuration for the chirp client.
#[derive(Debug, Clone)]
pub struct ChirpConfig {
    /// Base URL for the REST API (e.g. `https://chirp.example/api`).
    pub api_url: String,
    /// Page size requested by feed and reply lists.
    pub page_size: u32,
    /// Page size requested by the notifications list.
    pub notifications_page_size: u32,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Fetch-ahead distance for infinite scroll sentinels.
    pub scroll_root_margin: u32,
    /// How long scroll restoration keeps re-applying the saved offset.
    pub restore_deadline: Duration,
    /// Interval between scroll restoration attempts.
    pub restore_interval: Duration,
    /// Login identifier (username or email), if the client should sign in.
    pub identifier: Option<String>,
    /// Password paired with `identifier`.
    pub password: Option<String>,
}

impl Default for ChirpConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: 10,
            notifications_page_size: 15,
            request_timeout: Duration::from_secs(15),
            scroll_root_margin: 200,
            restore_deadline: Duration::from_millis(3000),
            restore_interval: Duration::from_millis(60),
            identifier: None,
            password: None,
        }
    }
}

impl ChirpConfig {
    /// Build a config from `CHIRP_*` environment variables on top of the
    /// defaults. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("CHIRP_API_URL") {
            config.api_url = url;
        }
        if let Ok(size) = std::env::var("CHIRP_PAGE_SIZE") {
            config.page_size = size
                .parse()
                .map_err(|_| ChirpError::Config(format!("CHIRP_PAGE_SIZE is not a number: {size}")))?;
        }
        if let Ok(secs) = std::env::var("CHIRP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ChirpError::Config(format!("CHIRP_TIMEOUT_SECS is not a number: {secs}")))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        config.identifier = std::env::var("CHIRP_IDENTIFIER").ok();
        config.password = std::env::var("CHIRP_PASSWORD").ok();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(ChirpError::Config("page size must be positive".into()));
        }
        url::Url::parse(&self.api_url)?;
        if self.identifier.is_some() != self.password.is_some() {
            return Err(ChirpError::Config(
                "CHIRP_IDENTIFIER and CHIRP_PASSWORD must be set together".into(),
            ));
        }
        Ok(())
    }

    /// Credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.identifier, &self.password) {
            (Some(id), Some(pw)) => Some((id.as_str(), pw.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChirpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 10);
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_half_credentials_rejected() {
        let config = ChirpConfig {
            identifier: Some("ada".into()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ChirpError::Config(_))));
    }

    #[test]
    fn test_bad_url_rejected() {
        let config = ChirpConfig {
            api_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ChirpError::Url(_))));
    }
}
