//! Client configuration

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Identity service client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the identity service and protected API
    pub base_url: String,
    /// Request timeout in seconds (0 = none; ignored on wasm)
    pub timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Auth endpoint paths
    pub endpoints: EndpointConfig,
}

/// Paths of the identity service operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub login: String,
    pub register: String,
    pub refresh: String,
    pub logout: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8443".to_string(),
            timeout_secs: 30,
            user_agent: format!("keystone-client/{}", env!("CARGO_PKG_VERSION")),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            login: "/api/auth/login".to_string(),
            register: "/api/auth/register".to_string(),
            refresh: "/api/auth/refresh".to_string(),
            logout: "/api/auth/logout".to_string(),
        }
    }
}

impl ClientConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL doesn't parse as an http(s) URL or an
    /// endpoint path is not absolute
    pub fn validate(&self) -> CoreResult<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| CoreError::invalid_config(format!("base_url: invalid URL - {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::invalid_config(format!(
                "base_url: unsupported scheme '{}'",
                url.scheme()
            )));
        }

        for (field, path) in [
            ("endpoints.login", &self.endpoints.login),
            ("endpoints.register", &self.endpoints.register),
            ("endpoints.refresh", &self.endpoints.refresh),
            ("endpoints.logout", &self.endpoints.logout),
        ] {
            if !path.starts_with('/') {
                return Err(CoreError::invalid_config(format!(
                    "{field}: path must start with '/'"
                )));
            }
        }

        Ok(())
    }
}
