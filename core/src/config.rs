//! Base URL resolution.

/// Host used when no override is configured.
pub const DEFAULT_API_BASE: &str = "https://api.quantara.co";

/// Version segment appended to every base URL.
pub const API_VERSION_PATH: &str = "/api/v1";

/// Environment variables checked, in order, for a host override.
pub const API_URL_VARS: [&str; 2] = ["PETPULSE_API_URL", "PETPULSE_API_BASE_URL"];

/// Client configuration, resolved once when the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
}

impl ClientConfig {
    /// Configure against `host` (scheme and authority, optionally a path
    /// prefix). One trailing slash is dropped and `/api/v1` appended.
    pub fn new(host: &str) -> Self {
        let host = host.strip_suffix('/').unwrap_or(host);
        Self {
            base_url: format!("{host}{API_VERSION_PATH}"),
        }
    }

    /// Resolve the host from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the host through `lookup`, falling back to
    /// [`DEFAULT_API_BASE`]. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = API_URL_VARS
            .iter()
            .filter_map(|name| lookup(*name))
            .find(|value| !value.trim().is_empty());
        match host {
            Some(host) => Self::new(host.trim()),
            None => Self::new(DEFAULT_API_BASE),
        }
    }

    /// Versioned base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}
