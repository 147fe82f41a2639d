use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.ai3d.cloud.tencent.com/v1/ai3d";
pub const DEFAULT_PROXY_URL: &str = "https://corsproxy.io/?";

const BEARER_PREFIX: &str = "Bearer ";

/// Connection settings for the remote generation API.
///
/// Passed to the adapter on every call so settings can change between calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub use_proxy: bool,
    pub proxy_url: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("use_proxy", &self.use_proxy)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
            use_proxy: false,
            proxy_url: DEFAULT_PROXY_URL.into(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = use_proxy;
        self
    }

    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = proxy_url.into();
        self
    }

    /// Same settings with the routing mode flipped (direct <-> relay).
    pub fn with_proxy_toggled(&self) -> Self {
        let mut cfg = self.clone();
        cfg.use_proxy = !cfg.use_proxy;
        cfg
    }

    /// `Authorization` header value. Keys pasted with their `Bearer ` prefix are
    /// used as-is.
    pub fn authorization_header(&self) -> String {
        let key = self.api_key.trim();
        if key.starts_with(BEARER_PREFIX) {
            key.to_string()
        } else {
            format!("{BEARER_PREFIX}{key}")
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn mode_label(&self) -> &'static str {
        if self.use_proxy { "proxy" } else { "direct" }
    }
}
