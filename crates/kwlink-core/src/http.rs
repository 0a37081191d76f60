use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport settings shared by the generation and knowledge-base clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u32,
    /// Whole-request timeout in seconds
    pub request_timeout_seconds: u32,
    /// User agent sent with every request (defaults to `kwlink/<version>`)
    pub user_agent: Option<String>,
    /// Proxy for all traffic, e.g. `socks5://127.0.0.1:9050`
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 30,
            request_timeout_seconds: 120,
            user_agent: None,
            proxy: None,
        }
    }
}

impl HttpConfig {
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("kwlink/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Build a pooled client. Each API client owns one of these.
    pub fn build_client(&self) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(self.connect_timeout_seconds)))
            .timeout(Duration::from_secs(u64::from(self.request_timeout_seconds)))
            .user_agent(self.user_agent());

        if let Some(ref proxy_url) = self.proxy {
            builder = builder.proxy(Proxy::all(proxy_url)?);
        }

        builder.build()
    }
}
