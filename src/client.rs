use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::DeviceConfig;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(reqwest::Error),
    #[error("device returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid JSON body: {0}")]
    Json(reqwest::Error),
}

/// Transport seam between the resolver and the device.
///
/// The resolver only ever needs "GET a path with a query and hand back the
/// parsed JSON, or fail"; keeping that behind a trait lets the fallback
/// protocol be exercised without a device on the network.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ClientError>;
}

/// HTTP client for one Shelly device.
///
/// Holds only read-only configuration (base URL, credentials, a pooled
/// reqwest client), so it is safe to share across concurrent scrape cycles.
pub struct ShellyClient {
    base: String,
    username: Option<String>,
    password: Option<String>,
    http: reqwest::Client,
}

impl ShellyClient {
    pub fn new(cfg: &DeviceConfig) -> Result<Self, ClientError> {
        let mut base = format!("{}://{}", cfg.scheme.as_str(), cfg.host);
        if let Some(port) = cfg.port {
            base = format!("{base}:{port}");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            base,
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            http,
        })
    }
}

#[async_trait]
impl DeviceApi for ShellyClient {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base, path);
        tracing::debug!(%url, "requesting device endpoint");

        let mut req = self.http.get(&url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            req = req.basic_auth(user, Some(pass));
        }

        // A timed-out call surfaces as ClientError::Http, which the
        // resolver treats identically to any other transport failure.
        let resp = req.send().await.map_err(ClientError::Http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        resp.json::<Value>().await.map_err(ClientError::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scheme;

    fn device(host: &str, scheme: Scheme, port: Option<u16>) -> DeviceConfig {
        DeviceConfig {
            host: host.to_string(),
            scheme,
            port,
            timeout_secs: 5,
            username: None,
            password: None,
        }
    }

    #[test]
    fn base_url_omits_port_when_unset() {
        let client = ShellyClient::new(&device("meter.local", Scheme::Http, None)).unwrap();
        assert_eq!(client.base, "http://meter.local");
    }

    #[test]
    fn base_url_includes_scheme_and_port() {
        let client = ShellyClient::new(&device("10.0.0.7", Scheme::Https, Some(8443))).unwrap();
        assert_eq!(client.base, "https://10.0.0.7:8443");
    }
}
