use std::{env, fs, path::Path};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => anyhow::bail!("unsupported scheme {other:?}, expected http or https"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub host: String,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl AppConfig {
    /// Load configuration from the TOML file named by
    /// `SHELLY_EXPORTER_CONFIG` (default `shelly-exporter.toml`). When no
    /// such file exists, fall back to flat environment variables
    /// (`SHELLY_HOST`, `SHELLY_PROTOCOL`, ...), which suits container
    /// deployments without a mounted config.
    pub fn load() -> anyhow::Result<Self> {
        let path =
            env::var("SHELLY_EXPORTER_CONFIG").unwrap_or_else(|_| "shelly-exporter.toml".to_string());

        if Path::new(&path).exists() {
            let contents = fs::read_to_string(&path)?;
            let cfg: AppConfig = toml::from_str(&contents)?;
            Ok(cfg)
        } else {
            Self::from_env()
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let host = nonempty_var("SHELLY_HOST")
            .ok_or_else(|| anyhow::anyhow!("SHELLY_HOST is required when no config file is present"))?;

        let scheme = match nonempty_var("SHELLY_PROTOCOL") {
            Some(s) => Scheme::parse(&s)?,
            None => Scheme::default(),
        };

        let port = match nonempty_var("SHELLY_PORT") {
            Some(p) => Some(
                p.parse::<u16>()
                    .map_err(|e| anyhow::anyhow!("SHELLY_PORT must be a port number: {e}"))?,
            ),
            None => None,
        };

        let timeout_secs = match nonempty_var("SHELLY_TIMEOUT") {
            Some(t) => t
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("SHELLY_TIMEOUT must be an integer: {e}"))?,
            None => default_timeout_secs(),
        };

        let listen_address =
            nonempty_var("LISTEN_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string());
        let listen_port = match nonempty_var("LISTEN_PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("LISTEN_PORT must be a port number: {e}"))?,
            None => 8000,
        };

        Ok(Self {
            device: DeviceConfig {
                host,
                scheme,
                port,
                timeout_secs,
                username: nonempty_var("SHELLY_USERNAME"),
                password: nonempty_var("SHELLY_PASSWORD"),
            },
            server: ServerConfig {
                bind_addr: format!("{listen_address}:{listen_port}"),
            },
        })
    }
}

fn nonempty_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}
