use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

/// Runtime configuration for the data layer resolved from file and env.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the hosted store, e.g. `https://abc.example.co`.
    pub base_url: Url,
    /// Anonymous API key sent with every request.
    pub anon_key: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Whether verbose logging is enabled.
    pub logging_enabled: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    remote: Option<FileRemote>,
    #[serde(default)]
    http: FileHttp,
    #[serde(default)]
    logging: FileLogging,
}

#[derive(Deserialize)]
struct FileRemote {
    url: String,
    anon_key: String,
}

#[derive(Deserialize)]
struct FileHttp {
    #[serde(default = "default_timeout")]
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct FileLogging {
    #[serde(default = "default_logging")]
    enabled: bool,
}

fn default_timeout() -> u64 {
    10
}

fn default_logging() -> bool {
    true
}

impl Default for FileHttp {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for FileLogging {
    fn default() -> Self {
        Self {
            enabled: default_logging(),
        }
    }
}

impl Config {
    /// Build a configuration directly from an endpoint and key.
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        if anon_key.is_empty() {
            anyhow::bail!("missing_anon_key");
        }
        Ok(Self {
            base_url,
            anon_key: anon_key.to_string(),
            request_timeout_secs: default_timeout(),
            logging_enabled: default_logging(),
        })
    }

    /// Resolve configuration from config file and environment variables.
    /// Precedence: environment over file over defaults.
    pub fn load() -> Result<Self> {
        let mut url: Option<String> = None;
        let mut anon_key: Option<String> = None;
        let mut timeout = default_timeout();
        let mut logging = default_logging();

        // config file path precedence: ENV -> default
        let config_path = std::env::var("LDHINGRAM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/ldhingram.toml"));

        if let Ok(bytes) = fs::read(&config_path) {
            let contents = String::from_utf8_lossy(&bytes);
            let file_cfg: FileConfig = toml::from_str(&contents).context("invalid config file")?;
            if let Some(remote) = file_cfg.remote {
                url = Some(remote.url);
                anon_key = Some(remote.anon_key);
            }
            timeout = file_cfg.http.timeout_secs;
            logging = file_cfg.logging.enabled;
        }

        // environment overrides
        if let Ok(u) = std::env::var("LDHINGRAM_URL") {
            url = Some(u);
        }
        if let Ok(k) = std::env::var("LDHINGRAM_ANON_KEY") {
            anon_key = Some(k);
        }
        if let Ok(l) = std::env::var("LDHINGRAM_LOGGING") {
            if let Ok(l) = l.parse::<bool>() {
                logging = l;
            }
        }

        let url = url.ok_or_else(|| anyhow::anyhow!("missing_remote_endpoint"))?;
        let anon_key = anon_key.ok_or_else(|| anyhow::anyhow!("missing_anon_key"))?;
        let base_url = parse_base_url(&url)?;
        if anon_key.is_empty() {
            anyhow::bail!("missing_anon_key");
        }

        Ok(Self {
            base_url,
            anon_key,
            request_timeout_secs: timeout,
            logging_enabled: logging,
        })
    }

    /// REST root, without a trailing slash.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Websocket endpoint for the realtime change feed.
    pub fn realtime_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws}/realtime/v1?apikey={}", self.anon_key)
    }
}

fn parse_base_url(input: &str) -> Result<Url> {
    let url = Url::parse(input).context("invalid_remote_endpoint")?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("invalid_remote_endpoint");
    }
    Ok(url)
}
