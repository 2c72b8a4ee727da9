//! Configuration loading for gatehouse-ac
//!
//! A single TOML file describes the store endpoint, the pipeline
//! parameters, the HTTP status surface, and the reader channels. Every
//! pipeline parameter has a default matching the deployed hardware, so a
//! minimal config only lists the store URL and the channels.
//!
//! ```toml
//! [store]
//! base_url = "https://gatehouse-demo.firebaseio.com"
//! auth_token = "secret"
//!
//! [[channels]]
//! name = "Vehicle Entry"
//! kind = "entry"
//! endpoint = "tcp://10.0.8.21:4001"
//!
//! [[channels]]
//! name = "Assign"
//! kind = "enroll"
//! endpoint = "/dev/ttyUSB0"
//! ```

use crate::channel::transport::Endpoint;
use crate::error::{Error, Result};
use gatehouse_common::ChannelKind;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default cooldown window between two dispatched resolutions of the
/// same tag on one channel (3 minutes)
const DEFAULT_COOLDOWN_MS: u64 = 180_000;
/// Default store retry budget (retries after the initial attempt)
const DEFAULT_STORE_RETRIES: u32 = 3;
/// Largest store retry budget accepted by validation; retries are
/// immediate with no backoff
const MAX_STORE_RETRIES: u32 = 100;
/// Default total attempts for writing a response line
const DEFAULT_RESPOND_ATTEMPTS: u32 = 3;
/// Default liveness pulse interval (5 minutes)
const DEFAULT_HEARTBEAT_MS: u64 = 300_000;
/// Default store request timeout
const DEFAULT_STORE_TIMEOUT_MS: u64 = 10_000;
/// Default status API port
const DEFAULT_API_PORT: u16 = 5750;

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Document store connection
    pub store: StoreConfig,

    /// Decision pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Status API listener
    #[serde(default)]
    pub api: ApiConfig,

    /// Reader channels, one per physical endpoint
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

/// Which document store implementation backs the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// RTDB-style HTTP document service (production)
    #[default]
    Http,
    /// In-process store (development and tests)
    Memory,
}

/// Document store connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store implementation selector
    #[serde(default)]
    pub backend: StoreBackend,

    /// Base URL of the document service, e.g.
    /// `https://gatehouse-demo.firebaseio.com`
    #[serde(default)]
    pub base_url: String,

    /// Optional auth token appended to every request
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

/// Decision pipeline tuning knobs
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Cooldown window in milliseconds (per channel, per tag)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Store retries after the initial attempt; a resolution makes at
    /// most `store_retries + 1` attempts
    #[serde(default = "default_store_retries")]
    pub store_retries: u32,

    /// Total attempts for writing one response line to a reader
    #[serde(default = "default_respond_attempts")]
    pub respond_attempts: u32,

    /// Liveness pulse interval in milliseconds
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

/// Status API listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// TCP port for the HTTP status surface
    #[serde(default = "default_api_port")]
    pub port: u16,
}

/// One reader channel
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Display name, e.g. "Vehicle Entry"; also the key in /status
    pub name: String,

    /// Pipeline selector: entry / exit run the decision pipeline,
    /// enroll runs the badge-enrollment pipeline
    pub kind: ChannelKind,

    /// Transport endpoint: `tcp://host:port` or a device path
    pub endpoint: Endpoint,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            store_retries: DEFAULT_STORE_RETRIES,
            respond_attempts: DEFAULT_RESPOND_ATTEMPTS,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_API_PORT,
        }
    }
}

impl PipelineConfig {
    /// Cooldown window as a Duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Heartbeat interval as a Duration
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}

impl StoreConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {} failed: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("parse {} failed: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(Error::Config(
                "at least one [[channels]] entry is required".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for channel in &self.channels {
            if channel.name.trim().is_empty() {
                return Err(Error::Config("channel name must not be empty".to_string()));
            }
            if !names.insert(channel.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate channel name: {}",
                    channel.name
                )));
            }
        }

        if self.store.backend == StoreBackend::Http && self.store.base_url.trim().is_empty() {
            return Err(Error::Config(
                "store.base_url is required for the http backend".to_string(),
            ));
        }

        if self.pipeline.respond_attempts == 0 {
            return Err(Error::Config(
                "pipeline.respond_attempts must be at least 1".to_string(),
            ));
        }

        if self.pipeline.store_retries > MAX_STORE_RETRIES {
            return Err(Error::Config(format!(
                "pipeline.store_retries must be at most {}",
                MAX_STORE_RETRIES
            )));
        }

        // A zero interval panics the pulse timer
        if self.pipeline.heartbeat_ms == 0 {
            return Err(Error::Config(
                "pipeline.heartbeat_ms must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

fn default_store_retries() -> u32 {
    DEFAULT_STORE_RETRIES
}

fn default_respond_attempts() -> u32 {
    DEFAULT_RESPOND_ATTEMPTS
}

fn default_heartbeat_ms() -> u64 {
    DEFAULT_HEARTBEAT_MS
}

fn default_store_timeout_ms() -> u64 {
    DEFAULT_STORE_TIMEOUT_MS
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}
