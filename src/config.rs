//! TOML configuration for linktester.
//!
//! Every section has compiled-in defaults, so an empty file (or no file at
//! all) yields a working configuration. The file path can come from the
//! command line, the `LINKTESTER_CONFIG` environment variable, or the
//! standard system location.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::filter::LevelFilter;

use crate::system::interfaces::InterfaceFilter;

/// Standard system location of the configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/linktester/linktester.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinktesterConfig {
    #[serde(default)]
    pub binaries: BinaryConfig,
    #[serde(default)]
    pub iperf3: Iperf3Config,
    #[serde(default)]
    pub interfaces: InterfaceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LinktesterConfig {
    /// Load and validate configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::load_from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded linktester configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn load_from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration to use.
    ///
    /// An explicit path (command line or `LINKTESTER_CONFIG`) must load; a
    /// broken explicit file is an error rather than a silent fallback. Without
    /// one, `/etc/linktester/linktester.toml` is tried, then the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.iperf3.port != 0, "iperf3.port must be non-zero");
        anyhow::ensure!(
            self.iperf3.duration_sec > 0,
            "iperf3.duration_sec must be at least 1 second"
        );
        for (name, path) in [
            ("ethtool", &self.binaries.ethtool),
            ("iperf3", &self.binaries.iperf3),
            ("ip", &self.binaries.ip),
        ] {
            anyhow::ensure!(!path.trim().is_empty(), "binaries.{} must not be empty", name);
        }
        self.interfaces.filter()?;
        self.logging.validate()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Binaries
// ---------------------------------------------------------------------------

/// External tools driven by linktester. Bare names are resolved via `$PATH`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryConfig {
    pub ethtool: String,
    pub iperf3: String,
    pub ip: String,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            ethtool: "ethtool".to_string(),
            iperf3: "iperf3".to_string(),
            ip: "ip".to_string(),
        }
    }
}

impl BinaryConfig {
    /// All required binaries, in the order they are checked.
    pub fn required(&self) -> [&str; 3] {
        [
            self.ethtool.as_str(),
            self.iperf3.as_str(),
            self.ip.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Iperf3
// ---------------------------------------------------------------------------

/// Defaults for the iperf3 client and server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Iperf3Config {
    pub port: u16,
    /// Client test length in seconds.
    pub duration_sec: u64,
    /// Use sendfile(2) on the client (`--zerocopy`).
    pub zerocopy: bool,
    /// Address the local server binds to.
    pub server_bind_address: String,
}

impl Default for Iperf3Config {
    fn default() -> Self {
        Self {
            port: crate::throughput::DEFAULT_IPERF_PORT,
            duration_sec: crate::throughput::DEFAULT_DURATION_SECS,
            zerocopy: true,
            server_bind_address: crate::throughput::LOCALHOST.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Interface discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// Regular expressions; interfaces whose name matches any are skipped.
    pub exclude_patterns: Vec<String>,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: InterfaceFilter::DEFAULT_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl InterfaceConfig {
    /// Compile the exclusion patterns.
    pub fn filter(&self) -> crate::error::Result<InterfaceFilter> {
        InterfaceFilter::new(self.exclude_patterns.as_slice())
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl LoggingConfig {
    /// A bare word must be a level name; `target=level` directives go through
    /// `EnvFilter` parsing.
    fn validate(&self) -> Result<()> {
        let level = self.level.trim();
        if level.contains(['=', ',']) {
            tracing_subscriber::EnvFilter::try_new(level)
                .with_context(|| format!("invalid logging.level: {:?}", self.level))?;
        } else {
            level
                .parse::<LevelFilter>()
                .with_context(|| format!("invalid logging.level: {:?}", self.level))?;
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
