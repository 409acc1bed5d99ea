//! Error types shared by the capture, comparison and link test layers.

use thiserror::Error;

use crate::stats::CounterKey;

pub type Result<T> = std::result::Result<T, LinkTestError>;

#[derive(Debug, Error)]
pub enum LinkTestError {
    #[error("missing the following required binary: {binary}")]
    BrokenEnvironment { binary: String },

    #[error("no usable network interface found (all interfaces filtered or none configured)")]
    NoInterface,

    #[error("failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with code {code:?}: {output}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("invalid value for counter {key}: '{value}'")]
    InvalidCounter { key: CounterKey, value: String },

    #[error("the following key is missing from the second run results: {key}. First run: {key}={value}")]
    MissingKey { key: CounterKey, value: u64 },

    #[error("{server_hostname}:{port}, bind_address (override): {bind_address}, {message}")]
    Link {
        server_hostname: String,
        port: u16,
        bind_address: String,
        message: String,
    },

    #[error("invalid iperf3 target '{target}'")]
    InvalidTarget { target: String },

    #[error("failed to decode iperf3 output: {0}")]
    Iperf3Output(#[from] serde_json::Error),

    #[error("invalid interface pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl LinkTestError {
    /// True for errors that mean the host cannot run a link test at all.
    pub fn is_environment(&self) -> bool {
        matches!(self, Self::BrokenEnvironment { .. } | Self::NoInterface)
    }
}
