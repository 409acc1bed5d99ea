//! iperf3 `--json` output decoding.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Parsed iperf3 JSON result (subset of fields we care about).
///
/// iperf3 still emits a JSON document when a test fails; it then carries a
/// top-level `error` string and mostly empty `start`/`end` sections, so every
/// section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Iperf3Result {
    #[serde(default)]
    pub start: Option<Iperf3Start>,
    #[serde(default)]
    pub end: Option<Iperf3End>,
    #[serde(default)]
    pub error: Option<String>,
    /// The complete document as emitted by iperf3.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iperf3Start {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub test_start: Option<Iperf3TestStart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iperf3TestStart {
    pub protocol: String,
    pub num_streams: u32,
    pub duration: f64,
    #[serde(default)]
    pub reverse: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iperf3End {
    #[serde(default)]
    pub sum_sent: Option<Iperf3Sum>,
    #[serde(default)]
    pub sum_received: Option<Iperf3Sum>,
    /// UDP tests on older iperf3 versions only report a combined sum.
    #[serde(default)]
    pub sum: Option<Iperf3Sum>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iperf3Sum {
    pub bits_per_second: f64,
    pub bytes: u64,
    #[serde(default)]
    pub seconds: f64,
    #[serde(default)]
    pub retransmits: Option<u64>,
    #[serde(default)]
    pub jitter_ms: Option<f64>,
    #[serde(default)]
    pub lost_percent: Option<f64>,
}

impl Iperf3Result {
    pub fn test_start(&self) -> Option<&Iperf3TestStart> {
        self.start.as_ref().and_then(|s| s.test_start.as_ref())
    }

    pub fn sent(&self) -> Option<&Iperf3Sum> {
        self.end
            .as_ref()
            .and_then(|e| e.sum_sent.as_ref().or(e.sum.as_ref()))
    }

    pub fn received(&self) -> Option<&Iperf3Sum> {
        self.end
            .as_ref()
            .and_then(|e| e.sum_received.as_ref().or(e.sum.as_ref()))
    }
}

/// Parse an iperf3 JSON output string into a structured result.
pub fn parse_output(json_str: &str) -> Result<Iperf3Result> {
    let raw: serde_json::Value = serde_json::from_str(json_str)?;
    let mut result = Iperf3Result::deserialize(&raw)?;
    result.raw = raw;
    Ok(result)
}
