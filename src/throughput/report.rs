//! Throughput result formatting.

use serde::Serialize;

use super::iperf::Iperf3Result;

/// Condensed view of one iperf3 client run.
#[derive(Debug, Clone, Serialize)]
pub struct ThroughputSummary {
    pub server: String,
    /// "upload" (client sends) or "download" (`--reverse`).
    pub direction: String,
    pub protocol: String,
    pub throughput_mbps: f64,
    pub sent_mbps: Option<f64>,
    pub retransmits: Option<u64>,
    pub jitter_ms: Option<f64>,
    pub loss_percent: Option<f64>,
    pub streams: u32,
    pub duration_secs: f64,
}

impl ThroughputSummary {
    /// Build a summary from a successful iperf3 result. The headline figure
    /// is the receiver-side rate.
    pub fn from_result(result: &Iperf3Result, server: &str, reverse: bool) -> Self {
        let start = result.test_start();
        let received = result.received();
        let sent = result.sent();

        Self {
            server: server.to_string(),
            direction: if reverse { "download" } else { "upload" }.to_string(),
            protocol: start
                .map(|s| s.protocol.clone())
                .unwrap_or_else(|| "TCP".to_string()),
            throughput_mbps: received
                .map(|s| s.bits_per_second / 1_000_000.0)
                .unwrap_or(0.0),
            sent_mbps: sent.map(|s| s.bits_per_second / 1_000_000.0),
            retransmits: sent.and_then(|s| s.retransmits),
            jitter_ms: received.and_then(|s| s.jitter_ms),
            loss_percent: received.and_then(|s| s.lost_percent),
            streams: start.map(|s| s.num_streams).unwrap_or(1),
            duration_secs: received
                .map(|s| s.seconds)
                .filter(|secs| *secs > 0.0)
                .or_else(|| start.map(|s| s.duration))
                .unwrap_or(0.0),
        }
    }
}

/// Format a throughput summary as a human-readable line.
pub fn format_summary(summary: &ThroughputSummary) -> String {
    let speed = if summary.throughput_mbps >= 1000.0 {
        format!("{:.2} Gbps", summary.throughput_mbps / 1000.0)
    } else {
        format!("{:.1} Mbps", summary.throughput_mbps)
    };

    let mut line = format!(
        "{} {} to {}: {} ({} stream{}, {:.0}s)",
        summary.protocol,
        summary.direction,
        summary.server,
        speed,
        summary.streams,
        if summary.streams == 1 { "" } else { "s" },
        summary.duration_secs,
    );

    if let Some(retransmits) = summary.retransmits {
        line.push_str(&format!(", retransmits: {}", retransmits));
    }
    if let Some(jitter) = summary.jitter_ms {
        line.push_str(&format!(", jitter: {:.2}ms", jitter));
    }
    if let Some(loss) = summary.loss_percent {
        line.push_str(&format!(", loss: {:.2}%", loss));
    }

    line
}
