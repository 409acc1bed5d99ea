//! One complete link test: counters before, iperf3 run, counters after.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::stats::{Comparison, CounterComparator, CounterSnapshot, EthtoolCapture};
use crate::throughput::{Client, ThroughputSummary};

/// Outcome of a link test.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub interface: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub throughput: ThroughputSummary,
    pub before: CounterSnapshot,
    pub after: CounterSnapshot,
    /// Counters that moved during the test; empty on a healthy link.
    pub changed_counters: Comparison,
}

impl LinkReport {
    pub fn is_clean(&self) -> bool {
        self.changed_counters.is_clean()
    }
}

/// Runs an iperf3 client while watching the error counters of `interface`.
pub struct LinkTest {
    capture: EthtoolCapture,
    client: Client,
}

impl LinkTest {
    pub fn new(ethtool_path: &str, interface: &str, client: Client) -> Self {
        Self {
            capture: EthtoolCapture::new(ethtool_path, interface),
            client,
        }
    }

    pub async fn run(&self) -> Result<LinkReport> {
        let started_at = Utc::now();
        let interface = self.capture.interface().to_string();
        info!(%interface, client = %self.client, "starting link test");

        let comparator = CounterComparator::new(self.capture.capture().await?);
        let result = self.client.start().await?;
        let after = self.capture.capture().await?;
        let changed_counters = comparator.compare(&after)?;

        let throughput = ThroughputSummary::from_result(
            &result,
            &self.client.server_hostname,
            self.client.reverse,
        );

        if changed_counters.is_clean() {
            info!(%interface, mbps = throughput.throughput_mbps, "link test clean");
        } else {
            warn!(%interface, counters = %changed_counters, "error counters increased during link test");
        }

        Ok(LinkReport {
            interface,
            started_at,
            finished_at: Utc::now(),
            throughput,
            before: comparator.reference().clone(),
            after,
            changed_counters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use crate::error::LinkTestError;
    use crate::stats::{compare, parse_statistics, CounterKey};

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// An ethtool that reports `tx_errors: 0` first and `tx_errors: 3` after.
    fn flaky_ethtool(dir: &Path) -> PathBuf {
        let marker = dir.join("captured");
        write_script(
            dir,
            "ethtool",
            &format!(
                "if [ -f {m} ]; then tx=3; else tx=0; touch {m}; fi\n\
                 printf 'NIC statistics:\\n     tx_errors: %s\\n     rx_crc: 1\\n' \"$tx\"",
                m = marker.display()
            ),
        )
    }

    fn iperf3_from_fixture(dir: &Path) -> PathBuf {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/iperf3/1g-tcp.json");
        write_script(dir, "iperf3", &format!("cat {}", fixture.display()))
    }

    #[tokio::test]
    async fn test_run_reports_counters_that_moved() {
        let dir = tempfile::TempDir::new().unwrap();
        let ethtool = flaky_ethtool(dir.path());
        let iperf3 = iperf3_from_fixture(dir.path());

        let client = Client::new(iperf3.to_str().unwrap(), "127.0.0.1");
        let report = LinkTest::new(ethtool.to_str().unwrap(), "eno1", client)
            .run()
            .await
            .unwrap();

        assert_eq!(report.interface, "eno1");
        assert_eq!(report.before.get(CounterKey::TxErrors), Some(0));
        assert_eq!(report.after.get(CounterKey::TxErrors), Some(3));
        assert_eq!(report.changed_counters.len(), 1);
        assert_eq!(report.changed_counters.get(CounterKey::TxErrors), Some(3));
        assert!(!report.is_clean());
        assert!((report.throughput.throughput_mbps - 939.3).abs() < 0.1);
        assert_eq!(report.throughput.direction, "upload");
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_run_clean_when_counters_hold() {
        let dir = tempfile::TempDir::new().unwrap();
        let ethtool = write_script(
            dir.path(),
            "ethtool",
            "printf 'NIC statistics:\\n     tx_errors: 5\\n     rx_dropped: 2\\n'",
        );
        let iperf3 = iperf3_from_fixture(dir.path());

        let client = Client {
            reverse: true,
            ..Client::new(iperf3.to_str().unwrap(), "127.0.0.1")
        };
        let report = LinkTest::new(ethtool.to_str().unwrap(), "eno1", client)
            .run()
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.before.len(), 2);
        assert_eq!(report.throughput.direction, "download");
    }

    #[tokio::test]
    async fn test_capture_failure_aborts_before_iperf3() {
        // ethtool fails, so the client (pointing at a missing binary) never runs
        let client = Client::new("/nonexistent/iperf3", "127.0.0.1");
        let test = LinkTest::new("false", "eth0", client);
        assert!(matches!(
            test.run().await,
            Err(LinkTestError::CommandFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_client_failure_propagates() {
        // `echo` acts as an ethtool with no interesting counters
        let client = Client::new("/nonexistent/iperf3", "127.0.0.1");
        let test = LinkTest::new("echo", "eth0", client);
        assert!(matches!(test.run().await, Err(LinkTestError::Spawn { .. })));
    }

    #[test]
    fn test_report_verdict() {
        let before = parse_statistics("tx_errors: 0\nrx_crc: 1").unwrap();
        let after = parse_statistics("tx_errors: 3\nrx_crc: 1").unwrap();
        let changed = compare(&before, &after).unwrap();
        let report = LinkReport {
            interface: "eno1".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            throughput: ThroughputSummary::from_result(&Default::default(), "127.0.0.1", false),
            before,
            after,
            changed_counters: changed,
        };
        assert!(!report.is_clean());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["changed_counters"]["tx_errors"], 3);
        assert_eq!(json["interface"], "eno1");
    }
}
