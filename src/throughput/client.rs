//! iperf3 client wrapper.

use std::fmt;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::iperf::{self, Iperf3Result};
use super::{DEFAULT_DURATION_SECS, DEFAULT_IPERF_PORT, LOCALHOST};
use crate::error::{LinkTestError, Result};

/// Parameters for one `iperf3 --client` run.
#[derive(Debug, Clone)]
pub struct Client {
    /// Path (or bare command name resolved via `$PATH`) to the iperf3 binary.
    pub iperf3_path: String,
    pub server_hostname: String,
    pub port: u16,
    pub duration_secs: u64,
    /// Local address to bind instead of letting the kernel choose.
    pub bind_address: Option<String>,
    pub verbose: bool,
    /// Server sends, client receives (`--reverse`).
    pub reverse: bool,
    pub zerocopy: bool,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            iperf3_path: "iperf3".to_string(),
            server_hostname: LOCALHOST.to_string(),
            port: DEFAULT_IPERF_PORT,
            duration_secs: DEFAULT_DURATION_SECS,
            bind_address: None,
            verbose: false,
            reverse: false,
            zerocopy: true,
        }
    }
}

impl Client {
    pub fn new(iperf3_path: impl Into<String>, server_hostname: impl Into<String>) -> Self {
        Self {
            iperf3_path: iperf3_path.into(),
            server_hostname: server_hostname.into(),
            ..Self::default()
        }
    }

    /// Command line arguments passed to iperf3.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--client".to_string(),
            self.server_hostname.clone(),
            "--port".to_string(),
            self.port.to_string(),
            "--time".to_string(),
            self.duration_secs.to_string(),
            "--json".to_string(),
        ];
        if let Some(bind) = &self.bind_address {
            args.push("--bind".to_string());
            args.push(bind.clone());
        }
        if self.zerocopy {
            args.push("--zerocopy".to_string());
        }
        if self.reverse {
            args.push("--reverse".to_string());
        }
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }

    /// Run the test and return iperf3's result.
    ///
    /// An `error` reported by iperf3 becomes [`LinkTestError::Link`]; a
    /// non-zero exit without a decodable result is a command failure.
    pub async fn start(&self) -> Result<Iperf3Result> {
        super::validate_target(&self.server_hostname)?;
        if let Some(bind) = &self.bind_address {
            super::validate_target(bind)?;
        }

        let args = self.args();
        let command = format!("{} {}", self.iperf3_path, args.join(" "));
        info!(
            server = %self.server_hostname,
            port = self.port,
            duration_secs = self.duration_secs,
            reverse = self.reverse,
            "starting iperf3 client"
        );

        let output = Command::new(&self.iperf3_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| LinkTestError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let result = self.evaluate(&command, &stdout, &stderr, output.status.code())?;

        if self.verbose {
            info!(raw = %result.raw, "iperf3 result");
        }
        Ok(result)
    }

    /// Interpret the output of a finished iperf3 client process.
    fn evaluate(
        &self,
        command: &str,
        stdout: &str,
        stderr: &str,
        code: Option<i32>,
    ) -> Result<Iperf3Result> {
        let success = code == Some(0);
        let parsed = iperf::parse_output(stdout);

        if let Ok(result) = &parsed {
            if let Some(error) = &result.error {
                warn!(server = %self.server_hostname, port = self.port, %error, "iperf3 reported an error");
                return Err(LinkTestError::Link {
                    server_hostname: self.server_hostname.clone(),
                    port: self.port,
                    bind_address: self.bind_address.clone().unwrap_or_else(|| "none".to_string()),
                    message: error.clone(),
                });
            }
        }

        if !success {
            let stderr = stderr.trim();
            return Err(LinkTestError::CommandFailed {
                command: command.to_string(),
                code,
                output: if stderr.is_empty() {
                    stdout.trim().to_string()
                } else {
                    stderr.to_string()
                },
            });
        }

        let result = parsed?;
        debug!(
            received_bps = result.received().map(|s| s.bits_per_second),
            "iperf3 client finished"
        );
        Ok(result)
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Client: server_hostname={}, port={}, duration={}",
            self.server_hostname, self.port, self.duration_secs
        )
    }
}
