//! iperf3 server wrapper, mostly for testing against localhost.
//!
//! Each run is `iperf3 --server --one-off`: the server exits after serving a
//! single test. With `forever` set a fresh one-off server is started after
//! every test.

use std::fmt;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::{DEFAULT_IPERF_PORT, LOCALHOST};
use crate::error::{LinkTestError, Result};

#[derive(Debug, Clone)]
pub struct Server {
    /// Path (or bare command name resolved via `$PATH`) to the iperf3 binary.
    pub iperf3_path: String,
    pub bind_address: String,
    pub port: u16,
    pub verbose: bool,
    /// Keep accepting test runs instead of exiting after the first one.
    pub forever: bool,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            iperf3_path: "iperf3".to_string(),
            bind_address: LOCALHOST.to_string(),
            port: DEFAULT_IPERF_PORT,
            verbose: false,
            forever: false,
        }
    }
}

impl Server {
    pub fn new(iperf3_path: impl Into<String>) -> Self {
        Self {
            iperf3_path: iperf3_path.into(),
            ..Self::default()
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--server".to_string(),
            "--one-off".to_string(),
            "--bind".to_string(),
            self.bind_address.clone(),
            "--port".to_string(),
            self.port.to_string(),
        ];
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }

    /// Serve test runs. Returns the number of completed runs.
    ///
    /// A failing run stops the loop, even in `forever` mode.
    pub async fn start(&self) -> Result<u64> {
        super::validate_target(&self.bind_address)?;
        info!(server = %self, "starting server");

        let mut runs = 0u64;
        loop {
            self.run_once().await?;
            runs += 1;
            debug!(runs, "iperf3 server run finished");
            if !self.forever {
                break;
            }
        }

        info!(server = %self, runs, "shutting down server");
        Ok(runs)
    }

    async fn run_once(&self) -> Result<()> {
        let args = self.args();
        let command = format!("{} {}", self.iperf3_path, args.join(" "));

        // iperf3's own report goes straight to the terminal in verbose mode.
        let stdout = if self.verbose {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        let child = Command::new(&self.iperf3_path)
            .args(&args)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LinkTestError::Spawn {
                command: command.clone(),
                source,
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| LinkTestError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(LinkTestError::CommandFailed {
                command,
                code: output.status.code(),
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Server: bind_address={}, port={}, forever={}",
            self.bind_address, self.port, self.forever
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let server = Server {
            port: 5400,
            bind_address: "0.0.0.0".to_string(),
            ..Server::default()
        };
        assert_eq!(
            server.args(),
            vec!["--server", "--one-off", "--bind", "0.0.0.0", "--port", "5400"]
        );
    }

    #[test]
    fn test_display_shows_port() {
        let server = Server::default();
        assert_eq!(
            server.to_string(),
            "Server: bind_address=127.0.0.1, port=5201, forever=false"
        );
    }

    #[tokio::test]
    async fn test_single_run() {
        // `true` stands in for an iperf3 that served one test and exited.
        let server = Server::new("true");
        assert_eq!(server.start().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_run_stops_forever_loop() {
        let server = Server {
            forever: true,
            ..Server::new("false")
        };
        assert!(matches!(
            server.start().await,
            Err(LinkTestError::CommandFailed { code: Some(1), .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let server = Server::new("/nonexistent/iperf3");
        assert!(matches!(
            server.start().await,
            Err(LinkTestError::Spawn { .. })
        ));
    }
}
