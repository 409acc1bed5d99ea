//! Host tooling: subprocess execution, environment checks, interface discovery.

pub mod environment;
pub mod interfaces;

use std::process::Output;

use tracing::{debug, warn};

use crate::error::{LinkTestError, Result};

/// Run `program` with `args` and return its stdout.
///
/// A launch failure or a non-zero exit is an error; the captured stderr (or
/// stdout, when stderr is empty) is carried along for context.
pub fn run_command(program: &str, args: &[&str]) -> Result<String> {
    let command = render_command(program, args);
    debug!(%command, "running command");

    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|source| LinkTestError::Spawn {
            command: command.clone(),
            source,
        })?;
    check_output(command, output)
}

/// [`run_command`] on the tokio process driver, for use inside async code.
pub async fn run_command_async(program: &str, args: &[&str]) -> Result<String> {
    let command = render_command(program, args);
    debug!(%command, "running command");

    let output = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| LinkTestError::Spawn {
            command: command.clone(),
            source,
        })?;
    check_output(command, output)
}

fn check_output(command: String, output: Output) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let output_text = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        warn!(%command, code = ?output.status.code(), error = %output_text, "command failed");
        return Err(LinkTestError::CommandFailed {
            command,
            code: output.status.code(),
            output: output_text,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub(crate) fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_captures_stdout() {
        let out = run_command("echo", &["NIC statistics:"]).unwrap();
        assert_eq!(out.trim(), "NIC statistics:");
    }

    #[test]
    fn test_run_command_nonzero_exit_is_error() {
        match run_command("false", &[]) {
            Err(LinkTestError::CommandFailed { command, code, .. }) => {
                assert_eq!(command, "false");
                assert_eq!(code, Some(1));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_run_command_missing_binary_is_spawn_error() {
        let result = run_command("/nonexistent/linktester-tool", &["--statistics", "eth0"]);
        assert!(matches!(result, Err(LinkTestError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_run_command_async_matches_sync() {
        let out = run_command_async("echo", &["rx_crc: 4"]).await.unwrap();
        assert_eq!(out.trim(), "rx_crc: 4");

        match run_command_async("sh", &["-c", "echo link down >&2; exit 3"]).await {
            Err(LinkTestError::CommandFailed { code, output, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "link down");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
        assert!(matches!(
            run_command_async("/nonexistent/linktester-tool", &[]).await,
            Err(LinkTestError::Spawn { .. })
        ));
    }

    #[test]
    fn test_render_command() {
        assert_eq!(
            render_command("ethtool", &["--statistics", "eno1"]),
            "ethtool --statistics eno1"
        );
    }
}
