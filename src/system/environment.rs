//! Startup check for the external tools a link test depends on.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::BinaryConfig;
use crate::error::{LinkTestError, Result};

/// Where each required binary was found.
#[derive(Debug, Clone)]
pub struct ResolvedBinary {
    pub name: String,
    pub path: PathBuf,
}

/// Verify that `ethtool`, `iperf3` and `ip` are all resolvable.
///
/// Bare names are searched on `$PATH`; paths are checked directly. The first
/// missing binary aborts the check.
pub fn check_environment(binaries: &BinaryConfig) -> Result<Vec<ResolvedBinary>> {
    let mut resolved = Vec::with_capacity(3);
    for binary in binaries.required() {
        let path = which::which(binary).map_err(|e| {
            debug!(binary, error = %e, "binary lookup failed");
            LinkTestError::BrokenEnvironment {
                binary: binary.to_string(),
            }
        })?;
        debug!(binary, path = %path.display(), "binary resolved");
        resolved.push(ResolvedBinary {
            name: binary.to_string(),
            path,
        });
    }
    info!(count = resolved.len(), "environment check passed");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_broken_environment() {
        let binaries = BinaryConfig {
            ethtool: "linktester-no-such-ethtool".to_string(),
            iperf3: "iperf3".to_string(),
            ip: "ip".to_string(),
        };
        match check_environment(&binaries) {
            Err(LinkTestError::BrokenEnvironment { binary }) => {
                assert_eq!(binary, "linktester-no-such-ethtool");
            }
            other => panic!("expected BrokenEnvironment, got {:?}", other),
        }
    }

    #[test]
    fn test_resolves_present_binaries() {
        // `sh`, `true` and `false` exist on any unix test host.
        let binaries = BinaryConfig {
            ethtool: "sh".to_string(),
            iperf3: "true".to_string(),
            ip: "false".to_string(),
        };
        let resolved = check_environment(&binaries).unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].name, "sh");
        assert!(resolved.iter().all(|b| b.path.is_absolute()));
    }

    #[test]
    fn test_absolute_missing_path() {
        let binaries = BinaryConfig {
            ethtool: "/sbin/ethtool".to_string(),
            iperf3: "/nonexistent/bin/iperf3".to_string(),
            ip: "/sbin/ip".to_string(),
        };
        let err = check_environment(&binaries).unwrap_err();
        assert!(err.is_environment());
    }
}
