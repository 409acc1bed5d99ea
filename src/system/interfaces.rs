//! Interface discovery from `ip --oneline address`.
//!
//! One record per line, e.g.:
//!
//! ```text
//! 1: lo    inet 127.0.0.1/8 scope host lo\       valid_lft forever preferred_lft forever
//! 3: eno1    inet 192.168.1.30/24 brd 192.168.1.255 scope global dynamic noprefixroute eno1\ ...
//! 3: eno1    inet6 fe80::3f7d:217e:9952:9cdb/64 scope link noprefixroute \ ...
//! 7: docker0    inet 172.17.0.1/16 brd 172.17.255.255 scope global docker0\ ...
//! ```
//!
//! The interface name is the second whitespace-delimited token. Loopback and
//! virtual interfaces are skipped by regex.

use regex::Regex;
use tracing::{debug, info};

use crate::error::{LinkTestError, Result};

/// Compiled set of interface-name exclusion patterns.
#[derive(Debug, Clone)]
pub struct InterfaceFilter {
    patterns: Vec<Regex>,
}

impl InterfaceFilter {
    /// Loopback plus the usual container, wireless and libvirt bridges.
    pub const DEFAULT_PATTERNS: [&'static str; 4] = ["^lo$", r"^docker\d+", r"^wlp\d+", r"^virbr\d+"];

    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| LinkTestError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// True when `name` matches one of the exclusion patterns.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }
}

impl Default for InterfaceFilter {
    fn default() -> Self {
        Self {
            patterns: Self::DEFAULT_PATTERNS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }
}

/// Extract the usable interface names from `ip --oneline address` output.
///
/// Names keep their first-appearance order and are deduplicated (an
/// interface with several addresses shows up once).
pub fn parse_interfaces(output: &str, filter: &InterfaceFilter) -> Vec<String> {
    let mut captured: Vec<String> = Vec::new();

    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        let (Some(_index), Some(token)) = (tokens.next(), tokens.next()) else {
            continue;
        };

        // veth pairs show up as "eth0@if12"
        let name = token.split('@').next().unwrap_or(token);
        if name.is_empty() || filter.is_excluded(name) {
            continue;
        }
        if !captured.iter().any(|c| c == name) {
            captured.push(name.to_string());
        }
    }

    captured
}

/// Lists the host's real network interfaces by running `ip`.
pub struct InterfaceLister {
    ip_path: String,
    filter: InterfaceFilter,
}

impl InterfaceLister {
    pub fn new(ip_path: impl Into<String>, filter: InterfaceFilter) -> Self {
        Self {
            ip_path: ip_path.into(),
            filter,
        }
    }

    /// Usable interfaces; loopback and virtual interfaces are skipped.
    pub fn list_interfaces(&self) -> Result<Vec<String>> {
        let stdout = super::run_command(&self.ip_path, &["--oneline", "address"])?;
        let interfaces = parse_interfaces(&stdout, &self.filter);
        debug!(?interfaces, "discovered interfaces");
        Ok(interfaces)
    }

    /// The interface a link test monitors when none is given: the first one
    /// listed. No usable interface at all is an environment error.
    pub fn default_interface(&self) -> Result<String> {
        let interface = self
            .list_interfaces()?
            .into_iter()
            .next()
            .ok_or(LinkTestError::NoInterface)?;
        info!(%interface, "selected default interface");
        Ok(interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
1: lo    inet6 ::1/128 scope host \\       valid_lft forever preferred_lft forever
3: eno1    inet 192.168.1.30/24 brd 192.168.1.255 scope global dynamic noprefixroute eno1\\       valid_lft 1879sec preferred_lft 1879sec
3: eno1    inet6 fe80::3f7d:217e:9952:9cdb/64 scope link noprefixroute \\       valid_lft forever preferred_lft forever
4: wlp4s0    inet 192.168.1.31/24 brd 192.168.1.255 scope global dynamic noprefixroute wlp4s0\\       valid_lft 1883sec preferred_lft 1883sec
5: virbr0    inet 192.168.122.1/24 brd 192.168.122.255 scope global virbr0\\       valid_lft forever preferred_lft forever
7: docker0    inet 172.17.0.1/16 brd 172.17.255.255 scope global docker0\\       valid_lft forever preferred_lft forever
";

    #[test]
    fn test_only_physical_interface_survives() {
        let ifaces = parse_interfaces(SAMPLE, &InterfaceFilter::default());
        assert_eq!(ifaces, vec!["eno1".to_string()]);
    }

    #[test]
    fn test_dedup_keeps_first_appearance_order() {
        let out = "\
2: enp1s0    inet 10.0.0.2/24 scope global enp1s0
3: eno1    inet 10.0.1.2/24 scope global eno1
2: enp1s0    inet6 fe80::1/64 scope link
";
        let ifaces = parse_interfaces(out, &InterfaceFilter::default());
        assert_eq!(ifaces, vec!["enp1s0", "eno1"]);
    }

    #[test]
    fn test_short_and_blank_lines_skipped() {
        let out = "\n   \n1:\n2: eth0    inet 10.0.0.5/24 scope global eth0\n";
        let ifaces = parse_interfaces(out, &InterfaceFilter::default());
        assert_eq!(ifaces, vec!["eth0"]);
    }

    #[test]
    fn test_veth_suffix_stripped() {
        let out = "12: eth0@if13    inet 172.18.0.2/16 brd 172.18.255.255 scope global eth0\n";
        let ifaces = parse_interfaces(out, &InterfaceFilter::default());
        assert_eq!(ifaces, vec!["eth0"]);
    }

    #[test]
    fn test_loopback_pattern_is_exact() {
        // "wlo1" is an onboard wireless NIC, not loopback.
        let filter = InterfaceFilter::default();
        assert!(filter.is_excluded("lo"));
        assert!(!filter.is_excluded("wlo1"));
        assert!(!filter.is_excluded("eno1"));
        assert!(filter.is_excluded("docker0"));
        assert!(filter.is_excluded("virbr10"));
        assert!(filter.is_excluded("wlp4s0"));
    }

    #[test]
    fn test_custom_patterns() {
        let filter = InterfaceFilter::new(&["^veth", "^br-"]).unwrap();
        let out = "\
1: lo    inet 127.0.0.1/8 scope host lo
5: br-3f2a    inet 172.19.0.1/16 scope global br-3f2a
9: veth12ab    inet6 fe80::1/64 scope link
";
        // lo is only excluded by the default pattern set.
        assert_eq!(parse_interfaces(out, &filter), vec!["lo"]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = InterfaceFilter::new(&["docker(\\d+"]).unwrap_err();
        assert!(matches!(err, LinkTestError::InvalidPattern { .. }));
    }

    #[test]
    fn test_empty_listing_is_not_an_error() {
        assert!(parse_interfaces("", &InterfaceFilter::default()).is_empty());
    }

    #[test]
    fn test_lister_propagates_command_failure() {
        let lister = InterfaceLister::new("false", InterfaceFilter::default());
        assert!(matches!(
            lister.list_interfaces(),
            Err(LinkTestError::CommandFailed { .. })
        ));
        assert!(lister.default_interface().is_err());
    }
}
