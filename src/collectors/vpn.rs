//! WireGuard peers from `wg show all dump`.

use crate::subprocess::{run_with_timeout, SubprocessResult};
use std::collections::HashMap;
use std::time::Duration;

/// A peer is connected when its last handshake is younger than this.
pub const HANDSHAKE_FRESH_SECS: u64 = 180;

const WG_TIMEOUT: Duration = Duration::from_secs(1);

/// One WireGuard peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpnPeer {
    /// Interface the peer belongs to.
    pub interface: String,
    /// Remote endpoint, `N/A` when unknown.
    pub endpoint: String,
    /// Allowed IP ranges.
    pub allowed_ips: String,
    /// Seconds since the latest handshake.
    pub handshake_age: Option<u64>,
    /// Handshake younger than [`HANDSHAKE_FRESH_SECS`].
    pub connected: bool,
    /// Bytes received.
    pub rx: u64,
    /// Bytes sent.
    pub tx: u64,
    /// Persistent keepalive setting.
    pub keepalive: String,
    /// Listen port of the interface.
    pub port: Option<String>,
    /// Compact handshake age, e.g. `42s`, `3m`, `2h`.
    pub latency: String,
}

/// Result of a peer query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpnStatus {
    /// Peers across all interfaces.
    pub peers: Vec<VpnPeer>,
    /// Only permission errors were seen.
    pub permission_denied: bool,
}

impl VpnStatus {
    /// Peers with a fresh handshake.
    pub fn connected(&self) -> usize {
        self.peers.iter().filter(|p| p.connected).count()
    }
}

/// Compact age label: seconds under a minute, minutes under an hour, else hours.
pub fn handshake_label(age_secs: u64) -> String {
    if age_secs < 60 {
        format!("{age_secs}s")
    } else if age_secs < 3600 {
        format!("{}m", age_secs / 60)
    } else {
        format!("{}h", age_secs / 3600)
    }
}

/// Parses tab-separated dump rows. Five-field rows describe interfaces,
/// rows with nine or more fields describe peers; anything else is skipped.
pub fn parse_wg_dump(dump: &str, now_unix: u64) -> Vec<VpnPeer> {
    let mut ports: HashMap<&str, &str> = HashMap::new();
    let mut peers = Vec::new();

    for line in dump.lines().filter(|l| !l.trim().is_empty()) {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() == 5 {
            ports.insert(parts[0], parts[3]);
            continue;
        }
        if parts.len() < 9 {
            continue;
        }

        let number = |raw: &str| raw.trim().parse::<u64>().unwrap_or(0);
        let handshake = number(parts[5]);
        let handshake_age = (handshake > 0).then(|| now_unix.saturating_sub(handshake));
        let endpoint = if parts[3] == "(none)" || parts[3].is_empty() { "N/A" } else { parts[3] };

        peers.push(VpnPeer {
            interface: parts[0].to_string(),
            endpoint: endpoint.to_string(),
            allowed_ips: parts[4].to_string(),
            handshake_age,
            connected: handshake_age.is_some_and(|age| age < HANDSHAKE_FRESH_SECS),
            rx: number(parts[6]),
            tx: number(parts[7]),
            keepalive: parts[8].to_string(),
            port: None,
            latency: handshake_age.map(handshake_label).unwrap_or_default(),
        });
    }

    for peer in &mut peers {
        peer.port = ports.get(peer.interface.as_str()).map(|p| (*p).to_string());
    }
    peers
}

fn combined_output(result: &SubprocessResult) -> Option<String> {
    match result {
        SubprocessResult::Success(out) | SubprocessResult::Failed(out) => {
            let text = format!("{}{}", out.stdout, out.stderr);
            (!text.trim().is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// Queries `wg`, retrying through non-interactive `sudo` when refused.
pub fn query_wireguard(now_unix: u64) -> VpnStatus {
    let attempts: [(&str, &[&str]); 2] =
        [("wg", &["show", "all", "dump"]), ("sudo", &["-n", "wg", "show", "all", "dump"])];
    let mut permission_seen = false;

    for (cmd, args) in attempts {
        let result = run_with_timeout(cmd, args, WG_TIMEOUT);
        let Some(output) = combined_output(&result) else {
            continue;
        };
        if result.mentions_permission_problem() {
            permission_seen = true;
            continue;
        }
        if !result.is_success() {
            continue;
        }
        return VpnStatus { peers: parse_wg_dump(&output, now_unix), permission_denied: false };
    }

    VpnStatus { peers: Vec::new(), permission_denied: permission_seen }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn dump() -> String {
        [
            "wg0\tPRIVKEY\tPUBKEY\t51820\toff",
            &format!("wg0\tPEER1\t(none)\t203.0.113.7:51820\t10.8.0.2/32\t{}\t1024\t2048\t25", NOW - 42),
            &format!("wg0\tPEER2\t(none)\t(none)\t10.8.0.3/32\t{}\t0\t0\toff", NOW - 7200),
            "wg0\tPEER3\t(none)\t(none)\t10.8.0.4/32\t0\t0\t0\toff",
            "garbage line",
        ]
        .join("\n")
    }

    #[test]
    fn test_parse_peers() {
        let peers = parse_wg_dump(&dump(), NOW);
        assert_eq!(peers.len(), 3);

        let first = &peers[0];
        assert_eq!(first.endpoint, "203.0.113.7:51820");
        assert_eq!(first.handshake_age, Some(42));
        assert!(first.connected);
        assert_eq!(first.latency, "42s");
        assert_eq!(first.rx, 1024);
        assert_eq!(first.port.as_deref(), Some("51820"));

        let stale = &peers[1];
        assert!(!stale.connected);
        assert_eq!(stale.endpoint, "N/A");
        assert_eq!(stale.latency, "2h");

        let never = &peers[2];
        assert_eq!(never.handshake_age, None);
        assert!(!never.connected);
        assert!(never.latency.is_empty());
    }

    #[test]
    fn test_handshake_boundary() {
        let line = format!("wg0\tP\t(none)\t(none)\t10.0.0.2/32\t{}\t0\t0\toff", NOW - 180);
        assert!(!parse_wg_dump(&line, NOW)[0].connected, "180s is stale");
    }

    #[test]
    fn test_handshake_labels() {
        assert_eq!(handshake_label(59), "59s");
        assert_eq!(handshake_label(60), "1m");
        assert_eq!(handshake_label(3599), "59m");
        assert_eq!(handshake_label(3600), "1h");
    }

    #[test]
    fn test_connected_count() {
        let status = VpnStatus { peers: parse_wg_dump(&dump(), NOW), permission_denied: false };
        assert_eq!(status.connected(), 1);
    }
}
