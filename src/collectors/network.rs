//! Network collector.
//!
//! Follows the default route's interface: byte counters from sysfs turned into
//! KB/s, link state, connection type, and WireGuard peers.

use super::vpn::{query_wireguard, VpnStatus};
use super::{read_attr, read_file, read_parsed, HostPaths};
use crate::cache::{Capability, ReadContext, Source, SourceId};
use crate::delta::CounterDelta;
use crate::error::Result;
use crate::subprocess::{run_with_timeout_stdout, which};
use std::net::UdpSocket;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Physical kind of the default interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionType {
    /// `en*` / `eth*`.
    Wired,
    /// `wl*` / `wi*`.
    Wireless,
    /// Anything else.
    Virtual,
    /// No default route.
    #[default]
    None,
}

impl ConnectionType {
    /// Classifies an interface by name prefix.
    pub fn from_interface(name: &str) -> Self {
        if name.starts_with("en") || name.starts_with("eth") {
            Self::Wired
        } else if name.starts_with("wl") || name.starts_with("wi") {
            Self::Wireless
        } else {
            Self::Virtual
        }
    }

    /// Lowercase label, empty for [`ConnectionType::None`].
    pub fn label(self) -> &'static str {
        match self {
            Self::Wired => "wired",
            Self::Wireless => "wireless",
            Self::Virtual => "virtual",
            Self::None => "",
        }
    }
}

/// Network reading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkInfo {
    /// Default-route interface.
    pub interface: Option<String>,
    /// Outbound local address, `N/A` when unknown.
    pub local_ip: String,
    /// Receive throughput, KB/s.
    pub rx_kbps: f64,
    /// Transmit throughput, KB/s.
    pub tx_kbps: f64,
    /// Bytes received since boot, GiB.
    pub rx_total_gb: f64,
    /// Bytes sent since boot, GiB.
    pub tx_total_gb: f64,
    /// Kernel operstate.
    pub operstate: String,
    /// Carrier present (or operstate up when carrier is unreadable).
    pub link_up: bool,
    /// Negotiated speed in Mb/s.
    pub link_speed_mbps: Option<u32>,
    /// Interface kind.
    pub connection_type: ConnectionType,
    /// Wireless network name.
    pub ssid: String,
    /// `wg0` exists.
    pub wg_active: bool,
    /// `wg0` address attribute.
    pub wg_address: Option<String>,
    /// WireGuard peers.
    pub vpn: VpnStatus,
}

impl NetworkInfo {
    /// Peer count, counting a bare `wg0` as one.
    pub fn wg_peers(&self) -> usize {
        match (self.vpn.peers.len(), self.wg_active) {
            (0, true) => 1,
            (n, _) => n,
        }
    }

    /// Connected peer count, counting a bare `wg0` as one.
    pub fn wg_peers_connected(&self) -> usize {
        match (self.vpn.peers.len(), self.wg_active) {
            (0, true) => 1,
            _ => self.vpn.connected(),
        }
    }
}

/// Reads the default interface's state.
#[derive(Debug)]
pub struct NetworkSource {
    paths: HostPaths,
    delta: CounterDelta<&'static str>,
    show_vpn: bool,
    wireguard: Capability,
}

impl NetworkSource {
    /// Creates a network source; `show_vpn` enables the peer query.
    pub fn new(paths: HostPaths, show_vpn: bool) -> Self {
        Self { paths, delta: CounterDelta::new(), show_vpn, wireguard: Capability::Unknown }
    }

    fn vpn_status(&mut self) -> VpnStatus {
        if !self.show_vpn {
            return VpnStatus::default();
        }
        if self.wireguard == Capability::Unknown {
            self.wireguard = Capability::from_probe(which("wg").is_some());
        }
        if !self.wireguard.is_available() {
            return VpnStatus::default();
        }
        let now_unix = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        query_wireguard(now_unix)
    }
}

impl Source for NetworkSource {
    type Output = NetworkInfo;

    fn id(&self) -> SourceId {
        SourceId::Network
    }

    fn read(&mut self, ctx: &ReadContext) -> Result<NetworkInfo> {
        let route = read_file("network", &self.paths.proc("net/route"))?;
        let interface = parse_default_route(&route);

        let wg_dir = self.paths.sys("class/net/wg0");
        let mut info = NetworkInfo {
            local_ip: "N/A".to_string(),
            wg_active: wg_dir.exists(),
            wg_address: read_attr(&wg_dir.join("address")),
            vpn: self.vpn_status(),
            ..NetworkInfo::default()
        };

        let Some(iface) = interface else {
            return Ok(info);
        };

        let dir = self.paths.sys(&format!("class/net/{iface}"));
        let rx_bytes = read_parsed::<u64>(&dir.join("statistics/rx_bytes")).unwrap_or(0);
        let tx_bytes = read_parsed::<u64>(&dir.join("statistics/tx_bytes")).unwrap_or(0);
        info.rx_kbps = self.delta.rate("rx", rx_bytes, ctx.now) / 1024.0;
        info.tx_kbps = self.delta.rate("tx", tx_bytes, ctx.now) / 1024.0;
        info.rx_total_gb = rx_bytes as f64 / 1024f64.powi(3);
        info.tx_total_gb = tx_bytes as f64 / 1024f64.powi(3);

        info.operstate = read_attr(&dir.join("operstate")).unwrap_or_default();
        info.link_up = match read_attr(&dir.join("carrier")) {
            Some(carrier) => carrier == "1",
            None => info.operstate == "up",
        };
        info.link_speed_mbps = read_parsed::<i64>(&dir.join("speed")).filter(|s| *s > 0).map(|s| s as u32);
        info.connection_type = ConnectionType::from_interface(&iface);
        if info.connection_type == ConnectionType::Wireless {
            info.ssid = run_with_timeout_stdout("iwgetid", &["-r"], Duration::from_secs(1))
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
        }
        info.local_ip = outbound_local_ip().unwrap_or_else(|| "N/A".to_string());
        info.interface = Some(iface);
        Ok(info)
    }

    fn sentinel(&self) -> NetworkInfo {
        NetworkInfo { local_ip: "N/A".to_string(), ..NetworkInfo::default() }
    }
}

/// Interface of the first route with destination `00000000`.
pub fn parse_default_route(route_table: &str) -> Option<String> {
    route_table.lines().skip(1).find_map(|line| {
        let mut parts = line.split_whitespace();
        let iface = parts.next()?;
        (parts.next()? == "00000000").then(|| iface.to_string())
    })
}

/// Local address the kernel would use for outbound traffic. No packet is sent.
fn outbound_local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::fixture::FakeHost;
    use approx::assert_relative_eq;
    use std::time::Instant;

    const ROUTE: &str = "Iface\tDestination\tGateway\tFlags\n\
                         docker0\t000011AC\t00000000\t0001\n\
                         enp3s0\t00000000\t0101A8C0\t0003\n";

    fn iface(host: &FakeHost, name: &str, value: &str) {
        host.write_sys(&format!("class/net/enp3s0/{name}"), value);
    }

    #[test]
    fn test_parse_default_route() {
        assert_eq!(parse_default_route(ROUTE).as_deref(), Some("enp3s0"));
        assert_eq!(parse_default_route("Iface\tDestination\n"), None);
    }

    #[test]
    fn test_connection_type() {
        assert_eq!(ConnectionType::from_interface("eth0"), ConnectionType::Wired);
        assert_eq!(ConnectionType::from_interface("enp3s0"), ConnectionType::Wired);
        assert_eq!(ConnectionType::from_interface("wlan0"), ConnectionType::Wireless);
        assert_eq!(ConnectionType::from_interface("tun0"), ConnectionType::Virtual);
        assert_eq!(ConnectionType::Wireless.label(), "wireless");
    }

    #[test]
    fn test_rates_over_two_reads() {
        let host = FakeHost::new();
        host.write_proc("net/route", ROUTE);
        iface(&host, "statistics/rx_bytes", "1048576");
        iface(&host, "statistics/tx_bytes", "0");
        iface(&host, "operstate", "up");
        iface(&host, "carrier", "1");
        iface(&host, "speed", "1000");

        let mut source = NetworkSource::new(host.paths.clone(), false);
        let t0 = Instant::now();
        let first = source.read(&ReadContext { now: t0, first_tick: true }).unwrap();
        assert_eq!(first.rx_kbps, 0.0);
        assert_eq!(first.interface.as_deref(), Some("enp3s0"));
        assert!(first.link_up);
        assert_eq!(first.link_speed_mbps, Some(1000));
        assert_eq!(first.connection_type, ConnectionType::Wired);

        iface(&host, "statistics/rx_bytes", "3145728");
        iface(&host, "statistics/tx_bytes", "20480");
        let second = source.read(&ReadContext { now: t0 + Duration::from_secs(2), first_tick: false }).unwrap();
        assert_relative_eq!(second.rx_kbps, 1024.0);
        assert_relative_eq!(second.tx_kbps, 10.0);
        assert_relative_eq!(second.rx_total_gb, 3.0 / 1024.0);
    }

    #[test]
    fn test_negative_speed_is_unknown() {
        let host = FakeHost::new();
        host.write_proc("net/route", ROUTE);
        iface(&host, "speed", "-1");
        iface(&host, "operstate", "down");

        let info = NetworkSource::new(host.paths.clone(), false)
            .read(&ReadContext { now: Instant::now(), first_tick: false })
            .unwrap();
        assert_eq!(info.link_speed_mbps, None);
        assert!(!info.link_up, "no carrier file falls back to operstate");
    }

    #[test]
    fn test_no_default_route() {
        let host = FakeHost::new();
        host.write_proc("net/route", "Iface\tDestination\n");
        host.write_sys("class/net/wg0/address", "");

        let info = NetworkSource::new(host.paths.clone(), false)
            .read(&ReadContext { now: Instant::now(), first_tick: false })
            .unwrap();
        assert!(info.interface.is_none());
        assert_eq!(info.local_ip, "N/A");
        assert!(info.wg_active);
        assert_eq!(info.wg_peers(), 1);
        assert_eq!(info.wg_peers_connected(), 1);
    }

    #[test]
    fn test_missing_route_table_fails() {
        let host = FakeHost::new();
        let mut source = NetworkSource::new(host.paths.clone(), false);
        assert!(source.read(&ReadContext { now: Instant::now(), first_tick: false }).is_err());
        assert_eq!(source.sentinel().local_ip, "N/A");
    }
}
