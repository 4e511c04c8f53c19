//! The tick context.
//!
//! [`Engine`] is the one owner of every cached source, every history buffer
//! and the fast-start flag. The loop that drives it (dashboard or headless
//! service) calls [`Engine::tick`] once per period and gets back an immutable
//! [`Snapshot`]; all sources are read before the snapshot is assembled.

use crate::cache::{CachedSource, Source, SourceId};
use crate::collectors::{
    public_ip, BatterySource, ContainerSource, ContainerSummary, CpuSource, DiskSource, EnergySource, HostPaths,
    KubernetesSource, KubernetesSummary, MemorySource, NetworkSource, ProcessSource, ProxySource, PublicIpSource,
    SecuritySource, SystemSource, UpdateSource, UpdateStatus,
};
use crate::config::{Config, REFRESH_RANGE};
use crate::error::MonitorError;
use crate::history::Histories;
use crate::snapshot::{Snapshot, Trends};
use std::time::{Duration, Instant};

/// Proxy rate is pushed scaled so that sub-1 rps values still draw.
const PROXY_RPS_SCALE: f64 = 10.0;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn fetch_optional<S: Source>(slot: &mut Option<CachedSource<S>>, now: Instant, first_tick: bool) -> bool {
    slot.as_mut().is_some_and(|cached| cached.fetch(now, first_tick))
}

fn current_or<S: Source>(slot: &Option<CachedSource<S>>, disabled: S::Output) -> S::Output {
    slot.as_ref().map_or(disabled, |cached| cached.current().clone())
}

/// Exclusively owned aggregation state.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    histories: Histories,
    first_tick: bool,
    cpu: CachedSource<CpuSource>,
    memory: CachedSource<MemorySource>,
    battery: CachedSource<BatterySource>,
    disk: CachedSource<DiskSource>,
    network: CachedSource<NetworkSource>,
    processes: CachedSource<ProcessSource>,
    system: CachedSource<SystemSource>,
    energy: CachedSource<EnergySource>,
    proxy: CachedSource<ProxySource>,
    security: CachedSource<SecuritySource>,
    public_ip: Option<CachedSource<PublicIpSource>>,
    containers: Option<CachedSource<ContainerSource>>,
    kubernetes: Option<CachedSource<KubernetesSource>>,
    update: Option<CachedSource<UpdateSource>>,
}

impl Engine {
    /// Builds an engine reading the real `/proc` and `/sys`.
    pub fn new(config: Config) -> Self {
        Self::with_paths(config, HostPaths::default())
    }

    /// Builds an engine whose kernel-file sources read below `paths`.
    pub fn with_paths(config: Config, paths: HostPaths) -> Self {
        let tick = config.refresh_interval();
        let iv = config.intervals;
        let docker = config.integrations.docker;

        let public_ip =
            config.public_ip_check.then(|| CachedSource::new(PublicIpSource::default(), secs(iv.public_ip)));
        let containers = docker.then(|| CachedSource::new(ContainerSource::new(secs(iv.docker_stats)), tick));
        let kubernetes =
            config.integrations.kubernetes.then(|| CachedSource::new(KubernetesSource::new(), secs(iv.kubernetes)));
        let update = config
            .update_check_url
            .clone()
            .map(|url| CachedSource::new(UpdateSource::new(Some(url)), secs(iv.update_check)));

        crate::debug!(
            "engine",
            "tick {}s, docker={docker}, kubernetes={}, public_ip={}, update={}",
            config.refresh_rate,
            kubernetes.is_some(),
            public_ip.is_some(),
            update.is_some()
        );

        Self {
            histories: Histories::default(),
            first_tick: true,
            cpu: CachedSource::new(CpuSource::new(paths.clone()), tick),
            memory: CachedSource::new(MemorySource::new(paths.clone()), tick),
            battery: CachedSource::new(BatterySource::new(&paths), tick),
            disk: CachedSource::new(DiskSource::new(docker), tick),
            network: CachedSource::new(NetworkSource::new(paths.clone(), config.show_vpn), tick),
            processes: CachedSource::new(ProcessSource::new(paths.clone(), secs(iv.process_top)), tick),
            system: CachedSource::new(SystemSource::new(paths.clone()), tick),
            energy: CachedSource::new(EnergySource::new(&paths), tick),
            proxy: CachedSource::new(ProxySource::new(config.proxy_log_paths()), secs(iv.proxy)),
            security: CachedSource::new(
                SecuritySource::new(config.security_log_paths(), config.security_alerts.into()),
                secs(iv.security),
            ),
            public_ip,
            containers,
            kubernetes,
            update,
            config,
        }
    }

    /// Reads every source (fresh or cached), feeds the histories and
    /// assembles the snapshot for `now`.
    pub fn tick(&mut self, now: Instant) -> Snapshot {
        crate::time_scope!("engine", "tick");
        let first = self.first_tick;
        let h = &mut self.histories;

        if self.cpu.fetch(now, first) {
            let cpu = self.cpu.current();
            h.cpu.push(cpu.usage);
            h.push_cores(&cpu.per_core);
        }
        if self.memory.fetch(now, first) {
            h.memory.push(self.memory.current().percent);
        }
        if self.network.fetch(now, first) {
            let net = self.network.current();
            h.rx.push(net.rx_kbps);
            h.tx.push(net.tx_kbps);
        }
        if self.energy.fetch(now, first) {
            h.power.push(self.energy.current().watts);
        }
        if self.proxy.fetch(now, first) {
            h.proxy_rps.push(self.proxy.current().rps * PROXY_RPS_SCALE);
        }
        if self.security.fetch(now, first) {
            let stats = self.security.current();
            h.failed_logins.push(stats.failed_logins);
            h.suspicious_ips.push(stats.suspicious_ips.len() as u64);
        }

        self.battery.fetch(now, first);
        self.disk.fetch(now, first);
        self.processes.fetch(now, first);
        self.system.fetch(now, first);
        fetch_optional(&mut self.public_ip, now, first);
        fetch_optional(&mut self.containers, now, first);
        fetch_optional(&mut self.kubernetes, now, first);
        fetch_optional(&mut self.update, now, first);

        if first {
            crate::debug!("engine", "fast-start tick done");
        }
        self.first_tick = false;
        self.snapshot(first)
    }

    fn snapshot(&self, loading: bool) -> Snapshot {
        Snapshot {
            loading,
            cpu: self.cpu.current().clone(),
            memory: *self.memory.current(),
            battery: self.battery.current().clone(),
            disks: self.disk.current().clone(),
            network: self.network.current().clone(),
            public_ip: current_or(&self.public_ip, public_ip::UNKNOWN.to_string()),
            processes: self.processes.current().clone(),
            system: self.system.current().clone(),
            energy: *self.energy.current(),
            containers: current_or(&self.containers, ContainerSummary::default()),
            kubernetes: current_or(&self.kubernetes, KubernetesSummary::default()),
            proxy: self.proxy.current().clone(),
            security: self.security.current().clone(),
            update: current_or(&self.update, UpdateStatus::Unknown),
            trends: Trends::from(&self.histories),
        }
    }

    /// Forces every source to recompute on the next tick and leaves fast-start mode.
    pub fn refresh_now(&mut self) {
        self.cpu.invalidate();
        self.memory.invalidate();
        self.battery.invalidate();
        self.disk.invalidate();
        self.network.invalidate();
        self.processes.invalidate();
        self.system.invalidate();
        self.energy.invalidate();
        self.proxy.invalidate();
        self.security.invalidate();
        self.refresh_public_ip();
        if let Some(c) = self.containers.as_mut() {
            c.invalidate();
        }
        if let Some(k) = self.kubernetes.as_mut() {
            k.invalidate();
        }
        if let Some(u) = self.update.as_mut() {
            u.invalidate();
        }
        self.first_tick = false;
        crate::debug!("engine", "manual refresh");
    }

    /// Forces the public address lookup on the next tick.
    pub fn refresh_public_ip(&mut self) {
        if let Some(ip) = self.public_ip.as_mut() {
            ip.invalidate();
        }
    }

    /// Sets the tick period, clamped to the valid range. Returns the applied value.
    pub fn set_refresh_rate(&mut self, secs_requested: u64) -> u64 {
        let rate = secs_requested.clamp(*REFRESH_RANGE.start(), *REFRESH_RANGE.end());
        self.config.refresh_rate = rate;
        let tick = secs(rate);
        self.cpu.set_interval(tick);
        self.memory.set_interval(tick);
        self.battery.set_interval(tick);
        self.disk.set_interval(tick);
        self.network.set_interval(tick);
        self.processes.set_interval(tick);
        self.system.set_interval(tick);
        self.energy.set_interval(tick);
        if let Some(c) = self.containers.as_mut() {
            c.set_interval(tick);
        }
        crate::debug!("engine", "refresh rate {rate}s");
        rate
    }

    /// Shortens the tick period by one second.
    pub fn faster(&mut self) -> u64 {
        self.set_refresh_rate(self.config.refresh_rate.saturating_sub(1))
    }

    /// Lengthens the tick period by one second.
    pub fn slower(&mut self) -> u64 {
        self.set_refresh_rate(self.config.refresh_rate + 1)
    }

    /// Current tick period.
    pub fn refresh_interval(&self) -> Duration {
        self.config.refresh_interval()
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// History buffers.
    pub fn histories(&self) -> &Histories {
        &self.histories
    }

    /// True until the first tick has run.
    pub fn is_first_tick(&self) -> bool {
        self.first_tick
    }

    /// Refresh interval of a source; `None` when it is disabled.
    pub fn interval(&self, id: SourceId) -> Option<Duration> {
        match id {
            SourceId::Cpu => Some(self.cpu.interval()),
            SourceId::Memory => Some(self.memory.interval()),
            SourceId::Battery => Some(self.battery.interval()),
            SourceId::Disk => Some(self.disk.interval()),
            SourceId::Network => Some(self.network.interval()),
            SourceId::Processes => Some(self.processes.interval()),
            SourceId::System => Some(self.system.interval()),
            SourceId::Energy => Some(self.energy.interval()),
            SourceId::Proxy => Some(self.proxy.interval()),
            SourceId::Security => Some(self.security.interval()),
            SourceId::PublicIp => self.public_ip.as_ref().map(CachedSource::interval),
            SourceId::Containers => self.containers.as_ref().map(CachedSource::interval),
            SourceId::Kubernetes => self.kubernetes.as_ref().map(CachedSource::interval),
            SourceId::Update => self.update.as_ref().map(CachedSource::interval),
        }
    }

    /// Error of the most recent attempt of a source, if it failed.
    pub fn last_error(&self, id: SourceId) -> Option<&MonitorError> {
        match id {
            SourceId::Cpu => self.cpu.last_error(),
            SourceId::Memory => self.memory.last_error(),
            SourceId::Battery => self.battery.last_error(),
            SourceId::Disk => self.disk.last_error(),
            SourceId::Network => self.network.last_error(),
            SourceId::Processes => self.processes.last_error(),
            SourceId::System => self.system.last_error(),
            SourceId::Energy => self.energy.last_error(),
            SourceId::Proxy => self.proxy.last_error(),
            SourceId::Security => self.security.last_error(),
            SourceId::PublicIp => self.public_ip.as_ref().and_then(CachedSource::last_error),
            SourceId::Containers => self.containers.as_ref().and_then(CachedSource::last_error),
            SourceId::Kubernetes => self.kubernetes.as_ref().and_then(CachedSource::last_error),
            SourceId::Update => self.update.as_ref().and_then(CachedSource::last_error),
        }
    }
}
