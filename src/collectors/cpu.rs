//! CPU collector.
//!
//! Parses `/proc/stat` for aggregate and per-core usage, plus temperature,
//! frequency, governor and load from `/proc` and `/sys`.

use super::{read_attr, read_file, read_parsed, truncate_chars, HostPaths};
use crate::cache::{ReadContext, Source, SourceId};
use crate::delta::{CpuKey, CpuTimes, CpuUsageTracker};
use crate::error::{MonitorError, Result};
use std::path::{Path, PathBuf};

/// hwmon chip names that report CPU package temperature.
const CPU_SENSOR_CHIPS: [&str; 9] = [
    "coretemp",
    "k10temp",
    "zenpower",
    "acpitz",
    "thinkpad",
    "cpu_thermal",
    "soc_thermal",
    "armada_thermal",
    "rpi_thermal",
];

/// Load average values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAverage {
    /// 1-minute load average.
    pub one: f64,
    /// 5-minute load average.
    pub five: f64,
    /// 15-minute load average.
    pub fifteen: f64,
}

/// Coarse frequency classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FreqStatus {
    /// Between 1.5 and 3.5 GHz.
    #[default]
    Normal,
    /// Above 3.5 GHz.
    High,
    /// Below 1.5 GHz.
    Low,
}

impl FreqStatus {
    /// Classifies an average frequency in GHz.
    pub fn from_ghz(ghz: f64) -> Self {
        if ghz > 3.5 {
            Self::High
        } else if ghz < 1.5 {
            Self::Low
        } else {
            Self::Normal
        }
    }
}

/// One CPU reading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuInfo {
    /// Aggregate usage %.
    pub usage: f64,
    /// Usage % per core, in core order.
    pub per_core: Vec<f64>,
    /// Package temperature in °C, 0 when unknown.
    pub temp: f64,
    /// Average frequency in GHz.
    pub freq_ghz: f64,
    /// Frequency classification.
    pub freq_status: FreqStatus,
    /// Cleaned model name.
    pub model: String,
    /// Number of cores.
    pub cores: usize,
    /// Scaling governor of cpu0.
    pub governor: String,
    /// Energy-performance preference of cpu0, abbreviated.
    pub epp: String,
    /// Load averages.
    pub load: LoadAverage,
    /// First spinning fan, 0 when none.
    pub fan_rpm: u32,
}

/// Reads CPU state, keeping one previous counter sample per CPU line.
#[derive(Debug)]
pub struct CpuSource {
    paths: HostPaths,
    tracker: CpuUsageTracker,
    model: Option<String>,
}

impl CpuSource {
    /// Creates a CPU source reading below `paths`.
    pub fn new(paths: HostPaths) -> Self {
        Self { paths, tracker: CpuUsageTracker::new(), model: None }
    }

    fn model(&mut self, cpuinfo: Option<&str>) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        let model = cpuinfo.and_then(parse_model).unwrap_or_else(|| "Unknown CPU".to_string());
        self.model = Some(model.clone());
        model
    }
}

impl Source for CpuSource {
    type Output = CpuInfo;

    fn id(&self) -> SourceId {
        SourceId::Cpu
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<CpuInfo> {
        let stat = read_file("cpu", &self.paths.proc("stat"))?;
        let (aggregate, cores) = parse_proc_stat(&stat)?;

        let usage = self.tracker.usage(CpuKey::Aggregate, aggregate);
        let per_core: Vec<f64> =
            cores.iter().map(|(index, times)| self.tracker.usage(CpuKey::Core(*index), *times)).collect();

        let cpuinfo = std::fs::read_to_string(self.paths.proc("cpuinfo")).ok();
        let freq_ghz = cpuinfo.as_deref().map_or(0.0, average_freq_ghz);
        let model = self.model(cpuinfo.as_deref());

        let cpufreq = self.paths.sys("devices/system/cpu/cpu0/cpufreq");
        let governor = read_attr(&cpufreq.join("scaling_governor")).unwrap_or_else(|| "N/A".to_string());
        let epp = read_attr(&cpufreq.join("energy_performance_preference"))
            .map_or_else(|| "N/A".to_string(), |epp| abbreviate_epp(&epp));

        let load = std::fs::read_to_string(self.paths.proc("loadavg"))
            .ok()
            .and_then(|s| parse_loadavg(&s))
            .unwrap_or_default();

        Ok(CpuInfo {
            usage,
            cores: per_core.len().max(1),
            per_core,
            temp: read_temperature(&self.paths),
            freq_ghz,
            freq_status: FreqStatus::from_ghz(freq_ghz),
            model,
            governor,
            epp,
            load,
            fan_rpm: read_fan_rpm(&self.paths),
        })
    }

    fn sentinel(&self) -> CpuInfo {
        CpuInfo { model: self.model.clone().unwrap_or_default(), ..CpuInfo::default() }
    }
}

/// Parses one `cpu`/`cpuN` line into idle and total ticks.
///
/// Idle counts both idle and iowait; total sums user through softirq.
pub fn parse_cpu_line(line: &str) -> Result<CpuTimes> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 8 {
        return Err(MonitorError::parse("cpu", format!("expected 8 fields, got {}", parts.len())));
    }
    let mut values = [0u64; 7];
    for (slot, raw) in values.iter_mut().zip(&parts[1..8]) {
        *slot = raw.parse().map_err(|_| MonitorError::parse("cpu", format!("bad counter '{raw}'")))?;
    }
    Ok(CpuTimes { idle: values[3] + values[4], total: values.iter().sum() })
}

/// Parses `/proc/stat` into the aggregate sample and `(core index, sample)` pairs.
///
/// A malformed per-core line is skipped; a missing or malformed aggregate line is an error.
pub fn parse_proc_stat(content: &str) -> Result<(CpuTimes, Vec<(usize, CpuTimes)>)> {
    let mut aggregate = None;
    let mut cores = Vec::new();

    for line in content.lines() {
        if line.starts_with("cpu ") {
            aggregate = Some(parse_cpu_line(line)?);
        } else if let Some(rest) = line.strip_prefix("cpu") {
            let index = rest.split_whitespace().next().and_then(|n| n.parse::<usize>().ok());
            match (index, parse_cpu_line(line)) {
                (Some(index), Ok(times)) => cores.push((index, times)),
                (_, Err(err)) => crate::trace!("cpu", "skipping core line: {err}"),
                (None, Ok(_)) => {}
            }
        }
    }

    let aggregate = aggregate.ok_or_else(|| MonitorError::parse("cpu", "no aggregate cpu line"))?;
    Ok((aggregate, cores))
}

/// Cleans a `model name` value of trademark noise, max 40 chars.
pub fn clean_model_name(raw: &str) -> String {
    let mut model = raw.to_string();
    for noise in ["(R)", "(TM)", "CPU"] {
        model = model.replace(noise, "");
    }
    let collapsed = model.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, 40)
}

fn parse_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| clean_model_name(value))
}

/// Average of every `cpu MHz` entry, in GHz.
pub fn average_freq_ghz(cpuinfo: &str) -> f64 {
    let freqs: Vec<f64> = cpuinfo
        .lines()
        .filter(|line| line.starts_with("cpu MHz"))
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(_, value)| value.trim().parse::<f64>().ok())
        .collect();
    if freqs.is_empty() {
        return 0.0;
    }
    freqs.iter().sum::<f64>() / freqs.len() as f64 / 1000.0
}

/// `balance_performance` → `bal-performance`.
pub fn abbreviate_epp(epp: &str) -> String {
    epp.replace("balance_", "bal").replace('_', "-")
}

fn parse_loadavg(content: &str) -> Option<LoadAverage> {
    let mut parts = content.split_whitespace().map(str::parse::<f64>);
    Some(LoadAverage { one: parts.next()?.ok()?, five: parts.next()?.ok()?, fifteen: parts.next()?.ok()? })
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}

fn files_matching(dir: &Path, prefix: &str, suffix: &str) -> Vec<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix) && n.ends_with(suffix))
        })
        .collect()
}

/// Package temperature in °C: thermal zone 0, then known hwmon chips, then any positive hwmon reading.
pub fn read_temperature(paths: &HostPaths) -> f64 {
    if let Some(milli) = read_parsed::<i64>(&paths.sys("class/thermal/thermal_zone0/temp")) {
        return milli as f64 / 1000.0;
    }

    for hwmon in sorted_entries(&paths.sys("class/hwmon")) {
        let is_cpu_chip = read_attr(&hwmon.join("name")).is_some_and(|name| CPU_SENSOR_CHIPS.contains(&name.as_str()));
        if is_cpu_chip {
            let reading = ["temp1_input", "temp2_input", "temp3_input"]
                .iter()
                .find_map(|file| read_parsed::<i64>(&hwmon.join(file)));
            if let Some(milli) = reading {
                return milli as f64 / 1000.0;
            }
        }
        let fallback = files_matching(&hwmon, "temp", "_input")
            .iter()
            .filter_map(|p| read_parsed::<i64>(p))
            .find(|milli| *milli > 0);
        if let Some(milli) = fallback {
            return milli as f64 / 1000.0;
        }
    }
    0.0
}

fn read_fan_rpm(paths: &HostPaths) -> u32 {
    sorted_entries(&paths.sys("class/hwmon"))
        .iter()
        .flat_map(|hwmon| files_matching(hwmon, "fan", "_input"))
        .filter_map(|p| read_parsed::<u32>(&p))
        .find(|rpm| *rpm > 0)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::fixture::FakeHost;
    use approx::assert_relative_eq;
    use std::time::{Duration, Instant};

    fn stat(idle: u64, busy: u64) -> String {
        // user nice system idle iowait irq softirq steal
        format!(
            "cpu  {busy} 0 0 {idle} 0 0 0 0\ncpu0 {busy} 0 0 {idle} 0 0 0 0\ncpu1 0 0 0 {} 0 0 0 0\nintr 1 2 3\n",
            idle + busy
        )
    }

    fn ctx(now: Instant) -> ReadContext {
        ReadContext { now, first_tick: false }
    }

    #[test]
    fn test_parse_cpu_line_counts_iowait_as_idle() {
        let times = parse_cpu_line("cpu  10 20 30 40 50 60 70 80").unwrap();
        assert_eq!(times.idle, 90);
        assert_eq!(times.total, 280, "steal is not part of the total");
    }

    #[test]
    fn test_parse_cpu_line_too_short() {
        let err = parse_cpu_line("cpu 1 2 3").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
    }

    #[test]
    fn test_parse_proc_stat_skips_malformed_core() {
        let content = "cpu  1 0 0 1 0 0 0\ncpu0 1 0 0 1 0 0 0\ncpu1 garbage\ncpu2 1 0 0 1 0 0 0\n";
        let (_, cores) = parse_proc_stat(content).unwrap();

        let indices: Vec<usize> = cores.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_parse_proc_stat_requires_aggregate() {
        assert!(parse_proc_stat("cpu0 1 0 0 1 0 0 0\n").is_err());
    }

    #[test]
    fn test_clean_model_name() {
        assert_eq!(
            clean_model_name(" Intel(R) Core(TM) i7-8550U CPU @ 1.80GHz"),
            "Intel Core i7-8550U @ 1.80GHz"
        );
        assert_eq!(clean_model_name(&"x".repeat(60)).len(), 40);
    }

    #[test]
    fn test_average_freq() {
        let cpuinfo = "processor : 0\ncpu MHz : 1000.0\nprocessor : 1\ncpu MHz\t\t: 3000.0\n";
        assert_relative_eq!(average_freq_ghz(cpuinfo), 2.0);
        assert_eq!(average_freq_ghz("nothing here"), 0.0);
    }

    #[test]
    fn test_freq_status() {
        assert_eq!(FreqStatus::from_ghz(3.6), FreqStatus::High);
        assert_eq!(FreqStatus::from_ghz(1.4), FreqStatus::Low);
        assert_eq!(FreqStatus::from_ghz(2.4), FreqStatus::Normal);
    }

    #[test]
    fn test_abbreviate_epp() {
        assert_eq!(abbreviate_epp("balance_performance"), "balperformance");
        assert_eq!(abbreviate_epp("power_save"), "power-save");
    }

    #[test]
    fn test_read_usage_over_two_ticks() {
        let host = FakeHost::new();
        host.write_proc("stat", &stat(100, 900));
        let mut source = CpuSource::new(host.paths.clone());
        let t0 = Instant::now();

        let first = source.read(&ctx(t0)).unwrap();
        assert_eq!(first.usage, 0.0, "first sample has no delta");
        assert_eq!(first.cores, 2);

        // idle +50, total +200
        host.write_proc("stat", &stat(150, 1050));
        let second = source.read(&ctx(t0 + Duration::from_secs(2))).unwrap();
        assert_relative_eq!(second.usage, 75.0);
        assert_relative_eq!(second.per_core[0], 75.0);
        assert_relative_eq!(second.per_core[1], 0.0);
    }

    #[test]
    fn test_read_missing_stat_fails() {
        let host = FakeHost::new();
        let mut source = CpuSource::new(host.paths.clone());
        assert!(source.read(&ctx(Instant::now())).is_err());
    }

    #[test]
    fn test_read_sysfs_details() {
        let host = FakeHost::new();
        host.write_proc("stat", &stat(1, 1));
        host.write_proc("cpuinfo", "model name\t: AMD Ryzen 7 5800X 8-Core Processor\ncpu MHz\t: 3800.0\n");
        host.write_proc("loadavg", "0.50 0.25 0.10 1/200 12345\n");
        host.write_sys("devices/system/cpu/cpu0/cpufreq/scaling_governor", "schedutil\n");
        host.write_sys("devices/system/cpu/cpu0/cpufreq/energy_performance_preference", "balance_power\n");
        host.write_sys("class/hwmon/hwmon0/name", "k10temp\n");
        host.write_sys("class/hwmon/hwmon0/temp1_input", "61500\n");
        host.write_sys("class/hwmon/hwmon1/fan1_input", "0\n");
        host.write_sys("class/hwmon/hwmon1/fan2_input", "1200\n");

        let info = CpuSource::new(host.paths.clone()).read(&ctx(Instant::now())).unwrap();

        assert_eq!(info.model, "AMD Ryzen 7 5800X 8-Core Processor");
        assert_relative_eq!(info.freq_ghz, 3.8);
        assert_eq!(info.freq_status, FreqStatus::High);
        assert_eq!(info.governor, "schedutil");
        assert_eq!(info.epp, "balpower");
        assert_relative_eq!(info.load.five, 0.25);
        assert_relative_eq!(info.temp, 61.5);
        assert_eq!(info.fan_rpm, 1200);
    }

    #[test]
    fn test_thermal_zone_wins() {
        let host = FakeHost::new();
        host.write_sys("class/thermal/thermal_zone0/temp", "45000\n");
        host.write_sys("class/hwmon/hwmon0/name", "coretemp\n");
        host.write_sys("class/hwmon/hwmon0/temp1_input", "70000\n");

        assert_relative_eq!(read_temperature(&host.paths), 45.0);
    }

    #[test]
    fn test_unknown_chip_falls_back_to_positive_reading() {
        let host = FakeHost::new();
        host.write_sys("class/hwmon/hwmon0/name", "nvme\n");
        host.write_sys("class/hwmon/hwmon0/temp1_input", "0\n");
        host.write_sys("class/hwmon/hwmon0/temp2_input", "38000\n");

        assert_relative_eq!(read_temperature(&host.paths), 38.0);
    }

    #[test]
    fn test_missing_details_use_defaults() {
        let host = FakeHost::new();
        host.write_proc("stat", &stat(1, 1));

        let info = CpuSource::new(host.paths.clone()).read(&ctx(Instant::now())).unwrap();
        assert_eq!(info.model, "Unknown CPU");
        assert_eq!(info.governor, "N/A");
        assert_eq!(info.epp, "N/A");
        assert_eq!(info.temp, 0.0);
        assert_eq!(info.fan_rpm, 0);
    }
}
