//! Power draw: RAPL package energy counter, or battery discharge rate.

use super::battery::BatterySource;
use super::{read_parsed, HostPaths};
use crate::cache::{ReadContext, Source, SourceId};
use crate::delta::CounterDelta;
use crate::error::Result;
use std::path::PathBuf;

const RAPL_CANDIDATES: [&str; 4] = [
    "class/powercap/intel-rapl/intel-rapl:0/energy_uj",
    "class/powercap/intel-rapl:0/energy_uj",
    "devices/virtual/powercap/intel-rapl/intel-rapl:0/energy_uj",
    "class/powercap/amd-rapl/amd-rapl:0/energy_uj",
];

/// Where a power figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    /// Package energy counter.
    Rapl,
    /// Battery discharge rate.
    Battery,
}

impl PowerSource {
    /// Four-letter label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Rapl => "RAPL",
            Self::Battery => "BATT",
        }
    }
}

/// Power reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyInfo {
    /// True when `watts` is meaningful.
    pub available: bool,
    /// Power draw in W.
    pub watts: f64,
    /// Origin of the figure.
    pub source: Option<PowerSource>,
}

/// Derives power from the energy counter, falling back to the battery.
#[derive(Debug)]
pub struct EnergySource {
    rapl: Option<PathBuf>,
    delta: CounterDelta<()>,
    battery: BatterySource,
}

impl EnergySource {
    /// Probes for a RAPL counter below `paths`.
    pub fn new(paths: &HostPaths) -> Self {
        let rapl = RAPL_CANDIDATES.iter().map(|rel| paths.sys(rel)).find(|p| p.exists());
        Self { rapl, delta: CounterDelta::new(), battery: BatterySource::new(paths) }
    }

    fn rapl_watts(&mut self, ctx: &ReadContext) -> Option<f64> {
        let path = self.rapl.as_ref()?;
        let Some(energy_uj) = read_parsed::<u64>(path) else {
            crate::trace!("energy", "{} unreadable", path.display());
            return None;
        };
        let primed = self.delta.is_primed(&());
        let uj_per_sec = self.delta.rate((), energy_uj, ctx.now);
        primed.then_some(uj_per_sec / 1_000_000.0)
    }
}

impl Source for EnergySource {
    type Output = EnergyInfo;

    fn id(&self) -> SourceId {
        SourceId::Energy
    }

    fn read(&mut self, ctx: &ReadContext) -> Result<EnergyInfo> {
        if let Some(watts) = self.rapl_watts(ctx) {
            return Ok(EnergyInfo { available: true, watts, source: Some(PowerSource::Rapl) });
        }
        let battery = self.battery.read_info();
        if battery.present && battery.power_w > 0.0 {
            return Ok(EnergyInfo { available: true, watts: battery.power_w, source: Some(PowerSource::Battery) });
        }
        Ok(EnergyInfo::default())
    }

    fn sentinel(&self) -> EnergyInfo {
        EnergyInfo::default()
    }
}
