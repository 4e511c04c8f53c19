//! Battery collector.
//!
//! Reads `/sys/class/power_supply/BAT0`. A host without that directory simply
//! reports no battery.

use super::{read_attr, read_parsed, HostPaths};
use crate::cache::{ReadContext, Source, SourceId};
use crate::error::Result;
use std::path::PathBuf;

/// Battery charging state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryState {
    /// Battery is charging.
    Charging,
    /// Battery is discharging.
    Discharging,
    /// Battery is full.
    Full,
    /// Plugged in but not charging.
    NotCharging,
    /// Unknown state.
    #[default]
    Unknown,
}

impl BatteryState {
    /// Parses the sysfs `status` attribute.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "charging" => Self::Charging,
            "discharging" => Self::Discharging,
            "full" => Self::Full,
            "not charging" => Self::NotCharging,
            _ => Self::Unknown,
        }
    }

    /// Single-character status marker.
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Charging => '+',
            Self::Full => '=',
            _ => '-',
        }
    }

    /// Returns true if the battery is charging.
    #[must_use]
    pub fn is_charging(self) -> bool {
        matches!(self, Self::Charging)
    }
}

/// Unit of the capacity figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityUnit {
    /// From `charge_*` attributes.
    MilliampHours,
    /// From `energy_*` attributes.
    #[default]
    WattHours,
}

impl CapacityUnit {
    /// Display suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::MilliampHours => "mAh",
            Self::WattHours => "Wh",
        }
    }
}

/// Battery reading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatteryInfo {
    /// False when the host has no battery.
    pub present: bool,
    /// Charge level %.
    pub level: u8,
    /// Charging state.
    pub state: BatteryState,
    /// Raw status string.
    pub status: String,
    /// Current draw in W.
    pub power_w: f64,
    /// Full capacity as a percentage of design capacity, 0 when unknown.
    pub health: f64,
    /// Full capacity.
    pub full_capacity: Option<f64>,
    /// Design capacity.
    pub design_capacity: Option<f64>,
    /// Unit of the two capacity figures.
    pub capacity_unit: CapacityUnit,
    /// Voltage in V.
    pub voltage: Option<f64>,
    /// Cell chemistry.
    pub technology: String,
    /// Model name.
    pub model: String,
    /// Manufacturer.
    pub vendor: String,
    /// Charge cycles.
    pub cycle_count: Option<u32>,
}

/// Reads one battery directory.
#[derive(Debug)]
pub struct BatterySource {
    dir: PathBuf,
}

impl BatterySource {
    /// Reads `BAT0` below `paths`.
    pub fn new(paths: &HostPaths) -> Self {
        Self { dir: paths.sys("class/power_supply/BAT0") }
    }

    fn attr(&self, name: &str) -> Option<String> {
        read_attr(&self.dir.join(name))
    }

    fn number(&self, name: &str) -> Option<u64> {
        read_parsed(&self.dir.join(name)).filter(|v| *v > 0)
    }

    /// Reads every attribute; missing ones fall back to empty values.
    pub fn read_info(&self) -> BatteryInfo {
        if !self.dir.exists() {
            return BatteryInfo::default();
        }

        let status = self.attr("status").unwrap_or_else(|| "Unknown".to_string());
        let power_uw = self.number("power_now").or_else(|| self.number("current_now")).unwrap_or(0);

        let charge = (self.number("charge_full"), self.number("charge_full_design"));
        let (unit, full, design) = match charge {
            (Some(full), Some(design)) => (CapacityUnit::MilliampHours, Some(full), Some(design)),
            _ => (CapacityUnit::WattHours, self.number("energy_full"), self.number("energy_full_design")),
        };
        let scale = match unit {
            CapacityUnit::MilliampHours => 1_000.0,
            CapacityUnit::WattHours => 1_000_000.0,
        };
        let health = match (full, design) {
            (Some(full), Some(design)) => full as f64 / design as f64 * 100.0,
            _ => 0.0,
        };

        BatteryInfo {
            present: true,
            level: read_parsed::<u8>(&self.dir.join("capacity")).unwrap_or(0),
            state: BatteryState::parse(&status),
            status,
            power_w: power_uw as f64 / 1_000_000.0,
            health,
            full_capacity: full.map(|v| v as f64 / scale),
            design_capacity: design.map(|v| v as f64 / scale),
            capacity_unit: unit,
            voltage: self.number("voltage_now").map(|v| v as f64 / 1_000_000.0),
            technology: self.attr("technology").unwrap_or_default(),
            model: self.attr("model_name").unwrap_or_default(),
            vendor: self.attr("manufacturer").unwrap_or_default(),
            cycle_count: self.number("cycle_count").map(|v| v as u32),
        }
    }
}

impl Source for BatterySource {
    type Output = BatteryInfo;

    fn id(&self) -> SourceId {
        SourceId::Battery
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<BatteryInfo> {
        Ok(self.read_info())
    }

    fn sentinel(&self) -> BatteryInfo {
        BatteryInfo::default()
    }
}
