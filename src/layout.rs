//! Adaptive layout allocator.
//!
//! [`allocate`] is a pure function from terminal size, [`LayoutMode`] and
//! [`PanelDemands`] to a [`DashboardLayout`]. Regions never overlap and never
//! leave the terminal. Inside the power panel, the variable-cardinality group
//! (containers, pods, security) shares the rows left below the power readout:
//! space is granted by the number of active panels, and each panel's demand
//! only limits how many items it shows.

use crate::error::MonitorError;
use std::fmt;
use std::str::FromStr;

/// Width at which three columns are used.
pub const THREE_COLUMN_MIN_WIDTH: u16 = 100;

/// Width at which two columns are used.
pub const TWO_COLUMN_MIN_WIDTH: u16 = 60;

/// Display emphasis selecting the column ratio table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutMode {
    /// Equal columns.
    #[default]
    Default,
    /// Wide CPU column.
    Cpu,
    /// Wide, tall network panel.
    Network,
    /// Wide power column for containers.
    Docker,
    /// Wide power column; security gets half of the group.
    Security,
    /// Equal columns, reduced detail.
    Minimal,
}

impl LayoutMode {
    /// Every mode in cycling order.
    pub const ALL: [Self; 6] = [Self::Default, Self::Cpu, Self::Network, Self::Docker, Self::Security, Self::Minimal];

    /// The next mode in cycling order.
    #[must_use]
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Cpu => "cpu",
            Self::Network => "network",
            Self::Docker => "docker",
            Self::Security => "security",
            Self::Minimal => "minimal",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutMode {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.name() == lower).ok_or_else(|| MonitorError::ConfigInvalid {
            key: "layout".to_string(),
            message: format!("unknown layout '{s}'"),
        })
    }
}

/// A rectangle of character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    /// First row.
    pub top: u16,
    /// First column.
    pub left: u16,
    /// Rows.
    pub height: u16,
    /// Columns.
    pub width: u16,
}

impl Region {
    /// Creates a region.
    pub const fn new(top: u16, left: u16, height: u16, width: u16) -> Self {
        Self { top, left, height, width }
    }

    /// One past the last row.
    pub fn bottom(self) -> u32 {
        u32::from(self.top) + u32::from(self.height)
    }

    /// One past the last column.
    pub fn right(self) -> u32 {
        u32::from(self.left) + u32::from(self.width)
    }

    /// True when the region covers no cell.
    pub fn is_empty(self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// True when both regions share at least one cell.
    pub fn intersects(self, other: Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && u32::from(self.top) < other.bottom()
            && u32::from(other.top) < self.bottom()
            && u32::from(self.left) < other.right()
            && u32::from(other.left) < self.right()
    }

    /// True when `other` lies entirely inside `self`. Empty regions fit anywhere.
    pub fn contains(self, other: Self) -> bool {
        other.is_empty()
            || (other.top >= self.top
                && other.left >= self.left
                && other.bottom() <= self.bottom()
                && other.right() <= self.right())
    }

    /// The region minus a one-cell border.
    #[must_use]
    pub fn inner(self) -> Self {
        if self.height < 2 || self.width < 2 {
            return Self::new(self.top, self.left, 0, 0);
        }
        Self::new(self.top + 1, self.left + 1, self.height - 2, self.width - 2)
    }

    /// The part of `self` inside `bounds`.
    #[must_use]
    pub fn clip_to(self, bounds: Self) -> Self {
        let top = self.top.max(bounds.top);
        let left = self.left.max(bounds.left);
        let bottom = self.bottom().min(bounds.bottom());
        let right = self.right().min(bounds.right());
        let height = bottom.saturating_sub(u32::from(top)) as u16;
        let width = right.saturating_sub(u32::from(left)) as u16;
        if height == 0 || width == 0 {
            Self::new(top.min(bounds.top.saturating_add(bounds.height)), left, 0, 0)
        } else {
            Self::new(top, left, height, width)
        }
    }
}

#[cfg(feature = "tui")]
impl From<Region> for ratatui::layout::Rect {
    fn from(r: Region) -> Self {
        Self::new(r.left, r.top, r.width, r.height)
    }
}

/// A panel of the variable-cardinality group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPanel {
    /// Running containers.
    Containers,
    /// Cluster pods.
    Pods,
    /// Suspicious addresses.
    Security,
}

/// Runtime list lengths of the group panels; `None` marks an inactive panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelDemands {
    /// Containers to list.
    pub containers: Option<usize>,
    /// Pods to list.
    pub pods: Option<usize>,
    /// Suspicious addresses to list.
    pub security: Option<usize>,
    /// Power-panel rows taken by the readout above the group.
    pub reserved_rows: u16,
}

impl PanelDemands {
    /// Active panels with their demand, in display order.
    pub fn active(&self) -> Vec<(GroupPanel, usize)> {
        [(GroupPanel::Containers, self.containers), (GroupPanel::Pods, self.pods), (GroupPanel::Security, self.security)]
            .into_iter()
            .filter_map(|(panel, demand)| demand.map(|d| (panel, d)))
            .collect()
    }
}

/// Space granted to one group panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSlot {
    /// Which panel.
    pub panel: GroupPanel,
    /// Rows granted, including the panel's header row.
    pub region: Region,
    /// Same as `region.height`.
    pub rows_granted: u16,
    /// `min(rows_granted - 1, demand)`.
    pub items_shown: usize,
}

/// Regions for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardLayout {
    /// Column count chosen from the width tier (1, 2 or 3).
    pub columns: u8,
    /// Row 0.
    pub header: Region,
    /// Last row.
    pub footer: Region,
    /// CPU panel.
    pub cpu: Region,
    /// Memory panel.
    pub memory: Region,
    /// Disks panel.
    pub disks: Region,
    /// Network panel.
    pub network: Region,
    /// Power panel, hosting the group.
    pub power: Region,
    /// Group slots inside the power panel's interior.
    pub group: Vec<PanelSlot>,
}

impl DashboardLayout {
    /// The five body panels.
    pub fn panels(&self) -> [Region; 5] {
        [self.cpu, self.memory, self.disks, self.network, self.power]
    }

    /// Slot granted to `panel`, if active.
    pub fn slot(&self, panel: GroupPanel) -> Option<&PanelSlot> {
        self.group.iter().find(|s| s.panel == panel)
    }
}

/// Splits `rows` among `active` group panels.
///
/// Returned shares follow display order (containers, pods, security) and sum
/// to `rows` whenever at least one panel is active.
pub fn split_group(rows: u16, active: usize, mode: LayoutMode) -> Vec<u16> {
    match active {
        0 => Vec::new(),
        1 => vec![rows],
        2 => vec![rows / 2, rows - rows / 2],
        _ if mode == LayoutMode::Security => {
            let security = rows / 2;
            let rest = rows - security;
            vec![rest / 2, rest - rest / 2, security]
        }
        _ => vec![rows / 3, rows / 3, rows - 2 * (rows / 3)],
    }
}

/// Lays out the group below `reserved_rows` readout rows and one spacing row.
pub fn allocate_group(interior: Region, mode: LayoutMode, demands: &PanelDemands) -> Vec<PanelSlot> {
    let reserved = demands.reserved_rows;
    let rows = if reserved < interior.height.saturating_sub(1) { interior.height - reserved - 1 } else { 0 };
    let active = demands.active();
    let shares = split_group(rows, active.len(), mode);

    let mut top = interior.top.saturating_add(reserved).saturating_add(1);
    active
        .into_iter()
        .zip(shares)
        .map(|((panel, demand), granted)| {
            let region = Region::new(top, interior.left, granted, if granted == 0 { 0 } else { interior.width });
            top = top.saturating_add(granted);
            PanelSlot {
                panel,
                region,
                rows_granted: granted,
                items_shown: usize::from(granted.saturating_sub(1)).min(demand),
            }
        })
        .collect()
}

fn scale(value: u16, ratio: f64) -> u16 {
    (f64::from(value) * ratio) as u16
}

/// Full-width region of `desired` rows at `cursor`, clipped to `body`.
fn stack(cursor: &mut u16, desired: u16, body: Region) -> Region {
    let region = Region::new(*cursor, body.left, desired, body.width).clip_to(body);
    *cursor = cursor.saturating_add(desired);
    region
}

/// Partitions a `width` x `height` terminal.
pub fn allocate(width: u16, height: u16, mode: LayoutMode, demands: &PanelDemands) -> DashboardLayout {
    let screen = Region::new(0, 0, height, width);
    let header = Region::new(0, 0, height.min(1), width).clip_to(screen);
    let footer = if height >= 2 { Region::new(height - 1, 0, 1, width) } else { Region::default() };
    let avail = height.saturating_sub(2);
    let body = Region::new(1, 0, avail, width);
    let row = body.top;

    let (columns, cpu, memory, disks, network, power) = if width >= THREE_COLUMN_MIN_WIDTH {
        let (c1, c2) = match mode {
            LayoutMode::Cpu => (width / 2, width / 4),
            LayoutMode::Network => (width / 4, width / 4),
            LayoutMode::Docker => (scale(width, 0.30), scale(width, 0.20)),
            LayoutMode::Security => (width / 4, scale(width, 0.20)),
            LayoutMode::Default | LayoutMode::Minimal => (width / 3, width / 3),
        };
        let c3 = width - c1 - c2;
        let mem_h = avail / 2;
        let net_h = match mode {
            LayoutMode::Network => scale(avail, 0.7),
            LayoutMode::Docker | LayoutMode::Security => scale(avail, 0.3),
            _ => avail / 2,
        };
        (
            3,
            Region::new(row, 0, avail, c1),
            Region::new(row, c1, mem_h, c2),
            Region::new(row + mem_h, c1, avail - mem_h, c2),
            Region::new(row, c1 + c2, net_h, c3),
            Region::new(row + net_h, c1 + c2, avail - net_h, c3),
        )
    } else if width >= TWO_COLUMN_MIN_WIDTH {
        let c1 = match mode {
            LayoutMode::Cpu => scale(width, 0.6),
            LayoutMode::Network | LayoutMode::Docker | LayoutMode::Security => scale(width, 0.4),
            LayoutMode::Default | LayoutMode::Minimal => width / 2,
        };
        let c2 = width - c1;
        let cpu_h = avail / 2;
        let mem_h = (avail - cpu_h) / 2;
        let net_h = avail / 2;
        (
            2,
            Region::new(row, 0, cpu_h, c1),
            Region::new(row + cpu_h, 0, mem_h, c1),
            Region::new(row + cpu_h + mem_h, 0, avail - cpu_h - mem_h, c1),
            Region::new(row, c1, net_h, c2),
            Region::new(row + net_h, c1, avail - net_h, c2),
        )
    } else {
        let cpu_h = (avail / 3).max(6) / 2;
        let mem_h = (avail / 4).max(4);
        let net_h = (avail / 4).max(4);
        let mut cursor = row;
        let cpu = stack(&mut cursor, cpu_h, body);
        let memory = stack(&mut cursor, mem_h, body);
        let disks = stack(&mut cursor, mem_h, body);
        let network = stack(&mut cursor, net_h, body);
        let rest = u16::try_from(body.bottom().saturating_sub(u32::from(cursor))).unwrap_or(0);
        let power = stack(&mut cursor, rest, body);
        (1, cpu, memory, disks, network, power)
    };

    let group = allocate_group(power.inner(), mode, demands);
    DashboardLayout { columns, header, footer, cpu, memory, disks, network, power, group }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn all_active(containers: usize, pods: usize, security: usize, reserved: u16) -> PanelDemands {
        PanelDemands { containers: Some(containers), pods: Some(pods), security: Some(security), reserved_rows: reserved }
    }

    #[test]
    fn test_split_group_conservation() {
        assert_eq!(split_group(10, 3, LayoutMode::Default), vec![3, 3, 4]);
        assert_eq!(split_group(10, 2, LayoutMode::Default), vec![5, 5]);
        assert_eq!(split_group(10, 1, LayoutMode::Default), vec![10]);
        assert!(split_group(10, 0, LayoutMode::Default).is_empty());
        assert_eq!(split_group(11, 2, LayoutMode::Default), vec![5, 6]);
    }

    #[test]
    fn test_split_group_security_emphasis() {
        assert_eq!(split_group(10, 3, LayoutMode::Security), vec![2, 3, 5]);
        assert_eq!(split_group(7, 3, LayoutMode::Security), vec![2, 2, 3]);
        assert_eq!(split_group(10, 2, LayoutMode::Security), vec![5, 5]);
    }

    #[test]
    fn test_demand_limits_items_not_space() {
        let interior = Region::new(10, 50, 14, 30);
        let slots = allocate_group(interior, LayoutMode::Default, &all_active(0, 50, 2, 3));

        // 14 - 3 reserved - 1 spacing = 10 rows
        let granted: Vec<u16> = slots.iter().map(|s| s.rows_granted).collect();
        assert_eq!(granted, vec![3, 3, 4]);
        assert_eq!(slots[0].items_shown, 0);
        assert_eq!(slots[1].items_shown, 2);
        assert_eq!(slots[2].items_shown, 2);
        assert_eq!(slots[0].region.top, 14);
        assert_eq!(slots[2].region.top, 20);
    }

    #[test]
    fn test_group_without_room() {
        let interior = Region::new(0, 0, 4, 20);
        let slots = allocate_group(interior, LayoutMode::Default, &all_active(5, 5, 5, 3));
        assert!(slots.iter().all(|s| s.rows_granted == 0 && s.items_shown == 0));
    }

    #[test]
    fn test_inactive_panels_are_skipped() {
        let demands = PanelDemands { containers: None, pods: Some(4), security: None, reserved_rows: 0 };
        let slots = allocate_group(Region::new(0, 0, 11, 20), LayoutMode::Default, &demands);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].panel, GroupPanel::Pods);
        assert_eq!(slots[0].rows_granted, 10);
        assert_eq!(slots[0].items_shown, 4);
    }

    #[test]
    fn test_width_tiers() {
        let d = PanelDemands::default();
        assert_eq!(allocate(120, 40, LayoutMode::Default, &d).columns, 3);
        assert_eq!(allocate(100, 40, LayoutMode::Default, &d).columns, 3);
        assert_eq!(allocate(99, 40, LayoutMode::Default, &d).columns, 2);
        assert_eq!(allocate(60, 40, LayoutMode::Default, &d).columns, 2);
        assert_eq!(allocate(59, 40, LayoutMode::Default, &d).columns, 1);
    }

    #[test]
    fn test_three_column_ratios() {
        let d = PanelDemands::default();
        let cpu = allocate(200, 50, LayoutMode::Cpu, &d);
        assert_eq!((cpu.cpu.width, cpu.memory.width, cpu.network.width), (100, 50, 50));

        let net = allocate(200, 50, LayoutMode::Network, &d);
        assert_eq!((net.cpu.width, net.memory.width, net.network.width), (50, 50, 100));
        assert_eq!(net.network.height, 33);

        let sec = allocate(200, 50, LayoutMode::Security, &d);
        assert_eq!((sec.cpu.width, sec.memory.width, sec.power.width), (50, 40, 110));
        assert_eq!(sec.network.height, 14);
        assert_eq!(sec.power.height, 34);
    }

    #[test]
    fn test_header_footer_and_body() {
        let layout = allocate(120, 40, LayoutMode::Default, &PanelDemands::default());
        assert_eq!(layout.header, Region::new(0, 0, 1, 120));
        assert_eq!(layout.footer, Region::new(39, 0, 1, 120));
        assert_eq!(layout.cpu, Region::new(1, 0, 38, 40));
    }

    #[test]
    fn test_two_column_memory_stays_in_left_column() {
        let layout = allocate(80, 30, LayoutMode::Cpu, &PanelDemands::default());
        assert_eq!(layout.cpu.width, 48);
        assert_eq!(layout.memory.width, 48);
        assert!(!layout.memory.intersects(layout.network));
    }

    #[test]
    fn test_tiny_terminal_is_safe() {
        for (w, h) in [(0, 0), (1, 1), (10, 2), (59, 3), (100, 0)] {
            let layout = allocate(w, h, LayoutMode::Default, &all_active(3, 3, 3, 2));
            let screen = Region::new(0, 0, h, w);
            assert!(layout.panels().iter().all(|r| screen.contains(*r)), "{w}x{h}");
        }
    }

    #[test]
    fn test_mode_cycle_and_parse() {
        let mut mode = LayoutMode::Default;
        for _ in 0..LayoutMode::ALL.len() {
            mode = mode.next();
        }
        assert_eq!(mode, LayoutMode::Default);
        assert_eq!(LayoutMode::Default.next(), LayoutMode::Cpu);
        assert_eq!(LayoutMode::Minimal.next(), LayoutMode::Default);
        assert_eq!("Security".parse::<LayoutMode>().unwrap(), LayoutMode::Security);
        assert!("wide".parse::<LayoutMode>().is_err());
        assert_eq!(LayoutMode::Docker.to_string(), "docker");
    }

    fn any_mode() -> impl Strategy<Value = LayoutMode> {
        prop::sample::select(LayoutMode::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_split_never_exceeds_rows(rows in 0u16..500, active in 0usize..=3, mode in any_mode()) {
            let shares = split_group(rows, active, mode);
            prop_assert_eq!(shares.len(), active);
            let sum: u32 = shares.iter().map(|s| u32::from(*s)).sum();
            prop_assert!(sum <= u32::from(rows));
            if active > 0 {
                prop_assert_eq!(sum, u32::from(rows));
            }
        }

        #[test]
        fn prop_regions_disjoint_and_in_bounds(
            w in 0u16..300,
            h in 0u16..120,
            mode in any_mode(),
            c in prop::option::of(0usize..40),
            p in prop::option::of(0usize..40),
            s in prop::option::of(0usize..40),
            reserved in 0u16..8,
        ) {
            let demands = PanelDemands { containers: c, pods: p, security: s, reserved_rows: reserved };
            let layout = allocate(w, h, mode, &demands);
            let screen = Region::new(0, 0, h, w);

            let mut all = vec![layout.header, layout.footer];
            all.extend(layout.panels());
            for (i, a) in all.iter().enumerate() {
                prop_assert!(screen.contains(*a), "{:?} outside {}x{}", a, w, h);
                for b in &all[i + 1..] {
                    prop_assert!(!a.intersects(*b), "{:?} overlaps {:?}", a, b);
                }
            }

            let interior = layout.power.inner();
            for (i, slot) in layout.group.iter().enumerate() {
                prop_assert!(interior.contains(slot.region));
                prop_assert!(slot.items_shown <= usize::from(slot.rows_granted.saturating_sub(1)));
                for other in &layout.group[i + 1..] {
                    prop_assert!(!slot.region.intersects(other.region));
                }
            }
        }
    }
}
