//! Panel rendering.
//!
//! Every panel draws a bordered block into the region the allocator granted
//! and then fills the interior one row at a time until rows run out. Panels
//! never draw outside their region.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::Frame;

use super::widgets::{Bar, BlockGraph, BrailleSparkline};
use super::View;
use crate::alerts::Severity;
use crate::collectors::{BatteryState, DiskKind, FreqStatus, PodPhase};
use crate::layout::{GroupPanel, PanelSlot, Region};
use crate::theme::Theme;

/// Hands out one-row rects from the top of an area.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rows {
    area: Rect,
    used: u16,
}

impl Rows {
    pub(crate) fn new(area: Rect) -> Self {
        Self { area, used: 0 }
    }

    pub(crate) fn remaining(&self) -> u16 {
        self.area.height - self.used
    }

    /// Next row, `None` once the area is exhausted.
    pub(crate) fn next_row(&mut self) -> Option<Rect> {
        self.take(1)
    }

    /// Next `n` rows (fewer if the area is short).
    pub(crate) fn take(&mut self, n: u16) -> Option<Rect> {
        let n = n.min(self.remaining());
        if n == 0 {
            return None;
        }
        let rect = Rect::new(self.area.x, self.area.y + self.used, self.area.width, n);
        self.used += n;
        Some(rect)
    }

    pub(crate) fn skip(&mut self, n: u16) {
        self.used += n.min(self.remaining());
    }
}

/// Char-count truncation with an ellipsis.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else if max == 0 {
        String::new()
    } else {
        let mut out: String = text.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}

fn panel_block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(Span::styled(title, theme.title()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.border())
}

/// Draws the block and returns its interior, `None` for an empty region.
fn open_panel(f: &mut Frame, region: Region, title: &str, theme: &Theme) -> Option<Rect> {
    if region.is_empty() {
        return None;
    }
    let area: Rect = region.into();
    f.render_widget(panel_block(title, theme), area);
    let inner: Rect = region.inner().into();
    (inner.width > 0 && inner.height > 0).then_some(inner)
}

fn text_row(f: &mut Frame, row: Rect, spans: Vec<Span<'_>>) {
    f.render_widget(Paragraph::new(Line::from(spans)), row);
}

/// Label followed by a bar filling the rest of the row.
fn bar_row(f: &mut Frame, row: Rect, label: &str, percent: f64, color: ratatui::style::Color, theme: &Theme) {
    let label_width = (label.chars().count() as u16 + 1).min(row.width);
    text_row(f, Rect { width: label_width, ..row }, vec![Span::styled(label.to_string(), theme.label())]);
    let bar_area = Rect { x: row.x + label_width, width: row.width - label_width, ..row };
    f.render_widget(Bar::new(percent).color(color).empty(theme.muted), bar_area);
}

/// Label followed by a braille sparkline.
fn spark_row(f: &mut Frame, row: Rect, label: String, data: &[f64], max: f64, theme: &Theme) {
    let label_width = (label.chars().count() as u16 + 1).min(row.width);
    text_row(f, Rect { width: label_width, ..row }, vec![Span::styled(label, theme.body())]);
    let spark = Rect { x: row.x + label_width, width: row.width - label_width, ..row };
    f.render_widget(BrailleSparkline::new(data, max).color(theme.info), spark);
}

/// Top row: name and version, hostname centered, uptime and clock right.
pub fn draw_header(f: &mut Frame, view: &View<'_>, region: Region) {
    if region.is_empty() {
        return;
    }
    let area: Rect = region.into();
    let theme = view.theme;
    let left = format!(" sentinel v{}", env!("CARGO_PKG_VERSION"));
    let host = &view.snapshot.system.hostname;
    let right = format!("up {}  {} ", view.snapshot.system.uptime, view.clock);

    let width = usize::from(area.width);
    let host_x = width.saturating_sub(host.chars().count()) / 2;
    let left_len = left.chars().count();
    let gap1 = host_x.saturating_sub(left_len);
    let gap2 = width.saturating_sub(left_len + gap1 + host.chars().count() + right.chars().count());

    let line = Line::from(vec![
        Span::styled(left, theme.title()),
        Span::raw(" ".repeat(gap1)),
        Span::styled(host.clone(), theme.body().add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(gap2)),
        Span::styled(right, theme.label()),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

/// CPU: model, usage bar, sensors, load, trend, per-core bars, history graph.
pub fn draw_cpu(f: &mut Frame, view: &View<'_>, region: Region) {
    let theme = view.theme;
    let Some(inner) = open_panel(f, region, " CPU ", theme) else {
        return;
    };
    let cpu = &view.snapshot.cpu;
    let t = view.thresholds;
    let mut rows = Rows::new(inner);

    if let Some(row) = rows.next_row() {
        let model = truncate(&cpu.model, usize::from(row.width).saturating_sub(10));
        text_row(f, row, vec![Span::styled(model, theme.body()), Span::styled(format!(" {}c", cpu.cores), theme.label())]);
    }
    if let Some(row) = rows.next_row() {
        bar_row(f, row, "Usage", cpu.usage, theme.level(cpu.usage, t.cpu_high, t.cpu_critical), theme);
    }
    if let Some(row) = rows.next_row() {
        let freq_color = match cpu.freq_status {
            FreqStatus::High => theme.warning,
            FreqStatus::Low => theme.info,
            FreqStatus::Normal => theme.success,
        };
        let mut spans = vec![
            Span::styled("Temp ", theme.label()),
            Span::styled(format!("{:.0}°C", cpu.temp), Style::default().fg(theme.level(cpu.temp, t.temp_high, t.temp_critical))),
            Span::styled("  Freq ", theme.label()),
            Span::styled(format!("{:.2}GHz", cpu.freq_ghz), Style::default().fg(freq_color)),
        ];
        if cpu.fan_rpm > 0 {
            spans.push(Span::styled("  Fan ", theme.label()));
            spans.push(Span::styled(format!("{}rpm", cpu.fan_rpm), theme.body()));
        }
        text_row(f, row, spans);
    }
    if let Some(row) = rows.next_row() {
        let mut spans = vec![
            Span::styled("Load ", theme.label()),
            Span::styled(format!("{:.2} {:.2} {:.2}", cpu.load.one, cpu.load.five, cpu.load.fifteen), theme.body()),
        ];
        if !cpu.governor.is_empty() {
            spans.push(Span::styled(format!("  {}", cpu.governor), theme.accent_style()));
        }
        if !cpu.epp.is_empty() {
            spans.push(Span::styled(format!("/{}", cpu.epp), theme.label()));
        }
        text_row(f, row, spans);
    }
    if let Some(row) = rows.next_row() {
        spark_row(f, row, "Trend".to_string(), &view.snapshot.trends.cpu, 100.0, theme);
    }

    if view.show_per_core && rows.remaining() > 1 {
        rows.skip(1);
        for (i, usage) in cpu.per_core.iter().enumerate() {
            let Some(row) = rows.next_row() else {
                break;
            };
            bar_row(f, row, &format!("C{i:<2}"), *usage, theme.level(*usage, t.cpu_high, t.cpu_critical), theme);
        }
    }

    if rows.remaining() >= 3 {
        rows.skip(1);
        if let Some(area) = rows.take(rows.remaining()) {
            let graph = BlockGraph::new(&view.snapshot.trends.cpu, 100.0).colors(theme.success, theme.warning, theme.danger);
            f.render_widget(graph, area);
        }
    }
}

/// Memory: used and available figures, usage bar, trend.
pub fn draw_memory(f: &mut Frame, view: &View<'_>, region: Region) {
    let theme = view.theme;
    let Some(inner) = open_panel(f, region, " Memory ", theme) else {
        return;
    };
    let mem = &view.snapshot.memory;
    let t = view.thresholds;
    let mut rows = Rows::new(inner);

    if let Some(row) = rows.next_row() {
        text_row(
            f,
            row,
            vec![
                Span::styled("Used ", theme.label()),
                Span::styled(format!("{} / {} MB", mem.used_mb, mem.total_mb), theme.body()),
            ],
        );
    }
    if let Some(row) = rows.next_row() {
        bar_row(f, row, "RAM", mem.percent, theme.level(mem.percent, t.mem_high, t.mem_critical), theme);
    }
    if let Some(row) = rows.next_row() {
        text_row(
            f,
            row,
            vec![Span::styled("Avail ", theme.label()), Span::styled(format!("{} MB", mem.available_mb), theme.body())],
        );
    }
    if let Some(row) = rows.next_row() {
        spark_row(f, row, "Trend".to_string(), &view.snapshot.trends.memory, 100.0, theme);
    }
}

/// Disks: one line plus one bar per filesystem, one line per volume.
pub fn draw_disks(f: &mut Frame, view: &View<'_>, region: Region) {
    let theme = view.theme;
    let Some(inner) = open_panel(f, region, " Disks ", theme) else {
        return;
    };
    let mut rows = Rows::new(inner);

    for disk in &view.snapshot.disks {
        match disk.kind {
            DiskKind::Disk => {
                let Some(row) = rows.next_row() else {
                    break;
                };
                text_row(
                    f,
                    row,
                    vec![
                        Span::styled(format!("{:<8}", truncate(&disk.mount, 8)), theme.body()),
                        Span::styled(format!(" {} / {}", disk.used, disk.total), theme.label()),
                    ],
                );
                let Some(row) = rows.next_row() else {
                    break;
                };
                let pct = f64::from(disk.percent);
                bar_row(f, row, "", pct, theme.level(pct, 80.0, 95.0), theme);
            }
            DiskKind::DockerVolume => {
                let Some(row) = rows.next_row() else {
                    break;
                };
                text_row(
                    f,
                    row,
                    vec![
                        Span::styled("vol ", theme.accent_style()),
                        Span::styled(format!("{:<14}", disk.mount), theme.body()),
                        Span::styled(format!(" {}", disk.used), theme.label()),
                    ],
                );
            }
        }
    }
}

/// Network: link, addresses, throughput trends, proxy and VPN peers.
pub fn draw_network(f: &mut Frame, view: &View<'_>, region: Region) {
    let theme = view.theme;
    let Some(inner) = open_panel(f, region, " Network ", theme) else {
        return;
    };
    let snap = view.snapshot;
    let net = &snap.network;
    let mut rows = Rows::new(inner);

    if let Some(row) = rows.next_row() {
        let iface = net.interface.as_deref().unwrap_or("no route");
        let (link, link_color) = if net.link_up { ("up", theme.success) } else { ("down", theme.danger) };
        let mut spans = vec![
            Span::styled(iface.to_string(), theme.body().add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {}", net.connection_type.label()), theme.label()),
            Span::styled(format!(" {link}"), Style::default().fg(link_color)),
        ];
        if let Some(speed) = net.link_speed_mbps {
            spans.push(Span::styled(format!(" {speed}Mb/s"), theme.label()));
        }
        if !net.ssid.is_empty() {
            spans.push(Span::styled(format!(" {}", net.ssid), theme.accent_style()));
        }
        text_row(f, row, spans);
    }
    if let Some(row) = rows.next_row() {
        text_row(
            f,
            row,
            vec![
                Span::styled("IP ", theme.label()),
                Span::styled(net.local_ip.clone(), theme.body()),
                Span::styled("  Public ", theme.label()),
                Span::styled(snap.public_ip.clone(), theme.body()),
            ],
        );
    }
    let rate_max = BrailleSparkline::peak(&snap.trends.rx, 1.0).max(BrailleSparkline::peak(&snap.trends.tx, 1.0));
    if let Some(row) = rows.next_row() {
        spark_row(f, row, format!("↓ {:>8.1} KB/s", net.rx_kbps), &snap.trends.rx, rate_max, theme);
    }
    if let Some(row) = rows.next_row() {
        spark_row(f, row, format!("↑ {:>8.1} KB/s", net.tx_kbps), &snap.trends.tx, rate_max, theme);
    }
    if let Some(row) = rows.next_row() {
        text_row(
            f,
            row,
            vec![
                Span::styled("Total ", theme.label()),
                Span::styled(format!("↓{:.2}G ↑{:.2}G", net.rx_total_gb, net.tx_total_gb), theme.body()),
            ],
        );
    }

    if let Some(source) = &snap.proxy.source {
        if let Some(row) = rows.next_row() {
            let proxy_max = BrailleSparkline::peak(&snap.trends.proxy_rps, 1.0);
            let label = format!("{source} {} req {:.1}/s", snap.proxy.requests, snap.proxy.rps);
            spark_row(f, row, label, &snap.trends.proxy_rps, proxy_max, theme);
        }
    }

    if net.wg_active || !net.vpn.peers.is_empty() || net.vpn.permission_denied {
        if let Some(row) = rows.next_row() {
            let mut spans = vec![
                Span::styled("VPN ", theme.label()),
                Span::styled(format!("{}/{} peers", net.wg_peers_connected(), net.wg_peers()), theme.body()),
            ];
            if let Some(addr) = &net.wg_address {
                spans.push(Span::styled(format!(" {addr}"), theme.label()));
            }
            if net.vpn.permission_denied {
                spans.push(Span::styled(" (sudo required)", Style::default().fg(theme.warning)));
            }
            text_row(f, row, spans);
        }
        for peer in &net.vpn.peers {
            let Some(row) = rows.next_row() else {
                break;
            };
            let color = if peer.connected { theme.success } else { theme.muted };
            text_row(
                f,
                row,
                vec![
                    Span::styled(if peer.connected { " ● " } else { " ○ " }, Style::default().fg(color)),
                    Span::styled(truncate(&peer.endpoint, 21), theme.body()),
                    Span::styled(format!(" {}", peer.latency), theme.label()),
                ],
            );
        }
    }
}

/// Power readout rows; must match [`crate::snapshot::Snapshot::power_readout_rows`].
fn draw_power_readout(f: &mut Frame, view: &View<'_>, rows: &mut Rows) {
    let theme = view.theme;
    let snap = view.snapshot;
    let mut drew = false;

    if snap.energy.available {
        if let Some(row) = rows.next_row() {
            let source = snap.energy.source.map_or("", |s| s.label());
            text_row(
                f,
                row,
                vec![
                    Span::styled("Draw ", theme.label()),
                    Span::styled(format!("{:.1}W", snap.energy.watts), theme.body().add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" {source}"), theme.label()),
                ],
            );
        }
        if let Some(row) = rows.next_row() {
            let max = BrailleSparkline::peak(&snap.trends.power, 10.0);
            f.render_widget(BrailleSparkline::new(&snap.trends.power, max).color(theme.accent), row);
        }
        drew = true;
    }

    let battery = &snap.battery;
    if battery.present {
        if drew {
            rows.skip(1);
        }
        let t = view.thresholds;
        let level_color = if battery.state.is_charging() {
            theme.success
        } else if battery.level <= t.battery_critical {
            theme.danger
        } else if battery.level <= t.battery_low {
            theme.warning
        } else {
            theme.success
        };
        if let Some(row) = rows.next_row() {
            let state = if battery.state == BatteryState::Unknown { String::new() } else { format!(" {}", battery.status) };
            text_row(
                f,
                row,
                vec![
                    Span::styled("Battery ", theme.label()),
                    Span::styled(format!("{}% {}", battery.level, battery.state.symbol()), Style::default().fg(level_color)),
                    Span::styled(state, theme.label()),
                ],
            );
        }
        if let Some(row) = rows.next_row() {
            bar_row(f, row, "", f64::from(battery.level), level_color, theme);
        }
        if battery.health > 0.0 {
            if let Some(row) = rows.next_row() {
                let mut spans =
                    vec![Span::styled("Health ", theme.label()), Span::styled(format!("{:.0}%", battery.health), theme.body())];
                if let Some(cycles) = battery.cycle_count {
                    spans.push(Span::styled(format!("  {cycles} cycles"), theme.label()));
                }
                text_row(f, row, spans);
            }
        }
        if battery.power_w > 0.0 {
            if let Some(row) = rows.next_row() {
                text_row(
                    f,
                    row,
                    vec![Span::styled("Rate ", theme.label()), Span::styled(format!("{:.1}W", battery.power_w), theme.body())],
                );
            }
        }
        drew = true;
    }

    if !drew {
        if let Some(row) = rows.next_row() {
            text_row(f, row, vec![Span::styled("No power data", theme.label())]);
        }
    }
}

fn group_header(f: &mut Frame, row: Rect, title: &str, detail: String, theme: &Theme) {
    text_row(
        f,
        row,
        vec![Span::styled(title.to_string(), theme.title()), Span::styled(format!(" {detail}"), theme.label())],
    );
}

fn draw_containers_slot(f: &mut Frame, view: &View<'_>, slot: &PanelSlot) {
    let theme = view.theme;
    let c = &view.snapshot.containers;
    let mut rows = Rows::new(slot.region.into());
    if let Some(row) = rows.next_row() {
        group_header(f, row, "Docker", format!("{}/{} running", c.running, c.total), theme);
    }
    for container in c.containers.iter().filter(|c| c.is_running()).take(slot.items_shown) {
        let Some(row) = rows.next_row() else {
            break;
        };
        text_row(
            f,
            row,
            vec![
                Span::styled(" ● ", Style::default().fg(theme.success)),
                Span::styled(format!("{:<16}", truncate(&container.name, 16)), theme.body()),
                Span::styled(format!(" {:5.1}% {:5.1}%", container.cpu, container.mem), theme.label()),
            ],
        );
    }
}

fn draw_pods_slot(f: &mut Frame, view: &View<'_>, slot: &PanelSlot) {
    let theme = view.theme;
    let k = &view.snapshot.kubernetes;
    let mut rows = Rows::new(slot.region.into());
    if let Some(row) = rows.next_row() {
        let detail = format!(
            "{} nodes {}/{} R{} P{} F{}",
            truncate(&k.context, 20),
            k.nodes_ready,
            k.nodes,
            k.pods_running,
            k.pods_pending,
            k.pods_failed
        );
        group_header(f, row, "K8s", detail, theme);
    }
    for pod in k.pods.iter().take(slot.items_shown) {
        let Some(row) = rows.next_row() else {
            break;
        };
        let color = match pod.phase() {
            PodPhase::Running => theme.success,
            PodPhase::Pending => theme.warning,
            PodPhase::Failed => theme.danger,
            PodPhase::Other => theme.muted,
        };
        text_row(
            f,
            row,
            vec![
                Span::styled(format!(" {}/", pod.namespace), theme.label()),
                Span::styled(pod.name.clone(), theme.body()),
                Span::styled(format!(" {} {}", pod.ready, pod.status), Style::default().fg(color)),
            ],
        );
    }
}

fn draw_security_slot(f: &mut Frame, view: &View<'_>, slot: &PanelSlot) {
    let theme = view.theme;
    let s = &view.snapshot.security;
    let mut rows = Rows::new(slot.region.into());
    if let Some(row) = rows.next_row() {
        let detail = format!("fail {} ok {} ({:.0}% failed)", s.failed_logins, s.successful_logins, s.failed_ratio * 100.0);
        group_header(f, row, "Security", detail, theme);
    }
    let worst = s.suspicious_ips.first().map_or(1, |(_, n)| (*n).max(1));
    for (ip, hits) in s.suspicious_ips.iter().take(slot.items_shown) {
        let Some(row) = rows.next_row() else {
            break;
        };
        let color = if *hits * 2 >= worst { theme.danger } else { theme.warning };
        text_row(
            f,
            row,
            vec![
                Span::styled(" ! ", Style::default().fg(color)),
                Span::styled(format!("{ip:<15}"), theme.body()),
                Span::styled(format!(" {hits} hits"), theme.label()),
            ],
        );
    }
}

/// Power: readout, then the container, pod and security slots.
pub fn draw_power(f: &mut Frame, view: &View<'_>, region: Region, group: &[PanelSlot]) {
    let theme = view.theme;
    let Some(inner) = open_panel(f, region, " Power & Services ", theme) else {
        return;
    };
    let mut rows = Rows::new(inner);
    draw_power_readout(f, view, &mut rows);

    for slot in group.iter().filter(|s| s.rows_granted > 0) {
        match slot.panel {
            GroupPanel::Containers => draw_containers_slot(f, view, slot),
            GroupPanel::Pods => draw_pods_slot(f, view, slot),
            GroupPanel::Security => draw_security_slot(f, view, slot),
        }
    }
}

/// Bottom row: key hints and settings left, newest alerts right.
pub fn draw_footer(f: &mut Frame, view: &View<'_>, region: Region) {
    if region.is_empty() {
        return;
    }
    let area: Rect = region.into();
    let theme = view.theme;

    let mut left = vec![
        Span::styled(" q", theme.title()),
        Span::styled(" quit ", theme.label()),
        Span::styled("r", theme.title()),
        Span::styled(" refresh ", theme.label()),
        Span::styled("t", theme.title()),
        Span::styled(format!(" {} ", theme.name), theme.label()),
        Span::styled("l", theme.title()),
        Span::styled(format!(" {} ", view.mode), theme.label()),
        Span::styled("+/-", theme.title()),
        Span::styled(format!(" {}s ", view.refresh_rate), theme.label()),
        Span::styled("h", theme.title()),
        Span::styled(" help", theme.label()),
    ];
    if let crate::collectors::UpdateStatus::Available(version) = &view.snapshot.update {
        left.push(Span::styled(format!("  update v{version}"), theme.accent_style()));
    }
    f.render_widget(Paragraph::new(Line::from(left)), area);

    let shown: Vec<_> = view.alerts.iter().take(3).collect();
    if shown.is_empty() {
        return;
    }
    let mut right = Vec::new();
    for (i, alert) in shown.iter().enumerate() {
        if i > 0 {
            right.push(Span::styled(" │ ", theme.label()));
        }
        let color = match alert.severity {
            Severity::Danger => theme.danger,
            Severity::Warning => theme.warning,
        };
        right.push(Span::styled(
            format!("{} {}", alert.name, alert.value),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }
    right.push(Span::raw(" "));
    f.render_widget(Paragraph::new(Line::from(right)).alignment(ratatui::layout::Alignment::Right), area);
}
