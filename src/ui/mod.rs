//! Dashboard rendering.
//!
//! [`draw`] asks the allocator for regions sized to the frame and the
//! snapshot's panel demands, then fills them. Overlays (help, loading) are
//! drawn last.

pub mod panels;
pub mod widgets;

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::alerts::Alert;
use crate::config::AlertThresholds;
use crate::layout::{allocate, DashboardLayout, LayoutMode};
use crate::snapshot::Snapshot;
use crate::theme::Theme;

/// Everything one frame needs.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    /// Data of this tick.
    pub snapshot: &'a Snapshot,
    /// Alerts of this tick, in evaluator order.
    pub alerts: &'a [Alert],
    /// Active palette.
    pub theme: &'a Theme,
    /// Thresholds for value coloring.
    pub thresholds: &'a AlertThresholds,
    /// Active layout mode.
    pub mode: LayoutMode,
    /// Draw per-core bars.
    pub show_per_core: bool,
    /// Tick period in seconds.
    pub refresh_rate: u64,
    /// Wall-clock time for the header.
    pub clock: &'a str,
    /// Help overlay visible.
    pub show_help: bool,
}

/// Draws one frame and returns the layout used.
pub fn draw(f: &mut Frame, view: &View<'_>) -> DashboardLayout {
    let area = f.area();
    let layout = allocate(area.width, area.height, view.mode, &view.snapshot.panel_demands());

    panels::draw_header(f, view, layout.header);
    panels::draw_cpu(f, view, layout.cpu);
    panels::draw_memory(f, view, layout.memory);
    panels::draw_disks(f, view, layout.disks);
    panels::draw_network(f, view, layout.network);
    panels::draw_power(f, view, layout.power, &layout.group);
    panels::draw_footer(f, view, layout.footer);

    if view.snapshot.loading {
        draw_loading(f, view.theme, area);
    }
    if view.show_help {
        draw_help(f, view.theme, area);
    }
    layout
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(area.x + (area.width - width) / 2, area.y + (area.height - height) / 2, width, height)
}

fn modal<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(Span::styled(title, theme.title()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.warning))
}

fn draw_loading(f: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 36, 5);
    f.render_widget(Clear, popup);
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("  Collecting system data...", theme.body().add_modifier(Modifier::BOLD))),
    ];
    f.render_widget(Paragraph::new(text).block(modal(" sentinel ", theme)), popup);
}

const HELP_KEYS: [(&str, &str); 8] = [
    ("q, Esc", "Quit"),
    ("r", "Refresh all sources now"),
    ("t", "Next theme"),
    ("l", "Next layout"),
    ("i", "Look up public IP again"),
    ("+, =", "Faster refresh"),
    ("-, _", "Slower refresh"),
    ("h, ?", "Toggle help"),
];

fn draw_help(f: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 48, HELP_KEYS.len() as u16 + 6);
    f.render_widget(Clear, popup);

    let mut text = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  sentinel v{}", env!("CARGO_PKG_VERSION")), theme.title())),
        Line::from(""),
    ];
    text.extend(HELP_KEYS.iter().map(|(keys, what)| {
        Line::from(vec![Span::styled(format!("    {keys:<10}"), theme.title()), Span::styled(*what, theme.body())])
    }));
    f.render_widget(Paragraph::new(text).block(modal(" Help ", theme)), popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::evaluate;
    use crate::layout::GroupPanel;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal.backend().buffer().content().iter().map(|c| c.symbol()).collect()
    }

    fn render(snapshot: &Snapshot, width: u16, height: u16, show_help: bool) -> (String, DashboardLayout) {
        let thresholds = AlertThresholds::default();
        let alerts = evaluate(snapshot, &thresholds);
        let theme = Theme::default();
        let view = View {
            snapshot,
            alerts: &alerts,
            theme: &theme,
            thresholds: &thresholds,
            mode: LayoutMode::Default,
            show_per_core: true,
            refresh_rate: 2,
            clock: "12:00:00",
            show_help,
        };
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        let mut layout = DashboardLayout::default();
        terminal
            .draw(|f| {
                layout = draw(f, &view);
            })
            .unwrap();
        (screen_text(&terminal), layout)
    }

    #[test]
    fn test_draws_every_panel() {
        let mut snap = Snapshot::default();
        snap.system.hostname = "box".into();
        snap.cpu.usage = 97.0;
        let (text, layout) = render(&snap, 120, 40, false);

        assert_eq!(layout.columns, 3);
        for title in ["CPU", "Memory", "Disks", "Network", "Power & Services", "box"] {
            assert!(text.contains(title), "missing {title}");
        }
        assert!(text.contains("CPU CRITICAL 97%"));
    }

    #[test]
    fn test_group_slots_follow_availability() {
        let mut snap = Snapshot::default();
        snap.security.available = true;
        snap.security.suspicious_ips = vec![("10.0.0.5".into(), 20)];
        let (text, layout) = render(&snap, 120, 40, false);

        assert!(layout.slot(GroupPanel::Security).is_some());
        assert!(layout.slot(GroupPanel::Containers).is_none());
        assert!(text.contains("10.0.0.5"));
    }

    #[test]
    fn test_loading_and_help_overlays() {
        let snap = Snapshot { loading: true, ..Snapshot::default() };
        let (text, _) = render(&snap, 100, 30, false);
        assert!(text.contains("Collecting system data"));

        let (text, _) = render(&Snapshot::default(), 100, 30, true);
        assert!(text.contains("Toggle help"));
        assert!(!text.contains("Collecting system data"));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        for (w, h) in [(1, 1), (2, 2), (10, 3), (59, 8), (80, 5)] {
            let _ = render(&Snapshot::default(), w, h, true);
        }
    }
}
