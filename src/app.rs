//! Interactive dashboard state and loop.

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use std::io::stdout;
use std::time::{Duration, Instant};

use crate::alerts::{evaluate, Alert};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{MonitorError, Result};
use crate::input::{handle_key, Action};
use crate::layout::LayoutMode;
use crate::snapshot::Snapshot;
use crate::theme::Theme;
use crate::ui::{self, View};

/// Upper bound on one input wait; also the loop's clock.
pub const INPUT_WAIT: Duration = Duration::from_millis(500);

const CLOCK_FORMAT: &str = "%H:%M:%S";

/// Dashboard state.
#[derive(Debug)]
pub struct App {
    engine: Engine,
    theme: Theme,
    mode: LayoutMode,
    show_help: bool,
    snapshot: Snapshot,
    alerts: Vec<Alert>,
}

impl App {
    /// Creates the dashboard for `config`.
    pub fn new(config: Config) -> Self {
        Self::with_engine(Engine::new(config))
    }

    /// Creates the dashboard around an existing engine.
    pub fn with_engine(engine: Engine) -> Self {
        let theme = Theme::named_or_default(&engine.config().theme);
        let mode = engine.config().layout_mode();
        Self { engine, theme, mode, show_help: false, snapshot: Snapshot::default(), alerts: Vec::new() }
    }

    /// Ticks the engine and re-evaluates alerts.
    pub fn update(&mut self, now: Instant) {
        self.snapshot = self.engine.tick(now);
        self.alerts = evaluate(&self.snapshot, &self.engine.config().alerts);
    }

    /// Applies a key action. Returns true when the dashboard should exit.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::Refresh => self.engine.refresh_now(),
            Action::NextTheme => {
                self.theme = self.theme.next();
                crate::debug!("app", "theme {}", self.theme);
            }
            Action::NextLayout => {
                self.mode = self.mode.next();
                crate::debug!("app", "layout {}", self.mode);
            }
            Action::Help => self.show_help = !self.show_help,
            Action::RefreshPublicIp => self.engine.refresh_public_ip(),
            Action::Faster => {
                self.engine.faster();
            }
            Action::Slower => {
                self.engine.slower();
            }
            Action::None => {}
        }
        false
    }

    /// The frame description for the current state.
    pub fn view<'a>(&'a self, clock: &'a str) -> View<'a> {
        View {
            snapshot: &self.snapshot,
            alerts: &self.alerts,
            theme: &self.theme,
            thresholds: &self.engine.config().alerts,
            mode: self.mode,
            show_per_core: self.engine.config().show_per_core,
            refresh_rate: self.engine.config().refresh_rate,
            clock,
            show_help: self.show_help,
        }
    }

    /// Active theme.
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Active layout mode.
    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// Help overlay visible.
    pub fn show_help(&self) -> bool {
        self.show_help
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Alerts of the latest tick.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Draws one frame. A rendering failure is logged, not returned.
    pub fn render<B: Backend>(&self, terminal: &mut Terminal<B>) {
        let clock = chrono::Local::now().format(CLOCK_FORMAT).to_string();
        let view = self.view(&clock);
        if let Err(err) = terminal.draw(|f| {
            ui::draw(f, &view);
        }) {
            crate::error!("app", "draw failed: {err}");
        }
    }

    /// Runs the dashboard on the real terminal until the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be set up, polled or restored.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout());
        let result = Terminal::new(backend).map_err(MonitorError::from).and_then(|mut terminal| {
            let result = self.run_loop(&mut terminal);
            let _ = terminal.show_cursor();
            result
        });

        disable_raw_mode()?;
        stdout().execute(LeaveAlternateScreen)?;
        result
    }

    fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            self.update(Instant::now());
            self.render(terminal);

            if event::poll(INPUT_WAIT)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.apply(handle_key(key)) {
                        crate::info!("app", "quit");
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::fixture::FakeHost;
    use ratatui::backend::TestBackend;

    fn offline_app(host: &FakeHost) -> App {
        let mut config = Config::default();
        config.integrations.docker = false;
        config.integrations.kubernetes = false;
        config.public_ip_check = false;
        config.show_vpn = false;
        config.proxy_logs.clear();
        config.security_logs.clear();
        App::with_engine(Engine::with_paths(config, host.paths.clone()))
    }

    #[test]
    fn test_first_update_is_loading() {
        let host = FakeHost::new();
        let mut app = offline_app(&host);
        app.update(Instant::now());
        assert!(app.snapshot().loading);
        app.update(Instant::now());
        assert!(!app.snapshot().loading);
    }

    #[test]
    fn test_actions_change_state() {
        let host = FakeHost::new();
        let mut app = offline_app(&host);

        assert!(!app.apply(Action::NextTheme));
        assert_eq!(app.theme().name, "nord");

        assert!(!app.apply(Action::NextLayout));
        assert_eq!(app.mode(), LayoutMode::Default.next());

        app.apply(Action::Help);
        assert!(app.show_help());
        app.apply(Action::Help);
        assert!(!app.show_help());

        assert!(app.apply(Action::Quit));
    }

    #[test]
    fn test_rate_keys_clamp() {
        let host = FakeHost::new();
        let mut app = offline_app(&host);
        for _ in 0..5 {
            app.apply(Action::Faster);
        }
        assert_eq!(app.engine().config().refresh_rate, 1);
        for _ in 0..20 {
            app.apply(Action::Slower);
        }
        assert_eq!(app.engine().config().refresh_rate, 10);
    }

    #[test]
    fn test_refresh_leaves_fast_start() {
        let host = FakeHost::new();
        let mut app = offline_app(&host);
        app.apply(Action::Refresh);
        assert!(!app.engine().is_first_tick());
    }

    #[test]
    fn test_render_to_test_backend() {
        let host = FakeHost::new();
        let mut app = offline_app(&host);
        app.update(Instant::now());
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        app.render(&mut terminal);
        let text: String = terminal.backend().buffer().content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Collecting system data"));
    }
}
