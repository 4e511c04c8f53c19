//! Color themes for the dashboard.
//!
//! Every theme maps the same eight roles to 256-color palette entries so
//! that panels never reference a concrete color.

use crate::error::MonitorError;
use ratatui::style::{Color, Modifier, Style};
use std::fmt;
use std::str::FromStr;

/// Built-in theme names, in cycling order.
pub const THEME_NAMES: [&str; 5] = ["default", "nord", "dracula", "gruvbox", "monokai"];

/// A named palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Theme name.
    pub name: &'static str,
    /// Titles, borders and key hints.
    pub primary: Color,
    /// Healthy values.
    pub success: Color,
    /// Values past the high threshold.
    pub warning: Color,
    /// Values past the critical threshold.
    pub danger: Color,
    /// Secondary data.
    pub info: Color,
    /// Highlights.
    pub accent: Color,
    /// Body text.
    pub text: Color,
    /// Labels and empty bar cells.
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "default",
            primary: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            info: Color::Blue,
            accent: Color::Magenta,
            text: Color::White,
            muted: Color::Indexed(240),
        }
    }
}

const fn indexed(name: &'static str, roles: [u8; 8]) -> Theme {
    Theme {
        name,
        primary: Color::Indexed(roles[0]),
        success: Color::Indexed(roles[1]),
        warning: Color::Indexed(roles[2]),
        danger: Color::Indexed(roles[3]),
        info: Color::Indexed(roles[4]),
        accent: Color::Indexed(roles[5]),
        text: Color::Indexed(roles[6]),
        muted: Color::Indexed(roles[7]),
    }
}

impl Theme {
    /// Looks a theme up by name.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "nord" => Some(indexed("nord", [109, 108, 179, 131, 67, 139, 253, 60])),
            "dracula" => Some(indexed("dracula", [141, 84, 228, 203, 117, 212, 253, 61])),
            "gruvbox" => Some(indexed("gruvbox", [108, 142, 214, 167, 109, 175, 223, 102])),
            "monokai" => Some(indexed("monokai", [81, 148, 186, 197, 141, 208, 231, 242])),
            _ => None,
        }
    }

    /// Theme by name, falling back to the default.
    pub fn named_or_default(name: &str) -> Self {
        Self::named(name).unwrap_or_else(|| {
            crate::warn!("theme", "unknown theme '{name}', using default");
            Self::default()
        })
    }

    /// The next theme in cycling order.
    #[must_use]
    pub fn next(&self) -> Self {
        let idx = THEME_NAMES.iter().position(|n| *n == self.name).unwrap_or(0);
        let next = THEME_NAMES[(idx + 1) % THEME_NAMES.len()];
        Self::named(next).unwrap_or_default()
    }

    /// Color for a percentage against high/critical thresholds.
    pub fn level(&self, value: f64, high: f64, critical: f64) -> Color {
        if value >= critical {
            self.danger
        } else if value >= high {
            self.warning
        } else {
            self.success
        }
    }

    /// Panel title style.
    pub fn title(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    /// Border style.
    pub fn border(&self) -> Style {
        Style::default().fg(self.primary)
    }

    /// Label style.
    pub fn label(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Body text style.
    pub fn body(&self) -> Style {
        Style::default().fg(self.text)
    }

    /// Highlight style.
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl FromStr for Theme {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::named(s).ok_or_else(|| MonitorError::ConfigInvalid {
            key: "theme".to_string(),
            message: format!("unknown theme '{s}' (expected one of {})", THEME_NAMES.join(", ")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_resolves() {
        for name in THEME_NAMES {
            assert_eq!(Theme::named(name).unwrap().name, name);
        }
        assert!(Theme::named("solarized").is_none());
        assert!("solarized".parse::<Theme>().is_err());
    }

    #[test]
    fn test_next_cycles() {
        let mut theme = Theme::default();
        let mut seen = Vec::new();
        for _ in 0..THEME_NAMES.len() {
            seen.push(theme.name);
            theme = theme.next();
        }
        assert_eq!(seen, THEME_NAMES);
        assert_eq!(theme.name, "default");
    }

    #[test]
    fn test_palette_entries() {
        let nord = Theme::named("nord").unwrap();
        assert_eq!(nord.primary, Color::Indexed(109));
        assert_eq!(nord.muted, Color::Indexed(60));
        assert_eq!(Theme::default().muted, Color::Indexed(240));
    }

    #[test]
    fn test_level_colors() {
        let t = Theme::default();
        assert_eq!(t.level(10.0, 85.0, 95.0), t.success);
        assert_eq!(t.level(85.0, 85.0, 95.0), t.warning);
        assert_eq!(t.level(99.0, 85.0, 95.0), t.danger);
    }
}
