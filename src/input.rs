//! Input handling for the dashboard.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Input action resulting from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit the application.
    Quit,
    /// Recompute every source on the next tick.
    Refresh,
    /// Cycle to the next theme.
    NextTheme,
    /// Cycle to the next layout mode.
    NextLayout,
    /// Toggle the help overlay.
    Help,
    /// Look the public address up again.
    RefreshPublicIp,
    /// Shorten the tick period.
    Faster,
    /// Lengthen the tick period.
    Slower,
    /// No action.
    None,
}

/// Maps a key event to an action.
#[must_use]
pub fn handle_key(event: KeyEvent) -> Action {
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('c' | 'C') = event.code {
            return Action::Quit;
        }
    }

    match event.code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r' | 'R') | KeyCode::F(5) => Action::Refresh,
        KeyCode::Char('t' | 'T') => Action::NextTheme,
        KeyCode::Char('l' | 'L') => Action::NextLayout,
        KeyCode::Char('h' | 'H' | '?') | KeyCode::F(1) => Action::Help,
        KeyCode::Char('i' | 'I') => Action::RefreshPublicIp,
        KeyCode::Char('+' | '=') => Action::Faster,
        KeyCode::Char('-' | '_') => Action::Slower,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Action {
        handle_key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_quit_actions() {
        assert_eq!(key(KeyCode::Char('q')), Action::Quit);
        assert_eq!(key(KeyCode::Char('Q')), Action::Quit);
        assert_eq!(key(KeyCode::Esc), Action::Quit);
        assert_eq!(handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)), Action::Quit);
    }

    #[test]
    fn test_plain_c_is_ignored() {
        assert_eq!(key(KeyCode::Char('c')), Action::None);
    }

    #[test]
    fn test_dashboard_keys() {
        assert_eq!(key(KeyCode::Char('r')), Action::Refresh);
        assert_eq!(key(KeyCode::Char('t')), Action::NextTheme);
        assert_eq!(key(KeyCode::Char('l')), Action::NextLayout);
        assert_eq!(key(KeyCode::Char('h')), Action::Help);
        assert_eq!(key(KeyCode::Char('?')), Action::Help);
        assert_eq!(key(KeyCode::Char('i')), Action::RefreshPublicIp);
    }

    #[test]
    fn test_rate_keys() {
        assert_eq!(key(KeyCode::Char('+')), Action::Faster);
        assert_eq!(key(KeyCode::Char('=')), Action::Faster);
        assert_eq!(key(KeyCode::Char('-')), Action::Slower);
        assert_eq!(key(KeyCode::Char('_')), Action::Slower);
    }
}
