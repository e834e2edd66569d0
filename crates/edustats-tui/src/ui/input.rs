//! Keyboard input handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use edustats_core::Role;

use crate::app::{App, AppState};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return true;
    }

    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.toggle_help();
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Char('r') => app.refresh_current(),
        KeyCode::Char('R') => app.refresh_all(),
        KeyCode::Char('1') => app.select_role(Role::Admin),
        KeyCode::Char('2') => app.select_role(Role::Teacher),
        KeyCode::Char('3') => app.select_role(Role::Student),
        KeyCode::Tab => app.select_role(app.role().next()),
        _ => {}
    }

    matches!(app.state, AppState::Quitting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StoreBackend;
    use edustats_core::cache::MemoryStore;
    use edustats_core::Config;

    fn app() -> App {
        let config = Config {
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            ..Config::default()
        };
        App::new(config, StoreBackend::Memory(MemoryStore::new())).unwrap()
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        assert!(handle_input(&mut app(), press(KeyCode::Char('q'))));
        assert!(handle_input(&mut app(), press(KeyCode::Esc)));
        assert!(handle_input(
            &mut app(),
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
    }

    #[test]
    fn test_help_swallows_keys_until_closed() {
        let mut app = app();
        assert!(!handle_input(&mut app, press(KeyCode::Char('?'))));
        assert_eq!(app.state, AppState::ShowingHelp);

        // q closes the overlay instead of quitting
        assert!(!handle_input(&mut app, press(KeyCode::Char('q'))));
        assert_eq!(app.state, AppState::Normal);
    }

    #[tokio::test]
    async fn test_role_keys_switch_dashboard() {
        let mut app = app();
        handle_input(&mut app, press(KeyCode::Char('3')));
        assert_eq!(app.role(), Role::Student);
        handle_input(&mut app, press(KeyCode::Tab));
        assert_eq!(app.role(), Role::Admin);
    }
}
