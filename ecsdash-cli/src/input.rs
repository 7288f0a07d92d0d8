use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use ecsdash_core::dashboard::Action;

/// Key bindings. Unbound keys are ignored.
pub fn map_key(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('s') | KeyCode::Char('S') => Action::FocusServicesTree,
        KeyCode::Char('t') | KeyCode::Char('T') => Action::ToggleDetail,
        KeyCode::Char(']') => Action::NextScreen,
        KeyCode::Char('[') => Action::PrevScreen,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Refresh,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        KeyCode::Tab | KeyCode::BackTab => Action::SwapFocus,
        _ => return None,
    };
    Some(action)
}
