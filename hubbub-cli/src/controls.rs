//! Keyboard handling for the chat screen.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Mutable UI state the keys act on.
pub struct ChatState {
    pub input: String,
    /// Lines scrolled up from the bottom of the message pane.
    pub scroll: usize,
    pub show_log: bool,
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            scroll: 0,
            show_log: false,
        }
    }

    /// Keep the scroll offset inside the history.
    pub fn clamp_scroll(&mut self, total_lines: usize) {
        self.scroll = self.scroll.min(total_lines);
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    None,
    Submit(String),
    Quit,
}

/// Wait briefly for a key and apply it. The poll doubles as the UI tick.
pub fn poll_key(state: &mut ChatState) -> Action {
    if event::poll(Duration::from_millis(50)).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Press {
                return Action::None;
            }
            return apply_key(state, key);
        }
    }

    Action::None
}

pub fn apply_key(state: &mut ChatState, key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('c') = key.code {
            return Action::Quit;
        }
    }

    match key.code {
        KeyCode::Esc => return Action::Quit,
        KeyCode::Enter => {
            let line = std::mem::take(&mut state.input);
            if !line.trim().is_empty() {
                return Action::Submit(line);
            }
        }
        KeyCode::Backspace => {
            state.input.pop();
        }
        KeyCode::Up => state.scroll = state.scroll.saturating_add(1),
        KeyCode::Down => state.scroll = state.scroll.saturating_sub(1),
        KeyCode::Tab => state.show_log = !state.show_log,
        KeyCode::Char(c) => state.input.push(c),
        _ => {}
    }

    Action::None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typed_characters_build_the_input_line() {
        let mut state = ChatState::new();
        for c in "salut".chars() {
            assert_eq!(apply_key(&mut state, press(KeyCode::Char(c))), Action::None);
        }
        assert_eq!(state.input, "salut");

        apply_key(&mut state, press(KeyCode::Backspace));
        assert_eq!(state.input, "salu");
    }

    #[test]
    fn enter_submits_and_clears_the_line() {
        let mut state = ChatState::new();
        state.input = "hello".to_string();
        assert_eq!(
            apply_key(&mut state, press(KeyCode::Enter)),
            Action::Submit("hello".to_string())
        );
        assert!(state.input.is_empty());
    }

    #[test]
    fn enter_on_a_blank_line_does_nothing() {
        let mut state = ChatState::new();
        state.input = "   ".to_string();
        assert_eq!(apply_key(&mut state, press(KeyCode::Enter)), Action::None);
        assert!(state.input.is_empty());
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        let mut state = ChatState::new();
        assert_eq!(apply_key(&mut state, press(KeyCode::Esc)), Action::Quit);
        assert_eq!(
            apply_key(
                &mut state,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
            ),
            Action::Quit
        );
    }

    #[test]
    fn arrows_scroll_and_tab_toggles_the_log_pane() {
        let mut state = ChatState::new();
        apply_key(&mut state, press(KeyCode::Up));
        apply_key(&mut state, press(KeyCode::Up));
        apply_key(&mut state, press(KeyCode::Down));
        assert_eq!(state.scroll, 1);

        state.clamp_scroll(0);
        assert_eq!(state.scroll, 0);
        apply_key(&mut state, press(KeyCode::Down));
        assert_eq!(state.scroll, 0);

        assert!(!state.show_log);
        apply_key(&mut state, press(KeyCode::Tab));
        assert!(state.show_log);
    }
}
