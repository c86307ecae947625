//! Keyboard input for the operator console.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::ConsoleError;
use super::state::Key;

/// Source of console key presses.
#[cfg_attr(test, mockall::automock)]
pub trait InputSource {
    /// Waits up to `timeout` for the next key the console understands.
    fn next_key(&mut self, timeout: Duration) -> Result<Option<Key>, ConsoleError>;
}

/// Reads keys from the controlling terminal.
#[derive(Debug, Default)]
pub struct CrosstermInput;

impl InputSource for CrosstermInput {
    fn next_key(&mut self, timeout: Duration) -> Result<Option<Key>, ConsoleError> {
        if !event::poll(timeout).map_err(|source| ConsoleError::Input { source })? {
            return Ok(None);
        }
        match event::read().map_err(|source| ConsoleError::Input { source })? {
            Event::Key(key) => Ok(map_key(key)),
            _ => Ok(None),
        }
    }
}

fn map_key(key: KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Key::Interrupt)
        }
        KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => None,
        KeyCode::Char(character) => Some(Key::Char(character)),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Esc),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        _ => None,
    }
}
