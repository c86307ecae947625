//! Operator console state machine.
//!
//! Pure and terminal-agnostic: keys go in, an [`Action`] comes out, and a
//! [`ConsoleView`] copy is handed to the renderer.

use crate::dispatch::{COMMAND_CAPACITY, DispatchFailure, is_command_char};

/// Keys the console reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    Esc,
    Up,
    Down,
    /// Ctrl+C.
    Interrupt,
}

/// What the console is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Typing the pending command.
    #[default]
    Editing,
    /// Choosing the slot that receives the command.
    Selecting,
}

/// Work requested by a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Dispatch { index: usize, command: String },
    Quit,
}

/// Result of the last dispatch, kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub index: usize,
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Sent,
    Failed { reason: &'static str },
}

/// Copy of the console state for one rendered frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsoleView {
    pub mode: Mode,
    pub command: String,
    pub selection: usize,
    pub last_outcome: Option<Outcome>,
}

/// Command editor and slot selector.
#[derive(Debug, Clone)]
pub struct ConsoleState {
    slots: usize,
    view: ConsoleView,
}

impl ConsoleState {
    /// Builds a console addressing `slots` roster positions.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            slots,
            view: ConsoleView::default(),
        }
    }

    #[must_use]
    pub fn view(&self) -> ConsoleView {
        self.view.clone()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.view.mode
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.view.command
    }

    #[must_use]
    pub fn selection(&self) -> usize {
        self.view.selection
    }

    /// Applies one key press.
    pub fn handle_key(&mut self, key: Key) -> Action {
        if key == Key::Interrupt {
            return Action::Quit;
        }
        match self.view.mode {
            Mode::Editing => self.edit(key),
            Mode::Selecting => self.select(key),
        }
    }

    /// Stores the result of the dispatch requested by the last action.
    pub fn record_outcome(&mut self, index: usize, result: &Result<String, DispatchFailure>) {
        let status = match result {
            Ok(_) => OutcomeStatus::Sent,
            Err(failure) => OutcomeStatus::Failed {
                reason: failure.reason(),
            },
        };
        self.view.last_outcome = Some(Outcome { index, status });
    }

    fn edit(&mut self, key: Key) -> Action {
        match key {
            Key::Char(character)
                if is_command_char(character)
                    && self.view.command.len() < COMMAND_CAPACITY =>
            {
                self.view.command.push(character);
            }
            Key::Backspace => {
                self.view.command.pop();
            }
            Key::Enter if !self.view.command.is_empty() && self.slots > 0 => {
                self.view.mode = Mode::Selecting;
                self.view.selection = 0;
            }
            _ => {}
        }
        Action::None
    }

    fn select(&mut self, key: Key) -> Action {
        match key {
            Key::Up => {
                self.view.selection = (self.view.selection + self.slots - 1) % self.slots;
            }
            Key::Down => {
                self.view.selection = (self.view.selection + 1) % self.slots;
            }
            Key::Enter => {
                self.view.mode = Mode::Editing;
                return Action::Dispatch {
                    index: self.view.selection,
                    command: std::mem::take(&mut self.view.command),
                };
            }
            Key::Esc => {
                self.view.mode = Mode::Editing;
            }
            _ => {}
        }
        Action::None
    }
}
