//! Dashboard rendering.

use std::io::{self, Stdout, Write};

use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::{ExecutableCommand, QueueableCommand, cursor, terminal};

use super::ConsoleError;
use super::state::{ConsoleView, Mode, OutcomeStatus};
use crate::roster::SlotView;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Everything drawn in one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub slots: Vec<SlotView>,
    pub console: ConsoleView,
    pub listen: String,
    pub tick: u64,
}

/// Draws frames somewhere.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer: Send {
    fn render(&mut self, frame: &Frame) -> Result<(), ConsoleError>;
}

/// Full-screen dashboard on the controlling terminal.
///
/// Raw mode and the alternate screen are entered on construction and left
/// when the renderer is dropped.
pub struct TerminalRenderer {
    stdout: Stdout,
}

impl TerminalRenderer {
    pub fn new() -> Result<Self, ConsoleError> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode().map_err(|source| ConsoleError::Terminal { source })?;
        let entered = stdout
            .execute(terminal::EnterAlternateScreen)
            .and_then(|out| out.execute(cursor::Hide).map(|_| ()));
        let mut renderer = Self { stdout };
        if let Err(source) = entered {
            renderer.teardown();
            return Err(ConsoleError::Terminal { source });
        }
        Ok(renderer)
    }

    fn teardown(&mut self) {
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }

    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        self.stdout.queue(cursor::MoveTo(0, 0))?;
        self.stdout.queue(terminal::Clear(terminal::ClearType::All))?;
        self.draw_title()?;
        for slot in &frame.slots {
            self.draw_slot(slot, frame)?;
        }
        self.draw_footer(frame)?;
        self.stdout.flush()
    }

    fn draw_title(&mut self) -> io::Result<()> {
        self.stdout.queue(SetForegroundColor(Color::Cyan))?;
        self.stdout.queue(SetAttribute(Attribute::Bold))?;
        self.line("========================================")?;
        self.line("       FACTORY MONITORING SYSTEM")?;
        self.line("========================================")?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        Ok(())
    }

    fn draw_slot(&mut self, slot: &SlotView, frame: &Frame) -> io::Result<()> {
        let (color, text) = if slot.connected {
            let color = if slot.error_flag && frame.tick % 2 == 0 {
                Color::Red
            } else if slot.error_flag {
                Color::DarkRed
            } else {
                Color::Green
            };
            (color, format!("[Machine {}] Status: {}", slot.name, slot.last_status))
        } else {
            let spinner = SPINNER[usize::try_from(frame.tick % 4).unwrap_or(0)];
            (
                Color::DarkGrey,
                format!("[Machine {}] Waiting for connection. {spinner}", slot.name),
            )
        };
        self.stdout.queue(SetForegroundColor(color))?;
        self.stdout.queue(Print(format!("  {text}")))?;
        self.stdout.queue(ResetColor)?;
        if frame.console.mode == Mode::Selecting && frame.console.selection == slot.index {
            self.stdout.queue(SetAttribute(Attribute::Bold))?;
            self.stdout.queue(Print("  <"))?;
            self.stdout.queue(SetAttribute(Attribute::Reset))?;
        }
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        Ok(())
    }

    fn draw_footer(&mut self, frame: &Frame) -> io::Result<()> {
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        let prompt = match frame.console.mode {
            Mode::Editing => "Command",
            Mode::Selecting => "Select target (Up/Down, Enter, Esc)",
        };
        self.line(&format!("  {prompt}: {}", frame.console.command))?;
        if let Some(outcome) = &frame.console.last_outcome {
            let name = frame
                .slots
                .get(outcome.index)
                .map_or("?", |slot| slot.name.as_str());
            let (color, text) = match outcome.status {
                OutcomeStatus::Sent => (Color::Green, format!("Sent to {name}")),
                OutcomeStatus::Failed { reason } => {
                    (Color::Red, format!("Failed to send to {name} ({reason})"))
                }
            };
            self.stdout.queue(SetForegroundColor(color))?;
            self.line(&format!("  {text}"))?;
            self.stdout.queue(ResetColor)?;
        }
        let dots = ".".repeat(usize::try_from(frame.tick % 8 / 2).unwrap_or(0));
        self.line(&format!("  Listening on {}{dots}", frame.listen))?;
        self.line("  Press Ctrl+C to exit server.")?;
        Ok(())
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        self.stdout.queue(Print(text))?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        Ok(())
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, frame: &Frame) -> Result<(), ConsoleError> {
        self.draw(frame).map_err(|source| ConsoleError::Render { source })
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        self.teardown();
    }
}
