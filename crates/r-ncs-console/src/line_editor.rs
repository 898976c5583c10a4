//! ---
//! ncs_section: "06-user-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Interactive console: dispatcher and session loop."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Minimal raw-mode line editor with command-name completion on Tab.

use std::io::{self, Write};
use std::mem;

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType};
use tracing::warn;

/// What the caller should do after one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Keep reading; redraw the line.
    Pending,
    /// The user pressed Enter.
    Submit(String),
    /// Ctrl-D on an empty line.
    EndOfInput,
    /// Tab matched several names; show them before redrawing.
    Candidates(Vec<String>),
}

/// Line being typed at the prompt.
#[derive(Debug, Default)]
pub struct LineBuffer {
    line: String,
}

impl LineBuffer {
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        complete: &dyn Fn(&str) -> Vec<String>,
    ) -> KeyOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => KeyOutcome::Submit(mem::take(&mut self.line)),
            KeyCode::Char('d') if ctrl && self.line.is_empty() => KeyOutcome::EndOfInput,
            KeyCode::Char('c') if ctrl => {
                self.line.clear();
                KeyOutcome::Pending
            }
            KeyCode::Char(c) if !ctrl => {
                self.line.push(c);
                KeyOutcome::Pending
            }
            KeyCode::Backspace => {
                self.line.pop();
                KeyOutcome::Pending
            }
            KeyCode::Tab => self.complete(complete),
            _ => KeyOutcome::Pending,
        }
    }

    /// Only the command word completes. A single match is followed by a space;
    /// several matches extend the line to their common prefix.
    fn complete(&mut self, complete: &dyn Fn(&str) -> Vec<String>) -> KeyOutcome {
        if self.line.contains(char::is_whitespace) {
            return KeyOutcome::Pending;
        }
        let mut names = complete(&self.line);
        names.dedup();
        match names.len() {
            0 => KeyOutcome::Pending,
            1 => {
                self.line = format!("{} ", names[0]);
                KeyOutcome::Pending
            }
            _ => {
                let common = common_prefix(&names);
                if common.len() > self.line.len() {
                    self.line = common.to_owned();
                }
                KeyOutcome::Candidates(names)
            }
        }
    }
}

fn common_prefix(names: &[String]) -> &str {
    let Some((first, rest)) = names.split_first() else {
        return "";
    };
    let mut end = first.len();
    for name in rest {
        end = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(end);
    }
    &first[..end]
}

struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            warn!(error = %err, "failed to restore terminal mode");
        }
    }
}

/// Read one line from the terminal. `None` means end of input.
pub fn read_line(
    prompt: &str,
    complete: &dyn Fn(&str) -> Vec<String>,
) -> io::Result<Option<String>> {
    let mut stdout = io::stdout();
    let _raw = RawMode::enable()?;
    let mut buffer = LineBuffer::default();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match buffer.handle_key(key, complete) {
            KeyOutcome::Submit(line) => {
                write!(stdout, "\r\n")?;
                stdout.flush()?;
                return Ok(Some(line));
            }
            KeyOutcome::EndOfInput => {
                write!(stdout, "\r\n")?;
                stdout.flush()?;
                return Ok(None);
            }
            KeyOutcome::Candidates(names) => write!(stdout, "\r\n{}\r\n", names.join("  "))?,
            KeyOutcome::Pending => {}
        }
        queue!(
            stdout,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(prompt),
            Print(buffer.line())
        )?;
        stdout.flush()?;
    }
}
