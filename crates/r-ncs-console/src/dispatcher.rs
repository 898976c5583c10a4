//! ---
//! ncs_section: "06-user-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Interactive console: dispatcher and session loop."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use r_ncs_apps::LoadOutcome;
use r_ncs_common::time::elapsed_millis;
use r_ncs_core::Environment;
use r_ncs_logging::{ncs_warn, LogContext};
use r_ncs_persistence::{CommandLogWriter, CommandRecord};
use tracing::{info, warn};

use crate::builtins::Builtin;
use crate::error::ConsoleError;
use crate::line_editor;
use crate::session::TeardownGuard;
use crate::DOC_HEADER;

/// Key of the orchestration application consulted by the auto hook.
const ORCH_KEY: &str = "orch";

type CommandResult = Result<Control, ConsoleError>;

/// Whether the read loop continues after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// Command dispatcher bound to an environment for one session.
///
/// Dropping the console tears the environment down through its
/// [`TeardownGuard`].
pub struct Console<'e, W: Write> {
    env: TeardownGuard<'e>,
    out: W,
    timing: bool,
    command_log: Option<CommandLogWriter>,
    commands: u64,
    auto_runs: u64,
}

impl<'e, W: Write> Console<'e, W> {
    pub fn new(env: &'e mut Environment, out: W) -> Self {
        let timing = env.config().console.command_log_enabled;
        let mut console = Self {
            env: TeardownGuard::new(env),
            out,
            timing: false,
            command_log: None,
            commands: 0,
            auto_runs: 0,
        };
        if timing {
            console.set_timing(true);
        }
        console
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Non-empty lines executed so far.
    pub fn commands(&self) -> u64 {
        self.commands
    }

    /// `run` commands synthesized by auto-orchestration.
    pub fn auto_runs(&self) -> u64 {
        self.auto_runs
    }

    pub fn timing_enabled(&self) -> bool {
        self.timing
    }

    /// Banner printed once per session.
    pub fn intro(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "NCS console: interactive network control shell.\nConfiguration:\n{}",
            self.env.pprint()
        )
    }

    /// Read and execute lines until `exit` or end of input.
    pub fn cmdloop(&mut self, input: &mut dyn BufRead) -> io::Result<()> {
        let mut buffer = String::new();
        loop {
            write!(self.out, "{}", self.env.config().console.prompt)?;
            self.out.flush()?;
            buffer.clear();
            let line = if input.read_line(&mut buffer)? == 0 {
                Builtin::Eof.name()
            } else {
                buffer.trim_end_matches(['\r', '\n'])
            };
            if self.onecmd(line) == Control::Exit {
                return Ok(());
            }
        }
    }

    /// Read loop on the controlling terminal, completing command names on Tab.
    pub fn cmdloop_terminal(&mut self) -> io::Result<()> {
        loop {
            let prompt = self.env.config().console.prompt.clone();
            let line = line_editor::read_line(&prompt, &|prefix: &str| self.complete_names(prefix))?;
            let line = line.unwrap_or_else(|| Builtin::Eof.name().to_owned());
            if self.onecmd(&line) == Control::Exit {
                return Ok(());
            }
        }
    }

    /// Execute one line, with timing instrumentation when enabled.
    pub fn onecmd(&mut self, line: &str) -> Control {
        let line = line.trim();
        if line.is_empty() {
            return Control::Continue;
        }
        self.commands += 1;
        if !self.timing {
            return self.dispatch_reporting(line);
        }

        let started_at = Local::now();
        let start = Instant::now();
        let control = self.dispatch_reporting(line);
        self.record(line, started_at, start.elapsed());
        control
    }

    /// Command-name completions for `prefix`: built-ins, then application keys.
    pub fn complete_names(&self, prefix: &str) -> Vec<String> {
        Builtin::names().map(|name| -> &str { name })
            .chain(self.env.apps().loaded_keys())
            .filter(|name| name.starts_with(prefix))
            .map(str::to_owned)
            .collect()
    }

    fn dispatch_reporting(&mut self, line: &str) -> Control {
        match self.dispatch(line) {
            Ok(control) => control,
            Err(err) => {
                ncs_warn!(context = LogContext::new().with_command(line), "{err}");
                let _ = writeln!(self.out, "*** {err}");
                Control::Continue
            }
        }
    }

    fn dispatch(&mut self, line: &str) -> CommandResult {
        let (command, rest) = split_command(line);
        if let Ok(builtin) = command.parse::<Builtin>() {
            return self.builtin(builtin, rest);
        }
        if self.env.apps().is_loaded(command) {
            self.forward(command, rest)?;
            return Ok(Control::Continue);
        }
        writeln!(self.out, "*** Unknown command: {line}")?;
        Ok(Control::Continue)
    }

    fn forward(&mut self, key: &str, rest: &str) -> Result<(), ConsoleError> {
        let auto_orch =
            self.env.apps().is_loaded(ORCH_KEY) && self.env.app_auto(ORCH_KEY) == Some(true);

        let output = self.env.execute_app(key, rest)?;
        self.print(&output)?;

        let targets_orch = self.env.apps().canonical(key) == self.env.apps().canonical(ORCH_KEY);
        if auto_orch && !targets_orch {
            self.auto_runs += 1;
            let output = self.env.execute_app(ORCH_KEY, "run")?;
            self.print(&output)?;
        }
        Ok(())
    }

    fn builtin(&mut self, builtin: Builtin, rest: &str) -> CommandResult {
        match builtin {
            Builtin::Apps => self.do_apps()?,
            Builtin::Load => self.do_load(rest)?,
            Builtin::Unload => self.do_unload(rest)?,
            Builtin::Reinit => self.env.reinit()?,
            Builtin::Stat => {
                let stat = self.env.pprint();
                write!(self.out, "{stat}")?;
            }
            Builtin::Time => self.do_time(rest)?,
            Builtin::Profile => self.do_profile(rest)?,
            Builtin::Watch => self.do_watch(rest)?,
            Builtin::Cmdlogger => match rest.to_ascii_lowercase().as_str() {
                "on" => self.set_timing(true),
                "off" => self.set_timing(false),
                _ => writeln!(
                    self.out,
                    "Input 'on' to turn on cmd logger and 'off' to turn it off."
                )?,
            },
            Builtin::Help => self.do_help(rest)?,
            Builtin::Exit => return Ok(Control::Exit),
            Builtin::Eof => {
                writeln!(self.out)?;
                return Ok(Control::Exit);
            }
        }
        Ok(Control::Continue)
    }

    fn do_apps(&mut self) -> Result<(), ConsoleError> {
        let apps = self.env.apps();
        let lines: Vec<String> = apps
            .registry()
            .iter()
            .map(|app| {
                let status = if apps.is_loaded(app.name()) {
                    "[online]"
                } else {
                    "[offline]"
                };
                let shortcut = app
                    .shortcut()
                    .map(|s| format!(" ({s})"))
                    .unwrap_or_default();
                let description = app
                    .description()
                    .map(|d| format!(": {d}"))
                    .unwrap_or_default();
                format!("  {status} {}{shortcut}{description}", app.name())
            })
            .collect();
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn do_load(&mut self, rest: &str) -> Result<(), ConsoleError> {
        if rest.is_empty() {
            return Err(ConsoleError::Usage("usage: load <app> [<app> ...]"));
        }
        for name in rest.split_whitespace() {
            match self.env.load_app(name) {
                Ok(LoadOutcome::Loaded {
                    shortcut_conflict: Some(shortcut),
                }) => writeln!(
                    self.out,
                    "*** shortcut {shortcut} for {name} already in use"
                )?,
                Ok(LoadOutcome::NotLoadable) => {
                    writeln!(self.out, "{name}: schema installed, no commands defined")?
                }
                Ok(_) => {}
                Err(err) => writeln!(self.out, "*** {err}")?,
            }
        }
        Ok(())
    }

    fn do_unload(&mut self, rest: &str) -> Result<(), ConsoleError> {
        if rest.is_empty() {
            return Err(ConsoleError::Usage("usage: unload <app> [<app> ...]"));
        }
        for name in rest.split_whitespace() {
            if let Err(err) = self.env.unload_app(name) {
                writeln!(self.out, "*** {err}")?;
            }
        }
        Ok(())
    }

    fn do_time(&mut self, rest: &str) -> Result<(), ConsoleError> {
        let start = Instant::now();
        if !rest.is_empty() {
            self.onecmd(rest);
        }
        writeln!(self.out, "\nTime: {}ms", elapsed_millis(start.elapsed()))?;
        Ok(())
    }

    fn do_profile(&mut self, rest: &str) -> Result<(), ConsoleError> {
        if rest.is_empty() {
            return Ok(());
        }
        let statements = self.env.db().statements_issued();
        let start = Instant::now();
        self.onecmd(rest);
        let elapsed = start.elapsed();

        // let straggling counters settle before summarizing
        thread::sleep(self.env.config().console.profile_settle);
        let issued = self.env.db().statements_issued().saturating_sub(statements);
        writeln!(
            self.out,
            "\nProfile: {}ms, {issued} database statements",
            elapsed_millis(elapsed)
        )?;
        Ok(())
    }

    fn do_watch(&mut self, rest: &str) -> Result<(), ConsoleError> {
        let args: Vec<&str> = rest.split_whitespace().collect();
        if args.is_empty() {
            return Ok(());
        }
        let pid = self.env.watch(&args)?;
        writeln!(self.out, "watching {} (pid {pid})", args.join(" "))?;
        Ok(())
    }

    fn do_help(&mut self, rest: &str) -> Result<(), ConsoleError> {
        let mut tokens = rest.split_whitespace();
        let Some(topic) = tokens.next() else {
            let names: Vec<&str> = Builtin::names().map(|name| -> &str { name })
                .chain(self.env.apps().loaded_keys())
                .collect();
            let listing = names.join("  ");
            writeln!(self.out, "\n{DOC_HEADER}\n{}\n{listing}\n", "=".repeat(DOC_HEADER.len()))?;
            return Ok(());
        };

        if self.env.apps().is_loaded(topic) {
            let remainder = tokens.collect::<Vec<_>>().join(" ");
            let help = self.env.app_help(topic, &remainder).unwrap_or_default();
            writeln!(self.out, "{help}")?;
            return Ok(());
        }
        match topic.parse::<Builtin>() {
            Ok(builtin) => writeln!(self.out, "{}", builtin.doc())?,
            Err(_) => writeln!(self.out, "*** No help on {rest}")?,
        }
        Ok(())
    }

    fn set_timing(&mut self, on: bool) {
        if on && self.command_log.is_none() {
            let path = self.env.config().console.command_log.clone();
            match CommandLogWriter::open(&path) {
                Ok(writer) => self.command_log = Some(writer),
                Err(err) => warn!(path = %path.display(), error = %err, "command log unavailable"),
            }
        }
        self.timing = on;
        info!("Cmd logger {}.", if on { "on" } else { "off" });
    }

    fn record(&mut self, line: &str, started_at: DateTime<Local>, elapsed: Duration) {
        let record = CommandRecord::new(line, started_at, elapsed);
        info!(command = line, elapsed_ms = record.elapsed_ms, "Execution time: {}ms", record.elapsed_ms);
        if let Some(writer) = self.command_log.as_mut() {
            if let Err(err) = writer.append(&record) {
                warn!(error = %err, "failed to append to command log");
            }
        }
    }

    fn print(&mut self, output: &str) -> io::Result<()> {
        if output.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "{output}")
    }
}

fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_command_separates_first_token() {
        assert_eq!(split_command("foo bar baz"), ("foo", "bar baz"));
        assert_eq!(split_command("stat"), ("stat", ""));
        assert_eq!(split_command("psql  SELECT 1"), ("psql", "SELECT 1"));
    }
}
