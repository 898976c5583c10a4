//! ---
//! ncs_section: "03-persistence-logging"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Structured logging adapters and sinks."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Console-aware logging on top of `tracing`.
//!
//! Events carry the application, command line and session phase they
//! belong to, so the JSON file log can be filtered per application.

pub mod macros;

/// Where in the session an event happened. Every field is optional.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogContext<'a> {
    /// Canonical application name.
    pub app: Option<&'a str>,
    /// Command line as typed at the prompt.
    pub command: Option<&'a str>,
    /// Session phase: discovery, startup, session or teardown.
    pub phase: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(self, app: &'a str) -> Self {
        Self {
            app: Some(app),
            ..self
        }
    }

    pub fn with_command(self, command: &'a str) -> Self {
        Self {
            command: Some(command),
            ..self
        }
    }

    pub fn with_phase(self, phase: &'a str) -> Self {
        Self {
            phase: Some(phase),
            ..self
        }
    }
}

/// Result recorded on a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// Logged at `info`.
    Success,
    /// Logged at `error`.
    Fault,
}

impl SystemEventOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fault => "fault",
        }
    }
}

/// Record a named lifecycle event such as `environment.start`.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.copied().unwrap_or_default();
    let app = ctx.app.unwrap_or("");
    let command = ctx.command.unwrap_or("");
    let phase = ctx.phase.unwrap_or("");
    let outcome_label = outcome.label();
    if outcome == SystemEventOutcome::Fault {
        tracing::error!(event, outcome = outcome_label, app, command, phase, message = %message);
    } else {
        tracing::info!(event, outcome = outcome_label, app, command, phase, message = %message);
    }
}
