//! ---
//! ncs_section: "06-user-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Interactive console: dispatcher and session loop."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Built-in console commands. They take precedence over application keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    Apps,
    Load,
    Unload,
    Reinit,
    Stat,
    Time,
    Profile,
    Watch,
    Cmdlogger,
    Help,
    Exit,
    #[strum(serialize = "EOF")]
    Eof,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// One-line help shown by `help <command>`.
    pub fn doc(&self) -> &'static str {
        match self {
            Self::Apps => "List available applications and their status",
            Self::Load => "Load one or more applications: load <app> [<app> ...]",
            Self::Unload => "Unload one or more applications: unload <app> [<app> ...]",
            Self::Reinit => "Reinitialize the database, deleting all data except topology",
            Self::Stat => "Show running configuration, state",
            Self::Time => "Run command and report execution time: time <command>",
            Self::Profile => {
                "Run command and report execution time and database statements: profile <command>\n\
                 Note - if nothing is reported, try enabling auto-orchestration with orch auto on"
            }
            Self::Watch => {
                "Launch a terminal to watch database tables in real-time\n\
                 Usage: watch [table1(,max_rows)] [table2(,max_rows)] ...\n\
                 Example: watch hosts switches cf,5"
            }
            Self::Cmdlogger => "Turn the command log on or off: cmdlogger on|off",
            Self::Help => "List available commands with 'help' or detailed help with 'help cmd'",
            Self::Exit | Self::Eof => "Quit the console",
        }
    }

    /// Names of every built-in, in table order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::iter().map(<&'static str>::from)
    }
}
