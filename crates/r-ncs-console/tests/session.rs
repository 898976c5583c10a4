//! ---
//! ncs_section: "11-testing"
//! ncs_subsection: "integration"
//! ncs_type: "test"
//! ncs_scope: "code"
//! ncs_description: "Console dispatch, auto-orchestration and crash recovery."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::io::Cursor;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use r_ncs_common::config::AppConfig;
use r_ncs_console::{run_session, Console, Control, KeyOutcome, LineBuffer, DOC_HEADER};
use r_ncs_core::Environment;
use r_ncs_db::{DbOp, DbState, MemoryDatabase};
use r_ncs_net::NetworkProvider;
use r_ncs_persistence::read_records;
use r_ncs_testharness::{AppDirFixture, RecordingProvider, SchemaFixture, ORCH_RUN_SQL};

struct Fixture {
    apps: AppDirFixture,
    schema: SchemaFixture,
    logs: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            apps: AppDirFixture::with_core_apps(),
            schema: SchemaFixture::new(),
            logs: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.apps.directories = vec![self.apps.path().to_path_buf()];
        config.resources.directory = self.schema.resource_dir().to_path_buf();
        config.resources.schema_dir = self.schema.schema_dir();
        config.resources.render_dir = self.schema.render_dir();
        config.console.command_log = self.logs.path().join("cmd.log");
        config.console.profile_settle = std::time::Duration::ZERO;
        config
    }

    fn started(
        &self,
        state: DbState,
        provider: Box<dyn NetworkProvider>,
    ) -> (Environment, MemoryDatabase) {
        let db = MemoryDatabase::new("ncs", "ncs", state);
        let mut env = Environment::new(self.config(), Box::new(db.clone()), provider).unwrap();
        env.start().unwrap();
        (env, db)
    }
}

fn orch_runs(db: &MemoryDatabase) -> usize {
    db.journal()
        .iter()
        .filter(|op| matches!(op, DbOp::Execute(sql) if sql == ORCH_RUN_SQL))
        .count()
}

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

#[test]
fn unknown_command_is_reported_and_session_continues() {
    let fixture = Fixture::new();
    let (mut env, _db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));

    let mut out = Vec::new();
    let input = Cursor::new("foo bar\n\nstat\nexit\n");
    let summary = run_session(&mut env, input, &mut out).unwrap();

    let out = text(out);
    assert!(out.contains("*** Unknown command: foo bar"));
    assert!(out.contains("topology:"));
    assert_eq!(summary.commands, 3);
    assert_eq!(summary.restarts, 0);
    assert!(env.is_stopped());
}

#[test]
fn end_of_input_exits_cleanly() {
    let fixture = Fixture::new();
    let provider = RecordingProvider::new("single,2");
    let calls = provider.calls();
    let (mut env, _db) = fixture.started(DbState::Fresh, Box::new(provider));

    let mut out = Vec::new();
    let summary = run_session(&mut env, Cursor::new("apps\n"), &mut out).unwrap();

    assert_eq!(summary.commands, 2);
    assert!(text(out).contains("[online] orch (o): Orchestration"));
    assert_eq!(calls.lock().stops, 1);
}

#[test]
fn auto_orchestration_follows_each_application_command_once() {
    let fixture = Fixture::new();
    let (mut env, db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));
    let mut out = Vec::new();
    let mut console = Console::new(&mut env, &mut out);

    console.onecmd("psql SELECT * FROM tp");
    assert_eq!(orch_runs(&db), 0);

    console.onecmd("orch auto on");
    assert_eq!(orch_runs(&db), 0);

    console.onecmd("psql SELECT * FROM tp");
    assert_eq!(orch_runs(&db), 1);

    // the orchestration app itself, by name or shortcut, never triggers a run
    console.onecmd("o status");
    console.onecmd("orch run");
    assert_eq!(orch_runs(&db), 2);

    console.onecmd("mn nodes");
    assert_eq!(orch_runs(&db), 3);
    assert_eq!(console.auto_runs(), 2);

    console.onecmd("o auto off");
    console.onecmd("psql SELECT * FROM tp");
    assert_eq!(orch_runs(&db), 3);
    assert_eq!(console.auto_runs(), 2);
}

#[test]
fn builtins_shadow_application_keys_and_report_errors() {
    let fixture = Fixture::new();
    let (mut env, _db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));
    let mut out = Vec::new();
    {
        let mut console = Console::new(&mut env, &mut out);
        assert_eq!(console.onecmd("unload psql"), Control::Continue);
        assert_eq!(console.onecmd("load nosuch"), Control::Continue);
        assert_eq!(console.onecmd("load"), Control::Continue);
        assert_eq!(console.onecmd("o bogus"), Control::Continue);
        assert_eq!(console.onecmd("exit"), Control::Exit);
        assert_eq!(console.onecmd("EOF"), Control::Exit);
    }
    let out = text(out);
    assert!(out.contains("*** cannot unload core application 'psql'"));
    assert!(out.contains("*** unknown application 'nosuch'"));
    assert!(out.contains("*** usage: load <app>"));
    assert!(out.contains("*** orch: unknown command 'bogus'"));
    assert!(env.is_stopped());
}

#[test]
fn help_lists_and_delegates() {
    let fixture = Fixture::new();
    let (mut env, _db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));
    let mut out = Vec::new();
    {
        let mut console = Console::new(&mut env, &mut out);
        console.onecmd("help");
        console.onecmd("help o");
        console.onecmd("help orch run");
        console.onecmd("help watch");
        console.onecmd("help nothing");
    }
    let out = text(out);
    assert!(out.contains(DOC_HEADER));
    assert!(out.contains("cmdlogger  help  exit  EOF  psql  mn  orch  o"));
    assert!(out.contains("Orchestration\n  auto: auto on|off"));
    assert!(out.contains("orchestrate pending updates"));
    assert!(out.contains("Example: watch hosts switches cf,5"));
    assert!(out.contains("*** No help on nothing"));
}

#[test]
fn completion_covers_builtins_and_loaded_keys() {
    let fixture = Fixture::new();
    let (mut env, _db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));
    let console = Console::new(&mut env, Vec::new());

    assert_eq!(console.complete_names("o"), vec!["orch", "o"]);
    assert_eq!(console.complete_names("p"), vec!["profile", "psql"]);
    assert!(console.complete_names("").contains(&"EOF".to_owned()));
    assert!(console.complete_names("zz").is_empty());
}

#[test]
fn tab_completes_builtins_and_loaded_keys() {
    let fixture = Fixture::new();
    let (mut env, _db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));
    let console = Console::new(&mut env, Vec::new());
    let complete = |prefix: &str| console.complete_names(prefix);
    let key = |code| KeyEvent::new(code, KeyModifiers::NONE);

    let mut buffer = LineBuffer::default();
    for c in "ps".chars() {
        buffer.handle_key(key(KeyCode::Char(c)), &complete);
    }
    buffer.handle_key(key(KeyCode::Tab), &complete);
    assert_eq!(buffer.line(), "psql ");

    let mut buffer = LineBuffer::default();
    buffer.handle_key(key(KeyCode::Char('o')), &complete);
    assert_eq!(
        buffer.handle_key(key(KeyCode::Tab), &complete),
        KeyOutcome::Candidates(vec!["orch".to_owned(), "o".to_owned()])
    );
    assert_eq!(buffer.line(), "o");
}

#[test]
fn command_logger_records_timed_commands() {
    let fixture = Fixture::new();
    let (mut env, _db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));
    let log = env.config().console.command_log.clone();
    {
        let mut console = Console::new(&mut env, Vec::new());
        assert!(!console.timing_enabled());
        console.onecmd("cmdlogger on");
        assert!(console.timing_enabled());
        console.onecmd("psql SELECT * FROM hosts");
        console.onecmd("cmdlogger off");
        console.onecmd("stat");
    }

    let commands: Vec<String> = read_records(&log)
        .unwrap()
        .into_iter()
        .map(|record| record.command)
        .collect();
    assert_eq!(commands, vec!["psql SELECT * FROM hosts", "cmdlogger off"]);
}

#[test]
fn command_logger_records_failed_commands() {
    let fixture = Fixture::new();
    let (mut env, _db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));
    let log = env.config().console.command_log.clone();
    let mut out = Vec::new();
    {
        let mut console = Console::new(&mut env, &mut out);
        console.onecmd("cmdlogger on");
        console.onecmd("load nosuch");
        console.onecmd("unload psql");
        console.onecmd("load");
    }

    let output = text(out);
    assert!(output.contains("*** unknown application 'nosuch'"));
    assert!(output.contains("*** cannot unload core application 'psql'"));
    let commands: Vec<String> = read_records(&log)
        .unwrap()
        .into_iter()
        .map(|record| record.command)
        .collect();
    assert_eq!(commands, vec!["load nosuch", "unload psql", "load"]);
}

#[test]
fn time_and_profile_report_measurements() {
    let fixture = Fixture::new();
    let (mut env, _db) =
        fixture.started(DbState::Fresh, Box::new(RecordingProvider::new("single,2")));
    let mut out = Vec::new();
    {
        let mut console = Console::new(&mut env, &mut out);
        console.onecmd("time psql SELECT * FROM hosts");
        console.onecmd("profile psql SELECT * FROM switches");
    }
    let out = text(out);
    assert!(out.contains("\nTime: "));
    assert!(out.contains("ms, 1 database statements"));
}

#[test]
fn crash_restarts_the_loop_and_tears_down_once() {
    let fixture = Fixture::new();
    let provider = RecordingProvider::panicking("single,2");
    let calls = provider.calls();
    let (mut env, _db) = fixture.started(DbState::Reconnected, Box::new(provider));

    let mut out = Vec::new();
    let input = Cursor::new("mn nodes\nstat\nexit\n");
    let summary = run_session(&mut env, input, &mut out).unwrap();

    assert_eq!(summary.restarts, 1);
    assert_eq!(summary.commands, 3);
    assert!(text(out).contains("topology:"));
    assert!(env.is_stopped());
    assert_eq!(calls.lock().stops, 1);
    assert!(env.stop().is_none());
    assert_eq!(calls.lock().stops, 1);
}
