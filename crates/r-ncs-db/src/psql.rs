//! ---
//! ncs_section: "03-persistence-logging"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Topology database interface and implementations."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::path::Path;
use std::process::{Command, Output};

use r_ncs_net::NetworkProvider;
use tracing::{debug, info};

use crate::{Database, DbError, DbState, Result, TOPOLOGY_TABLES};

const INSERT_BATCH: usize = 500;

/// PostgreSQL database reached through the `psql` client binary.
#[derive(Debug)]
pub struct PsqlDatabase {
    name: String,
    user: String,
    password: Option<String>,
    state: DbState,
    statements: u64,
}

impl PsqlDatabase {
    pub fn new(name: &str, user: &str, password: Option<String>, state: DbState) -> Self {
        Self {
            name: name.to_owned(),
            user: user.to_owned(),
            password,
            state,
            statements: 0,
        }
    }

    fn client(&self) -> Command {
        let mut cmd = Command::new("psql");
        cmd.args(["-X", "-q", "-v", "ON_ERROR_STOP=1"])
            .arg("-d")
            .arg(&self.name)
            .arg("-U")
            .arg(&self.user);
        if let Some(password) = &self.password {
            cmd.env("PGPASSWORD", password);
        }
        cmd
    }

    fn run(&mut self, mut cmd: Command) -> Result<String> {
        self.statements += 1;
        let Output {
            status,
            stdout,
            stderr,
        } = cmd.output()?;
        if !status.success() {
            return Err(DbError::Command {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn run_sql(&mut self, sql: &str) -> Result<String> {
        let mut cmd = self.client();
        cmd.arg("-c").arg(sql);
        self.run(cmd)
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn truncate_statement() -> String {
    let keep = TOPOLOGY_TABLES
        .iter()
        .map(|t| quote(t))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "DO $$ DECLARE r RECORD; BEGIN \
         FOR r IN SELECT tablename FROM pg_tables WHERE schemaname = 'public' \
         AND tablename NOT IN ({keep}) LOOP \
         EXECUTE 'TRUNCATE TABLE ' || quote_ident(r.tablename) || ' CASCADE'; \
         END LOOP; END $$;"
    )
}

fn insert_batches<T>(table: &str, rows: &[T], values: impl Fn(&T) -> String) -> Vec<String> {
    rows.chunks(INSERT_BATCH)
        .map(|chunk| {
            let values = chunk.iter().map(&values).collect::<Vec<_>>().join(", ");
            format!("INSERT INTO {table} VALUES {values};")
        })
        .collect()
}

impl Database for PsqlDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn user(&self) -> &str {
        &self.user
    }

    fn state(&self) -> DbState {
        self.state
    }

    fn truncate(&mut self) -> Result<()> {
        self.run_sql(&truncate_statement())?;
        info!(database = %self.name, "non-topology tables truncated");
        Ok(())
    }

    fn load_schema(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(DbError::MissingSchema(path.to_path_buf()));
        }
        let mut cmd = self.client();
        cmd.arg("-f").arg(path);
        self.run(cmd)?;
        debug!(path = %path.display(), "schema installed");
        Ok(())
    }

    fn load_topo(&mut self, provider: &dyn NetworkProvider) -> Result<()> {
        let topology = provider.topology();
        let mut batches = insert_batches("switches", &topology.switches, |s| {
            format!("({}, {})", s.id, quote(&s.name))
        });
        batches.extend(insert_batches("hosts", &topology.hosts, |h| {
            format!("({}, {})", h.id, quote(&h.name))
        }));
        batches.extend(insert_batches("tp", &topology.links, |l| {
            format!("({}, {})", quote(&l.a), quote(&l.b))
        }));
        for batch in batches {
            self.run_sql(&batch)?;
        }
        info!(
            switches = topology.switches.len(),
            hosts = topology.hosts.len(),
            links = topology.links.len(),
            "topology bulk loaded"
        );
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<String> {
        self.run_sql(sql)
    }

    fn statements_issued(&self) -> u64 {
        self.statements
    }
}
