//! Per-worktree databases: `db.create` and `db.destroy`.
//!
//! Every worktree gets its own database named `<site>_<adjective>_<noun>`.
//! The `<adjective>_<noun>` part is the worktree's suffix; it is kept in the
//! scaffold context for later steps and persisted to `.arbor.local` so that
//! cleanup can find the databases again.

use super::words;
use crate::config::{LocalState, StepConfig};
use crate::envfile::{self, EnvVars};
use crate::error::ArborError;
use crate::process::{run_command, CancelToken, CommandOutput};
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::step::{configured_condition, Step, StepOptions};
use crate::{log_debug, log_info};
use anyhow::{Context, Result};
use rand::Rng;
use std::process::Command;
use std::sync::Arc;

/// PostgreSQL's identifier limit, applied to every engine.
pub const MAX_DB_NAME_LEN: usize = 63;

/// Fresh suffixes tried after the first name turns out to be taken.
pub const MAX_CREATE_RETRIES: usize = 5;

/// Lowercase, runs of anything but ASCII letters and digits become one `_`,
/// no leading or trailing `_`. Never empty.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "db".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn generate_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    words::random_suffix(rng)
}

/// `<site>_<suffix>`, cutting the site part so the name fits
/// [`MAX_DB_NAME_LEN`]. The suffix is never shortened.
pub fn database_name(site: &str, suffix: &str) -> String {
    let site = sanitize_identifier(site);
    let room = MAX_DB_NAME_LEN.saturating_sub(suffix.len() + 1);
    let site = site[..site.len().min(room)].trim_end_matches('_');
    if site.is_empty() {
        suffix.to_string()
    } else {
        format!("{site}_{suffix}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEngine {
    Mysql,
    Postgres,
    /// File based; there is no server database to manage.
    Sqlite,
}

impl DbEngine {
    /// Accepts the `DB_CONNECTION` spellings Laravel uses.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::Mysql),
            "pgsql" | "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Server connection settings taken from the worktree's env file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbConnection {
    pub host: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl DbConnection {
    pub fn from_env(vars: &EnvVars) -> Self {
        let value = |key: &str| vars.get(key).filter(|v| !v.is_empty()).map(str::to_string);
        Self {
            host: value("DB_HOST"),
            port: value("DB_PORT"),
            username: value("DB_USERNAME"),
            password: value("DB_PASSWORD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// The operations the database steps need from a server.
pub trait DbClient {
    fn create_database(&self, name: &str, cancel: &CancelToken) -> Result<CreateOutcome>;

    /// Names matching the SQL `LIKE` pattern.
    fn list_databases(&self, pattern: &str, cancel: &CancelToken) -> Result<Vec<String>>;

    fn drop_database(&self, name: &str, cancel: &CancelToken) -> Result<()>;
}

/// Opens a [`DbClient`] for an engine.
pub trait DbClientProvider: Send + Sync {
    fn client(&self, engine: DbEngine, conn: &DbConnection) -> Result<Box<dyn DbClient>>;
}

/// Drives the `mysql` and `psql` command line clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandDbClients;

impl DbClientProvider for CommandDbClients {
    fn client(&self, engine: DbEngine, conn: &DbConnection) -> Result<Box<dyn DbClient>> {
        match engine {
            DbEngine::Mysql => Ok(Box::new(MysqlClient { conn: conn.clone() })),
            DbEngine::Postgres => Ok(Box::new(PsqlClient { conn: conn.clone() })),
            DbEngine::Sqlite => {
                Err(ArborError::config("sqlite databases have no server to manage").into())
            }
        }
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn is_already_exists(output: &CommandOutput) -> bool {
    let message = output.combined().to_ascii_lowercase();
    message.contains("already exists") || message.contains("database exists")
}

fn run_sql(mut command: Command, program: &str, cancel: &CancelToken) -> Result<CommandOutput> {
    run_command(&mut command, cancel).with_context(|| format!("Failed to run {program}"))
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

struct MysqlClient {
    conn: DbConnection,
}

impl MysqlClient {
    fn execute(&self, sql: &str, cancel: &CancelToken) -> Result<CommandOutput> {
        let mut cmd = Command::new("mysql");
        if let Some(host) = &self.conn.host {
            cmd.args(["-h", host]);
        }
        if let Some(port) = &self.conn.port {
            cmd.args(["-P", port]);
        }
        if let Some(user) = &self.conn.username {
            cmd.args(["-u", user]);
        }
        if let Some(password) = &self.conn.password {
            cmd.env("MYSQL_PWD", password);
        }
        cmd.args(["-N", "-B", "-e", sql]);
        run_sql(cmd, "mysql", cancel)
    }
}

impl DbClient for MysqlClient {
    fn create_database(&self, name: &str, cancel: &CancelToken) -> Result<CreateOutcome> {
        let output = self.execute(&format!("CREATE DATABASE `{name}`"), cancel)?;
        if output.success() {
            Ok(CreateOutcome::Created)
        } else if is_already_exists(&output) {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            anyhow::bail!("mysql: {}", output.error_message())
        }
    }

    fn list_databases(&self, pattern: &str, cancel: &CancelToken) -> Result<Vec<String>> {
        let output = self.execute(&format!("SHOW DATABASES LIKE {}", quote_literal(pattern)), cancel)?;
        if !output.success() {
            anyhow::bail!("mysql: {}", output.error_message());
        }
        Ok(non_empty_lines(&output.stdout))
    }

    fn drop_database(&self, name: &str, cancel: &CancelToken) -> Result<()> {
        let output = self.execute(&format!("DROP DATABASE IF EXISTS `{name}`"), cancel)?;
        if !output.success() {
            anyhow::bail!("mysql: {}", output.error_message());
        }
        Ok(())
    }
}

struct PsqlClient {
    conn: DbConnection,
}

impl PsqlClient {
    fn execute(&self, sql: &str, cancel: &CancelToken) -> Result<CommandOutput> {
        let mut cmd = Command::new("psql");
        if let Some(host) = &self.conn.host {
            cmd.args(["-h", host]);
        }
        if let Some(port) = &self.conn.port {
            cmd.args(["-p", port]);
        }
        if let Some(user) = &self.conn.username {
            cmd.args(["-U", user]);
        }
        if let Some(password) = &self.conn.password {
            cmd.env("PGPASSWORD", password);
        }
        cmd.args(["-d", "postgres", "-X", "-A", "-t", "-c", sql]);
        run_sql(cmd, "psql", cancel)
    }
}

impl DbClient for PsqlClient {
    fn create_database(&self, name: &str, cancel: &CancelToken) -> Result<CreateOutcome> {
        let output = self.execute(&format!("CREATE DATABASE \"{name}\""), cancel)?;
        if output.success() {
            Ok(CreateOutcome::Created)
        } else if is_already_exists(&output) {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            anyhow::bail!("psql: {}", output.error_message())
        }
    }

    fn list_databases(&self, pattern: &str, cancel: &CancelToken) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT datname FROM pg_database WHERE datname LIKE {}",
            quote_literal(pattern)
        );
        let output = self.execute(&sql, cancel)?;
        if !output.success() {
            anyhow::bail!("psql: {}", output.error_message());
        }
        Ok(non_empty_lines(&output.stdout))
    }

    fn drop_database(&self, name: &str, cancel: &CancelToken) -> Result<()> {
        let output = self.execute(&format!("DROP DATABASE IF EXISTS \"{name}\""), cancel)?;
        if !output.success() {
            anyhow::bail!("psql: {}", output.error_message());
        }
        Ok(())
    }
}

fn parse_engine(config: &StepConfig) -> Result<Option<DbEngine>> {
    match config.db_type.as_deref() {
        None => Ok(None),
        Some(name) => DbEngine::from_name(name).map(Some).ok_or_else(|| {
            ArborError::config(format!("{}: unsupported database type '{name}'", config.name))
                .into()
        }),
    }
}

/// The configured engine, else `DB_CONNECTION` from the env file, plus the
/// connection settings from that file. `None` when there is no server
/// database to manage: sqlite, or no engine named anywhere.
fn resolve_engine(
    configured: Option<DbEngine>,
    config: &StepConfig,
    ctx: &ScaffoldContext,
) -> Result<Option<(DbEngine, DbConnection)>> {
    let env_path = ctx.resolve(config.file.as_deref().unwrap_or(".env"));
    let vars = envfile::read_file_if_exists(&env_path)?.unwrap_or_default();

    let engine = match configured {
        Some(engine) => engine,
        None => match vars.get("DB_CONNECTION").filter(|v| !v.is_empty()) {
            Some(name) => DbEngine::from_name(name).ok_or_else(|| {
                ArborError::config(format!("unsupported DB_CONNECTION '{name}'"))
            })?,
            None => {
                log_debug!(
                    "{}: no 'type' given and DB_CONNECTION is not set in {}, skipping",
                    config.name,
                    env_path.display()
                );
                return Ok(None);
            }
        },
    };
    if engine == DbEngine::Sqlite {
        log_debug!("sqlite database needs no server setup");
        return Ok(None);
    }
    Ok(Some((engine, DbConnection::from_env(&vars))))
}

pub struct DbCreateStep {
    config: StepConfig,
    engine: Option<DbEngine>,
    provider: Arc<dyn DbClientProvider>,
}

impl DbCreateStep {
    pub fn new(config: StepConfig, provider: Arc<dyn DbClientProvider>) -> Result<Self> {
        let engine = parse_engine(&config)?;
        Ok(Self {
            config,
            engine,
            provider,
        })
    }

    fn record_suffix(&self, ctx: &ScaffoldContext, suffix: &str) -> Result<()> {
        ctx.set_db_suffix(suffix);
        LocalState {
            db_suffix: Some(suffix.to_string()),
        }
        .save(&ctx.worktree_path)
    }
}

impl Step for DbCreateStep {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        configured_condition(&self.config, ctx)
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()> {
        let Some((engine, conn)) = resolve_engine(self.engine, &self.config, ctx)? else {
            return Ok(());
        };
        let client = self.provider.client(engine, &conn)?;

        // A suffix from an earlier run keeps the worktree on its database.
        if let Some(suffix) = ctx.db_suffix() {
            let name = database_name(&ctx.site_name, &suffix);
            if client.create_database(&name, &opts.cancel)? == CreateOutcome::AlreadyExists {
                log_debug!("Database {name} already exists, reusing it");
            }
            return self.record_suffix(ctx, &suffix);
        }

        let mut rng = rand::rng();
        for attempt in 0..=MAX_CREATE_RETRIES {
            let suffix = generate_suffix(&mut rng);
            let name = database_name(&ctx.site_name, &suffix);
            match client.create_database(&name, &opts.cancel)? {
                CreateOutcome::Created => {
                    if !opts.quiet {
                        log_info!("Created database {name}");
                    }
                    return self.record_suffix(ctx, &suffix);
                }
                CreateOutcome::AlreadyExists => {
                    log_debug!("Database {name} exists (attempt {}), trying another name", attempt + 1);
                }
            }
        }
        anyhow::bail!(
            "no free database name for {} after {} attempts",
            ctx.site_name,
            MAX_CREATE_RETRIES + 1
        )
    }

    fn enabled(&self) -> Option<bool> {
        self.config.enabled
    }
}

pub struct DbDestroyStep {
    config: StepConfig,
    engine: Option<DbEngine>,
    provider: Arc<dyn DbClientProvider>,
}

impl DbDestroyStep {
    pub fn new(config: StepConfig, provider: Arc<dyn DbClientProvider>) -> Result<Self> {
        let engine = parse_engine(&config)?;
        Ok(Self {
            config,
            engine,
            provider,
        })
    }
}

impl Step for DbDestroyStep {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        configured_condition(&self.config, ctx)
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()> {
        let suffix = match ctx.db_suffix() {
            Some(suffix) => suffix,
            None => match LocalState::load(&ctx.worktree_path)?.db_suffix() {
                Some(suffix) => suffix.to_string(),
                None => {
                    log_debug!("No database suffix recorded, nothing to drop");
                    return Ok(());
                }
            },
        };

        let Some((engine, conn)) = resolve_engine(self.engine, &self.config, ctx)? else {
            return Ok(());
        };
        let client = self.provider.client(engine, &conn)?;

        // `_` is a LIKE wildcard, so the listing is filtered again exactly.
        let tail = format!("_{suffix}");
        let names = client.list_databases(&format!("%{tail}"), &opts.cancel)?;
        for name in names.iter().filter(|n| n.ends_with(&tail)) {
            opts.cancel.check()?;
            client
                .drop_database(name, &opts.cancel)
                .with_context(|| format!("Failed to drop database {name}"))?;
            if !opts.quiet {
                log_info!("Dropped database {name}");
            }
        }
        Ok(())
    }

    fn enabled(&self) -> Option<bool> {
        self.config.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// In-memory server. The first `collisions` creates report a clash.
    #[derive(Default)]
    struct FakeServer {
        databases: Mutex<BTreeSet<String>>,
        collisions: Mutex<usize>,
        engines: Mutex<Vec<DbEngine>>,
    }

    struct FakeClient(Arc<FakeServer>);

    impl DbClient for FakeClient {
        fn create_database(&self, name: &str, _: &CancelToken) -> Result<CreateOutcome> {
            let mut collisions = self.0.collisions.lock().unwrap();
            if *collisions > 0 {
                *collisions -= 1;
                return Ok(CreateOutcome::AlreadyExists);
            }
            if self.0.databases.lock().unwrap().insert(name.to_string()) {
                Ok(CreateOutcome::Created)
            } else {
                Ok(CreateOutcome::AlreadyExists)
            }
        }

        fn list_databases(&self, pattern: &str, _: &CancelToken) -> Result<Vec<String>> {
            let tail = pattern.trim_start_matches('%');
            Ok(self
                .0
                .databases
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.ends_with(tail))
                .cloned()
                .collect())
        }

        fn drop_database(&self, name: &str, _: &CancelToken) -> Result<()> {
            self.0.databases.lock().unwrap().remove(name);
            Ok(())
        }
    }

    struct FakeProvider(Arc<FakeServer>);

    impl DbClientProvider for FakeProvider {
        fn client(&self, engine: DbEngine, _: &DbConnection) -> Result<Box<dyn DbClient>> {
            self.0.engines.lock().unwrap().push(engine);
            Ok(Box::new(FakeClient(Arc::clone(&self.0))))
        }
    }

    fn setup(env: &str) -> (tempfile::TempDir, ScaffoldContext, Arc<FakeServer>) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".env"), env).unwrap();
        let ctx = ScaffoldContext::new(dir.path(), "main", "shop").with_site_name("My App");
        (dir, ctx, Arc::new(FakeServer::default()))
    }

    fn is_suffix(s: &str) -> bool {
        s.split_once('_').is_some_and(|(a, b)| {
            !a.is_empty()
                && !b.is_empty()
                && a.chars().all(|c| c.is_ascii_lowercase())
                && b.chars().all(|c| c.is_ascii_lowercase())
        })
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("My App"), "my_app");
        assert_eq!(sanitize_identifier("--shop..v2--"), "shop_v2");
        assert_eq!(sanitize_identifier("a  -  b"), "a_b");
        assert_eq!(sanitize_identifier("???"), "db");
    }

    #[test]
    fn test_database_name_truncates_site_only() {
        let long = "x".repeat(100);
        let name = database_name(&long, "brave_otter");
        assert_eq!(name.len(), MAX_DB_NAME_LEN);
        assert!(name.ends_with("_brave_otter"));
        assert_eq!(database_name("My App", "brave_otter"), "my_app_brave_otter");
    }

    #[test]
    fn test_engine_names() {
        assert_eq!(DbEngine::from_name("mariadb"), Some(DbEngine::Mysql));
        assert_eq!(DbEngine::from_name("PGSQL"), Some(DbEngine::Postgres));
        assert_eq!(DbEngine::from_name("postgresql"), Some(DbEngine::Postgres));
        assert_eq!(DbEngine::from_name("sqlite"), Some(DbEngine::Sqlite));
        assert_eq!(DbEngine::from_name("oracle"), None);
    }

    #[test]
    fn test_create_records_suffix() {
        let (dir, ctx, server) = setup("DB_CONNECTION=mysql\n");
        let step =
            DbCreateStep::new(StepConfig::named("db.create"), Arc::new(FakeProvider(Arc::clone(&server))))
                .unwrap();
        step.run(&ctx, &StepOptions::default()).unwrap();

        let suffix = ctx.db_suffix().unwrap();
        assert!(is_suffix(&suffix), "{suffix}");
        assert_eq!(
            LocalState::load(dir.path()).unwrap().db_suffix(),
            Some(suffix.as_str())
        );
        assert!(server
            .databases
            .lock()
            .unwrap()
            .contains(&format!("my_app_{suffix}")));
        assert_eq!(*server.engines.lock().unwrap(), vec![DbEngine::Mysql]);
    }

    #[test]
    fn test_create_retries_on_collision() {
        let (_dir, ctx, server) = setup("DB_CONNECTION=pgsql\n");
        *server.collisions.lock().unwrap() = MAX_CREATE_RETRIES;
        let step =
            DbCreateStep::new(StepConfig::named("db.create"), Arc::new(FakeProvider(Arc::clone(&server))))
                .unwrap();
        step.run(&ctx, &StepOptions::default()).unwrap();
        assert!(ctx.db_suffix().is_some());
    }

    #[test]
    fn test_create_gives_up_after_retries() {
        let (dir, ctx, server) = setup("DB_CONNECTION=mysql\n");
        *server.collisions.lock().unwrap() = MAX_CREATE_RETRIES + 1;
        let step =
            DbCreateStep::new(StepConfig::named("db.create"), Arc::new(FakeProvider(Arc::clone(&server))))
                .unwrap();
        assert!(step.run(&ctx, &StepOptions::default()).is_err());
        assert_eq!(ctx.db_suffix(), None);
        assert!(!LocalState::path_in(dir.path()).exists());
    }

    #[test]
    fn test_sqlite_is_a_no_op() {
        let (_dir, ctx, server) = setup("DB_CONNECTION=sqlite\n");
        let step =
            DbCreateStep::new(StepConfig::named("db.create"), Arc::new(FakeProvider(Arc::clone(&server))))
                .unwrap();
        step.run(&ctx, &StepOptions::default()).unwrap();
        assert_eq!(ctx.db_suffix(), None);
        assert!(server.engines.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unset_connection_is_a_no_op() {
        for env in ["APP_NAME=shop\n", "DB_CONNECTION=\n"] {
            let (dir, ctx, server) = setup(env);
            let step = DbCreateStep::new(
                StepConfig::named("db.create"),
                Arc::new(FakeProvider(Arc::clone(&server))),
            )
            .unwrap();
            step.run(&ctx, &StepOptions::default()).unwrap();
            assert_eq!(ctx.db_suffix(), None);
            assert!(server.engines.lock().unwrap().is_empty());
            assert!(!LocalState::path_in(dir.path()).exists());
        }
    }

    #[test]
    fn test_missing_env_file_is_a_no_op() {
        let dir = tempdir().unwrap();
        let ctx = ScaffoldContext::new(dir.path(), "main", "shop");
        let server = Arc::new(FakeServer::default());
        let step =
            DbCreateStep::new(StepConfig::named("db.create"), Arc::new(FakeProvider(Arc::clone(&server))))
                .unwrap();
        step.run(&ctx, &StepOptions::default()).unwrap();
        assert!(server.engines.lock().unwrap().is_empty());
    }

    #[test]
    fn test_explicit_type_wins_over_env() {
        let (_dir, ctx, server) = setup("DB_CONNECTION=sqlite\n");
        let config = StepConfig {
            db_type: Some("postgres".into()),
            ..StepConfig::named("db.create")
        };
        let step = DbCreateStep::new(config, Arc::new(FakeProvider(Arc::clone(&server)))).unwrap();
        step.run(&ctx, &StepOptions::default()).unwrap();
        assert_eq!(*server.engines.lock().unwrap(), vec![DbEngine::Postgres]);
    }

    #[test]
    fn test_unknown_type_rejected_at_build() {
        let config = StepConfig {
            db_type: Some("oracle".into()),
            ..StepConfig::named("db.create")
        };
        let provider = Arc::new(FakeProvider(Arc::new(FakeServer::default())));
        assert!(DbCreateStep::new(config, provider).is_err());
    }

    #[test]
    fn test_destroy_drops_matching_databases() {
        let (dir, ctx, server) = setup("DB_CONNECTION=mysql\n");
        {
            let mut dbs = server.databases.lock().unwrap();
            dbs.insert("my_app_brave_otter".into());
            dbs.insert("my_app_testing_brave_otter".into());
            dbs.insert("my_app_calm_heron".into());
        }
        LocalState {
            db_suffix: Some("brave_otter".into()),
        }
        .save(dir.path())
        .unwrap();

        let step = DbDestroyStep::new(
            StepConfig::named("db.destroy"),
            Arc::new(FakeProvider(Arc::clone(&server))),
        )
        .unwrap();
        step.run(&ctx, &StepOptions::default()).unwrap();

        let left: Vec<String> = server.databases.lock().unwrap().iter().cloned().collect();
        assert_eq!(left, vec!["my_app_calm_heron"]);
    }

    #[test]
    fn test_destroy_without_suffix_is_a_no_op() {
        let (_dir, ctx, server) = setup("DB_CONNECTION=mysql\n");
        let step = DbDestroyStep::new(
            StepConfig::named("db.destroy"),
            Arc::new(FakeProvider(Arc::clone(&server))),
        )
        .unwrap();
        step.run(&ctx, &StepOptions::default()).unwrap();
        assert!(server.engines.lock().unwrap().is_empty());
    }
}
