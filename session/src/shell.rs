//! High-level shell: session state plus engine plus storage roots.

use tracing::{debug, info};
use trivialdb_shell_core::{CatalogSchema, Statement, StorageLayout, validate_identifier};

use crate::backup::BackupOrchestrator;
use crate::bridge::{CommandBatch, Engine, ProcessEngine};
use crate::config::ShellConfig;
use crate::error::{Result, SessionError};
use crate::report::{CopyWarning, OperationReport};
use crate::session::Session;

/// Drives one engine on behalf of one user.
///
/// # Examples
///
/// ```no_run
/// use trivialdb_shell_session::{Shell, ShellConfig};
///
/// let config = ShellConfig::load("tdb-shell.yaml").unwrap();
/// let mut shell = Shell::from_config(&config).unwrap();
/// shell.select_database("shop").unwrap();
/// print!("{}", shell.execute("SELECT * FROM users;").unwrap());
/// let report = shell.backup().unwrap();
/// println!("{}", report.summary());
/// ```
#[derive(Debug)]
pub struct Shell<E> {
    orchestrator: BackupOrchestrator<E>,
    session: Session,
}

impl Shell<ProcessEngine> {
    /// Shell over the configured engine binary and storage roots.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the configuration is invalid.
    pub fn from_config(config: &ShellConfig) -> Result<Self> {
        config.validate()?;
        let engine = ProcessEngine::from_config(&config.engine)?;
        Ok(Self::new(engine, config.storage_layout(), config.backup_layout())
            .with_schema(config.engine.catalog_schema()))
    }
}

impl<E: Engine> Shell<E> {
    pub fn new(engine: E, storage: StorageLayout, backup: StorageLayout) -> Self {
        Self {
            orchestrator: BackupOrchestrator::new(engine, storage, backup),
            session: Session::new(),
        }
    }

    pub fn with_schema(mut self, schema: CatalogSchema) -> Self {
        self.orchestrator = self.orchestrator.with_schema(schema);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn storage(&self) -> &StorageLayout {
        self.orchestrator.storage()
    }

    pub fn backup_layout(&self) -> &StorageLayout {
        self.orchestrator.backup_layout()
    }

    fn engine(&self) -> &E {
        &self.orchestrator.engine
    }

    fn run(&self, batch: &CommandBatch) -> Result<String> {
        self.engine().run(batch, self.session.credentials())
    }

    /// Runs `sql` against the selected database.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoDatabaseSelected`] without launching anything, or
    /// whatever the engine run returns.
    pub fn execute(&self, sql: &str) -> Result<String> {
        let database = self.session.require_database()?;
        self.run(&CommandBatch::from_sql(sql).scoped_to(Some(database)))
    }

    /// Runs `sql` without a `USE` directive.
    pub fn execute_unscoped(&self, sql: &str) -> Result<String> {
        self.run(&CommandBatch::from_sql(sql))
    }

    /// Runs one built statement, scoped when it needs a database.
    pub fn run_statement(&self, statement: &Statement) -> Result<String> {
        self.run_statements(std::slice::from_ref(statement))
    }

    /// Runs `statements` in a single batch.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidIdentifier`] for a bad name,
    /// [`SessionError::NoDatabaseSelected`] if any statement needs a
    /// database and none is selected, otherwise the engine's result.
    pub fn run_statements(&self, statements: &[Statement]) -> Result<String> {
        for statement in statements {
            statement.validate()?;
        }
        let database = if statements.iter().any(Statement::needs_database) {
            Some(self.session.require_database()?)
        } else {
            None
        };
        let batch = CommandBatch::from_lines(statements.iter().map(ToString::to_string))
            .scoped_to(database);
        self.run(&batch)
    }

    /// Creates `name` and selects it.
    pub fn create_database(&mut self, name: &str) -> Result<String> {
        let output = self.run_statement(&Statement::CreateDatabase(name.to_string()))?;
        self.session.select_database(name)?;
        info!(database = name, "created and selected database");
        Ok(output)
    }

    /// Asks the engine to show `name` and selects it if that succeeds.
    ///
    /// The selection is unchanged when the engine reports an error.
    pub fn select_database(&mut self, name: &str) -> Result<String> {
        let output = self.run_statement(&Statement::ShowDatabase(name.to_string()))?;
        self.session.select_database(name)?;
        debug!(database = name, "selected database");
        Ok(output)
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.session.login(username, password)
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }

    /// Table names declared by the live descriptor of `database`.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingDatabaseFile`] when there is no descriptor,
    /// [`SessionError::CorruptCatalog`] when it cannot be parsed.
    pub fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        validate_identifier(database)?;
        let path = self.storage().descriptor_path(database);
        if !path.is_file() {
            return Err(SessionError::MissingDatabaseFile(path));
        }
        Ok(self.orchestrator.schema.read(&path)?.tables)
    }

    /// Backs up the selected database.
    pub fn backup(&self) -> Result<OperationReport> {
        self.orchestrator.backup(&self.session)
    }

    /// Restores `database` from the backup root; it stays selected afterwards.
    pub fn restore(&mut self, database: &str) -> Result<OperationReport> {
        self.orchestrator.restore(&mut self.session, database)
    }

    /// Checks the backup of `database` against its manifest.
    pub fn verify_backup(&self, database: &str) -> Result<Vec<CopyWarning>> {
        self.orchestrator.verify(database)
    }
}
