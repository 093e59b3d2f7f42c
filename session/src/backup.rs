//! Catalog-aware backup and restore of a database's file set.
//!
//! A database on disk is its descriptor (`<db>.database`) plus a structure
//! file and a data file for every table the descriptor lists. The descriptor
//! is the only authority on which table files belong to the database, so both
//! directions copy the descriptor first and then walk its table list.
//!
//! Missing or uncopyable table files never abort a run; they are collected as
//! [`CopyWarning`]s so the largest possible part of the database is carried
//! over. Only precondition failures and problems with the descriptor itself
//! are fatal.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use trivialdb_shell_core::{CatalogSchema, StorageLayout, TableFileKind, validate_identifier};

use crate::bridge::{CommandBatch, Engine};
use crate::config::ensure_distinct_roots;
use crate::error::{Result, SessionError};
use crate::manifest::BackupManifest;
use crate::report::{CopyWarning, Operation, OperationReport, Phase};
use crate::session::Session;

/// Suffix of the descriptor copy while its catalog is still being read.
const STAGING_SUFFIX: &str = "partial";

/// Records and logs the phases of one run.
struct PhaseTracker {
    operation: Operation,
    database: String,
    phases: Vec<Phase>,
}

impl PhaseTracker {
    fn start(operation: Operation, database: &str) -> Self {
        Self {
            operation,
            database: database.to_string(),
            phases: vec![Phase::Idle],
        }
    }

    fn current(&self) -> Phase {
        self.phases.last().copied().unwrap_or(Phase::Idle)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(
            operation = %self.operation,
            database = %self.database,
            from = %self.current(),
            to = %phase,
            "phase transition"
        );
        self.phases.push(phase);
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        warn!(
            operation = %self.operation,
            database = %self.database,
            phase = %self.current(),
            error = %err,
            "run failed"
        );
        self.phases.push(Phase::Failed);
        err
    }

    fn finish(&mut self, report: &mut OperationReport) {
        self.enter(report.status());
        report.phases = std::mem::take(&mut self.phases);
        info!(
            operation = %self.operation,
            database = %self.database,
            copied = report.copied.len(),
            warnings = report.warnings.len(),
            status = %report.status(),
            "run finished"
        );
    }
}

/// Moves database file sets between a storage root and a backup root.
#[derive(Debug, Clone)]
pub struct BackupOrchestrator<E> {
    pub(crate) engine: E,
    storage: StorageLayout,
    backup: StorageLayout,
    pub(crate) schema: CatalogSchema,
}

impl<E: Engine> BackupOrchestrator<E> {
    pub fn new(engine: E, storage: StorageLayout, backup: StorageLayout) -> Self {
        Self {
            engine,
            storage,
            backup,
            schema: CatalogSchema::default(),
        }
    }

    pub fn with_schema(mut self, schema: CatalogSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    pub fn backup_layout(&self) -> &StorageLayout {
        &self.backup
    }

    /// Backs up the session's selected database.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoDatabaseSelected`] before anything runs.
    /// - [`SessionError::Config`] when the storage and backup roots are the
    ///   same directory, before anything runs.
    /// - [`SessionError::MissingDatabaseFile`] if the descriptor is absent.
    /// - Any engine error from the flush step.
    /// - [`SessionError::CorruptCatalog`] or [`SessionError::Io`] for the
    ///   descriptor; a previous backup's descriptor is left untouched.
    pub fn backup(&self, session: &Session) -> Result<OperationReport> {
        let mut tracker = PhaseTracker::start(
            Operation::Backup,
            session.selected_database().unwrap_or_default(),
        );
        self.run_backup(session, &mut tracker)
            .map_err(|err| tracker.fail(err))
    }

    fn run_backup(&self, session: &Session, tracker: &mut PhaseTracker) -> Result<OperationReport> {
        tracker.enter(Phase::Validating);
        let database = session.require_database()?.to_string();
        ensure_distinct_roots(self.storage.root(), self.backup.root())?;
        let descriptor = self.storage.descriptor_path(&database);
        // Opening a database that has no descriptor makes the engine write
        // one on close, so check before flushing as well as after.
        ensure_descriptor(&descriptor)?;
        self.engine
            .run(&CommandBatch::close_session(&database), session.credentials())?;
        ensure_descriptor(&descriptor)?;
        fs::create_dir_all(self.backup.root())
            .map_err(|err| SessionError::io(self.backup.root(), err))?;

        tracker.enter(Phase::CopyingCatalog);
        let target = self.backup.descriptor_path(&database);
        let staged = staging_path(&target);
        if let Err(err) = fs::copy(&descriptor, &staged) {
            let _ = fs::remove_file(&staged);
            return Err(SessionError::io(&staged, err));
        }

        tracker.enter(Phase::ReadingCatalog);
        let catalog = match self.schema.read(&descriptor) {
            Ok(catalog) => catalog,
            Err(err) => {
                let _ = fs::remove_file(&staged);
                return Err(err.into());
            }
        };
        fs::rename(&staged, &target).map_err(|err| SessionError::io(&target, err))?;
        let mut copied = vec![target];

        tracker.enter(Phase::CopyingTableFiles);
        let mut warnings = Vec::new();
        for table in &catalog.tables {
            copy_table_files(table, &self.storage, &self.backup, &mut copied, &mut warnings);
        }

        let manifest_path = self.backup.manifest_path(&database);
        if let Err(err) = write_manifest(&database, &copied, &manifest_path) {
            warn!(path = %manifest_path.display(), error = %err, "failed to write backup manifest");
            warnings.push(CopyWarning::ManifestUnavailable {
                path: manifest_path,
                error: err.to_string(),
            });
        }

        let mut report = OperationReport {
            operation: Operation::Backup,
            database,
            source_root: self.storage.root().to_path_buf(),
            target_root: self.backup.root().to_path_buf(),
            phases: Vec::new(),
            tables: catalog.tables,
            copied,
            warnings,
        };
        tracker.finish(&mut report);
        Ok(report)
    }

    /// Restores `database` from the backup root and selects it.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidIdentifier`] for an unusable name.
    /// - [`SessionError::Config`] when the storage and backup roots are the
    ///   same directory.
    /// - [`SessionError::BackupNotFound`] if no backup descriptor exists.
    /// - [`SessionError::Io`] if the descriptor cannot be copied back.
    ///
    /// Everything after the descriptor copy is reported as warnings, and the
    /// session keeps `database` selected even when table files are missing.
    pub fn restore(&self, session: &mut Session, database: &str) -> Result<OperationReport> {
        let mut tracker = PhaseTracker::start(Operation::Restore, database);
        self.run_restore(session, database, &mut tracker)
            .map_err(|err| tracker.fail(err))
    }

    fn run_restore(
        &self,
        session: &mut Session,
        database: &str,
        tracker: &mut PhaseTracker,
    ) -> Result<OperationReport> {
        tracker.enter(Phase::Validating);
        validate_identifier(database)?;
        ensure_distinct_roots(self.storage.root(), self.backup.root())?;
        let source = self.backup.descriptor_path(database);
        if !source.is_file() {
            return Err(SessionError::BackupNotFound {
                database: database.to_string(),
                path: source,
            });
        }

        let mut warnings = Vec::new();
        let manifest_path = self.backup.manifest_path(database);
        if manifest_path.is_file() {
            match BackupManifest::load(&manifest_path) {
                Ok(manifest) => warnings.extend(manifest.verify(self.backup.root())),
                Err(err) => warnings.push(CopyWarning::ManifestUnavailable {
                    path: manifest_path,
                    error: err.to_string(),
                }),
            }
        } else {
            debug!(database, "backup has no manifest, skipping verification");
        }

        tracker.enter(Phase::CopyingCatalog);
        fs::create_dir_all(self.storage.root())
            .map_err(|err| SessionError::io(self.storage.root(), err))?;
        let target = self.storage.descriptor_path(database);
        fs::copy(&source, &target).map_err(|err| SessionError::io(&target, err))?;
        let mut copied = vec![target.clone()];
        session.select_database(database)?;
        info!(database, "descriptor restored, database selected");

        tracker.enter(Phase::ReadingCatalog);
        let (catalog_tables, catalog_error) = match self.schema.read(&target) {
            Ok(catalog) => (catalog.tables, None),
            Err(err) => {
                warn!(database, error = %err, "restored catalog is unreadable");
                (Vec::new(), Some(format!("restored catalog is unreadable: {err}")))
            }
        };
        let tables = if catalog_tables.is_empty() {
            self.fallback_tables(catalog_error, &mut warnings)
        } else {
            catalog_tables
        };

        tracker.enter(Phase::CopyingTableFiles);
        for table in &tables {
            copy_table_files(table, &self.backup, &self.storage, &mut copied, &mut warnings);
        }

        let mut report = OperationReport {
            operation: Operation::Restore,
            database: database.to_string(),
            source_root: self.backup.root().to_path_buf(),
            target_root: self.storage.root().to_path_buf(),
            phases: Vec::new(),
            tables,
            copied,
            warnings,
        };
        tracker.finish(&mut report);
        Ok(report)
    }

    /// Tables to restore when the catalog yields none: every structure file
    /// in the backup root, whichever database it came from.
    fn fallback_tables(
        &self,
        catalog_error: Option<String>,
        warnings: &mut Vec<CopyWarning>,
    ) -> Vec<String> {
        let reason = catalog_error
            .clone()
            .unwrap_or_else(|| "catalog lists no tables".to_string());
        match self.backup.structure_file_stems() {
            Ok(stems) if !stems.is_empty() => {
                warn!(tables = ?stems, "falling back to structure files found in backup root");
                warnings.push(CopyWarning::CatalogFallback {
                    reason,
                    tables: stems.clone(),
                });
                stems
            }
            Ok(_) => {
                if catalog_error.is_some() {
                    warnings.push(CopyWarning::CatalogFallback {
                        reason,
                        tables: Vec::new(),
                    });
                }
                Vec::new()
            }
            Err(err) => {
                warnings.push(CopyWarning::CatalogFallback {
                    reason: format!("{reason}; backup root unreadable: {err}"),
                    tables: Vec::new(),
                });
                Vec::new()
            }
        }
    }

    /// Checks the backup of `database` against its manifest.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ManifestNotFound`] when the backup has no
    /// manifest, or the manifest's load errors.
    pub fn verify(&self, database: &str) -> Result<Vec<CopyWarning>> {
        validate_identifier(database)?;
        let path = self.backup.manifest_path(database);
        if !path.is_file() {
            return Err(SessionError::ManifestNotFound(path));
        }
        let manifest = BackupManifest::load(&path)?;
        Ok(manifest.verify(self.backup.root()))
    }
}

fn ensure_descriptor(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SessionError::MissingDatabaseFile(path.to_path_buf()))
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".");
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn write_manifest(database: &str, copied: &[PathBuf], path: &Path) -> Result<()> {
    let mut manifest = BackupManifest::new(database);
    for file in copied {
        manifest.record(file)?;
    }
    manifest.save(path)
}

/// Copies the structure and data file of `table` from `from` to `to`.
fn copy_table_files(
    table: &str,
    from: &StorageLayout,
    to: &StorageLayout,
    copied: &mut Vec<PathBuf>,
    warnings: &mut Vec<CopyWarning>,
) {
    if let Err(err) = validate_identifier(table) {
        warn!(table, error = %err, "skipping table with unusable name");
        warnings.push(CopyWarning::InvalidTableName {
            table: table.to_string(),
            error: err.to_string(),
        });
        return;
    }
    for kind in TableFileKind::ALL {
        let src = from.table_path(table, kind);
        let dst = to.table_path(table, kind);
        if !src.is_file() {
            warn!(table, file_kind = %kind, path = %src.display(), "table file missing");
            warnings.push(CopyWarning::MissingTableFile {
                table: table.to_string(),
                file_kind: kind,
                path: src,
            });
            continue;
        }
        match fs::copy(&src, &dst) {
            Ok(bytes) => {
                debug!(table, file_kind = %kind, bytes, "copied table file");
                copied.push(dst);
            }
            Err(err) => {
                warn!(table, path = %src.display(), error = %err, "table file copy failed");
                warnings.push(CopyWarning::CopyFailed {
                    path: src,
                    error: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingEngine, write_database};

    struct Roots {
        _dir: tempfile::TempDir,
        storage: StorageLayout,
        backup: StorageLayout,
    }

    fn roots() -> Roots {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().join("data"));
        let backup = StorageLayout::new(dir.path().join("backup"));
        fs::create_dir_all(storage.root()).unwrap();
        Roots {
            _dir: dir,
            storage,
            backup,
        }
    }

    fn selected(db: &str) -> Session {
        let mut session = Session::new();
        session.select_database(db).unwrap();
        session
    }

    #[test]
    fn test_backup_without_selection_touches_nothing() {
        let roots = roots();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let err = orchestrator.backup(&Session::new()).unwrap_err();
        assert!(matches!(err, SessionError::NoDatabaseSelected));
        assert!(engine.batches().is_empty());
        assert!(!roots.backup.root().exists());
    }

    #[test]
    fn test_backup_flushes_before_copying() {
        let roots = roots();
        write_database(&roots.storage, "shop", &["users"]);
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let report = orchestrator.backup(&selected("shop")).unwrap();
        assert_eq!(engine.batches(), vec!["USE shop;\nEXIT;".to_string()]);
        assert!(report.is_clean());
        assert_eq!(
            report.phases,
            vec![
                Phase::Idle,
                Phase::Validating,
                Phase::CopyingCatalog,
                Phase::ReadingCatalog,
                Phase::CopyingTableFiles,
                Phase::Succeeded,
            ]
        );
        assert!(roots.backup.manifest_path("shop").is_file());
        assert!(!staging_path(&roots.backup.descriptor_path("shop")).exists());
    }

    #[test]
    fn test_backup_missing_descriptor_skips_engine() {
        let roots = roots();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let err = orchestrator.backup(&selected("ghost")).unwrap_err();
        assert!(matches!(err, SessionError::MissingDatabaseFile(_)));
        assert!(engine.batches().is_empty());
    }

    #[test]
    fn test_backup_aborts_on_flush_error() {
        let roots = roots();
        write_database(&roots.storage, "shop", &["users"]);
        let engine = RecordingEngine::new();
        engine.push_error("[Error] database is locked\n");
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let err = orchestrator.backup(&selected("shop")).unwrap_err();
        assert!(matches!(err, SessionError::EngineReportedError(_)));
        assert!(!roots.backup.descriptor_path("shop").exists());
    }

    #[test]
    fn test_corrupt_catalog_keeps_previous_backup() {
        let roots = roots();
        fs::create_dir_all(roots.backup.root()).unwrap();
        fs::write(roots.backup.descriptor_path("shop"), b"previous").unwrap();
        fs::write(roots.storage.descriptor_path("shop"), [5, 0]).unwrap();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let err = orchestrator.backup(&selected("shop")).unwrap_err();
        assert!(matches!(err, SessionError::CorruptCatalog(_)));
        assert_eq!(
            fs::read(roots.backup.descriptor_path("shop")).unwrap(),
            b"previous"
        );
        assert!(!staging_path(&roots.backup.descriptor_path("shop")).exists());
    }

    #[test]
    fn test_restore_selects_database_despite_missing_files() {
        let roots = roots();
        write_database(&roots.backup, "shop", &["users", "orders"]);
        fs::remove_file(roots.backup.data_path("orders")).unwrap();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let mut session = Session::new();
        let report = orchestrator.restore(&mut session, "shop").unwrap();
        assert_eq!(session.selected_database(), Some("shop"));
        assert_eq!(report.status(), Phase::SucceededWithWarnings);
        assert_eq!(report.warnings.len(), 1);
        assert!(roots.storage.structure_path("orders").is_file());
        assert!(engine.batches().is_empty());
    }

    #[test]
    fn test_restore_without_backup_keeps_selection() {
        let roots = roots();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let mut session = selected("other");
        let err = orchestrator.restore(&mut session, "shop").unwrap_err();
        assert!(matches!(err, SessionError::BackupNotFound { .. }));
        assert_eq!(session.selected_database(), Some("other"));
    }

    #[test]
    fn test_restore_falls_back_to_structure_files() {
        let roots = roots();
        write_database(&roots.backup, "shop", &[]);
        fs::write(roots.backup.structure_path("users"), b"head").unwrap();
        fs::write(roots.backup.data_path("users"), b"rows").unwrap();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let mut session = Session::new();
        let report = orchestrator.restore(&mut session, "shop").unwrap();
        assert_eq!(report.tables, vec!["users"]);
        assert!(matches!(
            report.warnings.as_slice(),
            [CopyWarning::CatalogFallback { .. }]
        ));
        assert_eq!(fs::read(roots.storage.data_path("users")).unwrap(), b"rows");
    }

    #[test]
    fn test_restore_of_corrupt_catalog_warns() {
        let roots = roots();
        fs::create_dir_all(roots.backup.root()).unwrap();
        fs::write(roots.backup.descriptor_path("shop"), [1, 0, 0, 0]).unwrap();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let mut session = Session::new();
        let report = orchestrator.restore(&mut session, "shop").unwrap();
        assert!(report.tables.is_empty());
        assert!(matches!(
            report.warnings.as_slice(),
            [CopyWarning::CatalogFallback { tables, .. }] if tables.is_empty()
        ));
        assert_eq!(session.selected_database(), Some("shop"));
    }

    #[test]
    fn test_restore_empty_database_is_clean() {
        let roots = roots();
        write_database(&roots.backup, "empty", &[]);
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let report = orchestrator.restore(&mut Session::new(), "empty").unwrap();
        assert!(report.is_clean());
        assert_eq!(report.copied.len(), 1);
    }

    #[test]
    fn test_restore_reports_manifest_mismatch() {
        let roots = roots();
        write_database(&roots.storage, "shop", &["users"]);
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());
        orchestrator.backup(&selected("shop")).unwrap();

        fs::write(roots.backup.data_path("users"), b"bit rot").unwrap();
        assert_eq!(orchestrator.verify("shop").unwrap().len(), 1);

        let report = orchestrator.restore(&mut Session::new(), "shop").unwrap();
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, CopyWarning::ChecksumMismatch { file, .. } if file == "users.tdata")));
    }

    #[test]
    fn test_verify_without_manifest() {
        let roots = roots();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());
        assert!(matches!(
            orchestrator.verify("shop"),
            Err(SessionError::ManifestNotFound(_))
        ));
    }

    #[test]
    fn test_shared_root_is_rejected_before_copying() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().join("data"));
        write_database(&storage, "shop", &["users"]);
        let same = StorageLayout::new(dir.path().join("data/."));
        let engine = RecordingEngine::new();
        let orchestrator = BackupOrchestrator::new(&engine, storage.clone(), same);

        let err = orchestrator.backup(&selected("shop")).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        let err = orchestrator.restore(&mut Session::new(), "shop").unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));

        assert!(engine.batches().is_empty());
        assert_eq!(fs::read(storage.structure_path("users")).unwrap(), b"head:users");
        assert_eq!(fs::read(storage.data_path("users")).unwrap(), b"rows:users");
        assert!(!storage.manifest_path("shop").exists());
    }

    #[test]
    fn test_failed_table_copy_continues() {
        let roots = roots();
        write_database(&roots.storage, "shop", &["users", "orders"]);
        fs::create_dir_all(roots.backup.structure_path("users")).unwrap();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let report = orchestrator.backup(&selected("shop")).unwrap();
        assert_eq!(report.status(), Phase::SucceededWithWarnings);
        assert!(matches!(
            report.warnings.as_slice(),
            [CopyWarning::CopyFailed { path, .. }] if *path == roots.storage.structure_path("users")
        ));
        assert_eq!(fs::read(roots.backup.data_path("users")).unwrap(), b"rows:users");
        assert_eq!(fs::read(roots.backup.structure_path("orders")).unwrap(), b"head:orders");
        assert_eq!(fs::read(roots.backup.data_path("orders")).unwrap(), b"rows:orders");
    }

    #[test]
    fn test_unusable_table_name_is_skipped() {
        let roots = roots();
        write_database(&roots.storage, "shop", &["users"]);
        let catalog = trivialdb_shell_core::Catalog {
            database_name: "shop".to_string(),
            tables: vec!["bad-name".to_string(), "users".to_string()],
        };
        let bytes = CatalogSchema::default().encode(&catalog).unwrap();
        fs::write(roots.storage.descriptor_path("shop"), bytes).unwrap();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let report = orchestrator.backup(&selected("shop")).unwrap();
        assert!(matches!(
            report.warnings.as_slice(),
            [CopyWarning::InvalidTableName { table, .. }] if table == "bad-name"
        ));
        assert!(roots.backup.structure_path("users").is_file());
        assert!(roots.backup.data_path("users").is_file());
    }

    #[test]
    fn test_manifest_write_failure_is_a_warning() {
        let roots = roots();
        write_database(&roots.storage, "shop", &["users"]);
        fs::create_dir_all(roots.backup.manifest_path("shop")).unwrap();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let report = orchestrator.backup(&selected("shop")).unwrap();
        assert_eq!(report.status(), Phase::SucceededWithWarnings);
        assert!(matches!(
            report.warnings.as_slice(),
            [CopyWarning::ManifestUnavailable { path, .. }] if *path == roots.backup.manifest_path("shop")
        ));
        assert_eq!(fs::read(roots.backup.data_path("users")).unwrap(), b"rows:users");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_staging_copy_leaves_no_partial() {
        let roots = roots();
        write_database(&roots.storage, "shop", &["users"]);
        fs::create_dir_all(roots.backup.root()).unwrap();
        fs::write(roots.backup.descriptor_path("shop"), b"previous").unwrap();
        let staged = staging_path(&roots.backup.descriptor_path("shop"));
        std::os::unix::fs::symlink(roots.backup.root().join("gone/shop.database"), &staged)
            .unwrap();
        let engine = RecordingEngine::new();
        let orchestrator =
            BackupOrchestrator::new(&engine, roots.storage.clone(), roots.backup.clone());

        let err = orchestrator.backup(&selected("shop")).unwrap_err();
        assert!(matches!(err, SessionError::Io { .. }));
        assert!(fs::symlink_metadata(&staged).is_err());
        assert_eq!(
            fs::read(roots.backup.descriptor_path("shop")).unwrap(),
            b"previous"
        );
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/b/shop.database")),
            PathBuf::from("/b/shop.database.partial")
        );
    }
}
