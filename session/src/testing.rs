//! In-process engine stand-ins for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use trivialdb_shell_core::{Catalog, CatalogSchema, StorageLayout};

use crate::bridge::{CommandBatch, Engine};
use crate::error::{Result, SessionError};
use crate::session::Credentials;

enum Reply {
    Stdout(String),
    Stderr(String),
}

/// Records every rendered batch and answers from a queue (empty stdout when
/// the queue runs dry).
#[derive(Default)]
pub(crate) struct RecordingEngine {
    batches: RefCell<Vec<String>>,
    logins: RefCell<Vec<Option<String>>>,
    replies: RefCell<VecDeque<Reply>>,
}

impl RecordingEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_output(&self, text: &str) {
        self.replies
            .borrow_mut()
            .push_back(Reply::Stdout(text.to_string()));
    }

    pub(crate) fn push_error(&self, text: &str) {
        self.replies
            .borrow_mut()
            .push_back(Reply::Stderr(text.to_string()));
    }

    pub(crate) fn batches(&self) -> Vec<String> {
        self.batches.borrow().clone()
    }

    /// Username passed with each batch.
    pub(crate) fn logins(&self) -> Vec<Option<String>> {
        self.logins.borrow().clone()
    }
}

impl Engine for RecordingEngine {
    fn run(&self, batch: &CommandBatch, credentials: Option<&Credentials>) -> Result<String> {
        self.batches.borrow_mut().push(batch.render());
        self.logins
            .borrow_mut()
            .push(credentials.map(|c| c.username().to_string()));
        match self.replies.borrow_mut().pop_front() {
            Some(Reply::Stdout(text)) => Ok(text),
            Some(Reply::Stderr(text)) => Err(SessionError::EngineReportedError(text)),
            None => Ok(String::new()),
        }
    }
}

/// Writes a descriptor for `database` plus both files of every table, with
/// contents derived from the table name.
pub(crate) fn write_database(layout: &StorageLayout, database: &str, tables: &[&str]) {
    std::fs::create_dir_all(layout.root()).unwrap();
    let catalog = Catalog {
        database_name: database.to_string(),
        tables: tables.iter().map(|t| t.to_string()).collect(),
    };
    let bytes = CatalogSchema::default().encode(&catalog).unwrap();
    std::fs::write(layout.descriptor_path(database), bytes).unwrap();
    for table in tables {
        std::fs::write(layout.structure_path(table), format!("head:{table}")).unwrap();
        std::fs::write(layout.data_path(table), format!("rows:{table}")).unwrap();
    }
}
