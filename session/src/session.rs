//! Per-user session state: the selected database and login credentials.
//!
//! The engine keeps nothing between invocations, so this is the only place
//! the "current database" lives. It is re-asserted on every batch through the
//! `USE` directive and is never written to disk.

use std::fmt;

use trivialdb_shell_core::validate_identifier;

use crate::bridge::CommandBatch;
use crate::error::{Result, SessionError};

/// Username and password handed to the engine as `-u`/`-p` arguments.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Launch arguments for the engine process.
    pub fn to_args(&self) -> [String; 4] {
        [
            "-u".to_string(),
            self.username.clone(),
            "-p".to_string(),
            self.password.clone(),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// State of one interactive session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    selected_database: Option<String>,
    credentials: Option<Credentials>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_database(&self) -> Option<&str> {
        self.selected_database.as_deref()
    }

    /// Selected database, or [`SessionError::NoDatabaseSelected`].
    pub fn require_database(&self) -> Result<&str> {
        self.selected_database()
            .ok_or(SessionError::NoDatabaseSelected)
    }

    /// Sets the selected database without asking the engine.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidIdentifier`] when `name` cannot be used
    /// in a `USE` directive; the previous selection is kept.
    pub fn select_database(&mut self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        self.selected_database = Some(name.to_string());
        Ok(())
    }

    pub fn clear_database(&mut self) {
        self.selected_database = None;
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Stores credentials used for every following invocation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] when the username is blank.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(SessionError::Config("username must not be empty".to_string()));
        }
        self.credentials = Some(Credentials::new(username, password));
        Ok(())
    }

    pub fn logout(&mut self) {
        self.credentials = None;
    }

    /// A batch of `lines` scoped to the selected database, if any.
    pub fn batch<I, S>(&self, lines: I) -> CommandBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandBatch::from_lines(lines).scoped_to(self.selected_database())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_database_validates() {
        let mut session = Session::new();
        session.select_database("shop").unwrap();
        assert!(session.select_database("shop; DROP DATABASE shop").is_err());
        assert_eq!(session.selected_database(), Some("shop"));
    }

    #[test]
    fn test_require_database() {
        let mut session = Session::new();
        assert!(matches!(
            session.require_database(),
            Err(SessionError::NoDatabaseSelected)
        ));
        session.select_database("shop").unwrap();
        assert_eq!(session.require_database().unwrap(), "shop");
        session.clear_database();
        assert!(session.selected_database().is_none());
    }

    #[test]
    fn test_login_and_logout() {
        let mut session = Session::new();
        assert!(session.login("  ", "pw").is_err());
        session.login("admin", "s3cret").unwrap();
        let creds = session.credentials().unwrap();
        assert_eq!(creds.to_args(), ["-u", "admin", "-p", "s3cret"]);
        assert!(!format!("{creds:?}").contains("s3cret"));
        session.logout();
        assert!(session.credentials().is_none());
    }

    #[test]
    fn test_batch_is_scoped_to_selection() {
        let mut session = Session::new();
        assert_eq!(session.batch(["SHOW DATABASE shop;"]).render(), "SHOW DATABASE shop;\nEXIT;");
        session.select_database("shop").unwrap();
        assert_eq!(
            session.batch(["SELECT * FROM users;"]).render(),
            "USE shop;\nSELECT * FROM users;\nEXIT;"
        );
    }
}
