//! Session bridge: one engine process per command batch.
//!
//! The engine reads statements from stdin until it sees `EXIT;` (or stdin
//! closes), writes results to stdout and errors to stderr, then exits. It keeps
//! no state between runs, so every [`CommandBatch`] re-asserts the selected
//! database with a leading `USE` directive.
//!
//! Success and failure are decided by which stream produced output, never by
//! looking for words like "Error" in the result text.
//!
//! # Example
//!
//! ```no_run
//! use trivialdb_shell_session::bridge::{CommandBatch, Engine, ProcessEngine};
//!
//! let engine = ProcessEngine::new("/opt/tdb/bin/trivial_db");
//! let batch = CommandBatch::from_sql("SELECT * FROM users;").scoped_to(Some("shop"));
//! match engine.run(&batch, None) {
//!     Ok(text) => print!("{text}"),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};
use trivialdb_shell_core::TextDecoder;
use wait_timeout::ChildExt;

use crate::config::EngineConfig;
use crate::error::{Result, SessionError};
use crate::session::Credentials;

/// Directive that makes the engine flush the open database and exit.
pub const SESSION_CLOSE_DIRECTIVE: &str = "EXIT;";

/// Ordered lines sent to one engine invocation.
///
/// Rendering always puts the `USE` directive first (when a database is set)
/// and [`SESSION_CLOSE_DIRECTIVE`] last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    database: Option<String>,
    lines: Vec<String>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch holding `sql` as typed, minus surrounding whitespace.
    pub fn from_sql(sql: &str) -> Self {
        Self::from_lines([sql.trim()])
    }

    /// Batch holding each non-blank entry of `lines`.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut batch = Self::new();
        for line in lines {
            batch.push(line);
        }
        batch
    }

    /// Batch that only opens `database` and closes the session, which makes
    /// the engine rewrite the descriptor.
    pub fn close_session(database: &str) -> Self {
        Self::new().scoped_to(Some(database))
    }

    pub fn push(&mut self, line: impl Into<String>) -> &mut Self {
        let line = line.into();
        if !line.trim().is_empty() {
            self.lines.push(line);
        }
        self
    }

    pub fn scoped_to(mut self, database: Option<&str>) -> Self {
        self.database = database.map(str::to_string);
        self
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// User lines, without the use/close directives.
    pub fn statements(&self) -> &[String] {
        &self.lines
    }

    /// Every protocol line in transmission order.
    pub fn protocol_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.lines.len() + 2);
        if let Some(db) = &self.database {
            lines.push(format!("USE {db};"));
        }
        lines.extend(self.lines.iter().cloned());
        lines.push(SESSION_CLOSE_DIRECTIVE.to_string());
        lines
    }

    /// Text written to the engine's stdin.
    pub fn render(&self) -> String {
        self.protocol_lines().join("\n")
    }
}

/// Something that can execute a command batch.
///
/// [`ProcessEngine`] is the real implementation; tests substitute recorders.
pub trait Engine {
    /// Runs `batch` once.
    ///
    /// # Errors
    ///
    /// [`SessionError::ProcessLaunchFailure`] when the engine cannot start,
    /// [`SessionError::EngineReportedError`] when it wrote to stderr.
    fn run(&self, batch: &CommandBatch, credentials: Option<&Credentials>) -> Result<String>;
}

impl<E: Engine + ?Sized> Engine for &E {
    fn run(&self, batch: &CommandBatch, credentials: Option<&Credentials>) -> Result<String> {
        (**self).run(batch, credentials)
    }
}

/// Everything one invocation produced.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    /// Stdout on a clean run; stderr as an error otherwise.
    pub fn into_result(self) -> Result<String> {
        if !self.stderr.is_empty() {
            return Err(SessionError::EngineReportedError(self.stderr));
        }
        if !self.status.success() {
            warn!(
                status = ?self.status.code(),
                "engine exited unsuccessfully without writing to stderr"
            );
        }
        Ok(self.stdout)
    }
}

/// Engine executable run as a child process.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    binary: PathBuf,
    decoder: TextDecoder,
    timeout: Option<Duration>,
}

impl ProcessEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            decoder: TextDecoder::default(),
            timeout: None,
        }
    }

    /// Engine set up from the `engine` section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for an unknown encoding label.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(&config.binary)
            .with_decoder(config.decoder()?)
            .with_timeout(config.timeout()))
    }

    pub fn with_decoder(mut self, decoder: TextDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Resolves the program to spawn and the directory to spawn it in.
    ///
    /// A path with a directory part is made absolute so it does not depend on
    /// how the platform resolves relative programs after `current_dir`. A bare
    /// name is left to `PATH` lookup and runs in the current directory.
    fn launch_target(&self) -> Result<(PathBuf, Option<PathBuf>)> {
        let has_dir = self
            .binary
            .parent()
            .is_some_and(|parent| !parent.as_os_str().is_empty());
        if !has_dir {
            return Ok((self.binary.clone(), None));
        }
        let program =
            std::fs::canonicalize(&self.binary).map_err(|source| SessionError::ProcessLaunchFailure {
                binary: self.binary.clone(),
                source,
            })?;
        let dir = program.parent().map(Path::to_path_buf);
        Ok((program, dir))
    }

    /// Runs `batch` and returns both streams regardless of content.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ProcessLaunchFailure`] if the engine cannot be
    /// spawned, [`SessionError::EngineTimeout`] if a timeout is configured and
    /// expires, or [`SessionError::Io`] if waiting on the child fails.
    pub fn run_captured(
        &self,
        batch: &CommandBatch,
        credentials: Option<&Credentials>,
    ) -> Result<EngineOutput> {
        let (program, working_dir) = self.launch_target()?;
        let script = batch.render();

        let mut command = Command::new(&program);
        if let Some(creds) = credentials {
            command.args(creds.to_args());
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &working_dir {
            command.current_dir(dir);
        }

        debug!(
            program = %program.display(),
            database = ?batch.database(),
            statements = batch.statements().len(),
            authenticated = credentials.is_some(),
            "launching engine"
        );
        let mut child = command
            .spawn()
            .map_err(|source| SessionError::ProcessLaunchFailure {
                binary: self.binary.clone(),
                source,
            })?;

        // Stdin is fed and both pipes drained on their own threads, so the
        // wait (and its timeout) starts at once whatever the engine reads.
        let stdin_thread = child
            .stdin
            .take()
            .map(|stdin| feed_stdin(stdin, script.into_bytes()));
        let stdout_thread = child.stdout.take().map(drain_pipe);
        let stderr_thread = child.stderr.take().map(drain_pipe);

        let status = match self.timeout {
            Some(timeout) => match child
                .wait_timeout(timeout)
                .map_err(|err| SessionError::io(&program, err))?
            {
                Some(status) => status,
                None => {
                    warn!(
                        program = %program.display(),
                        timeout_secs = timeout.as_secs(),
                        "engine timed out, killing process"
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    // The writer sees a broken pipe once the child is gone;
                    // its handle is dropped rather than joined.
                    drop(stdin_thread);
                    return Err(SessionError::EngineTimeout(timeout));
                }
            },
            None => child
                .wait()
                .map_err(|err| SessionError::io(&program, err))?,
        };

        if let Some(handle) = stdin_thread {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(SessionError::io(&program, err)),
                Err(_) => warn!("stdin writer thread panicked"),
            }
        }
        let stdout = join_pipe(stdout_thread, "stdout");
        let stderr = join_pipe(stderr_thread, "stderr");
        debug!(
            status = ?status.code(),
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "engine exited"
        );

        Ok(EngineOutput {
            status,
            stdout: self.decoder.decode(&stdout),
            stderr: self.decoder.decode(&stderr),
        })
    }
}

impl Engine for ProcessEngine {
    fn run(&self, batch: &CommandBatch, credentials: Option<&Credentials>) -> Result<String> {
        self.run_captured(batch, credentials)?.into_result()
    }
}

/// Writes the whole batch and closes stdin. An engine that exits without
/// reading everything is not an error.
fn feed_stdin<W: Write + Send + 'static>(
    mut stdin: W,
    script: Vec<u8>,
) -> JoinHandle<std::io::Result<()>> {
    std::thread::spawn(move || match stdin.write_all(&script) {
        Err(err) if err.kind() == ErrorKind::BrokenPipe => {
            debug!("engine closed stdin before the whole batch was written");
            Ok(())
        }
        result => result,
    })
}

type PipeResult = (Vec<u8>, std::io::Result<usize>);

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<PipeResult> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf);
        (buf, result)
    })
}

fn join_pipe(handle: Option<JoinHandle<PipeResult>>, stream: &str) -> Vec<u8> {
    handle
        .and_then(|thread| thread.join().ok())
        .map(|(buf, result)| {
            if let Err(err) = result {
                warn!(stream, error = %err, "failed to read engine output");
            }
            buf
        })
        .unwrap_or_default()
}
