//! Line-oriented interactive mode.
//!
//! Lines starting with `.` are shell commands; everything else is SQL,
//! collected until a line ends with `;` and sent as one batch.

use std::io::{self, BufRead, Write};

use trivialdb_shell_session::{Engine, OperationReport, Shell};

const HELP: &str = "\
.use NAME             select a database (runs SHOW DATABASE)
.create NAME          create a database and select it
.tables [NAME]        list tables of NAME or the selected database
.login USER PASS      pass credentials to every following command
.logout               forget credentials
.backup               back up the selected database
.restore NAME         restore NAME from the backup root and select it
.verify NAME          check the backup of NAME against its manifest
.status               show selection and login
.help                 show this text
.quit                 leave";

fn prompt<E: Engine>(shell: &Shell<E>, continuing: bool) -> String {
    if continuing {
        return "   ...> ".to_string();
    }
    match shell.session().selected_database() {
        Some(db) => format!("tdb({db})> "),
        None => "tdb> ".to_string(),
    }
}

fn write_report<W: Write>(out: &mut W, report: &OperationReport) -> io::Result<()> {
    writeln!(out, "{}", report.summary())
}

/// What the loop should do after a dot command.
enum Flow {
    Continue,
    Quit,
}

fn dot_command<E: Engine, W: Write>(
    shell: &mut Shell<E>,
    line: &str,
    out: &mut W,
) -> io::Result<Flow> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = parts.split_first() else {
        return Ok(Flow::Continue);
    };

    match (command, args) {
        (".quit" | ".exit", _) => return Ok(Flow::Quit),
        (".help", _) => writeln!(out, "{HELP}")?,
        (".use", [name]) => match shell.select_database(name) {
            Ok(output) => write!(out, "{output}")?,
            Err(err) => writeln!(out, "error: {err}")?,
        },
        (".create", [name]) => match shell.create_database(name) {
            Ok(output) => write!(out, "{output}")?,
            Err(err) => writeln!(out, "error: {err}")?,
        },
        (".tables", rest) if rest.len() <= 1 => {
            let name = match rest.first() {
                Some(name) => Some(name.to_string()),
                None => shell.session().selected_database().map(str::to_string),
            };
            match name {
                Some(name) => match shell.list_tables(&name) {
                    Ok(tables) => writeln!(out, "{}", tables.join(" "))?,
                    Err(err) => writeln!(out, "error: {err}")?,
                },
                None => writeln!(out, "error: no database selected")?,
            }
        }
        (".login", [user, password]) => match shell.login(user, password) {
            Ok(()) => writeln!(out, "logged in as {user}")?,
            Err(err) => writeln!(out, "error: {err}")?,
        },
        (".logout", []) => {
            shell.logout();
            writeln!(out, "logged out")?;
        }
        (".backup", []) => match shell.backup() {
            Ok(report) => write_report(out, &report)?,
            Err(err) => writeln!(out, "error: {err}")?,
        },
        (".restore", [name]) => match shell.restore(name) {
            Ok(report) => write_report(out, &report)?,
            Err(err) => writeln!(out, "error: {err}")?,
        },
        (".verify", [name]) => match shell.verify_backup(name) {
            Ok(problems) if problems.is_empty() => writeln!(out, "backup matches its manifest")?,
            Ok(problems) => {
                for problem in problems {
                    writeln!(out, "{problem}")?;
                }
            }
            Err(err) => writeln!(out, "error: {err}")?,
        },
        (".status", []) => {
            let session = shell.session();
            writeln!(
                out,
                "database: {}",
                session.selected_database().unwrap_or("(none)")
            )?;
            writeln!(
                out,
                "user: {}",
                session
                    .credentials()
                    .map(|creds| creds.username())
                    .unwrap_or("(anonymous)")
            )?;
        }
        _ => writeln!(out, "error: unknown command or wrong arguments: {line} (try .help)")?,
    }
    Ok(Flow::Continue)
}

fn run_sql<E: Engine, W: Write>(shell: &Shell<E>, sql: &str, out: &mut W) -> io::Result<()> {
    let result = if shell.session().selected_database().is_some() {
        shell.execute(sql)
    } else {
        shell.execute_unscoped(sql)
    };
    match result {
        Ok(output) => write!(out, "{output}"),
        Err(err) => writeln!(out, "error: {err}"),
    }
}

/// Runs the loop until `.quit` or end of input.
pub fn run<E, R, W>(shell: &mut Shell<E>, input: R, mut out: W) -> io::Result<()>
where
    E: Engine,
    R: BufRead,
    W: Write,
{
    let mut pending = String::new();
    let mut lines = input.lines();
    loop {
        write!(out, "{}", prompt(shell, !pending.is_empty()))?;
        out.flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();

        // Dot commands run even mid-statement; the pending text is kept.
        if line.starts_with('.') {
            match dot_command(shell, line, &mut out)? {
                Flow::Continue => continue,
                Flow::Quit => break,
            }
        }
        if pending.is_empty() {
            if line.is_empty() {
                continue;
            }
        } else {
            pending.push('\n');
        }

        pending.push_str(line);
        if line.ends_with(';') {
            run_sql(shell, &pending, &mut out)?;
            pending.clear();
        }
    }

    if !pending.trim().is_empty() {
        writeln!(out, "error: discarded unterminated statement")?;
    }
    writeln!(out)?;
    out.flush()
}
