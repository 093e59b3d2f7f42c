mod interactive;

use std::io::Read;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use trivialdb_shell_session::{OperationReport, ProcessEngine, Shell, ShellConfig};

#[derive(Debug, Parser)]
#[command(name = "tdb-shell", version)]
#[command(about = "Shell, backup and restore for the TrivialDB engine")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Engine binary; overrides `engine.binary`.
    #[arg(long, global = true)]
    engine: Option<PathBuf>,
    /// Directory holding the database files; overrides `storage.root`.
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,
    /// Directory holding backups; overrides `storage.backup_root`.
    #[arg(long, global = true)]
    backup_root: Option<PathBuf>,
    /// Kill the engine after this many seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Database to select before running the command.
    #[arg(short = 'd', long, global = true)]
    database: Option<String>,
    /// Engine username.
    #[arg(short = 'u', long, global = true, requires = "password")]
    user: Option<String>,
    /// Engine password.
    #[arg(short = 'p', long, global = true, requires = "user")]
    password: Option<String>,
    /// Log debug output to stderr.
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run SQL; reads stdin when no SQL is given.
    Sql(SqlArgs),
    /// Create a database.
    CreateDb(NameArgs),
    /// Show a database.
    ShowDb(NameArgs),
    /// List the tables a database's descriptor declares.
    Tables(NameArgs),
    /// Back up the database given with -d.
    Backup(ReportArgs),
    /// Restore a database from the backup root.
    Restore(RestoreArgs),
    /// Check a backup against its manifest.
    Verify(RestoreArgs),
    /// Read commands and SQL from stdin line by line.
    Interactive,
}

#[derive(Debug, Args)]
struct SqlArgs {
    /// SQL text; joined with spaces.
    sql: Vec<String>,
}

#[derive(Debug, Args)]
struct NameArgs {
    name: String,
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct RestoreArgs {
    name: String,
    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = build_shell(&cli.global).and_then(|mut shell| match cli.command {
        Command::Sql(args) => run_sql(&shell, args),
        Command::CreateDb(args) => run_create_db(&mut shell, args),
        Command::ShowDb(args) => run_show_db(&mut shell, args),
        Command::Tables(args) => run_tables(&shell, args),
        Command::Backup(args) => run_backup(&shell, args),
        Command::Restore(args) => run_restore(&mut shell, args),
        Command::Verify(args) => run_verify(&shell, args),
        Command::Interactive => run_interactive(&mut shell),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &GlobalArgs) -> Result<ShellConfig, String> {
    let mut config = match &args.config {
        Some(path) => ShellConfig::load(path).map_err(|err| err.to_string())?,
        None => ShellConfig::default(),
    };
    if let Some(engine) = &args.engine {
        config.engine.binary = engine.clone();
    }
    if let Some(root) = &args.storage_root {
        config.storage.root = Some(root.clone());
    }
    if let Some(root) = &args.backup_root {
        config.storage.backup_root = Some(root.clone());
    }
    if args.timeout.is_some() {
        config.engine.timeout_secs = args.timeout;
    }
    Ok(config)
}

fn build_shell(args: &GlobalArgs) -> Result<Shell<ProcessEngine>, String> {
    let config = load_config(args)?;
    debug!(
        engine = %config.engine.binary.display(),
        storage_root = %config.storage_root().display(),
        backup_root = %config.backup_root().display(),
        "resolved configuration"
    );
    let mut shell = Shell::from_config(&config).map_err(|err| err.to_string())?;
    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        shell.login(user, password).map_err(|err| err.to_string())?;
    }
    if let Some(database) = &args.database {
        shell
            .session_mut()
            .select_database(database)
            .map_err(|err| err.to_string())?;
    }
    Ok(shell)
}

fn run_sql(shell: &Shell<ProcessEngine>, args: SqlArgs) -> Result<(), String> {
    let sql = if args.sql.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| format!("Failed to read SQL from stdin: {err}"))?;
        text
    } else {
        args.sql.join(" ")
    };
    if sql.trim().is_empty() {
        return Err("No SQL given".to_string());
    }

    let output = if shell.session().selected_database().is_some() {
        shell.execute(&sql)
    } else {
        shell.execute_unscoped(&sql)
    }
    .map_err(|err| err.to_string())?;
    print!("{output}");
    Ok(())
}

fn run_create_db(shell: &mut Shell<ProcessEngine>, args: NameArgs) -> Result<(), String> {
    let output = shell
        .create_database(&args.name)
        .map_err(|err| err.to_string())?;
    print!("{output}");
    Ok(())
}

fn run_show_db(shell: &mut Shell<ProcessEngine>, args: NameArgs) -> Result<(), String> {
    let output = shell
        .select_database(&args.name)
        .map_err(|err| err.to_string())?;
    print!("{output}");
    Ok(())
}

fn run_tables(shell: &Shell<ProcessEngine>, args: NameArgs) -> Result<(), String> {
    let tables = shell
        .list_tables(&args.name)
        .map_err(|err| err.to_string())?;
    for table in tables {
        println!("{table}");
    }
    Ok(())
}

fn print_report(report: &OperationReport, json: bool) -> Result<(), String> {
    if json {
        let raw = serde_json::to_string_pretty(report)
            .map_err(|err| format!("Failed to serialize report: {err}"))?;
        println!("{raw}");
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

fn run_backup(shell: &Shell<ProcessEngine>, args: ReportArgs) -> Result<(), String> {
    if shell.session().selected_database().is_none() {
        return Err("No database selected; pass -d <name>".to_string());
    }
    let report = shell.backup().map_err(|err| err.to_string())?;
    print_report(&report, args.json)
}

fn run_restore(shell: &mut Shell<ProcessEngine>, args: RestoreArgs) -> Result<(), String> {
    let report = shell.restore(&args.name).map_err(|err| err.to_string())?;
    print_report(&report, args.json)
}

fn run_verify(shell: &Shell<ProcessEngine>, args: RestoreArgs) -> Result<(), String> {
    let problems = shell
        .verify_backup(&args.name)
        .map_err(|err| err.to_string())?;
    if args.json {
        let raw = serde_json::to_string_pretty(&problems)
            .map_err(|err| format!("Failed to serialize result: {err}"))?;
        println!("{raw}");
    } else if problems.is_empty() {
        println!("backup of `{}` matches its manifest", args.name);
    } else {
        for problem in &problems {
            println!("{problem}");
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "{} file(s) in the backup of `{}` do not match the manifest",
            problems.len(),
            args.name
        ))
    }
}

fn run_interactive(shell: &mut Shell<ProcessEngine>) -> Result<(), String> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    interactive::run(shell, stdin.lock(), stdout.lock())
        .map_err(|err| format!("Interactive session failed: {err}"))
}
