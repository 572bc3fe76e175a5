//! Command-line front end for markboard.
//!
//! # Responsibility
//! - Format, inspect and check board markup files without storage.
//! - Import, export, list and delete boards in a SQLite file.
//!
//! # Invariants
//! - All board work goes through `markboard_core`; this binary only parses
//!   arguments and prints.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use markboard_core::db::open_db;
use markboard_core::{
    core_version, default_template, init_logging, parse, serialize, BoardService, EngineConfig,
    IdentityStrategy, ParseMetadata, SqliteBoardRepository,
};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE: &str = "markboard.sqlite3";

#[derive(Parser, Debug)]
#[command(name = "markboard", about = "Task boards as outline markup", version)]
struct Cli {
    /// Board database (defaults to MARKBOARD_DB_PATH, then ./markboard.sqlite3)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Identity strategy for parsing and new boards: fresh or embedded
    #[arg(long, global = true)]
    identity: Option<IdentityStrategy>,

    /// Write rotating logs into this absolute directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical form of a markup file (stdin when omitted)
    Fmt { file: Option<PathBuf> },
    /// Print the parsed board as JSON
    Parse {
        file: Option<PathBuf>,
        /// Board title recorded in the output
        #[arg(short, long, default_value = "untitled")]
        title: String,
    },
    /// Fail unless the file is already in canonical form
    Check { file: Option<PathBuf> },
    /// Store a markup file as a new board and print its key
    Import {
        file: Option<PathBuf>,
        #[arg(short, long)]
        title: String,
    },
    /// Print a stored board as markup
    Export { key: i64 },
    /// List stored boards
    List,
    /// Delete a stored board
    Delete { key: i64 },
    /// Print the seed document used for new boards
    Template,
    /// Print the core version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    run(cli, &mut stdout.lock())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = EngineConfig::from_env().context("reading MARKBOARD_* environment")?;
    if let Some(dir) = &cli.log_dir {
        init_logging(config.log_level, dir).context("starting file logging")?;
    }
    let identity = cli.identity.unwrap_or(config.identity_strategy);

    match cli.command {
        Command::Fmt { file } => {
            let text = read_input(file.as_deref())?;
            let board = parse(&text, &ParseMetadata::new("fmt").with_identity(identity))?;
            write!(out, "{}", serialize(&board))?;
        }
        Command::Parse { file, title } => {
            let text = read_input(file.as_deref())?;
            let board = parse(&text, &ParseMetadata::new(title).with_identity(identity))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&board)?)?;
        }
        Command::Check { file } => {
            let text = read_input(file.as_deref())?;
            let metadata = ParseMetadata::new("check").with_identity(identity);
            let canonical = serialize(&parse(&text, &metadata)?);
            let again = serialize(&parse(&canonical, &metadata)?);
            if canonical != again {
                bail!("round-trip is not stable");
            }
            if canonical != text {
                bail!("not in canonical form; run `markboard fmt`");
            }
            writeln!(out, "ok")?;
        }
        Command::Import { file, title } => {
            let text = read_input(file.as_deref())?;
            let db = db_path(cli.db, &config);
            let conn = open_db(&db).with_context(|| format!("opening {}", db.display()))?;
            let service = BoardService::new(SqliteBoardRepository::try_new(&conn)?);
            let board = service.import_markdown(&title, &text, identity)?;
            writeln!(out, "{}", board.key.unwrap_or_default())?;
        }
        Command::Export { key } => {
            let db = db_path(cli.db, &config);
            let conn = open_db(&db).with_context(|| format!("opening {}", db.display()))?;
            let service = BoardService::new(SqliteBoardRepository::try_new(&conn)?);
            write!(out, "{}", service.export_markdown(key)?)?;
        }
        Command::List => {
            let db = db_path(cli.db, &config);
            let conn = open_db(&db).with_context(|| format!("opening {}", db.display()))?;
            let service = BoardService::new(SqliteBoardRepository::try_new(&conn)?);
            for summary in service.list_boards()? {
                writeln!(
                    out,
                    "{}\t{}\t{}/{}\t{}",
                    summary.key,
                    summary.identity,
                    summary.completed_card_count,
                    summary.card_count,
                    summary.title
                )?;
            }
        }
        Command::Delete { key } => {
            let db = db_path(cli.db, &config);
            let conn = open_db(&db).with_context(|| format!("opening {}", db.display()))?;
            let service = BoardService::new(SqliteBoardRepository::try_new(&conn)?);
            service.delete_board(key)?;
            writeln!(out, "deleted {key}")?;
        }
        Command::Template => write!(out, "{}", default_template())?,
        Command::Version => writeln!(out, "markboard {}", core_version())?,
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

fn db_path(flag: Option<PathBuf>, config: &EngineConfig) -> PathBuf {
    flag.or_else(|| config.db_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}
