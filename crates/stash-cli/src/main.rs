// crates/stash-cli/src/main.rs
// ============================================================================
// Module: Stash CLI Entry Point
// Description: Command dispatcher for stash key-value store operations.
// Purpose: Provide a safe CLI for storing and retrieving JSON values.
// Dependencies: clap, serde_json, stash-core, stash-store-sqlite, thiserror, tracing
// ============================================================================

//! ## Overview
//! The stash CLI stores, fetches, and deletes JSON values in a `SQLite`-backed
//! key-value store. Data is written to stdout, diagnostics go to stderr via
//! `tracing`, and every failure exits nonzero with an error message on stderr.
//! Inputs are untrusted and are validated before any store is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod config;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use stash_core::Entry;
use stash_core::Key;
use stash_core::KeyValueStore;
use stash_core::canonical;
use stash_store_sqlite::SqliteKvStore;
use stash_store_sqlite::SqliteStoreConfig;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::DEFAULT_STORE_NAME;
use crate::config::StashConfig;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a batch-set input file.
const MAX_BATCH_INPUT_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "stash", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a JSON value under a key.
    Set(SetCommand),
    /// Fetch the value stored under a key.
    Get(GetCommand),
    /// Delete the entry for a key.
    Delete(DeleteCommand),
    /// List every stored entry.
    List(ListCommand),
    /// Remove every stored entry.
    Clear(ClearCommand),
    /// Apply a batch of entries from a JSON input file.
    BatchSet(BatchSetCommand),
    /// Delete a batch of keys in one transaction.
    BatchDelete(BatchDeleteCommand),
}

/// Store location inputs for `SQLite`-backed store operations.
#[derive(Args, Debug, Clone)]
struct StoreLocationArgs {
    /// Optional config file path (defaults to stash.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Optional direct `SQLite` store path (overrides config).
    #[arg(long = "store-path", value_name = "PATH")]
    store_path: Option<PathBuf>,
}

/// Output formats for structured CLI commands.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum OutputFormat {
    /// Canonical JSON output.
    Json,
    /// Human-readable text output.
    Text,
}

/// Arguments for `set`.
#[derive(Args, Debug)]
struct SetCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
    /// Key to store the value under.
    #[arg(long, value_name = "KEY")]
    key: String,
    /// JSON text of the value to store.
    #[arg(long, value_name = "JSON")]
    value: String,
}

/// Arguments for `get`.
#[derive(Args, Debug)]
struct GetCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
    /// Key to look up.
    #[arg(long, value_name = "KEY")]
    key: String,
}

/// Arguments for `delete`.
#[derive(Args, Debug)]
struct DeleteCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
    /// Key to delete.
    #[arg(long, value_name = "KEY")]
    key: String,
}

/// Arguments for `list`.
#[derive(Args, Debug)]
struct ListCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
    /// Output format for entry listings.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Arguments for `clear`.
#[derive(Args, Debug)]
struct ClearCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
}

/// Arguments for `batch-set`.
#[derive(Args, Debug)]
struct BatchSetCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
    /// Path to a JSON array of `{"key", "value"}` objects.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
}

/// Arguments for `batch-delete`.
#[derive(Args, Debug)]
struct BatchDeleteCommand {
    /// Store location settings.
    #[command(flatten)]
    location: StoreLocationArgs,
    /// Key to delete; repeat the flag for multiple keys.
    #[arg(long = "key", value_name = "KEY", required = true)]
    keys: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Installs the stderr tracing subscriber for CLI diagnostics.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("stash {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Set(command) => command_set(&command),
        Commands::Get(command) => command_get(&command),
        Commands::Delete(command) => command_delete(&command),
        Commands::List(command) => command_list(&command),
        Commands::Clear(command) => command_clear(&command),
        Commands::BatchSet(command) => command_batch_set(&command),
        Commands::BatchDelete(command) => command_batch_delete(&command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

/// Executes `set`.
fn command_set(command: &SetCommand) -> CliResult<ExitCode> {
    let key = parse_key(&command.key)?;
    let value = parse_value(&command.value)?;
    let store = open_store(&command.location)?;
    store.set(&key, &value).map_err(|err| CliError::new(format!("set failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `get`.
fn command_get(command: &GetCommand) -> CliResult<ExitCode> {
    let key = parse_key(&command.key)?;
    let store = open_store(&command.location)?;
    let value = store.get(&key).map_err(|err| CliError::new(format!("get failed: {err}")))?;
    let Some(value) = value else {
        return Err(CliError::new(format!("key not found: {}", key.as_str())));
    };
    let text = canonical::to_canonical_text(&value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_bytes_with_newline(text.as_bytes())?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `delete`.
fn command_delete(command: &DeleteCommand) -> CliResult<ExitCode> {
    let key = parse_key(&command.key)?;
    let store = open_store(&command.location)?;
    store.delete(&key).map_err(|err| CliError::new(format!("delete failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `list`.
fn command_list(command: &ListCommand) -> CliResult<ExitCode> {
    let store = open_store(&command.location)?;
    let mut entries = store.list().map_err(|err| CliError::new(format!("list failed: {err}")))?;
    entries.sort_by(|left, right| left.key.cmp(&right.key));
    let text = render_list_text(&entries)?;
    emit_structured_output(&entries, command.format, text)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `clear`.
fn command_clear(command: &ClearCommand) -> CliResult<ExitCode> {
    let store = open_store(&command.location)?;
    store.clear().map_err(|err| CliError::new(format!("clear failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `batch-set`.
fn command_batch_set(command: &BatchSetCommand) -> CliResult<ExitCode> {
    let entries = read_batch_entries(&command.input)?;
    let store = open_store(&command.location)?;
    store.batch_set(&entries).map_err(|err| CliError::new(format!("batch-set failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `batch-delete`.
fn command_batch_delete(command: &BatchDeleteCommand) -> CliResult<ExitCode> {
    let keys = command.keys.iter().map(|raw| parse_key(raw)).collect::<CliResult<Vec<Key>>>()?;
    let store = open_store(&command.location)?;
    store
        .batch_delete(&keys)
        .map_err(|err| CliError::new(format!("batch-delete failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves the `SQLite` store configuration for CLI operations.
fn resolve_store_config(location: &StoreLocationArgs) -> CliResult<SqliteStoreConfig> {
    if let Some(store_path) = &location.store_path {
        if let Some(config_path) = location.config.as_deref() {
            let config = StashConfig::load(Some(config_path))
                .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
            return Ok(SqliteStoreConfig {
                path: store_path.clone(),
                busy_timeout_ms: config.store.busy_timeout_ms,
                journal_mode: config.store.journal_mode,
                sync_mode: config.store.sync_mode,
                max_value_bytes: config.store.max_value_bytes,
            });
        }
        return Ok(SqliteStoreConfig::new(store_path.clone()));
    }
    let config = StashConfig::load(location.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let path = config.store.path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_NAME));
    Ok(SqliteStoreConfig {
        path,
        busy_timeout_ms: config.store.busy_timeout_ms,
        journal_mode: config.store.journal_mode,
        sync_mode: config.store.sync_mode,
        max_value_bytes: config.store.max_value_bytes,
    })
}

/// Opens the `SQLite` store for CLI operations.
fn open_store(location: &StoreLocationArgs) -> CliResult<SqliteKvStore> {
    let store_config = resolve_store_config(location)?;
    debug!(path = %store_config.path.display(), "resolved store location");
    SqliteKvStore::new(store_config)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Parses a raw key argument into a validated store key.
fn parse_key(raw: &str) -> CliResult<Key> {
    Key::new(raw).map_err(|err| CliError::new(format!("invalid key: {err}")))
}

/// Parses raw JSON text into a value argument.
fn parse_value(raw: &str) -> CliResult<Value> {
    serde_json::from_str(raw).map_err(|err| CliError::new(format!("invalid JSON value: {err}")))
}

/// Reads and parses a batch-set input file.
fn read_batch_entries(path: &Path) -> CliResult<Vec<Entry>> {
    let bytes = read_bytes_with_limit(path, MAX_BATCH_INPUT_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read batch input {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "batch input {} too large: {size} bytes (max {limit})",
            path.display()
        )),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid batch input {}: {err}", path.display())))
}

/// Errors surfaced by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let read_limit = limit.saturating_add(1);
    let mut limited = file.take(read_limit);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Renders entry listings in text form, one aligned line per entry.
fn render_list_text(entries: &[Entry]) -> CliResult<String> {
    let mut buffer = String::new();
    if entries.is_empty() {
        buffer.push_str("no entries");
        buffer.push('\n');
        return Ok(buffer);
    }
    let width = entries.iter().map(|entry| entry.key.as_str().len()).max().unwrap_or(0);
    for entry in entries {
        let value = canonical::to_canonical_text(&entry.value)
            .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
        buffer.push_str(&format!("{:<width$}  {value}", entry.key.as_str()));
        buffer.push('\n');
    }
    Ok(buffer)
}

/// Computes canonical JSON bytes for output rendering.
fn canonical_output_bytes<T: Serialize>(value: &T) -> CliResult<Vec<u8>> {
    let value = serde_json::to_value(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    let text = canonical::to_canonical_text(&value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    Ok(text.into_bytes())
}

/// Emits structured output as canonical JSON or rendered text.
fn emit_structured_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: String,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let bytes = canonical_output_bytes(value)?;
            write_stdout_bytes_with_newline(&bytes)?;
        }
        OutputFormat::Text => {
            let mut output = text;
            if !output.ends_with('\n') {
                output.push('\n');
            }
            write_stdout_bytes(output.as_bytes())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(())
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes raw bytes to stdout with a trailing newline.
fn write_stdout_bytes_with_newline(bytes: &[u8]) -> CliResult<()> {
    let mut buffer = bytes.to_vec();
    buffer.push(b'\n');
    write_stdout_bytes(&buffer).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
