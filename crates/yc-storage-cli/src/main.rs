// crates/yc-storage-cli/src/main.rs
// ============================================================================
// Module: YC Storage CLI Entry Point
// Description: Command dispatcher for the YC Storage MCP server.
// Purpose: Launch the server and inspect its tools and configuration.
// Dependencies: clap, dotenvy, serde_json, thiserror, tokio, yc-storage-mcp
// ============================================================================

//! ## Overview
//! Running the binary without a subcommand serves MCP over stdio, which is how
//! MCP clients launch it. `serve` accepts transport overrides, `tools` prints
//! the advertised tool definitions, and `config validate` checks a config
//! file. A `.env` file in the working directory is loaded before anything
//! else so storage credentials can live outside the client configuration.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use thiserror::Error;
use yc_storage_config::ServerTransport;
use yc_storage_config::StorageMcpConfig;
use yc_storage_mcp::McpServer;
use yc_storage_mcp::tooling::tool_definitions;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "yc-storage-mcp", version, about = "MCP server for Yandex Cloud Object Storage")]
struct Cli {
    /// Selected subcommand; defaults to `serve` with configured settings.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the MCP server.
    Serve(ServeCommand),
    /// Print the tool definitions advertised by `tools/list`.
    Tools,
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug, Default)]
struct ServeCommand {
    /// Optional config file path (defaults to yc-storage-mcp.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Transport override.
    #[arg(long, value_enum, value_name = "TRANSPORT")]
    transport: Option<TransportArg>,
    /// Bind address override for the HTTP transport.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

/// Transport selection for `serve`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum TransportArg {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    Stdio,
    /// JSON-RPC over HTTP `POST /rpc`.
    Http,
}

impl From<TransportArg> for ServerTransport {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Stdio => Self::Stdio,
            TransportArg::Http => Self::Http,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to yc-storage-mcp.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
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
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    load_dotenv()?;
    match cli.command {
        None => command_serve(ServeCommand::default()).await,
        Some(Commands::Serve(command)) => command_serve(command).await,
        Some(Commands::Tools) => command_tools(),
        Some(Commands::Config {
            command,
        }) => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

/// Loads `.env` from the working directory when present.
fn load_dotenv() -> CliResult<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(CliError::new(format!("failed to load .env: {err}"))),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let mut config = StorageMcpConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    apply_serve_overrides(&mut config, &command);
    let server = McpServer::from_config(config)
        .await
        .map_err(|err| CliError::new(format!("failed to start server: {err}")))?;
    server
        .serve_until(shutdown_signal())
        .await
        .map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Applies command-line transport overrides on top of loaded config.
fn apply_serve_overrides(config: &mut StorageMcpConfig, command: &ServeCommand) {
    if let Some(transport) = command.transport {
        config.server.transport = transport.into();
        if transport == TransportArg::Stdio {
            config.server.bind = None;
        }
    }
    if let Some(bind) = &command.bind {
        config.server.bind = Some(bind.clone());
    }
}

/// Resolves when the process receives an interrupt signal.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// SECTION: Inspection Commands
// ============================================================================

/// Executes the `tools` command.
fn command_tools() -> CliResult<ExitCode> {
    let payload = serde_json::to_string_pretty(&tool_definitions())
        .map_err(|err| CliError::new(format!("failed to render tools: {err}")))?;
    write_stdout_line(&payload).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = StorageMcpConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let summary = format!(
        "config ok (transport: {}, endpoint: {}, region: {})",
        config.server.transport.as_str(),
        config.storage.endpoint,
        config.storage.region
    );
    write_stdout_line(&summary).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
