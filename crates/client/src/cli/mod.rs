//! CLI command definitions.

pub mod loadtest;
pub mod records;

use clap::{Parser, Subcommand, ValueEnum};

use stockroom_core::service::UpsertPolicy;

/// CLI client for the stockroom API.
#[derive(Debug, Parser)]
#[command(name = "stockroom-client")]
#[command(about = "CLI client for the stockroom API", long_about = None)]
pub struct Cli {
    /// Server base URL.
    #[arg(long, env = "STOCKROOM_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    /// Suppress non-essential output.
    #[arg(long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Upsert endpoint to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// `/upsert`: per-item lookup, no transaction.
    Immediate,
    /// `/upsert-batch-fetching`: one locked bulk read, no transaction.
    BatchFetching,
    /// `/upsert-with-transaction`: everything in one transaction.
    #[default]
    Transaction,
    /// `/upsert-with-lock`: transaction plus a delay per item.
    Lock,
}

impl From<PolicyArg> for UpsertPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Immediate => UpsertPolicy::Immediate,
            PolicyArg::BatchFetching => UpsertPolicy::PrefetchBatched,
            PolicyArg::Transaction => UpsertPolicy::Transactional,
            PolicyArg::Lock => UpsertPolicy::TransactionalLocked,
        }
    }
}

/// Record kind to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Channel,
    Location,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sales channel management.
    Channel(records::RecordCommand),
    /// Inventory location management.
    Location(records::RecordCommand),
    /// Check that the server is up.
    Ping,
    /// Fire concurrent upserts with random codes.
    Loadtest(loadtest::LoadtestCommand),
}
