//! Record CLI commands, shared by channels and locations.

use clap::{Parser, Subcommand};
use uuid::Uuid;

use stockroom_core::record::UpsertInput;

use super::PolicyArg;

/// Record management commands.
#[derive(Debug, Parser)]
pub struct RecordCommand {
    #[command(subcommand)]
    pub action: RecordAction,
}

/// Available record actions.
#[derive(Debug, Subcommand)]
pub enum RecordAction {
    /// Create or update records.
    Upsert {
        /// Items as `CODE` (create) or `ID=CODE`.
        #[arg(required = true, value_parser = parse_input)]
        inputs: Vec<UpsertInput>,
        /// Upsert endpoint to call.
        #[arg(long, value_enum, default_value_t)]
        policy: PolicyArg,
    },
    /// Get a record by ID.
    Get {
        /// Record ID.
        id: Uuid,
    },
    /// List records by ID and/or code.
    Filter {
        /// Record ID (repeatable).
        #[arg(long = "id")]
        ids: Vec<Uuid>,
        /// Record code (repeatable).
        #[arg(long = "code")]
        codes: Vec<String>,
    },
    /// List one page of records.
    Page {
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 25)]
        limit: i64,
        /// Record code (repeatable).
        #[arg(long = "code")]
        codes: Vec<String>,
    },
    /// Delete records by ID.
    Delete {
        /// Record IDs.
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
}

/// Parses `CODE` or `ID=CODE` into an upsert item.
pub fn parse_input(raw: &str) -> Result<UpsertInput, String> {
    match raw.split_once('=') {
        Some((id, code)) => {
            let id = Uuid::parse_str(id.trim()).map_err(|e| format!("invalid id '{id}': {e}"))?;
            Ok(UpsertInput::new(id, code.trim()))
        }
        None => Ok(UpsertInput::create(raw.trim())),
    }
}
