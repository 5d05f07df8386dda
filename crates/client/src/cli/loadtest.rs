//! Load test CLI command.

use clap::Parser;

use super::{KindArg, PolicyArg};

/// Fire `vus` concurrent users, each posting `iterations` single-item batches.
#[derive(Debug, Parser)]
pub struct LoadtestCommand {
    /// Record kind to upsert.
    #[arg(long, value_enum, default_value = "channel")]
    pub kind: KindArg,
    /// Upsert endpoint to call.
    #[arg(long, value_enum, default_value = "lock")]
    pub policy: PolicyArg,
    /// Concurrent virtual users.
    #[arg(long, default_value_t = 2)]
    pub vus: usize,
    /// Requests per virtual user.
    #[arg(long, default_value_t = 2)]
    pub iterations: usize,
}
