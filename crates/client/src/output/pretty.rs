//! Pretty output formatting.

use stockroom_core::record::{Record, UpsertOutput};
use stockroom_core::service::UpsertSummary;
use stockroom_core::storage::Pagination;

use crate::client::loadtest::LoadReport;

/// Format a record for display.
pub fn format_record<R: Record>(record: &R) -> String {
    format!(
        "{}\n  ID: {}\n  Created: {}\n  Updated: {}",
        record.code(),
        record.id(),
        record.created_at().to_rfc3339(),
        record.updated_at().to_rfc3339()
    )
}

/// Format records for display.
pub fn format_records<R: Record>(records: &[R]) -> String {
    if records.is_empty() {
        return format!("No {}s found.", R::KIND);
    }
    let mut output = format!("{}S ({})\n", R::KIND.to_uppercase(), records.len());
    output.push_str(&"-".repeat(40));
    for record in records {
        output.push_str(&format!("\n{}", format_record(record)));
        output.push('\n');
    }
    output
}

/// Format a page of records for display.
pub fn format_page<R: Record>(page: &Pagination<R>) -> String {
    format!(
        "{}\nPage {} of {} ({} total)",
        format_records(&page.items),
        page.current_page,
        page.total_page,
        page.total
    )
}

pub fn format_summary(summary: &UpsertSummary) -> String {
    format!("Created: {}\nUpdated: {}", summary.created, summary.updated)
}

/// Format the failed items of an upsert.
pub fn format_outputs(outputs: &[UpsertOutput]) -> String {
    let mut output = format!("FAILED ({})\n", outputs.len());
    output.push_str(&"-".repeat(40));
    for item in outputs {
        output.push_str(&format!(
            "\n{} [{:?}]\n  ID: {}\n  {}\n",
            item.code, item.status, item.id, item.message
        ));
    }
    output
}

pub fn format_report(report: &LoadReport) -> String {
    format!(
        "Requests: {}\nCreated: {}\nFailed: {}\nElapsed: {}ms\nMax latency: {}ms",
        report.requests, report.created, report.failed, report.elapsed_ms, report.max_latency_ms
    )
}
