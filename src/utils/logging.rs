//! Logging helpers
//!
//! Banner and summary formatting for the run log

use anyhow::{Context, Result};
use std::fs;
use tracing::info;

use crate::config::Config;
use crate::store::AuditSummary;

/// Start a fresh run log file
///
/// # Arguments
/// - `log_file_path`: run log path
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nSIGAE bulk withdrawal log - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("writing run log {}", log_file_path))?;
    Ok(())
}

/// Log the run settings
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 SIGAE bulk withdrawal - program {}", config.program);
    info!("🌐 Portal: {}", config.portal_base_url);
    info!(
        "⏱️ Delay between records: {} ms",
        config.inter_record_delay_ms
    );
    info!("{}", "=".repeat(60));
}

/// Log the loaded input
///
/// # Arguments
/// - `total`: records to attempt this run
/// - `source`: file the records came from
/// - `carried`: outcomes recovered from the journal of an earlier run
pub fn log_records_loaded(total: usize, source: &str, carried: usize) {
    info!("✓ {} records to process from {}", total, source);
    if carried > 0 {
        info!("↩️ {} records already attempted in an interrupted run", carried);
    }
    info!("💡 Press Ctrl-C to stop after the current record\n");
}

/// Print the end-of-run statistics
///
/// # Arguments
/// - `summary`: audit over every outcome in the report
/// - `pending`: records left for the next run
/// - `log_file_path`: run log path
pub fn print_final_stats(summary: &AuditSummary, pending: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 Run complete");
    info!(
        "Finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ Success: {}/{}", summary.successes, summary.total);
    info!("❌ Failure: {}", summary.failures);
    if pending > 0 {
        info!("⏸️ Pending: {}", pending);
    }
    info!("{}", "=".repeat(60));
    info!("\nLog saved to: {}", log_file_path);
}

/// Truncate long text for logs and notes
///
/// # Arguments
/// - `text`: original text
/// - `max_len`: maximum characters kept
///
/// # Returns
/// The text cut to `max_len` characters, with `...` when something was cut
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
