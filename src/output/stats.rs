//! Run statistics
//!
//! Collected by the coordinator at the end of a run and printed by the
//! CLI after the sinks are written.

use chrono::{DateTime, Utc};

use crate::state::{RunStatus, RunWarning};

/// Run statistics summary
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    /// Top-level categories written
    pub categories: usize,

    /// Category nodes below the top level
    pub subcategories: usize,

    /// Harvesting units (subcategories, or categories without any)
    pub leaves: usize,

    /// Products written
    pub products: usize,

    /// Product encounters rejected because the URL was already admitted
    pub duplicate_products: usize,

    /// Records skipped for lack of a name or link
    pub dropped_records: usize,

    /// Differing descriptive fields resolved by keeping the first value
    pub identity_conflicts: usize,

    /// Requests made, robots.txt included
    pub requests: u32,

    pub warnings: usize,
}

impl RunStatistics {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `status` - How the run ended
/// * `warnings` - Degraded branches, listed when present
pub fn print_statistics(stats: &RunStatistics, status: RunStatus, warnings: &[RunWarning]) {
    println!("=== Run Statistics ===\n");

    println!("Overview:");
    println!("  Status: {}", status.as_str());
    println!("  Duration: {}s", stats.duration_seconds());
    println!("  Requests made: {}", stats.requests);
    println!();

    println!("Catalog:");
    println!("  Categories: {}", stats.categories);
    println!("  Subcategories: {}", stats.subcategories);
    println!("  Leaves harvested: {}", stats.leaves);
    println!("  Products: {}", stats.products);
    println!();

    println!("Deduplication:");
    println!("  Duplicate product encounters: {}", stats.duplicate_products);
    println!("  Dropped records: {}", stats.dropped_records);
    println!("  Identity conflicts: {}", stats.identity_conflicts);
    println!();

    if !warnings.is_empty() {
        println!("Warnings ({}):", warnings.len());
        for warning in warnings {
            println!("  - {}", warning);
        }
        println!();
    }
}
