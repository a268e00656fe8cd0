//! Coarse memory accounting
//!
//! The sandbox reports the change in this worker's resident set across a
//! run. It is a whole-process snapshot, not child-exclusive attribution, and
//! is only meaningful because test cases never run concurrently.

use tracing::debug;

const PROC_STATUS: &str = "/proc/self/status";

/// Resident set size of the current process in KB, 0 when unavailable
pub async fn resident_memory_kb() -> u64 {
    match tokio::fs::read_to_string(PROC_STATUS).await {
        Ok(status) => parse_vm_rss(&status).unwrap_or(0),
        Err(e) => {
            debug!("Cannot read {}: {}", PROC_STATUS, e);
            0
        }
    }
}

fn parse_vm_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse().ok())
}
