//! Background expiry and eviction.
//!
//! The vector store has no server-side TTL, so a periodic task enforces
//! the freshness contract: expired entries are deleted every pass, and
//! when the live count exceeds the configured ceiling the excess is
//! removed in ascending expiry order. Time-sensitive entries (5-minute
//! TTL) are therefore the preferred eviction victims; evergreen entries
//! survive memory pressure longest.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::SemanticStore;
use super::client::VectorIndex;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries deleted because their expiry elapsed.
    pub expired: u64,
    /// Entries evicted to respect the live-entry ceiling.
    pub evicted: u64,
}

/// Spawns the sweeper loop. Failures are warnings; the loop continues.
pub fn spawn_sweeper<V>(store: Arc<SemanticStore<V>>, interval: Duration) -> JoinHandle<()>
where
    V: VectorIndex + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup is quiet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.sweep_once().await {
                Ok(report) => {
                    if report.expired > 0 || report.evicted > 0 {
                        debug!(
                            expired = report.expired,
                            evicted = report.evicted,
                            "sweep pass complete"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "sweep pass failed");
                }
            }
        }
    })
}
