use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::Engine;

/// Background task that rewrites the journal once enough appends have
/// accumulated since the last compaction. Spawned next to the engine.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        let appends = engine.journal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        debug!(appends, "compacting journal");
        if let Err(e) = engine.compact_journal().await {
            warn!("journal compaction failed: {e}");
        }
    }
}
