use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use muse_db::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background task that cancels orders left PENDING for longer than
/// `pending_ttl`.
///
/// The first tick fires immediately, then every `interval`. Exits once
/// `shutdown` is cancelled.
pub async fn run_sweeper(
    db: Arc<Database>,
    interval: Duration,
    pending_ttl: chrono::Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Order sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                match sweep_once(db.clone(), pending_ttl, Utc::now()).await {
                    Ok(count) => {
                        if count > 0 {
                            info!("Sweeper: cancelled {} stale pending orders", count);
                        }
                    }
                    Err(e) => {
                        warn!("Sweeper error: {}", e);
                    }
                }
            }
        }
    }
}

/// One sweep as of `now`: every PENDING order created before
/// `now - pending_ttl` becomes CANCELLED. Returns how many changed.
pub async fn sweep_once(
    db: Arc<Database>,
    pending_ttl: chrono::Duration,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let cutoff = now
        .checked_sub_signed(pending_ttl)
        .ok_or_else(|| anyhow::anyhow!("pending TTL {} reaches before the calendar", pending_ttl))?;
    tokio::task::spawn_blocking(move || db.cancel_stale_orders(cutoff)).await?
}
