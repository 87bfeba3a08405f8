// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic maintenance timers.
//!
//! The cache sweep and the WAL flush run on independent fixed-interval
//! timers. Neither coordinates with the event stream beyond serializing
//! against the same single-writer store handle.

use std::sync::Arc;
use std::time::Duration;

use marlin_storage::MessageCache;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Spawn the periodic age sweep.
pub fn spawn_sweeper(
    cache: Arc<MessageCache>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The immediate first tick would sweep an empty cache.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match cache.cleanup_old_messages().await {
                        Ok(removed) => debug!(removed, "cache sweep complete"),
                        Err(e) => warn!(error = %e, "cache sweep failed"),
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}

/// Spawn the periodic WAL checkpoint.
pub fn spawn_flusher(
    cache: Arc<MessageCache>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = cache.flush().await {
                        warn!(error = %e, "store flush failed");
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}
