// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `marlin status` command implementation.

use std::path::Path;

use marlin_config::MarlinConfig;
use marlin_core::MarlinError;
use marlin_storage::MessageCache;

/// Print cache statistics and durable counters for the configured store.
pub async fn run(config: &MarlinConfig) -> Result<(), MarlinError> {
    if !Path::new(&config.storage.database_path).exists() {
        println!(
            "no cache database at {}; has the agent run yet?",
            config.storage.database_path
        );
        return Ok(());
    }

    let cache = MessageCache::new(config.storage.clone());
    cache.initialize().await?;

    let stats = cache.stats().await?;
    let counters = cache.counters().await?;

    println!("database:               {}", config.storage.database_path);
    println!("cached messages:        {}", stats.total_messages);
    println!("distinct chats:         {}", stats.distinct_chats);
    println!("view-once messages:     {}", stats.view_once_messages);
    println!("total ever cached:      {}", counters.total_cached);
    println!("recovered after revoke: {}", counters.recovered_after_revoke);
    match counters.last_sweep_ms {
        Some(ms) => println!("last sweep (epoch ms):  {ms}"),
        None => println!("last sweep:             never"),
    }

    cache.close().await?;
    Ok(())
}
