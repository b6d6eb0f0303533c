pub mod search;
pub mod serve;

use std::sync::Arc;

use cluster_memory::MemoryCluster;
use kbrowse_engine::{MessageSearch, ScanPool};

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Build the cluster, load seed data and wire the search service.
pub async fn bootstrap(config: &ServerConfig) -> Result<Arc<MessageSearch>, ServerError> {
    let cluster = Arc::new(MemoryCluster::new(config.cluster.clone()));

    for topic_cfg in &config.topics {
        let retention = topic_cfg.retention_records.unwrap_or(config.cluster.retention_records);
        cluster
            .create_topic_with_retention(&topic_cfg.name, topic_cfg.partitions, retention)
            .await?;
        let mut seeded = 0;
        if let Some(path) = &topic_cfg.seed {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| ServerError::Config {
                context: "seed",
                detail: format!("'{path}': {e}"),
            })?;
            seeded = cluster.seed_from_jsonl(&topic_cfg.name, &content).await?;
        }
        tracing::info!(
            topic = %topic_cfg.name,
            partitions = topic_cfg.partitions,
            retention,
            seeded,
            "registered topic"
        );
    }

    let pool = Arc::new(ScanPool::new(config.search.workers));
    let workers = pool.workers();
    let search = MessageSearch::new(cluster.clone(), cluster, pool, &config.search)?;
    tracing::info!(
        workers,
        fetch_timeout_ms = config.search.fetch_timeout_ms,
        batch_size = config.search.batch_size,
        "search engine ready"
    );
    Ok(Arc::new(search))
}
