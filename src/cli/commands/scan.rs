//! Catalog run command.

use std::sync::Arc;
use tokio::runtime::Runtime;

use super::open_catalog;
use crate::catalog::BatchScheduler;
use crate::config::Config;
use crate::enrichment::EnrichmentService;
use crate::events::LogNotifier;
use crate::hints::GuessParser;
use crate::scanner::ScanFilter;

/// Catalog every configured source
pub fn cmd_scan(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_catalog(config).await?;
        let service = EnrichmentService::new(config.providers.to_enrichment())?;
        let scheduler = BatchScheduler::new(
            pool,
            service,
            Arc::new(GuessParser),
            ScanFilter::new(&config.processor.video_types),
            config.processor.concurrency,
            Arc::new(LogNotifier),
        );

        let summary = scheduler.run_catalog(&config.library.sources).await;
        println!(
            "Added: {}  Failed: {}  Removed: {}",
            summary.added, summary.failed, summary.removed
        );
        Ok::<_, anyhow::Error>(())
    })
}
