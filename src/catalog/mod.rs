//! Catalog runs.
//!
//! A run reconciles every configured source directory with the catalog:
//! entries whose files are gone are pruned, new files are turned into
//! partial records, resolved against the providers in fixed-size batches,
//! and each batch is persisted in one transaction.
//!
//! Per-item failures never leave their item: they are logged where they
//! happen and counted in the [`RunSummary`].

use std::collections::HashSet;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use futures::future::join_all;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

use crate::db;
use crate::enrichment::{EnrichmentService, PartialRecord, ResolvedRecord};
use crate::error::{Error, Result, ResultExt};
use crate::events::Notifier;
use crate::hints::{self, FilenameParser};
use crate::model::{CatalogKind, SourceRoot};
use crate::scanner::{self, ScanFilter};

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub added: usize,
    pub failed: usize,
    pub removed: usize,
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.failed += other.failed;
        self.removed += other.removed;
    }
}

/// The records extracted from one file, waiting for resolution.
///
/// A file bundling several episodes yields several records. They are stored
/// together or not at all, so a file is never half catalogued.
#[derive(Debug, Clone)]
struct WorkItem {
    path: PathBuf,
    records: Vec<PartialRecord>,
}

/// Split `items` into consecutive batches of at most `size` records.
///
/// A file's records never straddle two batches; a file with more than
/// `size` records gets a batch of its own.
fn batches(items: &[WorkItem], size: usize) -> Vec<&[WorkItem]> {
    let mut batches = Vec::new();
    let (mut start, mut records) = (0, 0);
    for (i, item) in items.iter().enumerate() {
        if records > 0 && records + item.records.len() > size {
            batches.push(&items[start..i]);
            start = i;
            records = 0;
        }
        records += item.records.len();
    }
    if start < items.len() {
        batches.push(&items[start..]);
    }
    batches
}

/// Drives catalog runs over source directories.
pub struct BatchScheduler {
    pool: SqlitePool,
    service: EnrichmentService,
    parser: Arc<dyn FilenameParser>,
    filter: ScanFilter,
    concurrency: usize,
    notifier: Arc<dyn Notifier>,
}

impl BatchScheduler {
    /// `concurrency` is the batch size: lookups resolved together before
    /// their results are committed.
    pub fn new(
        pool: SqlitePool,
        service: EnrichmentService,
        parser: Arc<dyn FilenameParser>,
        filter: ScanFilter,
        concurrency: usize,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            service,
            parser,
            filter,
            concurrency: concurrency.max(1),
            notifier,
        }
    }

    /// Catalog every source and return the aggregated counters.
    ///
    /// A source that cannot be catalogued is logged and left out of the
    /// summary; the other sources still run.
    pub async fn run_catalog(&self, sources: &[SourceRoot]) -> RunSummary {
        self.notifier.info("Starting scan");

        if sources.is_empty() {
            self.notifier.error("You don't have any sources defined");
            return RunSummary::default();
        }

        let mut summary = RunSummary::default();
        for source in sources {
            match self.catalog_source(source).await {
                Ok(counts) => summary += counts,
                Err(e) => {
                    error!(target: "catalog::run", root = %source.path.display(), error = %e, "Source run failed")
                }
            }
        }

        self.notifier.info(&format!(
            "Scan complete. {} new items, {} could not be added.",
            summary.added, summary.failed
        ));
        summary
    }

    /// Catalog one source directory.
    pub async fn catalog_source(&self, source: &SourceRoot) -> Result<RunSummary> {
        if !tokio::fs::try_exists(&source.path).await.unwrap_or(false) {
            return Err(Error::source_not_found(&source.path));
        }

        let started = Instant::now();
        let lookups_before = self.service.lookups();
        let mut summary = RunSummary {
            removed: self
                .prune(&source.path)
                .await
                .with_context(format!("pruning {}", source.path.display()))?,
            ..RunSummary::default()
        };

        let candidates = self.new_paths(&source.path).await?;
        debug!(target: "catalog::run", root = %source.path.display(), count = candidates.len(), "New files found");

        let (items, unextracted) = self.extract(source, candidates).await?;
        summary.failed += unextracted;

        for batch in batches(&items, self.concurrency) {
            summary += self.run_batch(source, batch).await;
        }

        self.promote_shows(&source.path).await?;

        info!(
            target: "catalog::run",
            root = %source.path.display(),
            class = %source.class,
            added = summary.added,
            failed = summary.failed,
            removed = summary.removed,
            lookups = self.service.lookups() - lookups_before,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Source catalogued"
        );
        Ok(summary)
    }

    /// Remove entries under `root` whose files no longer exist.
    ///
    /// A movie goes as soon as any of its discs under `root` is missing;
    /// discs on other sources are left to their own runs. An episode's
    /// removal deletes its show when it was the last one.
    async fn prune(&self, root: &Path) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for movie in db::movies_under(&mut tx, root).await? {
            let mut missing = None;
            for disc in movie.paths().filter(|disc| Path::new(disc).starts_with(root)) {
                if !still_exists(Path::new(disc)).await {
                    missing = Some(disc.to_string());
                    break;
                }
            }
            if let Some(disc) = missing {
                info!(target: "catalog::prune", media_id = %movie.media_id, path = %disc, "Removing movie");
                db::delete_movie(&mut tx, movie.id).await?;
                removed += 1;
            }
        }

        let mut touched_shows = HashSet::new();
        for episode in db::episodes_under(&mut tx, root).await? {
            if still_exists(Path::new(&episode.path)).await {
                continue;
            }
            info!(target: "catalog::prune", path = %episode.path, episode = episode.episode, "Removing episode");
            db::delete_episode(&mut tx, episode.id).await?;
            touched_shows.insert(episode.show_id);
            removed += 1;
        }

        for show_id in touched_shows {
            if db::delete_show_if_empty(&mut tx, show_id).await? {
                info!(target: "catalog::prune", show_id, "Removed show without episodes");
            } else {
                db::promote_show_if_watched(&mut tx, show_id).await?;
            }
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// Accepted files under `root` the catalog doesn't hold yet.
    async fn new_paths(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let known = {
            let mut conn = self.pool.acquire().await?;
            db::known_paths(&mut conn, root).await?
        };

        Ok(scanner::scan(root.to_path_buf(), self.filter.clone())
            .filter(|path| futures::future::ready(!known.contains(path)))
            .collect::<Vec<_>>()
            .await)
    }

    /// Extract hints for every path on the blocking pool.
    ///
    /// Returns the work items and the number of paths that produced none.
    async fn extract(&self, source: &SourceRoot, paths: Vec<PathBuf>) -> Result<(Vec<WorkItem>, usize)> {
        let source = source.clone();
        let parser = Arc::clone(&self.parser);

        let extracted = tokio::task::spawn_blocking(move || {
            let mut items = Vec::new();
            let mut failed = 0;
            for path in paths {
                match hints::extract(&path, &source, parser.as_ref()) {
                    Ok(records) => items.push(WorkItem { path, records }),
                    Err(e) if e.is_skip() => {
                        warn!(target: "catalog::run", path = %path.display(), reason = %e, "Skipping file");
                        failed += 1;
                    }
                    Err(e) => {
                        warn!(target: "catalog::run", path = %path.display(), error = %e, "Could not extract hints");
                        failed += 1;
                    }
                }
            }
            (items, failed)
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        Ok(extracted)
    }

    /// Resolve one batch concurrently, then persist it in one transaction.
    ///
    /// A file whose records don't all resolve is left out entirely and
    /// counted as failed for each of its records.
    async fn run_batch(&self, source: &SourceRoot, batch: &[WorkItem]) -> RunSummary {
        let kind = source.class.strategy().kind;
        let outcomes = join_all(batch.iter().map(|item| {
            join_all(
                item.records
                    .iter()
                    .map(|record| self.service.resolve(record.clone(), source.class)),
            )
        }))
        .await;

        let mut summary = RunSummary::default();
        let mut resolved = Vec::with_capacity(batch.len());
        for (item, outcomes) in batch.iter().zip(outcomes) {
            let mut records = Vec::with_capacity(outcomes.len());
            for outcome in outcomes {
                match outcome {
                    Ok(record) if kind == CatalogKind::Show && record.episode.is_none() => {
                        warn!(target: "catalog::run", path = %item.path.display(), "Resolved episode has no episode number");
                    }
                    Ok(record) => records.push(record),
                    Err(e) if e.is_skip() => {
                        warn!(target: "catalog::run", path = %item.path.display(), reason = %e, "No confident match");
                    }
                    Err(e) => {
                        error!(target: "catalog::run", path = %item.path.display(), error = %e, "Lookup failed");
                    }
                }
            }

            if records.len() == item.records.len() {
                resolved.extend(records.into_iter().map(|record| (item.path.as_path(), record)));
            } else {
                if !records.is_empty() {
                    warn!(
                        target: "catalog::run",
                        path = %item.path.display(),
                        resolved = records.len(),
                        total = item.records.len(),
                        "Holding back a partly resolved file until the next run"
                    );
                }
                summary.failed += item.records.len();
            }
        }

        match self.persist(source, &resolved).await {
            Ok(()) => summary.added += resolved.len(),
            Err(e) => {
                error!(
                    target: "catalog::run",
                    root = %source.path.display(),
                    items = resolved.len(),
                    error = %e,
                    "Batch commit failed, results dropped until the next run"
                );
                summary.failed += resolved.len();
            }
        }
        summary
    }

    async fn persist(&self, source: &SourceRoot, resolved: &[(&Path, ResolvedRecord)]) -> sqlx::Result<()> {
        if resolved.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for (path, record) in resolved {
            let path = path.to_string_lossy();
            match source.class.strategy().kind {
                CatalogKind::Movie => persist_movie(&mut tx, record, &path).await?,
                CatalogKind::Show => {
                    let show = db::get_or_create_show(&mut tx, record, source.class).await?;
                    let episode = record.episode.unwrap_or_default();
                    db::add_episode(&mut tx, &show, record.season, episode, &path).await?;
                    debug!(target: "catalog::run", media_id = %record.media_id, %path, episode, "Episode added");
                }
            }
        }
        tx.commit().await
    }

    /// Mark shows with episodes under `root` watched once all their episodes are.
    async fn promote_shows(&self, root: &Path) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let show_ids: HashSet<i64> = db::episodes_under(&mut tx, root)
            .await?
            .into_iter()
            .map(|e| e.show_id)
            .collect();
        for show_id in show_ids {
            if db::promote_show_if_watched(&mut tx, show_id).await? {
                info!(target: "catalog::run", show_id, "Show fully watched");
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn persist_movie(conn: &mut SqliteConnection, record: &ResolvedRecord, path: &str) -> sqlx::Result<()> {
    if record.disc.is_none() && db::find_movie_by_media_id(conn, &record.media_id).await?.is_some() {
        warn!(
            target: "catalog::run",
            media_id = %record.media_id,
            %path,
            "Merging a second file without a disc marker"
        );
    }
    let movie = db::upsert_movie(conn, record, path).await?;
    debug!(target: "catalog::run", media_id = %movie.media_id, path = %movie.path, "Movie stored");
    Ok(())
}

/// Unknown existence counts as present so an unreadable mount isn't pruned.
async fn still_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(true)
}
