//! Trait definitions for metadata providers.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the coordinator-backed clients, while tests
//! can substitute mock implementations.
//!
//! # Example
//!
//! ```ignore
//! use media_minder::enrichment::traits::TitleProvider;
//!
//! async fn first_hit<P: TitleProvider + ?Sized>(p: &P) -> Option<TitleHit> {
//!     p.exact("Arrietty", 2010, "movie").await.ok().flatten()
//! }
//! ```

use async_trait::async_trait;

use super::domain::{AnimeHit, CandidateMatch, EnrichmentError, TitleDetail, TitleHit};

/// Primary title database (OMDb-compatible).
#[async_trait]
pub trait TitleProvider: Send + Sync {
    /// Exact title + year + type lookup. `None` when nothing matches.
    async fn exact(
        &self,
        title: &str,
        year: i32,
        video_type: &str,
    ) -> Result<Option<TitleHit>, EnrichmentError>;

    /// Broad search by title and type, unranked.
    async fn search(
        &self,
        title: &str,
        video_type: &str,
    ) -> Result<Vec<CandidateMatch>, EnrichmentError>;

    /// Full record by id. `None` when the provider doesn't know the id.
    async fn detail(
        &self,
        media_id: &str,
        video_type: &str,
    ) -> Result<Option<TitleDetail>, EnrichmentError>;
}

/// Secondary search used when the primary search comes back empty.
#[async_trait]
pub trait FallbackSearch: Send + Sync {
    /// Candidates from every result bucket, in bucket priority order.
    async fn find(&self, title: &str) -> Result<Vec<CandidateMatch>, EnrichmentError>;
}

/// Anime-specific provider.
#[async_trait]
pub trait AnimeProvider: Send + Sync {
    /// First search hit for a title.
    async fn search(&self, title: &str) -> Result<Option<AnimeHit>, EnrichmentError>;

    /// Genre names for an anime id.
    async fn genres(&self, media_id: &str) -> Result<Vec<String>, EnrichmentError>;
}
