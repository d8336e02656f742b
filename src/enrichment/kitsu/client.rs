//! Kitsu client
//!
//! Anime lookups: take the first search hit, then fetch its genres.

use std::sync::Arc;

use async_trait::async_trait;

use super::dto;
use crate::enrichment::coordinator::{RequestCoordinator, params};
use crate::enrichment::domain::{AnimeHit, EnrichmentError, leading_year};
use crate::enrichment::traits::AnimeProvider;

/// Default Kitsu API root.
pub const DEFAULT_KITSU_URL: &str = "https://kitsu.io/api/edge";

/// Kitsu API client
pub struct KitsuClient {
    coordinator: Arc<RequestCoordinator>,
    base_url: String,
}

impl KitsuClient {
    pub fn new(coordinator: Arc<RequestCoordinator>, base_url: impl Into<String>) -> Self {
        Self {
            coordinator,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AnimeProvider for KitsuClient {
    async fn search(&self, title: &str) -> Result<Option<AnimeHit>, EnrichmentError> {
        let url = format!("{}/anime", self.base_url);
        let response: dto::AnimeSearchResponse = self
            .coordinator
            .get_json(&url, &params(&[("filter[text]", title)]))
            .await?;

        Ok(response.data.into_iter().next().map(|anime| AnimeHit {
            year: anime.attributes.start_date.as_deref().and_then(leading_year),
            title: anime.attributes.canonical_title,
            media_id: anime.id,
        }))
    }

    async fn genres(&self, media_id: &str) -> Result<Vec<String>, EnrichmentError> {
        let url = format!("{}/anime/{}/genres", self.base_url, media_id);
        let response: dto::GenresResponse = self.coordinator.get_json(&url, &[]).await?;
        Ok(response.data.into_iter().map(|g| g.attributes.name).collect())
    }
}
