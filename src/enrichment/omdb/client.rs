//! OMDb client
//!
//! Exact (`t=` + `y=`), search (`s=`) and detail (`i=` + `p=full`) lookups.
//! Every request goes through the shared [`RequestCoordinator`], so identical
//! lookups from sibling episodes collapse into one HTTP call.

use std::sync::Arc;

use async_trait::async_trait;

use super::{adapter, dto};
use crate::enrichment::coordinator::RequestCoordinator;
use crate::enrichment::domain::{CandidateMatch, EnrichmentError, TitleDetail, TitleHit};
use crate::enrichment::traits::TitleProvider;

/// Default OMDb endpoint.
pub const DEFAULT_OMDB_URL: &str = "http://www.omdbapi.com/";

/// OMDb API client
pub struct OmdbClient {
    coordinator: Arc<RequestCoordinator>,
    base_url: String,
    api_key: Option<String>,
}

impl OmdbClient {
    pub fn new(
        coordinator: Arc<RequestCoordinator>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            coordinator,
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Build a parameter list, appending the API key when configured.
    fn params(&self, pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(ref key) = self.api_key {
            params.push(("apikey".to_string(), key.clone()));
        }
        params
    }
}

#[async_trait]
impl TitleProvider for OmdbClient {
    async fn exact(
        &self,
        title: &str,
        year: i32,
        video_type: &str,
    ) -> Result<Option<TitleHit>, EnrichmentError> {
        let year = year.to_string();
        let params = self.params(&[("t", title), ("type", video_type), ("y", &year)]);
        let response: dto::TitleResponse = self.coordinator.get_json(&self.base_url, &params).await?;
        Ok(adapter::to_hit(response))
    }

    async fn search(
        &self,
        title: &str,
        video_type: &str,
    ) -> Result<Vec<CandidateMatch>, EnrichmentError> {
        let params = self.params(&[("s", title), ("type", video_type)]);
        let response: dto::SearchResponse =
            self.coordinator.get_json(&self.base_url, &params).await?;
        Ok(adapter::to_candidates(response))
    }

    async fn detail(
        &self,
        media_id: &str,
        video_type: &str,
    ) -> Result<Option<TitleDetail>, EnrichmentError> {
        let params = self.params(&[("i", media_id), ("p", "full"), ("type", video_type)]);
        let response: dto::TitleResponse = self.coordinator.get_json(&self.base_url, &params).await?;
        Ok(adapter::to_detail(response))
    }
}
