//! IMDb find client
//!
//! Used only when the primary search returns nothing. Requests go through the
//! shared [`RequestCoordinator`].

use std::sync::Arc;

use async_trait::async_trait;

use super::dto;
use crate::enrichment::coordinator::{RequestCoordinator, params};
use crate::enrichment::domain::{CandidateMatch, EnrichmentError, leading_year};
use crate::enrichment::traits::FallbackSearch;

/// Default find endpoint.
pub const DEFAULT_IMDB_FIND_URL: &str = "http://www.imdb.com/xml/find";

/// IMDb find API client
pub struct ImdbFindClient {
    coordinator: Arc<RequestCoordinator>,
    base_url: String,
}

impl ImdbFindClient {
    pub fn new(coordinator: Arc<RequestCoordinator>, base_url: impl Into<String>) -> Self {
        Self {
            coordinator,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl FallbackSearch for ImdbFindClient {
    async fn find(&self, title: &str) -> Result<Vec<CandidateMatch>, EnrichmentError> {
        let params = params(&[("q", title), ("tt", "on"), ("nr", "1"), ("json", "1")]);
        let response: dto::FindResponse = self.coordinator.get_json(&self.base_url, &params).await?;
        Ok(to_candidates(response))
    }
}

/// Convert bucketed rows into unranked candidates, preserving bucket order.
fn to_candidates(response: dto::FindResponse) -> Vec<CandidateMatch> {
    response
        .into_ranked_rows()
        .map(|row| {
            let description = html_escape::decode_html_entities(&row.description).into_owned();
            CandidateMatch {
                external_id: row.id,
                title: html_escape::decode_html_entities(&row.title).into_owned(),
                year: leading_year(description.trim_start()),
                description,
                score: 0,
            }
        })
        .collect()
}
