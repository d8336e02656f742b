//! Kitsu API Data Transfer Objects (JSON:API shaped)
//!
//! API Reference: https://kitsu.docs.apiary.io/

use serde::{Deserialize, Serialize};

/// Search response: `GET /anime?filter[text]=...`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimeSearchResponse {
    #[serde(default)]
    pub data: Vec<AnimeResource>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimeResource {
    pub id: String,
    pub attributes: AnimeAttributes,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeAttributes {
    pub canonical_title: String,
    /// "YYYY-MM-DD"
    pub start_date: Option<String>,
}

/// Genres response: `GET /anime/{id}/genres`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenresResponse {
    #[serde(default)]
    pub data: Vec<GenreResource>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenreResource {
    pub attributes: GenreAttributes,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenreAttributes {
    pub name: String,
}
