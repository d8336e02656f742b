//! OMDb API Data Transfer Objects
//!
//! These types match what the OMDb API returns. Every field arrives as a
//! string, including `Response` ("True"/"False") and `Year`.
//! DO NOT use these types outside the omdb module - convert to domain types.
//!
//! API Reference: https://www.omdbapi.com/

use serde::{Deserialize, Serialize};

/// Response to a by-title (`t=`) or by-id (`i=`) lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TitleResponse {
    /// "True" or "False"
    pub response: String,
    pub title: Option<String>,
    /// "2010", or "2013–2020" for series
    pub year: Option<String>,
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
    /// Comma-separated, e.g. "Action, Adventure, Sci-Fi"
    pub genre: Option<String>,
    /// Present when `Response` is "False"
    pub error: Option<String>,
}

/// Response to a search (`s=`) request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResponse {
    pub response: String,
    #[serde(default)]
    pub search: Vec<SearchItem>,
    pub error: Option<String>,
}

/// One row of a search response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchItem {
    pub title: String,
    pub year: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
}

impl TitleResponse {
    pub fn found(&self) -> bool {
        self.response != "False"
    }
}

impl SearchResponse {
    pub fn found(&self) -> bool {
        self.response != "False"
    }
}
