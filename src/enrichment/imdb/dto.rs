//! IMDb find Data Transfer Objects
//!
//! The find endpoint groups results into buckets by match quality. Each
//! bucket is optional and holds `{id, title, description}` rows; the
//! description is free text that usually starts with the release year.

use serde::{Deserialize, Serialize};

/// Response from the find endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FindResponse {
    #[serde(default)]
    pub title_exact: Vec<FindItem>,
    #[serde(default)]
    pub title_popular: Vec<FindItem>,
    #[serde(default)]
    pub title_approx: Vec<FindItem>,
    #[serde(default)]
    pub title_substring: Vec<FindItem>,
}

/// One result row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FindItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl FindResponse {
    /// All rows, buckets in priority order: exact, popular, approx, substring.
    pub fn into_ranked_rows(self) -> impl Iterator<Item = FindItem> {
        self.title_exact
            .into_iter()
            .chain(self.title_popular)
            .chain(self.title_approx)
            .chain(self.title_substring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_buckets_default_empty() {
        let parsed: FindResponse =
            serde_json::from_str(r#"{"title_popular":[{"id":"tt1","title":"A","description":"1999, dir"}]}"#)
                .unwrap();
        assert!(parsed.title_exact.is_empty());
        assert_eq!(parsed.title_popular.len(), 1);
    }

    #[test]
    fn test_bucket_priority_order() {
        let item = |id: &str| FindItem {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
        };
        let response = FindResponse {
            title_exact: vec![item("exact")],
            title_popular: vec![item("popular")],
            title_approx: vec![item("approx")],
            title_substring: vec![item("substring")],
        };
        let ids: Vec<_> = response.into_ranked_rows().map(|i| i.id).collect();
        assert_eq!(ids, vec!["exact", "popular", "approx", "substring"]);
    }
}
