//! Adapter layer: Convert OMDb DTOs to domain models
//!
//! This is the ONLY place where OMDb DTO types are converted to domain types.

use super::dto;
use crate::enrichment::domain::{CandidateMatch, TitleDetail, TitleHit, leading_year};

/// Convert an exact-title response into a hit, if it names a title.
pub fn to_hit(response: dto::TitleResponse) -> Option<TitleHit> {
    if !response.found() {
        return None;
    }
    Some(TitleHit {
        media_id: response.imdb_id?,
        title: decode(&response.title?),
        year: response.year.as_deref().and_then(leading_year),
    })
}

/// Convert a by-id response into year and genres.
pub fn to_detail(response: dto::TitleResponse) -> Option<TitleDetail> {
    if !response.found() {
        return None;
    }
    Some(TitleDetail {
        year: response.year.as_deref().and_then(leading_year),
        genres: split_genres(response.genre.as_deref().unwrap_or_default()),
    })
}

/// Convert search rows into unranked candidates.
///
/// OMDb has no description field, so "<title> <year>" stands in for one.
pub fn to_candidates(response: dto::SearchResponse) -> Vec<CandidateMatch> {
    if !response.found() {
        return Vec::new();
    }
    response
        .search
        .into_iter()
        .map(|item| {
            let title = decode(&item.title);
            CandidateMatch {
                description: format!("{} {}", title, item.year),
                year: leading_year(&item.year),
                external_id: item.imdb_id,
                title,
                score: 0,
            }
        })
        .collect()
}

/// "Action, Adventure" -> ["Action", "Adventure"]; "N/A" and blanks dropped.
fn split_genres(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty() && *g != "N/A")
        .map(str::to_string)
        .collect()
}

fn decode(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title_response(title: &str, year: &str, genre: Option<&str>) -> dto::TitleResponse {
        dto::TitleResponse {
            response: "True".to_string(),
            title: Some(title.to_string()),
            year: Some(year.to_string()),
            imdb_id: Some("tt0000001".to_string()),
            genre: genre.map(String::from),
            error: None,
        }
    }

    #[test]
    fn test_hit_decodes_entities() {
        let hit = to_hit(title_response("Tom &amp; Jerry", "1992", None)).unwrap();
        assert_eq!(hit.title, "Tom & Jerry");
        assert_eq!(hit.year, Some(1992));
    }

    #[test]
    fn test_not_found_is_none() {
        let mut response = title_response("X", "2000", None);
        response.response = "False".to_string();
        assert!(to_hit(response.clone()).is_none());
        assert!(to_detail(response).is_none());
    }

    #[test]
    fn test_detail_splits_genres() {
        let detail = to_detail(title_response("X", "2013–2020", Some("Drama, Sci-Fi"))).unwrap();
        assert_eq!(detail.year, Some(2013));
        assert_eq!(detail.genres, vec!["Drama", "Sci-Fi"]);

        let detail = to_detail(title_response("X", "N/A", Some("N/A"))).unwrap();
        assert_eq!(detail.year, None);
        assert!(detail.genres.is_empty());
    }

    #[test]
    fn test_candidates_carry_year_in_description() {
        let response = dto::SearchResponse {
            response: "True".to_string(),
            search: vec![dto::SearchItem {
                title: "Arrietty".to_string(),
                year: "2010".to_string(),
                imdb_id: "tt1568921".to_string(),
                kind: Some("movie".to_string()),
            }],
            error: None,
        };
        let candidates = to_candidates(response);
        assert_eq!(candidates[0].description, "Arrietty 2010");
        assert_eq!(candidates[0].external_id, "tt1568921");
    }
}
