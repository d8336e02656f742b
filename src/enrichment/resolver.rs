//! Resolver - completes partial records against metadata providers.
//!
//! Disambiguation, in order:
//! 1. Known year: exact title+year+type lookup. A hit is accepted outright.
//! 2. Broad search by title (falling back to the secondary provider when the
//!    primary returns nothing), ranked by ascending title distance.
//! 3. Best candidate within [`MATCH_THRESHOLD`] edits wins.
//! 4. Otherwise, with a year hint, the first ranked candidate whose
//!    description mentions that year.
//! 5. Otherwise the candidate sharing the most words with the query.
//! 6. Year unknown: one detail lookup recovers year and genres. Year known but
//!    missing from the top candidate's description: re-scan for a candidate
//!    that has it, or skip.
//! 7. Genres still missing: one detail lookup.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error};

use super::distance::title_distance;
use super::domain::{CandidateMatch, EnrichmentError, PartialRecord, ResolvedRecord};
use super::traits::{AnimeProvider, FallbackSearch, TitleProvider};
use crate::model::{MediaClass, ResolverKind};

/// Maximum title distance accepted without further evidence.
pub const MATCH_THRESHOLD: usize = 10;

/// Words ignored by the word-overlap fallback.
const ARTICLES: [&str; 3] = ["a", "an", "the"];

/// Completes partial records. Cheap to share behind an `Arc`.
pub struct Resolver {
    titles: Arc<dyn TitleProvider>,
    fallback: Arc<dyn FallbackSearch>,
    anime: Arc<dyn AnimeProvider>,
}

impl Resolver {
    pub fn new(
        titles: Arc<dyn TitleProvider>,
        fallback: Arc<dyn FallbackSearch>,
        anime: Arc<dyn AnimeProvider>,
    ) -> Self {
        Self {
            titles,
            fallback,
            anime,
        }
    }

    /// Resolve one record for a source of the given class.
    ///
    /// Complete records pass through without any provider call. Fails with
    /// [`EnrichmentError::Skip`] when no confident match exists.
    pub async fn resolve(
        &self,
        record: PartialRecord,
        class: MediaClass,
    ) -> Result<ResolvedRecord, EnrichmentError> {
        let strategy = class.strategy();

        let record = if record.is_complete(strategy.episodic) {
            debug!(target: "enrichment::resolve", ?record, "Record already complete");
            record
        } else {
            match strategy.resolver {
                ResolverKind::Imdb => self.resolve_title(record, strategy.video_type).await?,
                ResolverKind::Anime => self.resolve_anime(record).await?,
            }
        };

        record
            .into_resolved()
            .ok_or_else(|| EnrichmentError::skip("resolution left id or title empty"))
    }

    async fn resolve_title(
        &self,
        record: PartialRecord,
        video_type: &str,
    ) -> Result<PartialRecord, EnrichmentError> {
        let query = record
            .title
            .clone()
            .ok_or_else(|| EnrichmentError::skip("no title to search for"))?;

        let mut picked: Option<(String, String)> = None;
        let mut year = record.year;
        let mut genres: Option<Vec<String>> = None;
        let mut detail_attempted = false;

        if let Some(known_year) = record.year {
            debug!(target: "enrichment::resolve", title = %query, year = known_year, "Have year, doing exact lookup");
            if let Some(hit) = self.titles.exact(&query, known_year, video_type).await? {
                year = hit.year.or(Some(known_year));
                picked = Some((hit.media_id, hit.title));
            }
        }

        if picked.is_none() {
            let candidates = self.ranked_candidates(&query, video_type).await?;
            let Some(best) = candidates.first() else {
                return Err(EnrichmentError::skip(format!("no candidates for {query:?}")));
            };

            let choice = if best.score <= MATCH_THRESHOLD {
                best
            } else {
                record
                    .year
                    .and_then(|y| first_with_year(&candidates, y))
                    .unwrap_or_else(|| word_overlap_pick(&query, &candidates))
            };
            let mut chosen = (choice.external_id.clone(), choice.title.clone());

            match record.year {
                None => {
                    detail_attempted = true;
                    match self.titles.detail(&chosen.0, video_type).await? {
                        Some(detail) => {
                            year = detail.year;
                            genres = Some(detail.genres);
                        }
                        None => year = None,
                    }
                }
                Some(known_year) if !best.description.contains(&known_year.to_string()) => {
                    let Some(with_year) = first_with_year(&candidates, known_year) else {
                        error!(
                            target: "enrichment::resolve",
                            title = %query,
                            year = known_year,
                            "No candidate mentions the expected year"
                        );
                        return Err(EnrichmentError::skip(format!(
                            "no candidate for {query:?} from {known_year}"
                        )));
                    };
                    chosen = (with_year.external_id.clone(), with_year.title.clone());
                    year = Some(known_year);
                }
                Some(known_year) => year = Some(known_year),
            }

            picked = Some(chosen);
        }

        let Some((media_id, title)) = picked else {
            return Err(EnrichmentError::skip(format!("nothing matched {query:?}")));
        };

        if genres.is_none() && record.genres.is_empty() && !detail_attempted {
            genres = self
                .titles
                .detail(&media_id, video_type)
                .await?
                .map(|detail| detail.genres);
        }

        let genres = genres
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| record.genres.clone());

        debug!(target: "enrichment::resolve", %media_id, %title, ?year, "Resolved");
        Ok(record
            .with_media_id(media_id)
            .with_title(title)
            .with_year(year)
            .with_genres(genres))
    }

    async fn resolve_anime(&self, record: PartialRecord) -> Result<PartialRecord, EnrichmentError> {
        let query = record
            .title
            .clone()
            .ok_or_else(|| EnrichmentError::skip("no title to search for"))?;

        let Some(hit) = self.anime.search(&query).await? else {
            return Err(EnrichmentError::skip(format!("no anime found for {query:?}")));
        };
        let genres = self.anime.genres(&hit.media_id).await?;
        let year = hit.year.or(record.year);

        Ok(record
            .with_title(hit.title)
            .with_media_id(hit.media_id)
            .with_year(year)
            .with_genres(genres))
    }

    /// Primary search, else the fallback buckets; ranked by title distance.
    async fn ranked_candidates(
        &self,
        query: &str,
        video_type: &str,
    ) -> Result<Vec<CandidateMatch>, EnrichmentError> {
        let mut candidates = self.titles.search(query, video_type).await?;
        if candidates.is_empty() {
            debug!(target: "enrichment::resolve", title = %query, "Primary search empty, trying fallback");
            candidates = self.fallback.find(query).await?;
        }
        Ok(rank(query, candidates))
    }
}

/// Score every candidate and sort ascending. The sort is stable, so equal
/// scores keep provider order.
pub fn rank(query: &str, candidates: Vec<CandidateMatch>) -> Vec<CandidateMatch> {
    let mut ranked: Vec<CandidateMatch> = candidates
        .into_iter()
        .map(|c| CandidateMatch {
            score: title_distance(query, &c.title),
            ..c
        })
        .collect();
    ranked.sort_by_key(|c| c.score);
    ranked
}

fn first_with_year(candidates: &[CandidateMatch], year: i32) -> Option<&CandidateMatch> {
    let year = year.to_string();
    candidates.iter().find(|c| c.description.contains(&year))
}

/// Candidate with the largest word overlap with `query`, ignoring case,
/// punctuation and articles. Ties go to the earlier candidate.
///
/// A zero-overlap candidate is still returned when nothing better exists.
/// `candidates` must not be empty.
pub fn word_overlap_pick<'a>(query: &str, candidates: &'a [CandidateMatch]) -> &'a CandidateMatch {
    let wanted = significant_words(query);
    let mut best = &candidates[0];
    let mut best_score = overlap(&wanted, &best.title);
    for candidate in &candidates[1..] {
        let score = overlap(&wanted, &candidate.title);
        if score > best_score {
            best = candidate;
            best_score = score;
        }
    }
    best
}

fn overlap(wanted: &HashSet<String>, title: &str) -> usize {
    significant_words(title).intersection(wanted).count()
}

fn significant_words(s: &str) -> HashSet<String> {
    s.chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .filter(|w| !ARTICLES.contains(w))
        .map(str::to_string)
        .collect()
}
