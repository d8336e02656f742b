//! Internal domain models for metadata resolution.
//!
//! These types are OUR types - they don't change when external APIs change.
//! Provider responses get converted into these types via adapters.

/// Metadata known about one media item before (or during) resolution.
///
/// Values are never mutated in place; the `with_*` methods return an
/// updated copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    /// Provider id (IMDb `tt…` id or anime provider id)
    pub media_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub genres: Vec<String>,
    /// CD/disc number for movies split across files
    pub disc: Option<String>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media_id(self, media_id: impl Into<String>) -> Self {
        Self {
            media_id: Some(media_id.into()),
            ..self
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    pub fn with_media_id_opt(self, media_id: Option<String>) -> Self {
        Self { media_id, ..self }
    }

    pub fn with_title_opt(self, title: Option<String>) -> Self {
        Self { title, ..self }
    }

    pub fn with_year(self, year: Option<i32>) -> Self {
        Self { year, ..self }
    }

    pub fn with_season(self, season: Option<i32>) -> Self {
        Self { season, ..self }
    }

    pub fn with_episode(self, episode: Option<i32>) -> Self {
        Self { episode, ..self }
    }

    pub fn with_genres(self, genres: Vec<String>) -> Self {
        Self { genres, ..self }
    }

    pub fn with_disc(self, disc: Option<String>) -> Self {
        Self { disc, ..self }
    }

    /// Fill any field missing here from `other`. Fields already present win.
    pub fn or(self, other: &PartialRecord) -> Self {
        Self {
            media_id: self.media_id.or_else(|| other.media_id.clone()),
            title: self.title.or_else(|| other.title.clone()),
            year: self.year.or(other.year),
            season: self.season.or(other.season),
            episode: self.episode.or(other.episode),
            genres: if self.genres.is_empty() {
                other.genres.clone()
            } else {
                self.genres
            },
            disc: self.disc.or_else(|| other.disc.clone()),
        }
    }

    /// True when no provider lookup is needed.
    ///
    /// Movies need an id and a title; episodic media also need season and
    /// episode numbers.
    pub fn is_complete(&self, episodic: bool) -> bool {
        let base = self.media_id.is_some() && self.title.is_some();
        if episodic {
            base && self.season.is_some() && self.episode.is_some()
        } else {
            base
        }
    }

    /// Convert into a resolved record if id and title are known.
    pub fn into_resolved(self) -> Option<ResolvedRecord> {
        Some(ResolvedRecord {
            media_id: self.media_id?,
            title: self.title?,
            year: self.year,
            season: self.season,
            episode: self.episode,
            genres: self.genres,
            disc: self.disc,
        })
    }
}

/// A record ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub media_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub genres: Vec<String>,
    pub disc: Option<String>,
}

/// One search result from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMatch {
    pub external_id: String,
    /// HTML entities already decoded
    pub title: String,
    pub year: Option<i32>,
    /// Free text that usually embeds the release year
    pub description: String,
    /// Edit distance to the query title; lower is better
    pub score: usize,
}

/// A single unambiguous hit from an exact title+year lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleHit {
    pub media_id: String,
    pub title: String,
    pub year: Option<i32>,
}

/// Year and genres from a by-id detail lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleDetail {
    pub year: Option<i32>,
    pub genres: Vec<String>,
}

/// First hit from the anime provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimeHit {
    pub media_id: String,
    pub title: String,
    /// From the airing start date, when known
    pub year: Option<i32>,
}

/// Errors that can occur during resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrichmentError {
    /// Expected declination: no confident match, nothing to persist.
    #[error("Skipped: {0}")]
    Skip(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
}

impl EnrichmentError {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip(reason.into())
    }

    /// Whether this is a declined match rather than a fault.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

/// Parse the leading four-digit year out of strings like "2010", "2010–2015"
/// or "2010-07-17".
pub fn leading_year(s: &str) -> Option<i32> {
    let head: String = s.chars().take(4).collect();
    if head.len() == 4 && head.chars().all(|c| c.is_ascii_digit()) {
        head.parse().ok()
    } else {
        None
    }
}
