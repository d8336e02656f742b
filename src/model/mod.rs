//! Core data models for the media catalog.
//!
//! Defines the catalog entities: [`Movie`], [`Show`] and [`Episode`],
//! plus the [`MediaClass`] tag that configures how a source
//! directory is cataloged.
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `movies` - One row per film, multi-disc paths joined with `|`
//! - `shows` - Series (tv or anime), unique by media id
//! - `episodes` - Files owned by exactly one show
//! - `genres` - Unique genre names, joined through `movie_genres` / `show_genres`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Separator used to join multi-disc movie paths.
pub const DISC_PATH_SEPARATOR: char = '|';

/// What kind of media a source directory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    Movie,
    Show,
    Anime,
}

/// Which catalog table a media class lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Movie,
    Show,
}

/// Which resolution path completes a partial record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    /// OMDb exact/search/detail lookups with the IMDb find fallback.
    Imdb,
    /// Anime search provider.
    Anime,
}

/// Strategy table entry for one media class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStrategy {
    pub kind: CatalogKind,
    /// Value of the provider `type` parameter.
    pub video_type: &'static str,
    /// Whether records carry season/episode numbers.
    pub episodic: bool,
    pub resolver: ResolverKind,
}

impl MediaClass {
    /// Strategy pairing for this class.
    pub const fn strategy(self) -> MediaStrategy {
        match self {
            MediaClass::Movie => MediaStrategy {
                kind: CatalogKind::Movie,
                video_type: "movie",
                episodic: false,
                resolver: ResolverKind::Imdb,
            },
            MediaClass::Show => MediaStrategy {
                kind: CatalogKind::Show,
                video_type: "series",
                episodic: true,
                resolver: ResolverKind::Imdb,
            },
            MediaClass::Anime => MediaStrategy {
                kind: CatalogKind::Show,
                video_type: "series",
                episodic: true,
                resolver: ResolverKind::Anime,
            },
        }
    }

    /// Name stored in the `shows.class` column and used in config files.
    pub const fn as_str(self) -> &'static str {
        match self {
            MediaClass::Movie => "movie",
            MediaClass::Show => "show",
            MediaClass::Anime => "anime",
        }
    }

    pub fn is_episodic(self) -> bool {
        self.strategy().episodic
    }
}

impl std::fmt::Display for MediaClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured media directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRoot {
    pub path: PathBuf,
    pub class: MediaClass,
}

impl SourceRoot {
    pub fn new(path: impl Into<PathBuf>, class: MediaClass) -> Self {
        Self {
            path: path.into(),
            class,
        }
    }
}

/// A film in the catalog.
#[derive(Debug, Clone, FromRow)]
pub struct Movie {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Provider id (unique)
    pub media_id: String,
    pub title: String,
    /// One path, or several disc paths sorted and joined with `|`
    pub path: String,
    pub year: Option<i64>,
    pub watched: bool,
}

impl Movie {
    /// Individual file paths backing this movie.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.path.split(DISC_PATH_SEPARATOR)
    }
}

/// A series in the catalog.
#[derive(Debug, Clone, FromRow)]
pub struct Show {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Provider id (unique)
    pub media_id: String,
    pub title: String,
    pub year: Option<i64>,
    /// "show" or "anime"
    pub class: String,
    /// True once every owned episode has been watched
    pub watched: bool,
}

/// An episode file owned by a show.
#[derive(Debug, Clone, FromRow)]
pub struct Episode {
    pub id: i64,
    pub show_id: i64,
    pub season: Option<i64>,
    pub episode: i64,
    pub path: String,
    pub watched: bool,
}

impl Episode {
    /// Display title, e.g. "Firefly - Season 1, Episode 3".
    pub fn display_title(&self, show: &Show) -> String {
        match self.season {
            Some(season) => format!(
                "{} - Season {}, Episode {}",
                show.title, season, self.episode
            ),
            None => format!("{} - Episode {}", show.title, self.episode),
        }
    }
}
