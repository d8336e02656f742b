//! Local hint extraction.
//!
//! Derives partial records for one file from what is on disk: sidecar
//! metadata first, then filename heuristics. Sidecar fields win over
//! filename-derived ones. A file bundling several episodes fans out into one
//! record per episode.

pub mod filename;
pub mod sidecar;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::enrichment::PartialRecord;
use crate::model::SourceRoot;
pub use filename::{FilenameParser, GuessParser, ParsedName};

/// Most episodes one file may bundle.
pub const MAX_BUNDLED_EPISODES: usize = 2;

/// Season assumed when neither sidecar nor filename carries one.
pub const DEFAULT_SEASON: i32 = 1;

/// Errors from hint extraction.
#[derive(Error, Debug)]
pub enum HintError {
    /// Path deliberately excluded from the catalog.
    #[error("Skipped: {0}")]
    Skip(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed sidecar {path}: {message}")]
    Sidecar { path: PathBuf, message: String },

    #[error("Nothing identifiable in {0}")]
    Unparseable(PathBuf),
}

impl HintError {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

/// Extract partial records for `path`, which lives under `root`.
///
/// Never returns an empty list: a file with nothing identifiable is
/// [`HintError::Unparseable`].
pub fn extract(
    path: &Path,
    root: &SourceRoot,
    parser: &dyn FilenameParser,
) -> Result<Vec<PartialRecord>, HintError> {
    if root.class.is_episodic() {
        extract_episode(path, root, parser)
    } else {
        extract_movie(path, parser)
    }
}

fn extract_movie(path: &Path, parser: &dyn FilenameParser) -> Result<Vec<PartialRecord>, HintError> {
    let sidecar = tolerate_malformed(sidecar::read_movie_nfo(path))?.unwrap_or_default();
    if sidecar.is_complete(false) {
        debug!(target: "hints", path = %path.display(), "Movie sidecar is complete");
        return Ok(vec![sidecar]);
    }

    let raw = path.to_string_lossy();
    let normalized = PathBuf::from(raw.replace(" - ", " "));
    let parsed = parser.parse(&normalized, false);

    let title = parsed.title.map(|title| match parsed.part {
        Some(part) => format!("{title} {}", part_suffix(part, &raw)),
        None => title,
    });

    let record = sidecar.or(&PartialRecord::new()
        .with_title_opt(title)
        .with_year(parsed.year)
        .with_disc(parsed.cd));

    if record.title.is_none() && record.media_id.is_none() {
        return Err(HintError::Unparseable(path.to_path_buf()));
    }
    Ok(vec![record])
}

fn extract_episode(
    path: &Path,
    root: &SourceRoot,
    parser: &dyn FilenameParser,
) -> Result<Vec<PartialRecord>, HintError> {
    let episode_nfo = tolerate_malformed(sidecar::read_episode_nfo(path))?.unwrap_or_default();
    let series = match sidecar::find_series_descriptor(path, &root.path) {
        Some(descriptor) => tolerate_malformed(sidecar::read_series_descriptor(&descriptor).map(Some))?
            .unwrap_or_default(),
        None => PartialRecord::new(),
    };
    let sidecar = episode_nfo.or(&series);

    if sidecar.is_complete(true) {
        debug!(target: "hints", path = %path.display(), "Episode sidecars are complete");
        return Ok(vec![sidecar]);
    }

    let parsed = parser.parse(path, true);
    if parsed.episodes.len() > MAX_BUNDLED_EPISODES {
        return Err(HintError::Skip(format!(
            "{} bundles {} episodes (max {MAX_BUNDLED_EPISODES})",
            path.display(),
            parsed.episodes.len()
        )));
    }

    let base = sidecar.or(&PartialRecord::new()
        .with_title_opt(parsed.title)
        .with_year(parsed.year)
        .with_season(parsed.season.or(Some(DEFAULT_SEASON))));

    if base.title.is_none() && base.media_id.is_none() {
        return Err(HintError::Unparseable(path.to_path_buf()));
    }

    if base.episode.is_some() {
        return Ok(vec![base]);
    }
    if parsed.episodes.is_empty() {
        return Err(HintError::Unparseable(path.to_path_buf()));
    }

    Ok(parsed
        .episodes
        .into_iter()
        .map(|episode| base.clone().with_episode(Some(episode)))
        .collect())
}

/// Malformed sidecars degrade to "no sidecar"; other failures propagate.
fn tolerate_malformed(
    result: Result<Option<PartialRecord>, HintError>,
) -> Result<Option<PartialRecord>, HintError> {
    match result {
        Err(HintError::Sidecar { path, message }) => {
            warn!(target: "hints", path = %path.display(), %message, "Ignoring malformed sidecar");
            Ok(None)
        }
        other => other,
    }
}

/// `"Part N"` verbatim when the path already says so, else a Roman numeral.
pub fn part_suffix(part: u32, path: &str) -> String {
    let literal = format!("Part {part}");
    if path.contains(&literal) {
        literal
    } else {
        format!("Part {}", to_roman(part))
    }
}

const ROMAN: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Uppercase Roman numeral. Zero renders as an empty string.
pub fn to_roman(mut n: u32) -> String {
    let mut out = String::new();
    for (value, symbol) in ROMAN {
        while n >= value {
            out.push_str(symbol);
            n -= value;
        }
    }
    out
}

/// Parse a Roman numeral, case-insensitively. Only canonical forms are
/// accepted.
pub fn from_roman(s: &str) -> Option<u32> {
    let upper = s.to_ascii_uppercase();
    let mut rest = upper.as_str();
    let mut total = 0;
    for (value, symbol) in ROMAN {
        while let Some(tail) = rest.strip_prefix(symbol) {
            total += value;
            rest = tail;
        }
    }
    (rest.is_empty() && total > 0 && to_roman(total) == upper).then_some(total)
}
