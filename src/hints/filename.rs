//! Filename heuristics.
//!
//! [`FilenameParser`] is the seam the extractor consumes; [`GuessParser`] is
//! the regex-based default. Release tags, resolutions and codecs are treated
//! as noise and cut from the title.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// What a filename reveals about its media item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedName {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub season: Option<i32>,
    /// Episode numbers in file order; more than one for bundled episodes
    pub episodes: Vec<i32>,
    /// Sequel part number ("Part 2", "Part II")
    pub part: Option<u32>,
    /// CD/disc marker
    pub cd: Option<String>,
}

/// Recovers hints from a bare path.
pub trait FilenameParser: Send + Sync {
    /// Parse `path`. `episodic` selects episode patterns over movie patterns.
    fn parse(&self, path: &Path, episodic: bool) -> ParsedName;
}

/// `S01E02`, `s1e2e3`, `S01E02-E03`
static SXXEYY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bs(\d{1,2})[ ._-]?e(\d{1,3})((?:[ ._-]?-?[ ._-]?e\d{1,3})*)").expect("valid regex")
});

/// `1x02`, `1x02-1x03`, `1x02x03`
static NXNN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})x(\d{2,3})((?:-(?:\d{1,2}x)?\d{2,3}|x\d{2,3})*)").expect("valid regex")
});

static TRAILING_NX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:-(?:\d{1,2}x)?|x)(\d{2,3})").expect("valid regex"));

/// `Episode 5`, `Ep05`
static EPISODE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bep(?:isode)?[ ._-]?(\d{1,4})\b").expect("valid regex"));

/// Anime style ` - 05`
static DASHED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" - (\d{1,4})(?:v\d)?\b").expect("valid regex"));

static TRAILING_EPISODES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)e(\d{1,3})").expect("valid regex"));

static YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s.(\[_-]((?:19|20)\d{2})(?:[\s.)\]_-]|$)").expect("valid regex")
});

static CD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:cd|dis[ck])[ ._-]?(\d{1,2})\b").expect("valid regex"));

static PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpart[ ._-]?(\d{1,2}|[ivx]{1,5})\b").expect("valid regex")
});

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[\s.(\[_-](?:2160p|1080[pi]|720p|480p|4k|bluray|blu-ray|brrip|bdrip|web-?dl|webrip|hdrip|hdtv|dvdrip|dvdscr|xvid|divx|x264|x265|h\.?264|hevc|10bit|aac|ac3|dts|proper|repack|extended|unrated|limited)\b",
    )
    .expect("valid regex")
});

static SEASON_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:season|series|s)[ ._-]?(\d{1,2})$").expect("valid regex"));

/// Default regex parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuessParser;

impl FilenameParser for GuessParser {
    fn parse(&self, path: &Path, episodic: bool) -> ParsedName {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return ParsedName::default();
        };

        if episodic {
            parse_episode(path, stem)
        } else {
            parse_movie(stem)
        }
    }
}

fn parse_movie(stem: &str) -> ParsedName {
    let year = release_year(stem);
    let cd = CD.captures(stem).map(|c| c[1].trim_start_matches('0').to_string());
    let part = PART.captures(stem).and_then(|c| parse_part(&c[1]));

    let cutoff = [
        year.map(|(start, _)| start),
        CD.find(stem).map(|m| m.start()),
        PART.find(stem).map(|m| m.start()),
        NOISE.find(stem).map(|m| m.start()),
    ]
    .into_iter()
    .flatten()
    .min()
    .unwrap_or(stem.len());

    ParsedName {
        title: clean_title(&stem[..cutoff]),
        year: year.map(|(_, y)| y),
        part,
        cd: cd.filter(|c| !c.is_empty()),
        ..ParsedName::default()
    }
}

fn parse_episode(path: &Path, stem: &str) -> ParsedName {
    let (season, episodes, start) = if let Some(caps) = SXXEYY.captures(stem) {
        let mut episodes: Vec<i32> = caps[2].parse().into_iter().collect();
        episodes.extend(
            TRAILING_EPISODES
                .captures_iter(&caps[3])
                .filter_map(|c| c[1].parse::<i32>().ok()),
        );
        (caps[1].parse().ok(), episodes, caps.get(0).map(|m| m.start()))
    } else if let Some(caps) = NXNN.captures(stem) {
        let mut episodes: Vec<i32> = caps[2].parse().into_iter().collect();
        episodes.extend(
            TRAILING_NX
                .captures_iter(&caps[3])
                .filter_map(|c| c[1].parse::<i32>().ok()),
        );
        (caps[1].parse().ok(), episodes, caps.get(0).map(|m| m.start()))
    } else if let Some(caps) = EPISODE_WORD.captures(stem) {
        (None, caps[1].parse().into_iter().collect(), caps.get(0).map(|m| m.start()))
    } else if let Some(caps) = DASHED_NUMBER.captures(stem) {
        (None, caps[1].parse().into_iter().collect(), caps.get(0).map(|m| m.start()))
    } else {
        (None, Vec::new(), None)
    };

    let mut episodes = episodes;
    episodes.dedup();

    let prefix = &stem[..start.unwrap_or(stem.len())];
    let title = clean_title(prefix)
        .map(|t| strip_year_suffix(&t))
        .filter(|t| !t.is_empty())
        .or_else(|| series_dir_name(path));

    ParsedName {
        title,
        year: release_year(prefix).map(|(_, y)| y),
        season: season.or_else(|| season_from_dir(path)),
        episodes,
        ..ParsedName::default()
    }
}

/// Last year-looking token and where it starts. A leading year is part of
/// the title ("2001 A Space Odyssey"), so it never matches.
fn release_year(s: &str) -> Option<(usize, i32)> {
    YEAR.captures_iter(s)
        .filter_map(|c| {
            let start = c.get(0)?.start();
            Some((start, c[1].parse().ok()?))
        })
        .last()
}

/// Folder name of the series, skipping a `Season N` folder.
fn series_dir_name(path: &Path) -> Option<String> {
    let parent = path.parent()?;
    let name = parent.file_name()?.to_str()?;
    let name = if SEASON_DIR.is_match(name) {
        parent.parent()?.file_name()?.to_str()?
    } else {
        name
    };
    clean_title(name).map(|t| strip_year_suffix(&t))
}

fn season_from_dir(path: &Path) -> Option<i32> {
    let name = path.parent()?.file_name()?.to_str()?;
    SEASON_DIR.captures(name).and_then(|c| c[1].parse().ok())
}

fn strip_year_suffix(title: &str) -> String {
    match YEAR.find(title) {
        Some(m) if m.end() == title.len() => clean_title(&title[..m.start()]).unwrap_or_default(),
        _ => title.to_string(),
    }
}

/// Dots and underscores to spaces, brackets and dangling dashes trimmed.
fn clean_title(raw: &str) -> Option<String> {
    let spaced = raw.replace(['.', '_'], " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '(' | '[' | ')' | ']'));
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_part(raw: &str) -> Option<u32> {
    raw.parse().ok().or_else(|| super::from_roman(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(name: &str) -> ParsedName {
        GuessParser.parse(Path::new(name), false)
    }

    fn episode(path: &str) -> ParsedName {
        GuessParser.parse(Path::new(path), true)
    }

    #[test]
    fn test_movie_title_and_year() {
        let parsed = movie("/movies/The.Matrix.1999.1080p.BluRay.x264.mkv");
        assert_eq!(parsed.title.as_deref(), Some("The Matrix"));
        assert_eq!(parsed.year, Some(1999));
        assert_eq!(parsed.cd, None);
    }

    #[test]
    fn test_movie_with_parenthesised_year() {
        let parsed = movie("/movies/Arrietty (2010).avi");
        assert_eq!(parsed.title.as_deref(), Some("Arrietty"));
        assert_eq!(parsed.year, Some(2010));
    }

    #[test]
    fn test_leading_year_stays_in_title() {
        let parsed = movie("/movies/2001 A Space Odyssey (1968).mkv");
        assert_eq!(parsed.title.as_deref(), Some("2001 A Space Odyssey"));
        assert_eq!(parsed.year, Some(1968));
    }

    #[test]
    fn test_movie_cd_marker() {
        let parsed = movie("/movies/Seven Samurai (1954) CD2.avi");
        assert_eq!(parsed.title.as_deref(), Some("Seven Samurai"));
        assert_eq!(parsed.cd.as_deref(), Some("2"));
    }

    #[test]
    fn test_movie_part_numbers() {
        assert_eq!(movie("/m/Kill Bill Part 2.mkv").part, Some(2));
        assert_eq!(movie("/m/Kill Bill Part II.mkv").part, Some(2));
        assert_eq!(movie("/m/Kill Bill Part II.mkv").title.as_deref(), Some("Kill Bill"));
        assert_eq!(movie("/m/Partisan.mkv").part, None);
    }

    #[test]
    fn test_episode_sxxeyy() {
        let parsed = episode("/tv/Firefly/Firefly.S01E03.Bushwhacked.mkv");
        assert_eq!(parsed.title.as_deref(), Some("Firefly"));
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episodes, vec![3]);
    }

    #[test]
    fn test_bundled_episodes() {
        assert_eq!(episode("/tv/Show/Show S02E01E02.mkv").episodes, vec![1, 2]);
        assert_eq!(episode("/tv/Show/Show S02E01-E02.mkv").episodes, vec![1, 2]);
        assert_eq!(episode("/tv/Show/Show S02E01E02E03.mkv").episodes, vec![1, 2, 3]);
    }

    #[test]
    fn test_episode_nxnn() {
        let parsed = episode("/tv/Lost/Lost 2x05.avi");
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episodes, vec![5]);
        assert_eq!(episode("/tv/Lost/Lost 2x05-2x06.avi").episodes, vec![5, 6]);
    }

    #[test]
    fn test_episode_without_season_uses_folder() {
        let parsed = episode("/anime/Cowboy Bebop/Cowboy Bebop - 05.mkv");
        assert_eq!(parsed.title.as_deref(), Some("Cowboy Bebop"));
        assert_eq!(parsed.season, None);
        assert_eq!(parsed.episodes, vec![5]);

        let parsed = episode("/tv/Firefly/Season 1/Episode 4.mkv");
        assert_eq!(parsed.title.as_deref(), Some("Firefly"));
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episodes, vec![4]);
    }

    #[test]
    fn test_unparseable_episode() {
        let parsed = episode("/tv/Firefly/commentary.mkv");
        assert!(parsed.episodes.is_empty());
    }
}
