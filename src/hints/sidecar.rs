//! Sidecar metadata files.
//!
//! - `<stem>.nfo` next to a movie: `title`, `year`, `id`, repeated `genre`
//! - `<stem>.nfo` next to an episode: `episode`, `season`
//! - `series.xml` in an ancestor directory: `IMDB` | `IMDbId` | `media_id`,
//!   `SeriesName`, `ProductionYear`, `Genres/Genre`
//!
//! Only direct children of the document's root element are read. A missing
//! file is not an error; malformed XML is [`HintError::Sidecar`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::trace;

use super::HintError;
use crate::enrichment::PartialRecord;

/// Name of the per-series descriptor.
pub const SERIES_DESCRIPTOR: &str = "series.xml";

/// Read the movie `.nfo` beside `path`, if any.
pub fn read_movie_nfo(path: &Path) -> Result<Option<PartialRecord>, HintError> {
    let nfo = path.with_extension("nfo");
    let Some(text) = read_optional(&nfo)? else {
        return Ok(None);
    };
    let doc = parse(&nfo, &text)?;
    let root = doc.root_element();

    Ok(Some(
        PartialRecord::new()
            .with_media_id_opt(child_text(root, "id"))
            .with_title_opt(child_text(root, "title"))
            .with_year(child_number(&nfo, root, "year")?)
            .with_genres(children_text(root, "genre")),
    ))
}

/// Read the episode `.nfo` beside `path`, if any.
pub fn read_episode_nfo(path: &Path) -> Result<Option<PartialRecord>, HintError> {
    let nfo = path.with_extension("nfo");
    let Some(text) = read_optional(&nfo)? else {
        return Ok(None);
    };
    let doc = parse(&nfo, &text)?;
    let root = doc.root_element();

    Ok(Some(
        PartialRecord::new()
            .with_season(child_number(&nfo, root, "season")?)
            .with_episode(child_number(&nfo, root, "episode")?),
    ))
}

/// Nearest `series.xml` walking up from `path`'s directory, never above `root`.
pub fn find_series_descriptor(path: &Path, root: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .take_while(|dir| dir.starts_with(root))
        .map(|dir| dir.join(SERIES_DESCRIPTOR))
        .find(|candidate| candidate.is_file())
}

/// Read a series descriptor.
pub fn read_series_descriptor(descriptor: &Path) -> Result<PartialRecord, HintError> {
    let text = read_optional(descriptor)?.unwrap_or_default();
    let doc = parse(descriptor, &text)?;
    let root = doc.root_element();

    let media_id = ["IMDB", "IMDbId", "media_id"]
        .into_iter()
        .find_map(|tag| child_text(root, tag));
    let genres = child(root, "Genres")
        .map(|genres| children_text(genres, "Genre"))
        .unwrap_or_default();

    Ok(PartialRecord::new()
        .with_media_id_opt(media_id)
        .with_title_opt(child_text(root, "SeriesName"))
        .with_year(child_number(descriptor, root, "ProductionYear")?)
        .with_genres(genres))
}

fn read_optional(path: &Path) -> Result<Option<String>, HintError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            trace!(target: "hints::sidecar", path = %path.display(), "No sidecar");
            Ok(None)
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => Err(HintError::Sidecar {
            path: path.to_path_buf(),
            message: "not valid UTF-8".to_string(),
        }),
        Err(source) => Err(HintError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse<'a>(path: &Path, text: &'a str) -> Result<Document<'a>, HintError> {
    Document::parse(text).map_err(|e| HintError::Sidecar {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

/// Trimmed text of the first child named `tag`; empty text counts as absent.
fn child_text(node: Node, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn children_text(node: Node, tag: &str) -> Vec<String> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == tag)
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn child_number(path: &Path, node: Node, tag: &str) -> Result<Option<i32>, HintError> {
    child_text(node, tag)
        .map(|text| {
            text.parse().map_err(|_| HintError::Sidecar {
                path: path.to_path_buf(),
                message: format!("<{tag}> is not a number: {text:?}"),
            })
        })
        .transpose()
}
