//! Filesystem enumeration for catalog runs.
//!
//! Walks a source directory off the async runtime and streams back the video
//! files a [`ScanFilter`] accepts.

use futures::stream::Stream;
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Extensions cataloged when none are configured.
pub const DEFAULT_VIDEO_TYPES: [&str; 4] = ["avi", "mp4", "mkv", "ogm"];

/// Decides which walked files are catalog candidates.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    /// Lowercase, without the leading dot
    extensions: Vec<String>,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_TYPES)
    }
}

impl ScanFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Whether `path` should be cataloged.
    ///
    /// Rejects hidden files, files outside the extension allow-list, anything
    /// under an `.AppleDouble` directory, and samples (a `sample` directory
    /// or a `-sample` stem suffix). Segment checks are case-insensitive.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('.') {
            return false;
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if !self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)) {
            return false;
        }

        let in_excluded_dir = path.parent().into_iter().flat_map(Path::components).any(|c| match c {
            Component::Normal(segment) => segment
                .to_str()
                .is_some_and(|s| s.eq_ignore_ascii_case(".AppleDouble") || s.eq_ignore_ascii_case("sample")),
            _ => false,
        });
        if in_excluded_dir {
            return false;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_lowercase();
        !(stem == "sample" || stem.ends_with("-sample"))
    }
}

/// Scans the given root directory recursively for catalog candidates.
///
/// Returns a Stream of PathBufs accepted by `filter`. The traversal runs on
/// the blocking pool.
pub fn scan(root: PathBuf, filter: ScanFilter) -> impl Stream<Item = PathBuf> {
    let (tx, rx) = mpsc::channel(100);

    tokio::task::spawn_blocking(move || {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && filter.accepts(entry.path()) {
                // Receiver dropped: stop walking.
                if tx.blocking_send(entry.into_path()).is_err() {
                    break;
                }
            }
        }
    });

    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|path| (path, rx))
    })
}
