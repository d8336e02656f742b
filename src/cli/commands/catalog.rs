//! Catalog listing and watched toggles.

use std::path::Path;
use tokio::runtime::Runtime;

use super::open_catalog;
use crate::config::Config;
use crate::db;

fn mark(watched: bool) -> &'static str {
    if watched { "[x]" } else { "[ ]" }
}

fn year(year: Option<i64>) -> String {
    year.map(|y| format!(" ({y})")).unwrap_or_default()
}

/// List movies and shows with their episodes
pub fn cmd_list(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_catalog(config).await?;

        let movies = db::all_movies(&pool).await?;
        println!("Movies ({})", movies.len());
        for movie in &movies {
            println!("  {} {}{}  {}", mark(movie.watched), movie.title, year(movie.year), movie.path);
        }

        let shows = db::all_shows(&pool).await?;
        println!("Shows ({})", shows.len());
        for show in &shows {
            println!("  {} {}{} [{}]", mark(show.watched), show.title, year(show.year), show.class);
            for episode in db::episodes_for_show(&pool, show.id).await? {
                println!(
                    "      {} {}  {}",
                    mark(episode.watched),
                    episode.display_title(show),
                    episode.path
                );
            }
        }
        Ok::<_, anyhow::Error>(())
    })
}

/// Set the watched flag of the entry owning `path`
pub fn cmd_set_watched(rt: &Runtime, config: &Config, path: &Path, watched: bool) -> anyhow::Result<()> {
    let path = std::path::absolute(path)?;
    rt.block_on(async {
        let pool = open_catalog(config).await?;
        let updated = db::set_watched_by_path(&pool, &path.to_string_lossy(), watched).await?;
        if updated == 0 {
            anyhow::bail!("{} is not in the catalog", path.display());
        }
        println!(
            "Marked {} as {}",
            path.display(),
            if watched { "watched" } else { "not watched" }
        );
        Ok::<_, anyhow::Error>(())
    })
}
