//! Database module for movie, show, episode, and genre persistence.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Provides async operations for:
//! - Idempotent upserts keyed by provider media id
//! - Multi-disc path merging for movies
//! - Show/episode hierarchy with the watched aggregate
//! - Removal of entries whose files are gone
//!
//! Write operations take a `&mut SqliteConnection` so the caller decides the
//! transaction scope; listing operations take the pool.
//!
//! # Example
//!
//! ```ignore
//! use media_minder::db::{init_db, all_movies};
//!
//! let pool = init_db("sqlite:catalog.db").await?;
//! let mut tx = pool.begin().await?;
//! upsert_movie(&mut tx, &resolved, "/movies/Up (2009).mkv").await?;
//! tx.commit().await?;
//! let movies = all_movies(&pool).await?;
//! ```

mod genres;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sqlx::SqliteConnection;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::enrichment::ResolvedRecord;
use crate::model::{DISC_PATH_SEPARATOR, Episode, MediaClass, Movie, Show};
pub use genres::{GenreAssociable, GenreLink, MOVIE_GENRES, SHOW_GENRES, get_or_create_genre};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "catalog.db";

const MOVIE_COLUMNS: &str = "id, media_id, title, path, year, watched";
const SHOW_COLUMNS: &str = "id, media_id, title, year, class, watched";
const EPISODE_COLUMNS: &str = "id, show_id, season, episode, path, watched";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Merge `new` into a `|`-joined path list: deduplicated and sorted.
pub fn merge_paths(existing: &str, new: &str) -> String {
    let mut paths: Vec<&str> = existing
        .split(DISC_PATH_SEPARATOR)
        .chain(std::iter::once(new))
        .filter(|p| !p.is_empty())
        .collect();
    paths.sort_unstable();
    paths.dedup();
    paths.join(&DISC_PATH_SEPARATOR.to_string())
}

// ============================================================================
// Movies
// ============================================================================

pub async fn find_movie_by_media_id(
    conn: &mut SqliteConnection,
    media_id: &str,
) -> sqlx::Result<Option<Movie>> {
    sqlx::query_as(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE media_id = ?"))
        .bind(media_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Insert a new movie row.
pub async fn insert_movie_row(
    conn: &mut SqliteConnection,
    media_id: &str,
    title: &str,
    path: &str,
    year: Option<i32>,
) -> sqlx::Result<Movie> {
    sqlx::query_as(&format!(
        "INSERT INTO movies (media_id, title, path, year, added_at) VALUES (?, ?, ?, ?, ?) \
         RETURNING {MOVIE_COLUMNS}"
    ))
    .bind(media_id)
    .bind(title)
    .bind(path)
    .bind(year)
    .bind(now())
    .fetch_one(&mut *conn)
    .await
}

/// Insert or merge a resolved movie.
///
/// A movie already known by media id gets `path` merged into its disc list;
/// otherwise a new row is created. Genres are linked either way.
pub async fn upsert_movie(
    conn: &mut SqliteConnection,
    record: &ResolvedRecord,
    path: &str,
) -> sqlx::Result<Movie> {
    let movie = match find_movie_by_media_id(conn, &record.media_id).await? {
        Some(existing) => {
            let merged = merge_paths(&existing.path, path);
            debug!(target: "db", media_id = %record.media_id, path = %merged, "Merging movie paths");
            sqlx::query_as(&format!(
                "UPDATE movies SET path = ? WHERE id = ? RETURNING {MOVIE_COLUMNS}"
            ))
            .bind(merged)
            .bind(existing.id)
            .fetch_one(&mut *conn)
            .await?
        }
        None => {
            insert_movie_row(conn, &record.media_id, &record.title, path, record.year).await?
        }
    };

    movie.add_genres(conn, &record.genres).await?;
    Ok(movie)
}

pub async fn delete_movie(conn: &mut SqliteConnection, movie_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM movies WHERE id = ?")
        .bind(movie_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Movies with at least one disc under `root`.
pub async fn movies_under(conn: &mut SqliteConnection, root: &Path) -> sqlx::Result<Vec<Movie>> {
    let movies: Vec<Movie> = sqlx::query_as(&format!("SELECT {MOVIE_COLUMNS} FROM movies"))
        .fetch_all(&mut *conn)
        .await?;
    Ok(movies
        .into_iter()
        .filter(|m| m.paths().any(|p| Path::new(p).starts_with(root)))
        .collect())
}

// ============================================================================
// Shows and episodes
// ============================================================================

pub async fn find_show_by_media_id(
    conn: &mut SqliteConnection,
    media_id: &str,
) -> sqlx::Result<Option<Show>> {
    sqlx::query_as(&format!("SELECT {SHOW_COLUMNS} FROM shows WHERE media_id = ?"))
        .bind(media_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Insert a new show row.
pub async fn insert_show_row(
    conn: &mut SqliteConnection,
    media_id: &str,
    title: &str,
    year: Option<i32>,
    class: &str,
) -> sqlx::Result<Show> {
    sqlx::query_as(&format!(
        "INSERT INTO shows (media_id, title, year, class, added_at) VALUES (?, ?, ?, ?, ?) \
         RETURNING {SHOW_COLUMNS}"
    ))
    .bind(media_id)
    .bind(title)
    .bind(year)
    .bind(class)
    .bind(now())
    .fetch_one(&mut *conn)
    .await
}

/// Get or create the show a resolved episode belongs to.
///
/// Genres are attached only when the show is created.
pub async fn get_or_create_show(
    conn: &mut SqliteConnection,
    record: &ResolvedRecord,
    class: MediaClass,
) -> sqlx::Result<Show> {
    if let Some(show) = find_show_by_media_id(conn, &record.media_id).await? {
        return Ok(show);
    }

    let show = insert_show_row(conn, &record.media_id, &record.title, record.year, class.as_str()).await?;
    show.add_genres(conn, &record.genres).await?;
    Ok(show)
}

/// Add an episode to `show`. The show is no longer fully watched.
///
/// Re-adding the same (path, episode) pair updates the season in place.
pub async fn add_episode(
    conn: &mut SqliteConnection,
    show: &Show,
    season: Option<i32>,
    episode: i32,
    path: &str,
) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO episodes (show_id, season, episode, path, added_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(path, episode) DO UPDATE SET
            show_id = excluded.show_id,
            season = excluded.season
        RETURNING id
        "#,
    )
    .bind(show.id)
    .bind(season)
    .bind(episode)
    .bind(path)
    .bind(now())
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE shows SET watched = 0 WHERE id = ?")
        .bind(show.id)
        .execute(&mut *conn)
        .await?;

    Ok(row.0)
}

/// Episodes whose file is under `root`.
pub async fn episodes_under(
    conn: &mut SqliteConnection,
    root: &Path,
) -> sqlx::Result<Vec<Episode>> {
    let episodes: Vec<Episode> = sqlx::query_as(&format!("SELECT {EPISODE_COLUMNS} FROM episodes"))
        .fetch_all(&mut *conn)
        .await?;
    Ok(episodes
        .into_iter()
        .filter(|e| Path::new(&e.path).starts_with(root))
        .collect())
}

pub async fn delete_episode(conn: &mut SqliteConnection, episode_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM episodes WHERE id = ?")
        .bind(episode_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete `show_id` if it owns no episodes. Returns whether it was deleted.
pub async fn delete_show_if_empty(conn: &mut SqliteConnection, show_id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "DELETE FROM shows WHERE id = ? AND NOT EXISTS (SELECT 1 FROM episodes WHERE show_id = shows.id)",
    )
    .bind(show_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Mark `show_id` watched when every episode it owns is watched.
///
/// Never clears the flag. Returns whether the show was promoted.
pub async fn promote_show_if_watched(conn: &mut SqliteConnection, show_id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE shows SET watched = 1
        WHERE id = ?
          AND watched = 0
          AND EXISTS (SELECT 1 FROM episodes WHERE show_id = shows.id)
          AND NOT EXISTS (SELECT 1 FROM episodes WHERE show_id = shows.id AND watched = 0)
        "#,
    )
    .bind(show_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Paths and watched state
// ============================================================================

/// Every file path the catalog holds under `root`, discs split out.
pub async fn known_paths(conn: &mut SqliteConnection, root: &Path) -> sqlx::Result<HashSet<PathBuf>> {
    let mut known: HashSet<PathBuf> = movies_under(conn, root)
        .await?
        .iter()
        .flat_map(|m| m.paths().map(PathBuf::from).collect::<Vec<_>>())
        .filter(|p| p.starts_with(root))
        .collect();
    known.extend(
        episodes_under(conn, root)
            .await?
            .into_iter()
            .map(|e| PathBuf::from(e.path)),
    );
    Ok(known)
}

/// Set the watched flag of whatever entry owns `path`.
///
/// Movies match on any of their discs. A show's aggregate is left alone; the
/// next catalog pass promotes it. Returns the number of entries updated.
pub async fn set_watched_by_path(pool: &SqlitePool, path: &str, watched: bool) -> sqlx::Result<u64> {
    let mut tx = pool.begin().await?;

    let mut updated = sqlx::query("UPDATE episodes SET watched = ? WHERE path = ?")
        .bind(watched)
        .bind(path)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let movies: Vec<Movie> = sqlx::query_as(&format!("SELECT {MOVIE_COLUMNS} FROM movies"))
        .fetch_all(&mut *tx)
        .await?;
    for movie in movies.iter().filter(|m| m.paths().any(|p| p == path)) {
        updated += sqlx::query("UPDATE movies SET watched = ? WHERE id = ?")
            .bind(watched)
            .bind(movie.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    Ok(updated)
}

// ============================================================================
// Listing
// ============================================================================

pub async fn all_movies(pool: &SqlitePool) -> sqlx::Result<Vec<Movie>> {
    sqlx::query_as(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY title"))
        .fetch_all(pool)
        .await
}

pub async fn all_shows(pool: &SqlitePool) -> sqlx::Result<Vec<Show>> {
    sqlx::query_as(&format!("SELECT {SHOW_COLUMNS} FROM shows ORDER BY title"))
        .fetch_all(pool)
        .await
}

pub async fn episodes_for_show(pool: &SqlitePool, show_id: i64) -> sqlx::Result<Vec<Episode>> {
    sqlx::query_as(&format!(
        "SELECT {EPISODE_COLUMNS} FROM episodes WHERE show_id = ? ORDER BY season, episode"
    ))
    .bind(show_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_db;

    fn resolved(media_id: &str, title: &str, genres: &[&str]) -> ResolvedRecord {
        ResolvedRecord {
            media_id: media_id.to_string(),
            title: title.to_string(),
            year: Some(2002),
            season: Some(1),
            episode: Some(1),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            disc: None,
        }
    }

    #[test]
    fn test_db_url() {
        assert_eq!(db_url(None), "sqlite:catalog.db");
        assert_eq!(db_url(Some(Path::new("/tmp/x.db"))), "sqlite:/tmp/x.db");
    }

    #[test]
    fn test_merge_paths_sorts_and_dedups() {
        assert_eq!(merge_paths("/m/b.cd2.avi", "/m/a.cd1.avi"), "/m/a.cd1.avi|/m/b.cd2.avi");
        assert_eq!(merge_paths("/m/a.avi|/m/b.avi", "/m/a.avi"), "/m/a.avi|/m/b.avi");
        assert_eq!(merge_paths("", "/m/a.avi"), "/m/a.avi");
    }

    #[tokio::test]
    async fn test_upsert_movie_is_idempotent_by_media_id() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let record = resolved("tt0000001", "Long Film", &["Epic"]);

        upsert_movie(&mut conn, &record, "/m/film.cd2.avi").await.unwrap();
        let movie = upsert_movie(&mut conn, &record, "/m/film.cd1.avi").await.unwrap();
        upsert_movie(&mut conn, &record, "/m/film.cd1.avi").await.unwrap();

        assert_eq!(movie.path, "/m/film.cd1.avi|/m/film.cd2.avi");
        let movies = all_movies(&pool).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].genres(&mut conn).await.unwrap(), vec!["Epic"]);
    }

    #[tokio::test]
    async fn test_show_created_once_with_genres() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create_show(&mut conn, &resolved("tt0303461", "Firefly", &["Drama"]), MediaClass::Show)
            .await
            .unwrap();
        let second = get_or_create_show(&mut conn, &resolved("tt0303461", "Firefly", &["Other"]), MediaClass::Show)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.class, "show");
        assert_eq!(second.genres(&mut conn).await.unwrap(), vec!["Drama"]);
    }

    #[tokio::test]
    async fn test_bundled_episodes_share_a_path() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let show = insert_show_row(&mut conn, "tt1", "Show", None, "show").await.unwrap();

        add_episode(&mut conn, &show, Some(1), 1, "/tv/s/e01e02.mkv").await.unwrap();
        add_episode(&mut conn, &show, Some(1), 2, "/tv/s/e01e02.mkv").await.unwrap();
        add_episode(&mut conn, &show, Some(1), 2, "/tv/s/e01e02.mkv").await.unwrap();

        assert_eq!(episodes_for_show(&pool, show.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_watched_promotion_is_one_directional() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let show = insert_show_row(&mut conn, "tt1", "Show", None, "show").await.unwrap();
        add_episode(&mut conn, &show, Some(1), 1, "/tv/s/e1.mkv").await.unwrap();
        add_episode(&mut conn, &show, Some(1), 2, "/tv/s/e2.mkv").await.unwrap();

        set_watched_by_path(&pool, "/tv/s/e1.mkv", true).await.unwrap();
        assert!(!promote_show_if_watched(&mut conn, show.id).await.unwrap());

        set_watched_by_path(&pool, "/tv/s/e2.mkv", true).await.unwrap();
        assert!(promote_show_if_watched(&mut conn, show.id).await.unwrap());

        set_watched_by_path(&pool, "/tv/s/e2.mkv", false).await.unwrap();
        promote_show_if_watched(&mut conn, show.id).await.unwrap();
        let shows = all_shows(&pool).await.unwrap();
        assert!(shows[0].watched);
    }

    #[tokio::test]
    async fn test_new_episode_clears_show_watched() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let show = insert_show_row(&mut conn, "tt1", "Show", None, "show").await.unwrap();
        add_episode(&mut conn, &show, Some(1), 1, "/tv/s/e1.mkv").await.unwrap();
        set_watched_by_path(&pool, "/tv/s/e1.mkv", true).await.unwrap();
        promote_show_if_watched(&mut conn, show.id).await.unwrap();

        add_episode(&mut conn, &show, Some(1), 2, "/tv/s/e2.mkv").await.unwrap();
        assert!(!all_shows(&pool).await.unwrap()[0].watched);
    }

    #[tokio::test]
    async fn test_empty_show_is_deleted_with_its_genres() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let show = get_or_create_show(&mut conn, &resolved("tt1", "Show", &["Drama"]), MediaClass::Anime)
            .await
            .unwrap();
        let episode_id = add_episode(&mut conn, &show, Some(1), 1, "/tv/s/e1.mkv").await.unwrap();

        assert!(!delete_show_if_empty(&mut conn, show.id).await.unwrap());
        delete_episode(&mut conn, episode_id).await.unwrap();
        assert!(delete_show_if_empty(&mut conn, show.id).await.unwrap());

        assert!(all_shows(&pool).await.unwrap().is_empty());
        let links: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM show_genres")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links.0, 0);
    }

    #[tokio::test]
    async fn test_known_paths_are_scoped_to_root() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        insert_movie_row(&mut conn, "tt1", "A", "/movies/a.cd1.avi|/movies/a.cd2.avi", None)
            .await
            .unwrap();
        insert_movie_row(&mut conn, "tt2", "B", "/elsewhere/b.avi", None).await.unwrap();
        let show = insert_show_row(&mut conn, "tt3", "S", None, "show").await.unwrap();
        add_episode(&mut conn, &show, Some(1), 1, "/tv/s/e1.mkv").await.unwrap();

        let known = known_paths(&mut conn, Path::new("/movies")).await.unwrap();
        assert_eq!(known.len(), 2);
        assert!(known.contains(Path::new("/movies/a.cd2.avi")));

        let known = known_paths(&mut conn, Path::new("/tv")).await.unwrap();
        assert_eq!(known, HashSet::from([PathBuf::from("/tv/s/e1.mkv")]));
    }

    #[tokio::test]
    async fn test_set_watched_matches_any_disc() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        insert_movie_row(&mut conn, "tt1", "A", "/m/a.cd1.avi|/m/a.cd2.avi", None)
            .await
            .unwrap();
        drop(conn);

        assert_eq!(set_watched_by_path(&pool, "/m/a.cd2.avi", true).await.unwrap(), 1);
        assert_eq!(set_watched_by_path(&pool, "/m/a", true).await.unwrap(), 0);
        assert!(all_movies(&pool).await.unwrap()[0].watched);
    }
}
