//! Genre association for catalog entries.
//!
//! Movies and shows share one `genres` table and link to it through their
//! own join table. [`GenreAssociable`] gives both the same four operations;
//! the SQL lives once in the helpers below, parameterised by a
//! [`GenreLink`] naming the join table.

use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::model::{Movie, Show};

/// Join table between an entry table and `genres`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenreLink {
    pub table: &'static str,
    pub owner_column: &'static str,
}

pub const MOVIE_GENRES: GenreLink = GenreLink {
    table: "movie_genres",
    owner_column: "movie_id",
};

pub const SHOW_GENRES: GenreLink = GenreLink {
    table: "show_genres",
    owner_column: "show_id",
};

/// A catalog entry that carries genres.
#[async_trait]
pub trait GenreAssociable: Sync {
    const LINK: GenreLink;

    fn owner_id(&self) -> i64;

    /// Genre names, alphabetical.
    async fn genres(&self, conn: &mut SqliteConnection) -> sqlx::Result<Vec<String>> {
        genre_names(conn, Self::LINK, self.owner_id()).await
    }

    /// Link genres, creating genre rows on first use. Existing links stay.
    async fn add_genres(&self, conn: &mut SqliteConnection, genres: &[String]) -> sqlx::Result<()> {
        link_genres(conn, Self::LINK, self.owner_id(), genres).await
    }

    /// Replace every link with `genres`.
    async fn replace_genres(
        &self,
        conn: &mut SqliteConnection,
        genres: &[String],
    ) -> sqlx::Result<()> {
        unlink_genres(conn, Self::LINK, self.owner_id()).await?;
        link_genres(conn, Self::LINK, self.owner_id(), genres).await
    }

    /// Drop every link. Genre rows themselves are kept.
    async fn delete_genres(&self, conn: &mut SqliteConnection) -> sqlx::Result<()> {
        unlink_genres(conn, Self::LINK, self.owner_id()).await
    }
}

impl GenreAssociable for Movie {
    const LINK: GenreLink = MOVIE_GENRES;

    fn owner_id(&self) -> i64 {
        self.id
    }
}

impl GenreAssociable for Show {
    const LINK: GenreLink = SHOW_GENRES;

    fn owner_id(&self) -> i64 {
        self.id
    }
}

/// Get or create a genre by name.
pub async fn get_or_create_genre(conn: &mut SqliteConnection, text: &str) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO genres (text) VALUES (?)
        ON CONFLICT(text) DO UPDATE SET text = excluded.text
        RETURNING id
        "#,
    )
    .bind(text)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.0)
}

pub async fn genre_names(
    conn: &mut SqliteConnection,
    link: GenreLink,
    owner_id: i64,
) -> sqlx::Result<Vec<String>> {
    let sql = format!(
        "SELECT g.text FROM genres g JOIN {table} l ON l.genre_id = g.id \
         WHERE l.{owner} = ? ORDER BY g.text",
        table = link.table,
        owner = link.owner_column,
    );
    let rows: Vec<(String,)> = sqlx::query_as(&sql)
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|(text,)| text).collect())
}

pub async fn link_genres(
    conn: &mut SqliteConnection,
    link: GenreLink,
    owner_id: i64,
    genres: &[String],
) -> sqlx::Result<()> {
    let sql = format!(
        "INSERT OR IGNORE INTO {table} ({owner}, genre_id) VALUES (?, ?)",
        table = link.table,
        owner = link.owner_column,
    );
    for genre in genres.iter().map(|g| g.trim()).filter(|g| !g.is_empty()) {
        let genre_id = get_or_create_genre(conn, genre).await?;
        sqlx::query(&sql)
            .bind(owner_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn unlink_genres(
    conn: &mut SqliteConnection,
    link: GenreLink,
    owner_id: i64,
) -> sqlx::Result<()> {
    let sql = format!(
        "DELETE FROM {table} WHERE {owner} = ?",
        table = link.table,
        owner = link.owner_column,
    );
    sqlx::query(&sql).bind(owner_id).execute(&mut *conn).await?;
    Ok(())
}
