//! SQLite persistence for scraped records. Single-writer model: a pool of
//! one connection, opened per process, with replace-on-conflict writes.

pub mod export;
pub mod import;

#[cfg(test)]
mod tests;

use std::path::Path;

use prospect_core::{Comment, CoreError, DatabaseError, Post, SCHEMA_VERSION};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

const CREATE_POSTS: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    title TEXT,
    content TEXT,
    score INTEGER,
    num_comments INTEGER,
    created_utc TIMESTAMP,
    author TEXT,
    subreddit TEXT,
    url TEXT,
    search_pattern TEXT,
    upvote_ratio REAL,
    is_self BOOLEAN,
    domain TEXT,
    extracted_at TIMESTAMP
)
"#;

const CREATE_COMMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    post_id TEXT,
    body TEXT,
    score INTEGER,
    created_utc TIMESTAMP,
    author TEXT,
    FOREIGN KEY (post_id) REFERENCES posts (id)
)
"#;

// No writer in this crate; kept in the migration pass so external readers
// that mark favorites see the full schema from the start.
const CREATE_FAVORITES: &str = r#"
CREATE TABLE IF NOT EXISTS favorites (
    post_id TEXT PRIMARY KEY,
    favorited_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (post_id) REFERENCES posts (id)
)
"#;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the SQLite file at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        // Comments may arrive before their owning post; the FK is declared
        // for the read side but not enforced at write time.
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;

        debug!("Connected to SQLite store at {}", path.as_ref().display());
        Ok(Self { pool })
    }

    /// Idempotent table creation plus the `user_version` schema stamp. Runs
    /// before any write; refuses a store written by a newer schema.
    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        let found: i32 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;

        if found > SCHEMA_VERSION {
            return Err(CoreError::Database(DatabaseError::SchemaVersionMismatch {
                found,
                supported: SCHEMA_VERSION,
            }));
        }

        for (name, ddl) in [
            ("posts", CREATE_POSTS),
            ("comments", CREATE_COMMENTS),
            ("favorites", CREATE_FAVORITES),
        ] {
            sqlx::query(ddl).execute(&self.pool).await.map_err(|e| {
                tracing::error!("Creating table {} failed: {}", name, e);
                CoreError::Database(DatabaseError::MigrationFailed {
                    migration: format!("create table {name}"),
                })
            })?;
        }

        sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;

        info!("Database schema ready (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Write a batch of posts with replace-on-conflict semantics keyed by
    /// id: full-row replace, last write wins. Per-statement writes, so rows
    /// upserted before a mid-batch failure stay committed.
    pub async fn upsert_posts(&self, posts: &[Post]) -> Result<u64, CoreError> {
        for post in posts {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO posts (
                    id, title, content, score, num_comments, created_utc,
                    author, subreddit, url, search_pattern, upvote_ratio,
                    is_self, domain, extracted_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&post.id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.score)
            .bind(post.num_comments)
            .bind(post.created_utc)
            .bind(&post.author)
            .bind(&post.subreddit)
            .bind(&post.url)
            .bind(&post.search_pattern)
            .bind(post.upvote_ratio)
            .bind(post.is_self)
            .bind(&post.domain)
            .bind(post.extracted_at)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;
        }

        info!("Upserted {} posts", posts.len());
        Ok(posts.len() as u64)
    }

    pub async fn upsert_comments(&self, comments: &[Comment]) -> Result<u64, CoreError> {
        for comment in comments {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO comments (
                    comment_id, post_id, body, score, created_utc, author
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&comment.comment_id)
            .bind(&comment.post_id)
            .bind(&comment.body)
            .bind(comment.score)
            .bind(comment.created_utc)
            .bind(&comment.author)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))?;
        }

        info!("Upserted {} comments", comments.len());
        Ok(comments.len() as u64)
    }

    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, CoreError> {
        sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))
    }

    pub async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>, CoreError> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE comment_id = ?")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))
    }

    pub async fn count_posts(&self) -> Result<i64, CoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))
    }

    pub async fn count_comments(&self) -> Result<i64, CoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::Database(DatabaseError::Sql(e)))
    }
}
