//! # rb-db-sqlite Implementation
//! 
//! This module implements the data mapping between the SQLite relational model
//! and the `rb-core` domain models.

use async_trait::async_trait;
use rb_core::error::{AppError, Result};
use rb_core::models::{NewPost, Post, PostId, PostUpdate, User, UserId};
use rb_core::traits::BlogRepo;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT    NOT NULL UNIQUE,
        password_hash TEXT    NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        title      TEXT    NOT NULL,
        content    TEXT    NOT NULL,
        media      TEXT,
        author     TEXT    NOT NULL,
        author_id  INTEGER NOT NULL REFERENCES users(id),
        created_at TEXT    NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS posts_author_id ON posts(author_id)",
];

const POST_COLUMNS: &str = "id, title, content, media, author, author_id, created_at";

pub struct SqliteBlogRepo {
    pool: SqlitePool,
}

impl SqliteBlogRepo {
    /// Connects (creating the file if needed) and makes sure the schema exists.
    ///
    /// `sqlite::memory:` gives every connection its own database, so the pool
    /// is pinned to a single long-lived connection in that case.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options.max_connections(1).idle_timeout(None::<Duration>).max_lifetime(None::<Duration>)
        } else {
            pool_options.max_connections(5)
        };

        let pool = pool_options.connect_with(options).await.map_err(db_err)?;
        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        log::debug!("sqlite schema ready");
        Ok(())
    }
}

/// Anything the caller can't act on is an infrastructure failure.
fn db_err(e: sqlx::Error) -> AppError {
    log::error!("sqlite error: {}", e);
    AppError::internal(e)
}

fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
    }
}

fn row_to_post(row: &SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        media: row.get("media"),
        author: row.get("author"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl BlogRepo for SqliteBlogRepo {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(User {
                id: done.last_insert_rowid(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateUsername(username.to_string()))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let created_at = chrono::Utc::now();
        let done = sqlx::query(
            "INSERT INTO posts (title, content, media, author, author_id, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.media)
        .bind(&post.author)
        .bind(post.author_id)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Post {
            id: done.last_insert_rowid(),
            title: post.title,
            content: post.content,
            media: post.media,
            author: post.author,
            author_id: post.author_id,
            created_at,
        })
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!("SELECT {} FROM posts ORDER BY id ASC", POST_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_post).collect())
    }

    async fn list_posts_by_author(&self, author_id: UserId) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts WHERE author_id = ? ORDER BY id ASC",
            POST_COLUMNS
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(row_to_post).collect())
    }

    async fn get_post(&self, id: PostId) -> Result<Post> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref()
            .map(row_to_post)
            .ok_or_else(|| AppError::not_found("Post", id))
    }

    async fn update_post(&self, id: PostId, update: PostUpdate) -> Result<Post> {
        let done = sqlx::query("UPDATE posts SET title = ?, content = ? WHERE id = ?")
            .bind(&update.title)
            .bind(&update.content)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if done.rows_affected() == 0 {
            return Err(AppError::not_found("Post", id));
        }
        self.get_post(id).await
    }

    async fn delete_post(&self, id: PostId) -> Result<()> {
        let done = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if done.rows_affected() == 0 {
            return Err(AppError::not_found("Post", id));
        }
        Ok(())
    }
}
