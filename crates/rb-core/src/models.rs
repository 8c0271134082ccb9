//! # Domain Models
//! 
//! These structs represent the core entities of Rusty-Blog.
//! Ids are assigned by the store (auto-increment integers).

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub type UserId = i64;
pub type PostId = i64;

/// A registered account. Never mutated after registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// PHC-formatted password hash, never the plaintext
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// A user-authored entry with optional attached media.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    /// Relative reference handed out by the MediaStore (e.g. "uploads/cat.png")
    pub media: Option<String>,
    /// Username of the creator, copied at creation time
    pub author: String,
    /// Owner of the post; ownership checks go through this, not `author`
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.author_id == user.id
    }
}

/// Input for creating a post. The author fields always come from the session.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub media: Option<String>,
    pub author: String,
    pub author_id: UserId,
}

impl NewPost {
    pub fn by(user: &User, title: String, content: String, media: Option<String>) -> Self {
        Self {
            title,
            content,
            media,
            author: user.username.clone(),
            author_id: user.id,
        }
    }
}

/// The editable part of a post.
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub title: String,
    pub content: String,
}

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_TITLE_LEN: usize = 150;
