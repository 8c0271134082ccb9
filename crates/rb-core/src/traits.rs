//! # Core Traits (Ports)
//! 
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use crate::error::Result;
use crate::models::{NewPost, Post, PostId, PostUpdate, User, UserId};

/// Data persistence contract for users and posts.
///
/// Every write is a single atomic statement; no operation spans rows.
#[async_trait]
pub trait BlogRepo: Send + Sync {
    // User Operations

    /// Fails with `AppError::DuplicateUsername` when the name is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    // Post Operations
    async fn create_post(&self, post: NewPost) -> Result<Post>;
    /// All posts in insertion order.
    async fn list_posts(&self) -> Result<Vec<Post>>;
    async fn list_posts_by_author(&self, author_id: UserId) -> Result<Vec<Post>>;
    /// Fails with `AppError::NotFound` when absent.
    async fn get_post(&self, id: PostId) -> Result<Post>;
    async fn update_post(&self, id: PostId, update: PostUpdate) -> Result<Post>;
    async fn delete_post(&self, id: PostId) -> Result<()>;
}

/// Media storage contract for handling uploads.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes under a name derived from `filename` and returns the
    /// relative reference to put on the Post.
    async fn save_upload(&self, filename: &str, data: Vec<u8>) -> Result<String>;
    /// Deletes a stored upload. Removing something already gone is not an error.
    async fn remove_upload(&self, media_ref: &str) -> Result<()>;
    /// Returns the public URL for a reference produced by `save_upload`.
    fn get_url(&self, media_ref: &str) -> String;
    /// Upper bound on accepted upload size, so callers can stop reading early.
    fn max_bytes(&self) -> usize;
}

/// One-way credential hashing.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;
    /// Pure: same inputs always give the same answer. Malformed hashes are `false`.
    fn verify(&self, hash: &str, plaintext: &str) -> bool;
}
