//! # rb-storage-local
//! rusty-blog/crates/rb-plugins/rb-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaStore`.
//! Features: filename sanitization, extension allow-list, size limit,
//! optional content-hash prefixes for collision-free names.

use async_trait::async_trait;
use rb_core::error::{AppError, Result};
use rb_core::traits::MediaStore;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use unicode_normalization::UnicodeNormalization;

/// Every reference handed out by this store starts with this segment.
pub const MEDIA_REF_DIR: &str = "uploads";

pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "mp4", "webm"];

pub struct LocalMediaStore {
    /// Directory the files are written to (e.g., "./static/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static"); files appear under "<prefix>/uploads/"
    url_prefix: String,
    max_bytes: usize,
    /// Lowercase extensions without the dot. Empty accepts anything.
    allowed_extensions: Vec<String>,
    /// Prefix stored names with a content hash instead of overwriting on collision
    unique_names: bool,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix,
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            unique_names: false,
        }
    }

    pub fn with_limits(mut self, max_bytes: usize, allowed_extensions: Vec<String>) -> Self {
        self.max_bytes = max_bytes;
        self.allowed_extensions = allowed_extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_unique_names(mut self, unique_names: bool) -> Self {
        self.unique_names = unique_names;
        self
    }

    fn check_extension(&self, name: &str) -> Result<()> {
        if self.allowed_extensions.is_empty() {
            return Ok(());
        }
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            Ok(())
        } else {
            Err(AppError::ValidationError(format!(
                "File type not allowed. Allowed types: {}.",
                self.allowed_extensions.join(", ")
            )))
        }
    }
}

/// Reduces a client-supplied filename to something safe to use as a path
/// component: NFKD-folded to ASCII, no separators, only `[A-Za-z0-9_.-]`,
/// whitespace runs collapsed to `_`, and no leading/trailing `.` or `_`.
/// Characters with no ASCII decomposition are dropped.
///
/// May return an empty string (e.g. for `"../.."`).
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .nfkd()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Writes the upload to `<root>/<sanitized name>`. Without `unique_names`
    /// a second upload with the same sanitized name replaces the first.
    async fn save_upload(&self, filename: &str, data: Vec<u8>) -> Result<String> {
        let safe_name = sanitize_filename(filename);
        if safe_name.is_empty() {
            return Err(AppError::ValidationError("Invalid file name.".to_string()));
        }
        self.check_extension(&safe_name)?;
        if data.len() > self.max_bytes {
            return Err(AppError::ValidationError(format!(
                "File is too large (limit is {} bytes).",
                self.max_bytes
            )));
        }

        let stored_name = if self.unique_names {
            let digest = hex::encode(Sha256::digest(&data));
            format!("{}_{}", &digest[..12], safe_name)
        } else {
            safe_name
        };

        fs::create_dir_all(&self.root_path)
            .await
            .map_err(AppError::internal)?;
        let target_path = self.root_path.join(&stored_name);
        fs::write(&target_path, &data)
            .await
            .map_err(AppError::internal)?;
        log::info!("stored upload {} ({} bytes)", target_path.display(), data.len());

        Ok(format!("{}/{}", MEDIA_REF_DIR, stored_name))
    }

    async fn remove_upload(&self, media_ref: &str) -> Result<()> {
        let stored_name = media_ref
            .strip_prefix(MEDIA_REF_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && sanitize_filename(name) == *name)
            .ok_or_else(|| AppError::internal(format!("not a media reference: {}", media_ref)))?;

        let target_path = self.root_path.join(stored_name);
        match fs::remove_file(&target_path).await {
            Ok(()) => {
                log::info!("removed upload {}", target_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::internal(e)),
        }
    }

    fn get_url(&self, media_ref: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), media_ref)
    }

    fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}
