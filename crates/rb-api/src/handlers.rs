//! # rb-api Handlers
//! 
//! This module coordinates the flow between HTTP requests and Core traits.

use actix_multipart::{Field, Multipart};
use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};
use askama::Template;
use futures_util::StreamExt;
use rb_core::error::{AppError, Result};
use rb_core::models::{NewPost, Post, PostId, PostUpdate, User, MAX_TITLE_LEN, MAX_USERNAME_LEN};
use rb_core::traits::{BlogRepo, CredentialHasher, MediaStore};
use rb_core::validate::{required, required_text};
use rb_core::LikeTracker;
use rb_ui::{
    is_video, AboutTemplate, CreateTemplate, EditTemplate, IndexTemplate, LoginTemplate, PostCard,
    ProfileTemplate, RegisterTemplate,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{user_message, ApiError, LOGIN_FAILED};
use crate::middleware::CurrentUser;
use crate::session::{clear_flash_cookie, redirect, redirect_with_flash, Flash, SessionKeys};

/// Everything a handler needs, built once in `main` and shared by all workers.
pub struct AppState {
    pub repo: Box<dyn BlogRepo>,
    pub store: Box<dyn MediaStore>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub likes: LikeTracker,
    pub sessions: SessionKeys,
}

type HandlerResult = std::result::Result<HttpResponse, ApiError>;

/// Text fields of the multipart post form are capped well below media uploads.
const MAX_TEXT_FIELD_BYTES: usize = 256 * 1024;

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Renders a template and clears any flash message it consumed.
fn page<T: Template>(template: &T, flash: &Flash) -> HandlerResult {
    let html = template.render().map_err(AppError::internal)?;
    let mut response = HttpResponse::Ok();
    response.content_type(ContentType::html());
    if flash.is_pending() {
        response.cookie(clear_flash_cookie());
    }
    Ok(response.body(html))
}

fn post_cards(data: &AppState, posts: Vec<Post>, viewer: Option<&User>) -> Vec<PostCard> {
    posts
        .into_iter()
        .map(|post| {
            let media_url = post
                .media
                .as_deref()
                .map(|m| data.store.get_url(m))
                .unwrap_or_default();
            let liked_by = data.likes.likes_for(post.id);
            PostCard {
                has_media: post.media.is_some(),
                media_is_video: is_video(&media_url),
                media_url,
                like_count: liked_by.len(),
                liked_by_me: viewer.map_or(false, |u| data.likes.has_liked(post.id, &u.username)),
                owned_by_me: viewer.map_or(false, |u| post.is_owned_by(u)),
                liked_by,
                post,
            }
        })
        .collect()
}

fn ensure_owner(post: &Post, user: &User, action: &str) -> Result<()> {
    if post.is_owned_by(user) {
        Ok(())
    } else {
        log::warn!("user {} tried to {} post {} owned by {}", user.username, action, post.id, post.author);
        Err(AppError::PermissionDenied(format!(
            "You do not have permission to {} this post.",
            action
        )))
    }
}

async fn hash_password(data: &AppState, password: String) -> Result<String> {
    let hasher = Arc::clone(&data.hasher);
    web::block(move || hasher.hash(&password))
        .await
        .map_err(AppError::internal)?
}

async fn verify_password(data: &AppState, hash: String, password: String) -> Result<bool> {
    let hasher = Arc::clone(&data.hasher);
    web::block(move || hasher.verify(&hash, &password))
        .await
        .map_err(AppError::internal)
}

/// Renders the home page: every post with its likes.
pub async fn home(
    data: web::Data<AppState>,
    user: Option<CurrentUser>,
    flash: Flash,
) -> HandlerResult {
    let posts = data.repo.list_posts().await?;
    let viewer = user.as_deref();
    let cards = post_cards(&data, posts, viewer);
    page(
        &IndexTemplate {
            current_user: viewer.map(|u| u.username.as_str()),
            flash: flash.message(),
            posts: &cards,
        },
        &flash,
    )
}

pub async fn about(user: Option<CurrentUser>, flash: Flash) -> HandlerResult {
    page(
        &AboutTemplate {
            current_user: user.as_deref().map(|u| u.username.as_str()),
            flash: flash.message(),
        },
        &flash,
    )
}

pub async fn register_form(user: Option<CurrentUser>, flash: Flash) -> HandlerResult {
    page(
        &RegisterTemplate {
            current_user: user.as_deref().map(|u| u.username.as_str()),
            flash: flash.message(),
            username: "",
        },
        &flash,
    )
}

async fn create_account(data: &AppState, form: CredentialsForm) -> Result<User> {
    let username = required("Username", &form.username, Some(MAX_USERNAME_LEN))?;
    if form.password.is_empty() {
        return Err(AppError::ValidationError("Password is required.".to_string()));
    }
    // Skips hashing for the common case; the UNIQUE constraint still decides races.
    if data.repo.get_user_by_username(&username).await?.is_some() {
        return Err(AppError::DuplicateUsername(username));
    }
    let hash = hash_password(data, form.password).await?;
    data.repo.create_user(&username, &hash).await
}

/// Creates an account, then sends the user to the login page.
pub async fn register(
    data: web::Data<AppState>,
    user: Option<CurrentUser>,
    flash: Flash,
    form: web::Form<CredentialsForm>,
) -> HandlerResult {
    let form = form.into_inner();
    let submitted = form.username.clone();
    match create_account(&data, form).await {
        Ok(account) => {
            log::info!("registered user {}", account.username);
            Ok(redirect_with_flash("/login", "Registration Successful! Please log in."))
        }
        Err(err @ (AppError::ValidationError(_) | AppError::DuplicateUsername(_))) => {
            let message = user_message(&err);
            page(
                &RegisterTemplate {
                    current_user: user.as_deref().map(|u| u.username.as_str()),
                    flash: Some(message.as_str()),
                    username: &submitted,
                },
                &flash,
            )
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn login_form(user: Option<CurrentUser>, flash: Flash) -> HandlerResult {
    page(
        &LoginTemplate {
            current_user: user.as_deref().map(|u| u.username.as_str()),
            flash: flash.message(),
            username: "",
        },
        &flash,
    )
}

async fn authenticate(data: &AppState, form: CredentialsForm) -> Result<User> {
    let user = data
        .repo
        .get_user_by_username(form.username.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    if verify_password(data, user.password_hash.clone(), form.password).await? {
        Ok(user)
    } else {
        Err(AppError::InvalidCredentials)
    }
}

/// Checks credentials and starts a session.
pub async fn login(
    data: web::Data<AppState>,
    flash: Flash,
    form: web::Form<CredentialsForm>,
) -> HandlerResult {
    let form = form.into_inner();
    let submitted = form.username.clone();
    match authenticate(&data, form).await {
        Ok(user) => {
            let token = data.sessions.issue(user.id)?;
            log::info!("user {} logged in", user.username);
            Ok(HttpResponse::SeeOther()
                .insert_header((actix_web::http::header::LOCATION, "/"))
                .cookie(data.sessions.login_cookie(token))
                .cookie(clear_flash_cookie())
                .finish())
        }
        Err(AppError::InvalidCredentials) => {
            log::warn!("failed login attempt for {:?}", submitted);
            page(
                &LoginTemplate { current_user: None, flash: Some(LOGIN_FAILED), username: &submitted },
                &flash,
            )
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(data: web::Data<AppState>, user: CurrentUser) -> HandlerResult {
    log::info!("user {} logged out", user.username);
    Ok(HttpResponse::SeeOther()
        .insert_header((actix_web::http::header::LOCATION, "/"))
        .cookie(data.sessions.logout_cookie())
        .finish())
}

pub async fn create_form(user: CurrentUser, flash: Flash) -> HandlerResult {
    page(
        &CreateTemplate {
            current_user: Some(user.username.as_str()),
            flash: flash.message(),
            title: "",
            content: "",
        },
        &flash,
    )
}

/// An uploaded file as received from the client.
struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct MultipartPostForm {
    title: String,
    content: String,
    media: Option<UploadedFile>,
}

async fn read_field(field: &mut Field, limit: usize, too_large: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::ValidationError(format!("Upload failed: {}", e)))?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::ValidationError(too_large.to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Reads `title`, `content` and an optional `media` file. An empty file
/// input (no filename) means no media.
async fn read_post_form(payload: &mut Multipart, max_media_bytes: usize) -> Result<MultipartPostForm> {
    let mut form = MultipartPostForm::default();
    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| AppError::ValidationError(format!("Malformed form data: {}", e)))?;
        let name = field.name().to_string();
        match name.as_str() {
            "media" => {
                let filename = field
                    .content_disposition()
                    .get_filename()
                    .map(str::to_string)
                    .unwrap_or_default();
                let too_large = format!("File is too large (limit is {} bytes).", max_media_bytes);
                let bytes = read_field(&mut field, max_media_bytes, &too_large).await?;
                if !filename.is_empty() {
                    form.media = Some(UploadedFile { filename, bytes });
                }
            }
            "title" | "content" => {
                let bytes = read_field(&mut field, MAX_TEXT_FIELD_BYTES, "Text is too long.").await?;
                let text = String::from_utf8(bytes)
                    .map_err(|_| AppError::ValidationError("Text must be valid UTF-8.".to_string()))?;
                if name == "title" {
                    form.title = text;
                } else {
                    form.content = text;
                }
            }
            _ => {
                read_field(&mut field, MAX_TEXT_FIELD_BYTES, "Unexpected form field.").await?;
            }
        }
    }
    Ok(form)
}

async fn publish(data: &AppState, user: &User, form: &mut MultipartPostForm) -> Result<Post> {
    let title = required("Title", &form.title, Some(MAX_TITLE_LEN))?;
    let content = required_text("Content", &form.content, None)?;
    let media = match form.media.take() {
        Some(file) => Some(data.store.save_upload(&file.filename, file.bytes).await?),
        None => None,
    };
    let created = data
        .repo
        .create_post(NewPost::by(user, title, content, media.clone()))
        .await;

    // No post points at the file if the insert failed.
    if let (Err(_), Some(media_ref)) = (&created, &media) {
        if let Err(e) = data.store.remove_upload(media_ref).await {
            log::warn!("could not remove orphaned upload {}: {}", media_ref, e);
        }
    }
    created
}

/// Creates a post from the multipart form, storing the attached media if any.
pub async fn create_post(
    data: web::Data<AppState>,
    user: CurrentUser,
    flash: Flash,
    mut payload: Multipart,
) -> HandlerResult {
    let outcome = match read_post_form(&mut payload, data.store.max_bytes()).await {
        Ok(mut form) => publish(&data, &user, &mut form)
            .await
            .map_err(|err| (err, form.title, form.content)),
        Err(err) => Err((err, String::new(), String::new())),
    };

    match outcome {
        Ok(post) => {
            log::info!("user {} created post {}", user.username, post.id);
            Ok(redirect("/"))
        }
        Err((err @ AppError::ValidationError(_), title, content)) => {
            let message = user_message(&err);
            page(
                &CreateTemplate {
                    current_user: Some(user.username.as_str()),
                    flash: Some(message.as_str()),
                    title: &title,
                    content: &content,
                },
                &flash,
            )
        }
        Err((err, _, _)) => Err(err.into()),
    }
}

/// Shows the edit form, prefilled, to the post's owner only.
pub async fn edit_form(
    data: web::Data<AppState>,
    user: CurrentUser,
    flash: Flash,
    path: web::Path<PostId>,
) -> HandlerResult {
    let post = data.repo.get_post(path.into_inner()).await?;
    ensure_owner(&post, &user, "edit")?;
    page(
        &EditTemplate {
            current_user: Some(user.username.as_str()),
            flash: flash.message(),
            post_id: post.id,
            title: &post.title,
            content: &post.content,
        },
        &flash,
    )
}

pub async fn edit_post(
    data: web::Data<AppState>,
    user: CurrentUser,
    flash: Flash,
    path: web::Path<PostId>,
    form: web::Form<PostForm>,
) -> HandlerResult {
    let post = data.repo.get_post(path.into_inner()).await?;
    ensure_owner(&post, &user, "edit")?;

    let validated = required("Title", &form.title, Some(MAX_TITLE_LEN))
        .and_then(|title| Ok((title, required_text("Content", &form.content, None)?)));
    let (title, content) = match validated {
        Ok(fields) => fields,
        Err(err) => {
            let message = user_message(&err);
            return page(
                &EditTemplate {
                    current_user: Some(user.username.as_str()),
                    flash: Some(message.as_str()),
                    post_id: post.id,
                    title: &form.title,
                    content: &form.content,
                },
                &flash,
            );
        }
    };

    data.repo.update_post(post.id, PostUpdate { title, content }).await?;
    log::info!("user {} updated post {}", user.username, post.id);
    Ok(redirect_with_flash("/profile", "Post updated successfully!"))
}

pub async fn delete_post(
    data: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<PostId>,
) -> HandlerResult {
    let post = data.repo.get_post(path.into_inner()).await?;
    ensure_owner(&post, &user, "delete")?;
    data.repo.delete_post(post.id).await?;
    log::info!("user {} deleted post {}", user.username, post.id);
    Ok(redirect_with_flash("/profile", "Post deleted successfully!"))
}

/// Lists the current user's own posts.
pub async fn profile(
    data: web::Data<AppState>,
    user: CurrentUser,
    flash: Flash,
) -> HandlerResult {
    let posts = data.repo.list_posts_by_author(user.id).await?;
    let cards = post_cards(&data, posts, Some(&user.0));
    page(
        &ProfileTemplate {
            current_user: Some(user.username.as_str()),
            flash: flash.message(),
            username: &user.username,
            posts: &cards,
        },
        &flash,
    )
}

pub async fn like_post(
    data: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<PostId>,
) -> HandlerResult {
    let post = data.repo.get_post(path.into_inner()).await?;
    if data.likes.like(post.id, &user.username) {
        log::debug!("user {} liked post {}", user.username, post.id);
    }
    Ok(redirect("/"))
}
