//! # rb-ui
//!
//! Askama page templates. Every page extends `base.html`, which renders the
//! navigation for `current_user` and the one-shot `flash` message.

use askama::Template;
use rb_core::models::{Post, PostId};

/// A post as shown in a listing, with everything the template needs precomputed.
#[derive(Debug, Clone)]
pub struct PostCard {
    pub post: Post,
    pub has_media: bool,
    pub media_url: String,
    pub media_is_video: bool,
    pub like_count: usize,
    pub liked_by: Vec<String>,
    pub liked_by_me: bool,
    pub owned_by_me: bool,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];

pub fn is_video(media_url: &str) -> bool {
    media_url
        .rsplit_once('.')
        .map(|(_, ext)| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub current_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub posts: &'a [PostCard],
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate<'a> {
    pub current_user: Option<&'a str>,
    pub flash: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate<'a> {
    pub current_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub username: &'a str,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub current_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub username: &'a str,
}

#[derive(Template)]
#[template(path = "create.html")]
pub struct CreateTemplate<'a> {
    pub current_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Template)]
#[template(path = "edit.html")]
pub struct EditTemplate<'a> {
    pub current_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub post_id: PostId,
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate<'a> {
    pub current_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub username: &'a str,
    pub posts: &'a [PostCard],
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub current_user: Option<&'a str>,
    pub flash: Option<&'a str>,
    pub message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str, media: Option<&str>) -> PostCard {
        PostCard {
            post: Post {
                id: 1,
                title: title.to_string(),
                content: "World".to_string(),
                media: media.map(str::to_string),
                author: "alice".to_string(),
                author_id: 1,
                created_at: chrono::Utc::now(),
            },
            has_media: media.is_some(),
            media_url: media.map(|m| format!("/static/{}", m)).unwrap_or_default(),
            media_is_video: media.map(is_video).unwrap_or(false),
            like_count: 2,
            liked_by: vec!["bob".to_string(), "carol".to_string()],
            liked_by_me: false,
            owned_by_me: false,
        }
    }

    #[test]
    fn index_escapes_user_content() {
        let posts = vec![card("<script>alert(1)</script>", None)];
        let html = IndexTemplate { current_user: None, flash: None, posts: &posts }
            .render()
            .unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("alice"));
        assert!(html.contains("bob, carol"));
    }

    #[test]
    fn flash_and_navigation_follow_login_state() {
        let html = AboutTemplate { current_user: Some("alice"), flash: Some("Welcome back"), }
            .render()
            .unwrap();
        assert!(html.contains("Welcome back"));
        assert!(html.contains("/logout"));
        assert!(!html.contains("href=\"/register\""));

        let anon = AboutTemplate { current_user: None, flash: None }.render().unwrap();
        assert!(anon.contains("href=\"/login\""));
    }

    #[test]
    fn media_is_rendered_by_kind() {
        let posts = vec![card("pic", Some("uploads/a.png")), card("clip", Some("uploads/b.MP4"))];
        let html = IndexTemplate { current_user: None, flash: None, posts: &posts }
            .render()
            .unwrap();
        assert!(html.contains("<img src=\"/static/uploads/a.png\""));
        assert!(html.contains("<video controls src=\"/static/uploads/b.MP4\""));
    }

    #[test]
    fn edit_form_is_prefilled() {
        let html = EditTemplate {
            current_user: Some("alice"),
            flash: None,
            post_id: 9,
            title: "Hello",
            content: "World",
        }
        .render()
        .unwrap();
        assert!(html.contains("action=\"/edit/9\""));
        assert!(html.contains("value=\"Hello\""));
        assert!(html.contains(">World</textarea>"));
    }
}
