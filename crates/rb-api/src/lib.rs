//! # rb-api
//! 
//! The web routing and orchestration layer for Rusty-Blog.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;

use actix_files::Files;
use actix_web::web;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::CurrentUser;

/// Limit for urlencoded forms (login, register, edit).
const FORM_LIMIT_BYTES: usize = 256 * 1024;

/// Configures the routes for the blog.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().limit(FORM_LIMIT_BYTES))
        .route("/", web::get().to(handlers::home))
        .route("/about", web::get().to(handlers::about))
        .service(
            web::resource("/register")
                .route(web::get().to(handlers::register_form))
                .route(web::post().to(handlers::register)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(handlers::login_form))
                .route(web::post().to(handlers::login)),
        )
        .route("/logout", web::get().to(handlers::logout))
        .service(
            web::resource("/create")
                .route(web::get().to(handlers::create_form))
                .route(web::post().to(handlers::create_post)),
        )
        .service(
            web::resource("/edit/{post_id}")
                .route(web::get().to(handlers::edit_form))
                .route(web::post().to(handlers::edit_post)),
        )
        .route("/delete/{post_id}", web::post().to(handlers::delete_post))
        .route("/profile", web::get().to(handlers::profile))
        .route("/like/{post_id}", web::get().to(handlers::like_post));
}

/// Serves uploaded media from `upload_dir` under `<public_prefix>/uploads`,
/// matching the URLs the media store hands out.
pub fn configure_media(cfg: &mut web::ServiceConfig, public_prefix: &str, upload_dir: &str) {
    let mount = format!("{}/uploads", public_prefix.trim_end_matches('/'));
    cfg.service(Files::new(&mount, upload_dir));
}
