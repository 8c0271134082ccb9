//! # Rusty-Blog Binary
//! 
//! The entry point that assembles the application based on compile-time features.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rb_api::AppState;
use rb_config::Settings;
use rb_core::LikeTracker;
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::sync::Arc;

// Feature-gated imports: This is the "Compiled-to-Order" magic
#[cfg(feature = "db-sqlite")]
use rb_db_sqlite::SqliteBlogRepo;

#[cfg(feature = "storage-local")]
use rb_storage_local::LocalMediaStore;

#[cfg(feature = "auth-simple")]
use rb_auth_simple::Argon2CredentialHasher;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load().context("invalid configuration")?;

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteBlogRepo::new(&settings.database.url)
        .await
        .with_context(|| format!("failed to open database {}", settings.database.url))?;

    // 2. Initialize Storage Implementation
    std::fs::create_dir_all(&settings.media.upload_dir)
        .with_context(|| format!("failed to create {}", settings.media.upload_dir))?;
    #[cfg(feature = "storage-local")]
    let store = LocalMediaStore::new(
        PathBuf::from(&settings.media.upload_dir),
        settings.media.public_prefix.clone(),
    )
    .with_limits(settings.media.max_bytes, settings.media.allowed_extensions.clone())
    .with_unique_names(settings.media.unique_names);

    // 3. Initialize Auth Implementation
    #[cfg(feature = "auth-simple")]
    let hasher = Argon2CredentialHasher::new();

    // 4. Wrap in AppState (Using dynamic dispatch for maximum flexibility)
    let state = web::Data::new(AppState {
        repo: Box::new(repo),
        store: Box::new(store),
        hasher: Arc::new(hasher),
        likes: LikeTracker::new(),
        sessions: rb_api::session::SessionKeys::new(
            settings.session.secret.expose_secret().as_bytes(),
            settings.session.ttl_hours,
            settings.session.secure_cookie,
        ),
    });

    let (host, port) = settings.bind_addr();
    let public_prefix = settings.media.public_prefix.clone();
    let upload_dir = settings.media.upload_dir.clone();
    log::info!("Rusty-Blog starting on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(rb_api::middleware::standard_middleware())
            .wrap(rb_api::middleware::security_headers())
            .app_data(state.clone())
            .configure(|cfg| rb_api::configure_media(cfg, &public_prefix, &upload_dir))
            .configure(rb_api::configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
