//! rusty-blog/crates/rb-api/src/middleware.rs Middleware
//! 
//! Request logging, security headers and the authentication guard.

use actix_web::dev::Payload;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use rb_core::error::AppError;
use rb_core::models::User;
use std::ops::Deref;

use crate::error::ApiError;
use crate::handlers::AppState;
use crate::session::SESSION_COOKIE;

// Returns a standard set of middleware for the Rusty-Blog site.
pub fn standard_middleware() -> Logger {
    // We use the 'default' logger which outputs:
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

// Headers added to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
}

/// The logged-in user. Taking this extractor makes a handler require
/// authentication: anonymous requests are redirected to `/login` before the
/// handler body runs. Use `Option<CurrentUser>` for pages that are public.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

fn login_required() -> ApiError {
    ApiError(AppError::Unauthorized("login required".to_string()))
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());

        Box::pin(async move {
            let state = state
                .ok_or_else(|| ApiError(AppError::internal("AppState is not registered")))?;
            let user_id = token
                .as_deref()
                .and_then(|t| state.sessions.verify(t))
                .ok_or_else(login_required)?;

            // A valid token for a user that no longer exists is still anonymous.
            match state.repo.get_user(user_id).await? {
                Some(user) => Ok(CurrentUser(user)),
                None => Err(login_required()),
            }
        })
    }
}
