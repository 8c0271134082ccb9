//! Request-boundary error handling.
//!
//! Every recoverable `AppError` becomes a redirect to a safe page with a
//! flash message. Internal failures are logged and shown as a generic page;
//! their details never reach the client.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use askama::Template;
use rb_core::error::AppError;
use rb_ui::ErrorTemplate;
use std::fmt;

use crate::session::redirect_with_flash;

pub const LOGIN_REQUIRED: &str = "Please log in to access this page.";
pub const LOGIN_FAILED: &str = "Login Unsuccessful. Check username and password.";
const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// Wraps `AppError` so it can be returned straight from actix handlers.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The text shown to the user for an error.
pub fn user_message(err: &AppError) -> String {
    match err {
        AppError::NotFound(kind, _) => format!("{} not found.", kind),
        AppError::ValidationError(msg) | AppError::PermissionDenied(msg) => msg.clone(),
        AppError::DuplicateUsername(name) => format!("Username '{}' is already taken.", name),
        AppError::InvalidCredentials => LOGIN_FAILED.to_string(),
        AppError::Unauthorized(_) => LOGIN_REQUIRED.to_string(),
        AppError::Internal(_) => INTERNAL_MESSAGE.to_string(),
    }
}

/// Where the user lands after an error of this kind.
fn safe_location(err: &AppError) -> &'static str {
    match err {
        AppError::Unauthorized(_) | AppError::InvalidCredentials => "/login",
        AppError::DuplicateUsername(_) => "/register",
        _ => "/",
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::SEE_OTHER,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            AppError::Internal(detail) => {
                log::error!("request failed: {}", detail);
                let body = ErrorTemplate { current_user: None, flash: None, message: INTERNAL_MESSAGE }
                    .render()
                    .unwrap_or_else(|_| INTERNAL_MESSAGE.to_string());
                HttpResponse::InternalServerError()
                    .content_type("text/html; charset=utf-8")
                    .body(body)
            }
            other => {
                log::debug!("recoverable error: {}", other);
                redirect_with_flash(safe_location(other), &user_message(other))
            }
        }
    }
}
