//! Signed session cookies and one-shot flash messages.
//!
//! The session cookie holds an HS256 JWT whose `sub` is the user id; it never
//! carries credentials. The flash cookie holds a base64url message that the
//! next rendered page displays and clears.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::http::header::LOCATION;
use actix_web::{FromRequest, HttpRequest, HttpResponse};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rb_core::error::{AppError, Result};
use rb_core::models::UserId;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::{ready, Ready};

pub const SESSION_COOKIE: &str = "rb_session";
pub const FLASH_COOKIE: &str = "rb_flash";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and checks session tokens. Built once from the configured secret.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
    secure_cookie: bool,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_hours: i64, secure_cookie: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: chrono::Duration::hours(ttl_hours),
            secure_cookie,
        }
    }

    pub fn issue(&self, user_id: UserId) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("failed to sign session: {}", e)))
    }

    /// Returns the user id for a valid, unexpired token; anything else is anonymous.
    pub fn verify(&self, token: &str) -> Option<UserId> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => data.claims.sub.parse().ok(),
            Err(e) => {
                log::debug!("rejected session token: {}", e);
                None
            }
        }
    }

    pub fn login_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .max_age(CookieDuration::seconds(self.ttl.num_seconds()))
            .finish()
    }

    pub fn logout_cookie(&self) -> Cookie<'static> {
        removal(SESSION_COOKIE)
    }
}

fn removal(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

pub fn flash_cookie(message: &str) -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, URL_SAFE_NO_PAD.encode(message))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn clear_flash_cookie() -> Cookie<'static> {
    removal(FLASH_COOKIE)
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, location))
        .finish()
}

pub fn redirect_with_flash(location: &str, message: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, location))
        .cookie(flash_cookie(message))
        .finish()
}

/// The flash message left by the previous response, if any.
#[derive(Debug, Default)]
pub struct Flash(Option<String>);

impl Flash {
    pub fn message(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Whether the response should clear the flash cookie.
    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }
}

impl FromRequest for Flash {
    type Error = Infallible;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let message = req
            .cookie(FLASH_COOKIE)
            .and_then(|c| URL_SAFE_NO_PAD.decode(c.value()).ok())
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .filter(|m| !m.is_empty());
        ready(Ok(Flash(message)))
    }
}
