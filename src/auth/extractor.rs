//! Actix-web extractor for session authentication.
//!
//! Accepts the access-token JWT either from the `Authorization: Bearer`
//! header or from the session cookie. Verification is purely cryptographic;
//! handlers resolve the full user row from the database afterwards.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use std::future::{ready, Ready};

use crate::config::Config;
use crate::error::ErrorResponse;
use crate::models::SessionClaims;
use crate::services::auth::{verify_session_token, ACCESS_COOKIE};

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
        })
    }
}

/// Extractor that requires a valid session token.
///
/// Use this in handlers that require authentication:
/// ```ignore
/// async fn protected_handler(auth: SessionAuth) -> impl Responder {
///     // auth.claims contains the verified session claims
/// }
/// ```
pub struct SessionAuth {
    pub claims: SessionClaims,
}

impl FromRequest for SessionAuth {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let config = match req.app_data::<web::Data<Config>>() {
            Some(config) => config,
            None => {
                return ready(Err(AuthError {
                    message: "Internal configuration error".to_string(),
                }));
            }
        };

        // Authorization: Bearer takes precedence over the cookie
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
            .or_else(|| req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string()));

        let token = match token {
            Some(t) => t,
            None => {
                return ready(Err(AuthError {
                    message: "Missing session token. Log in first.".to_string(),
                }));
            }
        };

        match verify_session_token(&token, &config.session.secret) {
            Ok(claims) => ready(Ok(SessionAuth { claims })),
            Err(e) => ready(Err(AuthError { message: e })),
        }
    }
}
