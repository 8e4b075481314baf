//! Session authentication routes.
//!
//! Implements a short-lived access token + refresh token pattern:
//! - Access token: HS256 JWT in `prs_session` HttpOnly cookie (default 15 min),
//!   also returned in the login body for SPA Authorization headers
//! - Refresh token: opaque token (SHA-256 hashed in DB) in `prs_refresh`
//!   HttpOnly cookie (default 7 days)
//!
//! Endpoints:
//! 1. POST /auth/register — Self-registration, always an unapproved general user
//! 2. POST /auth/login — Verify credentials, issue token pair
//! 3. POST /auth/refresh — Rotate: validate refresh token, issue new pair, revoke old
//! 4. GET /auth/me — Return current user from access token
//! 5. POST /auth/logout — Revoke refresh token in DB, clear both cookies

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db::{refresh_tokens, users, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, RegisterRequest, Role, SessionClaims, User, UserResponse};

/// Access token cookie name (short-lived JWT).
pub const ACCESS_COOKIE: &str = "prs_session";
/// Refresh token cookie name (long-lived opaque token).
const REFRESH_COOKIE: &str = "prs_refresh";
/// Session JWT issuer.
pub const SESSION_ISSUER: &str = "prs";

/// Configure auth routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(refresh)
        .service(get_current_user)
        .service(logout);
}

// ============================================================================
// Endpoints
// ============================================================================

/// Self-registration. Always creates an unapproved general user.
///
/// POST /api/v1/auth/register
#[post("/auth/register")]
pub async fn register(
    pool: web::Data<DbPool>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let user =
        crate::services::users::register_general_user(pool.connection(), body.into_inner())
            .await?;

    info!("General user registered: '{}' (id={})", user.username, user.id);

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Registration successful. Awaiting admin approval.",
        "user": UserResponse::from(user),
    })))
}

/// Verify credentials and issue a token pair.
///
/// POST /api/v1/auth/login
#[post("/auth/login")]
pub async fn login(
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let model = users::find_model_by_email(pool.connection(), &req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let password = SecretString::from(req.password);
    if crate::auth::password::verify_password(&password, &model.password_hash).is_err() {
        warn!("Login failed for '{}'", req.email);
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let user = users::model_to_user(model);

    if !user.is_active {
        return Err(AppError::Forbidden(
            "This account has been deactivated".to_string(),
        ));
    }

    // Self-registered accounts stay locked out until an admin approves them
    if user.role == Role::GeneralUser && !user.is_approved {
        return Err(AppError::Forbidden(
            "Account is awaiting admin approval".to_string(),
        ));
    }

    let session = issue_session(&config, pool.get_ref(), &user).await?;

    info!("Login: user='{}' (id={})", user.username, user.id);

    Ok(HttpResponse::Ok()
        .cookie(session.access_cookie)
        .cookie(session.refresh_cookie)
        .json(serde_json::json!({
            "token": session.access_token,
            "user": UserResponse::from(user),
        })))
}

/// Refresh the access token using the refresh token.
///
/// Rotates: old refresh token is revoked, new pair is issued.
///
/// POST /api/v1/auth/refresh
#[post("/auth/refresh")]
pub async fn refresh(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    // Read refresh token from cookie
    let refresh_token = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("No refresh token".to_string()))?;

    // Validate refresh token against DB
    let token_hash = refresh_tokens::hash_token(&refresh_token);
    let user_id = refresh_tokens::find_valid_by_hash(pool.connection(), &token_hash)
        .await?
        .ok_or_else(|| {
            warn!("Refresh: invalid or expired refresh token");
            AppError::Unauthorized("Invalid refresh token".to_string())
        })?;

    // Revoke the old refresh token (rotation)
    refresh_tokens::revoke_by_hash(pool.connection(), &token_hash).await?;

    // Fetch user from DB
    let user = users::find_by_id(pool.connection(), user_id)
        .await?
        .ok_or_else(|| {
            warn!("Refresh: user {} not found", user_id);
            AppError::Unauthorized("User not found".to_string())
        })?;

    let session = issue_session(&config, pool.get_ref(), &user).await?;

    Ok(HttpResponse::Ok()
        .cookie(session.access_cookie)
        .cookie(session.refresh_cookie)
        .json(serde_json::json!({ "token": session.access_token })))
}

/// Get current authenticated user from access token.
///
/// GET /api/v1/auth/me
#[get("/auth/me")]
pub async fn get_current_user(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let token = match req.cookie(ACCESS_COOKIE) {
        Some(c) => c.value().to_string(),
        None => return Ok(HttpResponse::Ok().json(serde_json::json!({ "user": null }))),
    };

    let claims = match verify_session_token(&token, &config.session.secret) {
        Ok(c) => c,
        Err(_) => return Ok(HttpResponse::Ok().json(serde_json::json!({ "user": null }))),
    };

    let user_id = match Uuid::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return Ok(HttpResponse::Ok().json(serde_json::json!({ "user": null }))),
    };

    let user = users::find_by_id(pool.connection(), user_id).await?;

    match user {
        Some(u) => {
            let response: UserResponse = u.into();
            Ok(HttpResponse::Ok().json(serde_json::json!({ "user": response })))
        }
        None => Ok(HttpResponse::Ok().json(serde_json::json!({ "user": null }))),
    }
}

/// Logout: revoke refresh token server-side, clear both cookies.
///
/// POST /api/v1/auth/logout
#[post("/auth/logout")]
pub async fn logout(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let is_prod = config.environment.is_production();

    // Revoke refresh token in DB if present
    if let Some(refresh_cookie) = req.cookie(REFRESH_COOKIE) {
        let token_hash = refresh_tokens::hash_token(refresh_cookie.value());
        let _ = refresh_tokens::revoke_by_hash(pool.connection(), &token_hash).await;
    }

    // Clear both cookies
    let clear_access = build_cookie(ACCESS_COOKIE, String::new(), SameSite::Lax, is_prod);
    let clear_refresh = build_cookie(REFRESH_COOKIE, String::new(), SameSite::Strict, is_prod);

    Ok(HttpResponse::Ok()
        .cookie(clear_access)
        .cookie(clear_refresh)
        .json(serde_json::json!({ "message": "Logged out" })))
}

// ============================================================================
// Helpers
// ============================================================================

/// An issued session: the access token and both cookies.
struct IssuedSession {
    access_token: String,
    access_cookie: Cookie<'static>,
    refresh_cookie: Cookie<'static>,
}

fn build_cookie(
    name: &'static str,
    value: String,
    same_site: SameSite,
    secure: bool,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(same_site);
    cookie.set_secure(secure);
    cookie
}

/// Issue an access token + refresh token pair.
///
/// - Access token: HS256 JWT in `prs_session` cookie
/// - Refresh token: opaque random token in `prs_refresh` cookie (hash stored in DB)
async fn issue_session(config: &Config, pool: &DbPool, user: &User) -> AppResult<IssuedSession> {
    let access_token = create_access_token(
        user,
        &config.session.secret,
        config.session.access_token_ttl_secs,
    )?;

    // Create refresh token and store hash in DB
    let raw_refresh_token = refresh_tokens::generate_token();
    let refresh_hash = refresh_tokens::hash_token(&raw_refresh_token);

    refresh_tokens::insert(
        pool.connection(),
        user.id,
        &refresh_hash,
        config.session.refresh_token_ttl_secs,
    )
    .await?;

    let is_prod = config.environment.is_production();
    let access_cookie = build_cookie(ACCESS_COOKIE, access_token.clone(), SameSite::Lax, is_prod);
    // Stricter SameSite for the refresh token
    let refresh_cookie = build_cookie(REFRESH_COOKIE, raw_refresh_token, SameSite::Strict, is_prod);

    Ok(IssuedSession {
        access_token,
        access_cookie,
        refresh_cookie,
    })
}

/// Create a short-lived access token JWT for a user.
pub fn create_access_token(
    user: &User,
    secret: &SecretString,
    ttl_secs: u64,
) -> AppResult<String> {
    let now = chrono::Utc::now();
    let exp = now + chrono::Duration::seconds(ttl_secs as i64);

    let claims = SessionClaims {
        sub: user.id.to_string(),
        iss: SESSION_ISSUER.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
        user_id: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.as_str().to_string(),
    };

    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::InvalidInput(format!("Failed to create access token: {}", e)))
}

/// Verify an access token JWT and return claims.
pub fn verify_session_token(token: &str, secret: &SecretString) -> Result<SessionClaims, String> {
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[SESSION_ISSUER]);
    validation.validate_aud = false;

    let token_data = decode::<SessionClaims>(token, &key, &validation)
        .map_err(|e| format!("Invalid session token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "staff@example.edu".to_string(),
            username: "staff1".to_string(),
            full_name: "Staff One".to_string(),
            role: Role::Staff,
            level: None,
            is_staff: true,
            is_active: true,
            is_approved: true,
            department_id: None,
            phone: None,
            institution_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let secret = SecretString::from("test-secret".to_string());
        let user = sample_user();

        let token = create_access_token(&user, &secret, 900).unwrap();
        let claims = verify_session_token(&token, &secret).unwrap();

        assert_eq!(claims.iss, SESSION_ISSUER);
        assert_eq!(claims.user_id, user.id.to_string());
        assert_eq!(claims.username, "staff1");
        assert_eq!(claims.role, "staff");
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let secret = SecretString::from("test-secret".to_string());
        let other = SecretString::from("other-secret".to_string());
        let token = create_access_token(&sample_user(), &secret, 900).unwrap();

        assert!(verify_session_token(&token, &other).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = SecretString::from("test-secret".to_string());
        // Expiry 2 minutes in the past defeats the default 60s leeway
        let now = chrono::Utc::now();
        let claims = SessionClaims {
            sub: "x".to_string(),
            iss: SESSION_ISSUER.to_string(),
            exp: (now.timestamp() - 120) as usize,
            iat: (now.timestamp() - 1000) as usize,
            user_id: Uuid::new_v4().to_string(),
            username: "x".to_string(),
            role: "student".to_string(),
        };
        let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        assert!(verify_session_token(&token, &secret).is_err());
    }
}
