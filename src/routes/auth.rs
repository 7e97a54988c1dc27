/// Authentication routes
///
/// Login, logout, token refresh, and current-user lookup. The refresh
/// token travels in an HTTP-only Secure cookie; response bodies carry only
/// the access token.

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, Claims, TokenPair, STORED_REFRESH_TOKEN_TTL_DAYS};
use crate::domain::PublicUser;
use crate::error::AppError;
use crate::validators::{is_valid_password_input, is_valid_token_input, is_valid_username};

const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(|ip| ip.to_string())
}

fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn refresh_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token.to_string())
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::days(STORED_REFRESH_TOKEN_TTL_DAYS))
        .finish()
}

fn cleared_refresh_cookie() -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, "")
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::ZERO)
        .finish()
}

/// POST /auth/login
///
/// # Errors
/// - 400: malformed username/password fields
/// - 401: unknown username, wrong password, or inactive account
///   (identical body for the first two, preventing username enumeration)
/// - 423: account locked; `locked_until` carried in the error body
pub async fn login(
    form: web::Json<LoginRequest>,
    req: HttpRequest,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let username = is_valid_username(&form.username)?;
    is_valid_password_input(&form.password)?;

    let outcome = service
        .login(&username, &form.password, client_ip(&req), user_agent(&req))
        .await?;

    let TokenPair {
        access_token,
        refresh_token,
        expires_in,
        token_type,
    } = outcome.tokens;

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(&refresh_token))
        .json(LoginResponse {
            user: outcome.user,
            access_token,
            token_type,
            expires_in,
        }))
}

/// POST /auth/logout
///
/// # Errors
/// - 400: missing/malformed refresh_token field
/// - 401: unknown, revoked, expired, or non-refresh token
pub async fn logout(
    form: web::Json<LogoutRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    is_valid_token_input(&form.refresh_token)?;

    let message = service.logout(&form.refresh_token).await?;

    Ok(HttpResponse::Ok()
        .cookie(cleared_refresh_cookie())
        .json(LogoutResponse { message }))
}

/// POST /auth/refresh
///
/// Rotates the presented refresh token; the replacement travels back in
/// the cookie while the body carries the new access token.
///
/// # Errors
/// - 400: missing/malformed refresh_token field
/// - 401: unknown, revoked, expired, or non-refresh token; inactive account
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    req: HttpRequest,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    is_valid_token_input(&form.refresh_token)?;

    let outcome = service
        .refresh(&form.refresh_token, client_ip(&req), user_agent(&req))
        .await?;

    let TokenPair {
        access_token,
        refresh_token,
        expires_in,
        token_type,
    } = outcome.tokens;

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(&refresh_token))
        .json(RefreshResponse {
            access_token,
            token_type,
            expires_in,
        }))
}

/// GET /api/me
///
/// Requires a valid Bearer access token; claims are injected by the JWT
/// middleware.
pub async fn current_user(
    claims: web::ReqData<Claims>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user = service.current_user(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}
