//! Auth API routes
//!
//! `POST /signup`, `POST /login` and `GET /verify`, nested under `/api/auth`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{bearer_token, hash_password, issue_token, verify_password, verify_token};
use crate::db::{NewUser, UserProfile, UserRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_NAME_LEN: usize = 255;
const MAX_REGISTRATION_NO_LEN: usize = 100;

/// Create the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/verify", get(verify))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub registration_no: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of a successful signup or login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserProfile,
}

/// Email and password, both required and non-empty
fn credentials(email: Option<String>, password: Option<String>) -> Result<(String, String)> {
    match (
        email.filter(|e| !e.is_empty()),
        password.filter(|p| !p.is_empty()),
    ) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        )),
    }
}

async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    let (email, password) = credentials(req.email, req.password)?;

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    let name = req.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(
            "Name is too long (max 255 characters)".to_string(),
        ));
    }

    let registration_no = req.registration_no.as_deref().filter(|r| !r.is_empty());
    if registration_no.is_some_and(|r| r.chars().count() > MAX_REGISTRATION_NO_LEN) {
        return Err(AppError::BadRequest(
            "Registration number is too long (max 100 characters)".to_string(),
        ));
    }

    let repo = UserRepository::new(state.db());
    if repo.email_exists(&email).await? {
        return Err(AppError::Conflict("This email is already taken.".to_string()));
    }

    let auth = &state.config().auth;
    let password_hash = hash_password(&password, auth.bcrypt_cost).await?;
    let user = repo
        .create(&NewUser {
            email: &email,
            password_hash: &password_hash,
            name,
            registration_no,
        })
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                AppError::Conflict("This email is already taken.".to_string())
            } else {
                e
            }
        })?;

    let token = issue_token(user.id, &user.email, &auth.jwt_secret, auth.token_ttl_days)?;
    tracing::info!(user_id = user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            token,
            user: UserProfile::from(&user),
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let Json(req) = payload?;
    let (email, password) = credentials(req.email, req.password)?;

    let user = UserRepository::new(state.db())
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("No account found with this email.".to_string()))?;

    if !verify_password(&password, &user.password_hash).await? {
        return Err(AppError::Unauthorized("Incorrect password.".to_string()));
    }

    let auth = &state.config().auth;
    let token = issue_token(user.id, &user.email, &auth.jwt_secret, auth.token_ttl_days)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(&user),
    }))
}

async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<VerifyResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    let claims = verify_token(token, &state.config().auth.jwt_secret)?;

    let user = UserRepository::new(state.db())
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    Ok(Json(VerifyResponse {
        valid: true,
        user: UserProfile::from(&user),
    }))
}
