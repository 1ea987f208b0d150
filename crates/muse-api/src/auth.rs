use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use muse_db::is_unique_violation;
use muse_db::models::UserRow;
use muse_types::api::{AuthResponse, Claims, LoginRequest, SignupRequest, UserResponse};

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::{AppState, non_empty, run_blocking};

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let (Some(name), Some(email), Some(password)) = (
        non_empty(req.name),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Please provide name, email, and password."));
    };
    let phone = non_empty(req.phone);

    let user = run_blocking(&state, move |db| {
        if db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("User with this email already exists.".into()));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let user = UserRow {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password: password_hash,
            phone,
            created_at: Utc::now(),
        };

        // A concurrent signup can still win the race for the same email.
        db.create_user(&user).map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("User with this email already exists.".into())
            } else {
                ApiError::Internal(e)
            }
        })?;

        Ok(user)
    })
    .await?;

    let token = create_token(&state, &user)?;
    info!("User {} registered ({})", user.id, user.email);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully!".into(),
            token,
            user: user_response(user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let (Some(email), Some(password)) =
        (non_empty(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::bad_request("Please provide email and password."));
    };

    let user = run_blocking(&state, move |db| {
        let invalid = || ApiError::Unauthorized("Invalid credentials.".into());
        let user = db.get_user_by_email(&email)?.ok_or_else(invalid)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", user.id, e))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid())?;

        Ok(user)
    })
    .await?;

    let token = create_token(&state, &user)?;

    Ok(Json(AuthResponse {
        message: "Logged in successfully!".into(),
        token,
        user: user_response(user),
    }))
}

pub async fn profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |db| {
        db.get_user_by_id(&claims.sub)?
            .ok_or_else(|| ApiError::not_found("User not found."))
    })
    .await?;

    Ok(Json(user_response(user)))
}

fn create_token(state: &AppState, user: &UserRow) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        iat: now.timestamp() as usize,
        exp: now
            .checked_add_signed(state.token_ttl)
            .ok_or_else(|| anyhow::anyhow!("token TTL {} is out of range", state.token_ttl))?
            .timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(anyhow::Error::from)?;

    Ok(token)
}

/// Checks signature and expiry. Expiry is exact: no clock-skew leeway.
pub fn verify_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

fn user_response(user: UserRow) -> UserResponse {
    UserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        phone: user.phone,
    }
}
