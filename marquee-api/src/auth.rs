use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use marquee_domain::User;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SignupRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct SignupResponse {
    user_id: uuid::Uuid,
    username: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: UserView,
}

#[derive(Debug, Serialize)]
struct UserView {
    id: uuid::Uuid,
    username: String,
    email: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/signup", post(signup))
        .route("/v1/auth/login", post(login))
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::ValidationError("username must not be empty".to_string()));
    }
    if !req.email.contains('@') {
        return Err(AppError::ValidationError("email address is invalid".to_string()));
    }
    if req.password.len() < state.auth.min_password_length {
        return Err(AppError::ValidationError(format!(
            "password must be at least {} characters long",
            state.auth.min_password_length
        )));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let user = User::new(req.username, req.email, password_hash);
    state.users.create(&user).await.map_err(|e| match e {
        marquee_domain::StoreError::Duplicate(_) => {
            AppError::ValidationError("username is already taken".to_string())
        }
        other => other.into(),
    })?;

    info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id,
            username: user.username,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or_else(|| AppError::ValidationError("invalid credentials".to_string()))?;

    let verified = verify_password(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !verified {
        return Err(AppError::ValidationError("invalid credentials".to_string()));
    }

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        user: UserView {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}

/// Argon2id with a random salt, stored in PHC string format.
fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn token_round_trips_through_the_middleware_decoder() {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let secret = "test-secret";
        let user_id = uuid::Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            username: "ada".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.user_id().unwrap(), user_id);
        assert_eq!(decoded.claims.username, "ada");
    }
}
