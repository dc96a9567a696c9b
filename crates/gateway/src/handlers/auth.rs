//! Signup and token issuance handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extract::Payload;
use crate::AppState;
use yamdb_common::{
    db::{models::Role, NewUser},
    errors::{AppError, Result},
    mail, metrics,
    validation::validate_username,
};

/// Request to register (or to get a fresh confirmation code)
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

/// Request to exchange a confirmation code for an access token
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(length(min = 1))]
    pub confirmation_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Register an inactive account and email it a confirmation code.
///
/// Repeating a signup with the same (email, username) pair only sends a
/// new code. Either value used by a different account is a conflict.
pub async fn signup(
    State(state): State<AppState>,
    payload: Payload<SignupRequest>,
) -> Result<Json<SignupResponse>> {
    let request = payload.accept().await?;
    let repo = state.repo();

    let user = match repo
        .find_user_by_credentials(&request.email, &request.username)
        .await?
    {
        Some(existing) => {
            tracing::info!(user_id = existing.id, "Confirmation code re-requested");
            metrics::record_signup("resent");
            existing
        }
        None => {
            if repo
                .user_identity_taken(Some(&request.email), Some(&request.username), None)
                .await?
            {
                return Err(AppError::Conflict {
                    message: "Username or email is already registered to another account"
                        .to_string(),
                });
            }

            let user = repo
                .create_user(NewUser {
                    username: request.username,
                    email: request.email,
                    role: Role::User,
                    first_name: None,
                    last_name: None,
                    bio: None,
                    is_active: false,
                })
                .await?;

            tracing::info!(
                user_id = user.id,
                username = %user.username,
                "User registered"
            );
            metrics::record_signup("created");
            user
        }
    };

    let code = state.codes.make_code(&user);
    mail::send_confirmation_code(state.mailer.as_ref(), &user.email, &code).await;

    Ok(Json(SignupResponse {
        username: user.username,
        email: user.email,
    }))
}

/// Verify a confirmation code, activate the account and issue a JWT
pub async fn token(
    State(state): State<AppState>,
    payload: Payload<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    let request = payload.accept().await?;
    let repo = state.repo();

    let user = repo
        .find_user_by_username(&request.username)
        .await?
        .ok_or_else(|| AppError::not_found("User", &request.username))?;

    if !state.codes.check_code(&user, &request.confirmation_code) {
        return Err(AppError::invalid_field(
            "confirmation_code",
            "Invalid or expired confirmation code",
        ));
    }

    let user = repo.activate_user(user).await?;
    let token = state.jwt.generate_token(&user)?;

    tracing::info!(user_id = user.id, "Access token issued");
    metrics::record_token_issued();

    Ok(Json(TokenResponse { token }))
}
