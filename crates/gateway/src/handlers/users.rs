//! User administration and self-service profile handlers

use axum::{
    extract::State,
    http::{Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::SearchParams;
use crate::extract::{Path, Payload, Query, Requester};
use crate::AppState;
use yamdb_common::{
    db::{
        models::{Role, User},
        NewUser, Page, PageParams, UserChanges,
    },
    errors::{AppError, Result},
    permissions::Policy,
    validation::validate_username,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: Option<String>,

    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub role: Option<Role>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            bio: request.bio,
            role: request.role,
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
) -> Result<Json<Page<UserResponse>>> {
    Policy::user_admin().check(&method, requester.user())?;

    let (limit, offset) = page.resolve(&state.config.pagination);
    let (users, count) = state
        .repo()
        .list_users(search.search.as_deref(), offset, limit)
        .await?;

    Ok(Json(Page::new(users, count, limit, offset).map(UserResponse::from)))
}

pub async fn create_user(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    payload: Payload<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    Policy::user_admin().check(&method, requester.user())?;
    let request = payload.accept().await?;

    let repo = state.repo();
    if repo
        .user_identity_taken(Some(&request.email), Some(&request.username), None)
        .await?
    {
        return Err(AppError::Conflict {
            message: "A user with this username or email already exists".to_string(),
        });
    }

    let user = repo
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            role: request.role.unwrap_or_default(),
            first_name: request.first_name,
            last_name: request.last_name,
            bio: request.bio,
            is_active: true,
        })
        .await?;

    tracing::info!(
        user_id = user.id,
        username = %user.username,
        role = user.role.as_str(),
        "User created by admin"
    );

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_user(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>> {
    Policy::user_admin().check(&method, requester.user())?;

    let user = find_user(&state, &username).await?;
    Ok(Json(user.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(username): Path<String>,
    payload: Payload<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    Policy::user_admin().check(&method, requester.user())?;
    let request = payload.accept().await?;

    let user = find_user(&state, &username).await?;
    let user = apply_changes(&state, user, request.into()).await?;

    tracing::info!(user_id = user.id, "User updated by admin");
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    Policy::user_admin().check(&method, requester.user())?;

    let user = find_user(&state, &username).await?;
    state.repo().delete_user(user.id).await?;

    tracing::info!(user_id = user.id, username = %user.username, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// The requester's own profile
pub async fn get_me(method: Method, requester: Requester) -> Result<Json<UserResponse>> {
    Policy::self_service().check(&method, requester.user())?;

    let user = requester.0.ok_or_else(|| AppError::Unauthorized {
        message: "Authentication credentials were not provided".to_string(),
    })?;
    Ok(Json(user.into()))
}

/// Edit the requester's own profile; only admins may change their role
pub async fn update_me(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    payload: Payload<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    Policy::self_service().check(&method, requester.user())?;
    let request = payload.accept().await?;

    let user = requester.0.ok_or_else(|| AppError::Unauthorized {
        message: "Authentication credentials were not provided".to_string(),
    })?;

    let mut changes = UserChanges::from(request);
    if !user.is_admin() {
        changes.role = None;
    }

    let user = apply_changes(&state, user, changes).await?;

    tracing::info!(user_id = user.id, "Profile updated");
    Ok(Json(user.into()))
}

async fn find_user(state: &AppState, username: &str) -> Result<User> {
    state
        .repo()
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("User", username))
}

async fn apply_changes(state: &AppState, user: User, changes: UserChanges) -> Result<User> {
    let repo = state.repo();
    if repo
        .user_identity_taken(changes.email.as_deref(), changes.username.as_deref(), Some(user.id))
        .await?
    {
        return Err(AppError::Conflict {
            message: "A user with this username or email already exists".to_string(),
        });
    }

    repo.update_user(user, changes).await
}
