//! Review handlers, nested under a title

use axum::{
    extract::State,
    http::{Method, StatusCode},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extract::{Path, Payload, Query, Requester};
use crate::AppState;
use yamdb_common::{
    db::{
        models::{Review, User},
        NewReview, Page, PageParams, Repository,
    },
    errors::{AppError, Result},
    metrics,
    permissions::Policy,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: i32,
    /// Author's username
    pub author: String,
    pub text: String,
    pub score: i32,
    pub pub_date: DateTime<FixedOffset>,
}

impl ReviewResponse {
    fn new(review: Review, author: &User) -> Self {
        Self {
            id: review.id,
            author: author.username.clone(),
            text: review.text,
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(length(min = 1))]
    pub text: String,

    #[validate(range(min = 1, max = 10))]
    pub score: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReviewPatch {
    #[validate(length(min = 1))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 10))]
    pub score: Option<i32>,
}

pub async fn list_reviews(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(title_id): Path<i32>,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<ReviewResponse>>> {
    Policy::authored_content().check(&method, requester.user())?;

    let repo = state.repo();
    require_title(&repo, title_id).await?;

    let (limit, offset) = page.resolve(&state.config.pagination);
    let (reviews, count) = repo.list_reviews(title_id, offset, limit).await?;

    Ok(Json(
        Page::new(reviews, count, limit, offset)
            .map(|(review, author)| ReviewResponse::new(review, &author)),
    ))
}

/// One review per author and title; a second one is a conflict
pub async fn create_review(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(title_id): Path<i32>,
    payload: Payload<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    Policy::authored_content().check(&method, requester.user())?;
    let request = payload.accept().await?;
    let author = requester.0.ok_or_else(|| AppError::Unauthorized {
        message: "Authentication credentials were not provided".to_string(),
    })?;

    let repo = state.repo();
    require_title(&repo, title_id).await?;

    if repo.has_reviewed(author.id, title_id).await? {
        return Err(AppError::Conflict {
            message: "You have already reviewed this title".to_string(),
        });
    }

    let review = repo
        .create_review(NewReview {
            title_id,
            author_id: author.id,
            text: request.text,
            score: request.score,
        })
        .await?;

    tracing::info!(
        review_id = review.id,
        title_id,
        author_id = author.id,
        score = review.score,
        "Review created"
    );
    metrics::record_review_created();

    Ok((StatusCode::CREATED, Json(ReviewResponse::new(review, &author))))
}

pub async fn get_review(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ReviewResponse>> {
    Policy::authored_content().check(&method, requester.user())?;

    let (review, author) = find_review(&state.repo(), title_id, review_id).await?;
    Ok(Json(ReviewResponse::new(review, &author)))
}

pub async fn replace_review(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id)): Path<(i32, i32)>,
    payload: Payload<ReviewRequest>,
) -> Result<Json<ReviewResponse>> {
    let (review, author) =
        editable_review(&state, &method, &requester, title_id, review_id).await?;
    let request = payload.accept().await?;

    let review = state
        .repo()
        .update_review(review, Some(request.text), Some(request.score))
        .await?;

    tracing::info!(review_id, title_id, "Review replaced");
    Ok(Json(ReviewResponse::new(review, &author)))
}

pub async fn update_review(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id)): Path<(i32, i32)>,
    payload: Payload<ReviewPatch>,
) -> Result<Json<ReviewResponse>> {
    let (review, author) =
        editable_review(&state, &method, &requester, title_id, review_id).await?;
    let patch = payload.accept().await?;

    let review = state
        .repo()
        .update_review(review, patch.text, patch.score)
        .await?;

    tracing::info!(review_id, title_id, "Review updated");
    Ok(Json(ReviewResponse::new(review, &author)))
}

pub async fn delete_review(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<StatusCode> {
    let policy = Policy::authored_content();
    policy.check(&method, requester.user())?;

    let repo = state.repo();
    let (review, _) = find_review(&repo, title_id, review_id).await?;
    policy.check_object(&method, requester.user(), &review)?;

    repo.delete_review(review.id).await?;

    tracing::info!(review_id, title_id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// The review with its author, once the requester may write to it
async fn editable_review(
    state: &AppState,
    method: &Method,
    requester: &Requester,
    title_id: i32,
    review_id: i32,
) -> Result<(Review, User)> {
    let policy = Policy::authored_content();
    policy.check(method, requester.user())?;

    let (review, author) = find_review(&state.repo(), title_id, review_id).await?;
    policy.check_object(method, requester.user(), &review)?;
    Ok((review, author))
}

pub(crate) async fn require_title(repo: &Repository, title_id: i32) -> Result<()> {
    if repo.title_exists(title_id).await? {
        Ok(())
    } else {
        Err(AppError::not_found("Title", title_id))
    }
}

/// The review, only when it belongs to the title
pub(crate) async fn find_review(
    repo: &Repository,
    title_id: i32,
    review_id: i32,
) -> Result<(Review, User)> {
    repo.find_review(title_id, review_id)
        .await?
        .ok_or_else(|| AppError::not_found("Review", review_id))
}
