//! Comment handlers, nested under a title's review

use axum::{
    extract::State,
    http::{Method, StatusCode},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::reviews::find_review;
use crate::extract::{Path, Payload, Query, Requester};
use crate::AppState;
use yamdb_common::{
    db::{
        models::{Comment, User},
        NewComment, Page, PageParams,
    },
    errors::{AppError, Result},
    metrics,
    permissions::Policy,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i32,
    /// Id of the review the comment belongs to
    pub review: i32,
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<FixedOffset>,
}

impl CommentResponse {
    fn new(comment: Comment, author: &User) -> Self {
        Self {
            id: comment.id,
            review: comment.review_id,
            author: author.username.clone(),
            text: comment.text,
            pub_date: comment.pub_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CommentPatch {
    #[validate(length(min = 1))]
    pub text: Option<String>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<CommentResponse>>> {
    Policy::authored_content().check(&method, requester.user())?;

    let repo = state.repo();
    let (review, _) = find_review(&repo, title_id, review_id).await?;

    let (limit, offset) = page.resolve(&state.config.pagination);
    let (comments, count) = repo.list_comments(review.id, offset, limit).await?;

    Ok(Json(
        Page::new(comments, count, limit, offset)
            .map(|(comment, author)| CommentResponse::new(comment, &author)),
    ))
}

pub async fn create_comment(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id)): Path<(i32, i32)>,
    payload: Payload<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    Policy::authored_content().check(&method, requester.user())?;
    let request = payload.accept().await?;
    let author = requester.0.ok_or_else(|| AppError::Unauthorized {
        message: "Authentication credentials were not provided".to_string(),
    })?;

    let repo = state.repo();
    let (review, _) = find_review(&repo, title_id, review_id).await?;

    let comment = repo
        .create_comment(NewComment {
            review_id: review.id,
            author_id: author.id,
            text: request.text,
        })
        .await?;

    tracing::info!(
        comment_id = comment.id,
        review_id,
        author_id = author.id,
        "Comment created"
    );
    metrics::record_comment_created();

    Ok((StatusCode::CREATED, Json(CommentResponse::new(comment, &author))))
}

pub async fn get_comment(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<Json<CommentResponse>> {
    Policy::authored_content().check(&method, requester.user())?;

    let (comment, author) = find_comment(&state, title_id, review_id, comment_id).await?;
    Ok(Json(CommentResponse::new(comment, &author)))
}

pub async fn replace_comment(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
    payload: Payload<CommentRequest>,
) -> Result<Json<CommentResponse>> {
    let (comment, author) =
        editable_comment(&state, &method, &requester, (title_id, review_id, comment_id)).await?;
    let request = payload.accept().await?;

    let comment = state.repo().update_comment(comment, Some(request.text)).await?;

    tracing::info!(comment_id, review_id, "Comment replaced");
    Ok(Json(CommentResponse::new(comment, &author)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
    payload: Payload<CommentPatch>,
) -> Result<Json<CommentResponse>> {
    let (comment, author) =
        editable_comment(&state, &method, &requester, (title_id, review_id, comment_id)).await?;
    let patch = payload.accept().await?;

    let comment = state.repo().update_comment(comment, patch.text).await?;

    tracing::info!(comment_id, review_id, "Comment updated");
    Ok(Json(CommentResponse::new(comment, &author)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<StatusCode> {
    let policy = Policy::authored_content();
    policy.check(&method, requester.user())?;

    let (comment, _) = find_comment(&state, title_id, review_id, comment_id).await?;
    policy.check_object(&method, requester.user(), &comment)?;

    state.repo().delete_comment(comment.id).await?;

    tracing::info!(comment_id, review_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// The comment with its author, once the requester may write to it
async fn editable_comment(
    state: &AppState,
    method: &Method,
    requester: &Requester,
    (title_id, review_id, comment_id): (i32, i32, i32),
) -> Result<(Comment, User)> {
    let policy = Policy::authored_content();
    policy.check(method, requester.user())?;

    let (comment, author) = find_comment(state, title_id, review_id, comment_id).await?;
    policy.check_object(method, requester.user(), &comment)?;
    Ok((comment, author))
}

/// Resolve the comment through both path ids; any mismatch is a 404
async fn find_comment(
    state: &AppState,
    title_id: i32,
    review_id: i32,
    comment_id: i32,
) -> Result<(Comment, User)> {
    let repo = state.repo();
    let (review, _) = find_review(&repo, title_id, review_id).await?;

    repo.find_comment(review.id, comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment", comment_id))
}
