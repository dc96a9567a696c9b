//! Title handlers

use axum::{
    extract::State,
    http::{Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use super::catalog::CatalogEntry;
use super::double_option;
use crate::extract::{Path, Payload, Query, Requester};
use crate::AppState;
use yamdb_common::{
    db::{NewTitle, Page, PageParams, Repository, TitleChanges, TitleFilter, TitleRecord},
    errors::{AppError, Result},
    permissions::Policy,
    validation::validate_year,
};

/// Read representation, also returned by every write
#[derive(Debug, Serialize, Deserialize)]
pub struct TitleResponse {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    /// Mean review score, `null` until the first review
    pub rating: Option<f64>,
    pub category: Option<CatalogEntry>,
    pub genre: Vec<CatalogEntry>,
}

impl From<TitleRecord> for TitleResponse {
    fn from(record: TitleRecord) -> Self {
        Self {
            id: record.title.id,
            name: record.title.name,
            year: record.title.year,
            description: record.title.description,
            rating: record.rating,
            category: record.category.map(CatalogEntry::from),
            genre: record.genres.into_iter().map(CatalogEntry::from).collect(),
        }
    }
}

/// Body of POST and PUT; category and genres are referenced by slug
#[derive(Debug, Deserialize, Validate)]
pub struct TitleRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,

    #[validate(custom(function = "validate_year"))]
    pub year: i32,

    pub description: Option<String>,

    pub category: Option<String>,

    pub genre: Vec<String>,
}

/// Body of PATCH; `null` clears description or category
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TitlePatch {
    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_year"))]
    pub year: Option<i32>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,

    pub genre: Option<Vec<String>>,
}

pub async fn list_titles(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Query(page): Query<PageParams>,
    Query(filter): Query<TitleFilter>,
) -> Result<Json<Page<TitleResponse>>> {
    Policy::catalog().check(&method, requester.user())?;

    let (limit, offset) = page.resolve(&state.config.pagination);
    let (titles, count) = state.repo().list_titles(&filter, offset, limit).await?;

    Ok(Json(Page::new(titles, count, limit, offset).map(TitleResponse::from)))
}

pub async fn get_title(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(title_id): Path<i32>,
) -> Result<Json<TitleResponse>> {
    Policy::catalog().check(&method, requester.user())?;

    let record = state
        .repo()
        .find_title(title_id)
        .await?
        .ok_or_else(|| AppError::not_found("Title", title_id))?;

    Ok(Json(record.into()))
}

pub async fn create_title(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    payload: Payload<TitleRequest>,
) -> Result<(StatusCode, Json<TitleResponse>)> {
    Policy::catalog().check(&method, requester.user())?;
    let request = payload.accept().await?;

    let repo = state.repo();
    let category_id = resolve_category(&repo, request.category.as_deref()).await?;
    let genre_ids = resolve_genres(&repo, &request.genre).await?;

    let record = repo
        .create_title(NewTitle {
            name: request.name,
            year: request.year,
            description: request.description,
            category_id,
            genre_ids,
        })
        .await?;

    tracing::info!(
        title_id = record.title.id,
        name = %record.title.name,
        genres = record.genres.len(),
        "Title created"
    );

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// PUT: every field is replaced, omitted optionals become empty
pub async fn replace_title(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(title_id): Path<i32>,
    payload: Payload<TitleRequest>,
) -> Result<Json<TitleResponse>> {
    Policy::catalog().check(&method, requester.user())?;
    let request = payload.accept().await?;

    let repo = state.repo();
    let existing = find_title(&repo, title_id).await?;
    let category_id = resolve_category(&repo, request.category.as_deref()).await?;
    let genre_ids = resolve_genres(&repo, &request.genre).await?;

    let changes = TitleChanges {
        name: Some(request.name),
        year: Some(request.year),
        description: Some(request.description),
        category_id: Some(category_id),
        genre_ids: Some(genre_ids),
    };
    let record = repo.update_title(existing.title, changes).await?;

    tracing::info!(title_id, "Title replaced");
    Ok(Json(record.into()))
}

pub async fn update_title(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(title_id): Path<i32>,
    payload: Payload<TitlePatch>,
) -> Result<Json<TitleResponse>> {
    Policy::catalog().check(&method, requester.user())?;
    let patch = payload.accept().await?;

    let repo = state.repo();
    let existing = find_title(&repo, title_id).await?;

    let category_id = match patch.category {
        Some(slug) => Some(resolve_category(&repo, slug.as_deref()).await?),
        None => None,
    };
    let genre_ids = match patch.genre {
        Some(slugs) => Some(resolve_genres(&repo, &slugs).await?),
        None => None,
    };

    let changes = TitleChanges {
        name: patch.name,
        year: patch.year,
        description: patch.description,
        category_id,
        genre_ids,
    };
    let record = repo.update_title(existing.title, changes).await?;

    tracing::info!(title_id, "Title updated");
    Ok(Json(record.into()))
}

pub async fn delete_title(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(title_id): Path<i32>,
) -> Result<StatusCode> {
    Policy::catalog().check(&method, requester.user())?;

    if !state.repo().delete_title(title_id).await? {
        return Err(AppError::not_found("Title", title_id));
    }

    tracing::info!(title_id, "Title deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_title(repo: &Repository, title_id: i32) -> Result<TitleRecord> {
    repo.find_title(title_id)
        .await?
        .ok_or_else(|| AppError::not_found("Title", title_id))
}

async fn resolve_category(repo: &Repository, slug: Option<&str>) -> Result<Option<i32>> {
    let Some(slug) = slug else {
        return Ok(None);
    };

    let category = repo.find_category_by_slug(slug).await?.ok_or_else(|| {
        AppError::invalid_field("category", format!("Unknown category slug: {}", slug))
    })?;
    Ok(Some(category.id))
}

/// Genre ids in request order, duplicates dropped; any unknown slug fails
async fn resolve_genres(repo: &Repository, slugs: &[String]) -> Result<Vec<i32>> {
    let mut unique: Vec<String> = Vec::with_capacity(slugs.len());
    for slug in slugs {
        if !unique.contains(slug) {
            unique.push(slug.clone());
        }
    }

    let known: HashMap<String, i32> = repo
        .find_genres_by_slugs(&unique)
        .await?
        .into_iter()
        .map(|genre| (genre.slug, genre.id))
        .collect();

    unique
        .iter()
        .map(|slug| {
            known.get(slug).copied().ok_or_else(|| {
                AppError::invalid_field("genre", format!("Unknown genre slug: {}", slug))
            })
        })
        .collect()
}
