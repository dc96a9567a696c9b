//! Category and genre handlers
//!
//! Both resources share one shape (`{name, slug}`) and one policy: anyone
//! reads, admins write.

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
        models::{Category, Genre},
        Page, PageParams,
    },
    errors::{AppError, Result},
    permissions::Policy,
    validation::validate_slug,
};

/// Representation of a category or a genre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub slug: String,
}

impl From<Category> for CatalogEntry {
    fn from(category: Category) -> Self {
        Self {
            name: category.name,
            slug: category.slug,
        }
    }
}

impl From<Genre> for CatalogEntry {
    fn from(genre: Genre) -> Self {
        Self {
            name: genre.name,
            slug: genre.slug,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CatalogEntryRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,

    #[validate(length(min = 1, max = 50), custom(function = "validate_slug"))]
    pub slug: String,
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
) -> Result<Json<Page<CatalogEntry>>> {
    Policy::catalog().check(&method, requester.user())?;

    let (limit, offset) = page.resolve(&state.config.pagination);
    let (categories, count) = state
        .repo()
        .list_categories(search.search.as_deref(), offset, limit)
        .await?;

    Ok(Json(Page::new(categories, count, limit, offset).map(CatalogEntry::from)))
}

pub async fn create_category(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    payload: Payload<CatalogEntryRequest>,
) -> Result<(StatusCode, Json<CatalogEntry>)> {
    Policy::catalog().check(&method, requester.user())?;
    let request = payload.accept().await?;

    let repo = state.repo();
    if repo.find_category_by_slug(&request.slug).await?.is_some() {
        return Err(AppError::Conflict {
            message: format!("Category with slug '{}' already exists", request.slug),
        });
    }

    let category = repo.create_category(request.name, request.slug).await?;

    tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category.into())))
}

pub async fn delete_category(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(slug): Path<String>,
) -> Result<StatusCode> {
    Policy::catalog().check(&method, requester.user())?;

    let repo = state.repo();
    let category = repo
        .find_category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("Category", &slug))?;
    repo.delete_category(category.id).await?;

    tracing::info!(category_id = category.id, slug = %slug, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Genres
// ============================================================================

pub async fn list_genres(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
) -> Result<Json<Page<CatalogEntry>>> {
    Policy::catalog().check(&method, requester.user())?;

    let (limit, offset) = page.resolve(&state.config.pagination);
    let (genres, count) = state
        .repo()
        .list_genres(search.search.as_deref(), offset, limit)
        .await?;

    Ok(Json(Page::new(genres, count, limit, offset).map(CatalogEntry::from)))
}

pub async fn create_genre(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    payload: Payload<CatalogEntryRequest>,
) -> Result<(StatusCode, Json<CatalogEntry>)> {
    Policy::catalog().check(&method, requester.user())?;
    let request = payload.accept().await?;

    let repo = state.repo();
    if repo.find_genre_by_slug(&request.slug).await?.is_some() {
        return Err(AppError::Conflict {
            message: format!("Genre with slug '{}' already exists", request.slug),
        });
    }

    let genre = repo.create_genre(request.name, request.slug).await?;

    tracing::info!(genre_id = genre.id, slug = %genre.slug, "Genre created");
    Ok((StatusCode::CREATED, Json(genre.into())))
}

pub async fn delete_genre(
    State(state): State<AppState>,
    method: Method,
    requester: Requester,
    Path(slug): Path<String>,
) -> Result<StatusCode> {
    Policy::catalog().check(&method, requester.user())?;

    let repo = state.repo();
    let genre = repo
        .find_genre_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("Genre", &slug))?;
    repo.delete_genre(genre.id).await?;

    tracing::info!(genre_id = genre.id, slug = %slug, "Genre deleted");
    Ok(StatusCode::NO_CONTENT)
}
