//! Request extractors
//!
//! - [`Requester`]: the optional authenticated user behind a request
//! - [`Payload`]: a JSON body, decoded and validated once access is granted
//! - [`Query`] / [`Path`]: axum's extractors with rejections in the API
//!   error format

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::marker::PhantomData;
use validator::Validate;
use yamdb_common::{
    auth::extract_bearer,
    db::models::User,
    errors::{AppError, Result},
};

use crate::AppState;

/// The user a request acts as, `None` for anonymous requests.
///
/// A missing `Authorization` header means anonymous. A header that is
/// present but unusable (bad scheme, invalid or expired token, unknown or
/// inactive account) rejects the request with 401.
#[derive(Debug, Clone)]
pub struct Requester(pub Option<User>);

impl Requester {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for Requester {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Requester(None));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(extract_bearer)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Malformed Authorization header".to_string(),
            })?;

        let claims = state.jwt.validate_token(token)?;
        let user = state
            .repo()
            .find_user_by_id(claims.user_id()?)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::Unauthorized {
                message: "User not found or inactive".to_string(),
            })?;

        Ok(Requester(Some(user)))
    }
}

/// JSON request body of type `T`.
///
/// Extraction only takes hold of the request. The body is read, decoded and
/// run through its `validator` rules by [`Payload::accept`], which handlers
/// call after their access checks so a denied request never reports body
/// errors.
pub struct Payload<T> {
    request: Request,
    _body: PhantomData<fn() -> T>,
}

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(request: Request, _state: &S) -> std::result::Result<Self, Infallible> {
        Ok(Payload {
            request,
            _body: PhantomData,
        })
    }
}

impl<T> Payload<T>
where
    T: DeserializeOwned + Validate,
{
    pub async fn accept(self) -> Result<T> {
        let Json(value) = Json::<T>::from_request(self.request, &())
            .await
            .map_err(|rejection| AppError::Validation {
                message: rejection.body_text(),
                details: None,
            })?;

        value.validate()?;
        Ok(value)
    }
}

/// Query string parameters; a malformed query is a 400
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation {
                message: rejection.body_text(),
                details: None,
            })?;
        Ok(Query(value))
    }
}

/// Path parameters; a segment that does not parse names no resource, so 404
#[derive(Debug, Clone, Copy)]
pub struct Path<T>(pub T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Unparseable path parameters");
                Err(AppError::not_found("Resource", parts.uri.path()))
            }
        }
    }
}
