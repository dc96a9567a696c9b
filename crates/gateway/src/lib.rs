//! YaMDb API Gateway
//!
//! The HTTP surface of the review platform.
//! Handles:
//! - Signup and access token issuance
//! - Bearer authentication and access rules
//! - Catalog, review, comment and user endpoints
//! - Rate limiting and request metrics

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use yamdb_common::{
    auth::{ConfirmationCodes, JwtManager},
    config::AppConfig,
    db::{DbPool, Repository},
    errors::{AppError, Result},
    mail::Mailer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub codes: ConfirmationCodes,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Build the state; fails when no signing secret is configured
    pub fn new(config: AppConfig, db: DbPool, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let secret = config.jwt_secret().map_err(|e| AppError::Configuration {
            message: e.to_string(),
        })?;

        let jwt = Arc::new(JwtManager::new(secret, config.auth.jwt_expiration_secs));
        let codes = ConfirmationCodes::new(secret, config.auth.confirmation_code_ttl_secs)?;

        Ok(Self {
            config: Arc::new(config),
            db,
            jwt,
            codes,
            mailer,
        })
    }

    pub fn repo(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Signup & tokens
        .route("/auth/signup/", post(handlers::auth::signup))
        .route("/auth/token/", post(handlers::auth::token))

        // Users
        .route(
            "/users/",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/me/",
            get(handlers::users::get_me).patch(handlers::users::update_me),
        )
        .route(
            "/users/{username}/",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )

        // Categories & genres
        .route(
            "/categories/",
            get(handlers::catalog::list_categories).post(handlers::catalog::create_category),
        )
        .route("/categories/{slug}/", delete(handlers::catalog::delete_category))
        .route(
            "/genres/",
            get(handlers::catalog::list_genres).post(handlers::catalog::create_genre),
        )
        .route("/genres/{slug}/", delete(handlers::catalog::delete_genre))

        // Titles
        .route(
            "/titles/",
            get(handlers::titles::list_titles).post(handlers::titles::create_title),
        )
        .route(
            "/titles/{title_id}/",
            get(handlers::titles::get_title)
                .put(handlers::titles::replace_title)
                .patch(handlers::titles::update_title)
                .delete(handlers::titles::delete_title),
        )

        // Reviews
        .route(
            "/titles/{title_id}/reviews/",
            get(handlers::reviews::list_reviews).post(handlers::reviews::create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/",
            get(handlers::reviews::get_review)
                .put(handlers::reviews::replace_review)
                .patch(handlers::reviews::update_review)
                .delete(handlers::reviews::delete_review),
        )

        // Comments
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/",
            get(handlers::comments::list_comments).post(handlers::comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}/",
            get(handlers::comments::get_comment)
                .put(handlers::comments::replace_comment)
                .patch(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        )
        .route_layer(from_fn(middleware::metrics::track_metrics));

    let mut app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api/v1", api_routes);

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    let timeout =
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.config.request_timeout());

    // Compose the app
    app.layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}
