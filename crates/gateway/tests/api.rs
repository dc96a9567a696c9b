//! End-to-end tests driving the router against an in-memory database

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use yamdb_common::{
    config::AppConfig,
    db::{models::Role, models::User, DbPool, NewTitle, NewUser, Repository},
    mail::MemoryMailer,
};
use yamdb_gateway::{create_router, AppState};

struct TestApp {
    router: Router,
    state: AppState,
    mailer: MemoryMailer,
}

impl TestApp {
    async fn new() -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let conn = Database::connect(opts).await.unwrap();

        let db = DbPool::from_connection(conn);
        db.migrate().await.unwrap();

        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some("integration-secret".into());
        config.rate_limit.enabled = false;

        let mailer = MemoryMailer::new();
        let state = AppState::new(config, db, Arc::new(mailer.clone())).unwrap();

        Self {
            router: create_router(state.clone()),
            state,
            mailer,
        }
    }

    fn repo(&self) -> Repository {
        self.state.repo()
    }

    async fn user(&self, username: &str, role: Role) -> (User, String) {
        let user = self
            .repo()
            .create_user(NewUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                role,
                first_name: None,
                last_name: None,
                bio: None,
                is_active: true,
            })
            .await
            .unwrap();
        let token = self.state.jwt.generate_token(&user).unwrap();
        (user, token)
    }

    async fn title(&self, name: &str) -> i32 {
        self.repo()
            .create_title(NewTitle {
                name: name.into(),
                year: 1999,
                description: None,
                category_id: None,
                genre_ids: Vec::new(),
            })
            .await
            .unwrap()
            .title
            .id
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn last_code(&self) -> String {
        let sent = self.mailer.sent();
        let body = &sent.last().expect("a confirmation email").body;
        body.rsplit(' ').next().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"]["status"], "up");
}

#[tokio::test]
async fn test_signup_token_and_profile() {
    let app = TestApp::new().await;
    let signup = json!({"username": "reader", "email": "reader@example.com"});

    let (status, body) = app
        .send(Method::POST, "/api/v1/auth/signup/", None, Some(signup))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"username": "reader", "email": "reader@example.com"}));
    assert_eq!(app.mailer.sent()[0].to, "reader@example.com");

    // Inactive until the code is exchanged
    let pending = app.repo().find_user_by_username("reader").await.unwrap().unwrap();
    assert!(!pending.is_active);

    let wrong = json!({"username": "reader", "confirmation_code": "0-deadbeef"});
    let (status, _) = app
        .send(Method::POST, "/api/v1/auth/token/", None, Some(wrong))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let code = app.last_code();
    let right = json!({"username": "reader", "confirmation_code": code});
    let (status, body) = app
        .send(Method::POST, "/api/v1/auth/token/", None, Some(right.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let active = app.repo().find_user_by_username("reader").await.unwrap().unwrap();
    assert!(active.is_active);

    // Activation invalidates the code
    let (status, _) = app
        .send(Method::POST, "/api/v1/auth/token/", None, Some(right))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(Method::GET, "/api/v1/users/me/", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "reader");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = TestApp::new().await;

    for body in [
        json!({"username": "me", "email": "me@example.com"}),
        json!({"username": "bad name", "email": "bad@example.com"}),
        json!({"username": "reader", "email": "not-an-email"}),
        json!({"username": "reader"}),
    ] {
        let (status, _) = app
            .send(Method::POST, "/api/v1/auth/signup/", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_repeated_signup_resends_code() {
    let app = TestApp::new().await;
    let signup = json!({"username": "reader", "email": "reader@example.com"});

    for _ in 0..2 {
        let (status, _) = app
            .send(Method::POST, "/api/v1/auth/signup/", None, Some(signup.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.mailer.sent().len(), 2);
    let (users, count) = app.repo().list_users(Some("reader"), 0, 10).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(users[0].email, "reader@example.com");
}

#[tokio::test]
async fn test_signup_with_taken_identity() {
    let app = TestApp::new().await;
    app.user("reader", Role::User).await;

    let same_email = json!({"username": "other", "email": "reader@example.com"});
    let (status, body) = app
        .send(Method::POST, "/api/v1/auth/signup/", None, Some(same_email))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let same_username = json!({"username": "reader", "email": "other@example.com"});
    let (status, _) = app
        .send(Method::POST, "/api/v1/auth/signup/", None, Some(same_username))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_for_unknown_user() {
    let app = TestApp::new().await;
    let body = json!({"username": "ghost", "confirmation_code": "abc-123"});

    let (status, _) = app
        .send(Method::POST, "/api/v1/auth/token/", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(Method::GET, "/api/v1/titles/", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::GET, "/api/v1/titles/", None, None).await;
    assert_eq!(status, StatusCode::OK);

    // Token of an account that no longer exists
    let (user, token) = app.user("gone", Role::User).await;
    app.repo().delete_user(user.id).await.unwrap();
    let (status, _) = app.send(Method::GET, "/api/v1/titles/", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Token of an account that never confirmed its email
    let pending = app
        .repo()
        .create_user(NewUser {
            username: "pending".into(),
            email: "pending@example.com".into(),
            role: Role::User,
            first_name: None,
            last_name: None,
            bio: None,
            is_active: false,
        })
        .await
        .unwrap();
    let token = app.state.jwt.generate_token(&pending).unwrap();
    let (status, _) = app.send(Method::GET, "/api/v1/titles/", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_write_permissions() {
    let app = TestApp::new().await;
    let (_, user_token) = app.user("reader", Role::User).await;
    let (_, admin_token) = app.user("boss", Role::Admin).await;
    let category = json!({"name": "Films", "slug": "films"});

    let (status, _) = app
        .send(Method::POST, "/api/v1/categories/", None, Some(category.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::POST, "/api/v1/categories/", Some(user_token.as_str()), Some(category.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "PERMISSION_DENIED");

    let (status, body) = app
        .send(Method::POST, "/api/v1/categories/", Some(admin_token.as_str()), Some(category.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, category);

    let (status, _) = app
        .send(Method::POST, "/api/v1/categories/", Some(admin_token.as_str()), Some(category))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(Method::GET, "/api/v1/categories/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["next"], Value::Null);

    let bad_slug = json!({"name": "Bad", "slug": "no spaces"});
    let (status, _) = app
        .send(Method::POST, "/api/v1/genres/", Some(admin_token.as_str()), Some(bad_slug))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::DELETE, "/api/v1/categories/films/", Some(admin_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send(Method::DELETE, "/api/v1/categories/films/", Some(admin_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_title_lifecycle_and_rating() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (_, alice) = app.user("alice", Role::User).await;
    let (_, bob) = app.user("bob", Role::User).await;

    for (path, name, slug) in [
        ("/api/v1/categories/", "Books", "books"),
        ("/api/v1/genres/", "Drama", "drama"),
        ("/api/v1/genres/", "Comedy", "comedy"),
    ] {
        let (status, _) = app
            .send(Method::POST, path, Some(admin.as_str()), Some(json!({"name": name, "slug": slug})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let new_title = json!({
        "name": "War and Peace",
        "year": 1869,
        "category": "books",
        "genre": ["drama", "comedy"],
    });
    let (status, body) = app
        .send(Method::POST, "/api/v1/titles/", Some(admin.as_str()), Some(new_title))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["rating"], Value::Null);
    assert_eq!(body["category"], json!({"name": "Books", "slug": "books"}));
    assert_eq!(body["genre"].as_array().unwrap().len(), 2);
    let id = body["id"].as_i64().unwrap();

    app.title("Untouched").await;

    for (token, score) in [(&alice, 10), (&bob, 7)] {
        let (status, _) = app
            .send(
                Method::POST,
                &format!("/api/v1/titles/{id}/reviews/"),
                Some(token.as_str()),
                Some(json!({"text": "Read it", "score": score})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.send(Method::GET, &format!("/api/v1/titles/{id}/"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 8.5);

    let (_, body) = app.send(Method::GET, "/api/v1/titles/?genre=drama", None, None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "War and Peace");

    let (_, body) = app.send(Method::GET, "/api/v1/titles/?name=Untou", None, None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["rating"], Value::Null);

    let (_, body) = app.send(Method::GET, "/api/v1/titles/?limit=1", None, None).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["next"], 1);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let patch = json!({"genre": ["comedy"], "category": null});
    let (status, body) = app
        .send(Method::PATCH, &format!("/api/v1/titles/{id}/"), Some(admin.as_str()), Some(patch))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], Value::Null);
    assert_eq!(body["genre"], json!([{"name": "Comedy", "slug": "comedy"}]));
    assert_eq!(body["name"], "War and Peace");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/titles/{id}/"), Some(admin.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/titles/{id}/reviews/"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_title_validation() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;

    let future = json!({"name": "Tomorrow", "year": 9999, "genre": []});
    let (status, body) = app
        .send(Method::POST, "/api/v1/titles/", Some(admin.as_str()), Some(future))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["year"].is_array());

    let unknown_genre = json!({"name": "Lost", "year": 2000, "genre": ["missing"]});
    let (status, body) = app
        .send(Method::POST, "/api/v1/titles/", Some(admin.as_str()), Some(unknown_genre))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["genre"].is_array());

    let unknown_category = json!({"name": "Lost", "year": 2000, "category": "nope", "genre": []});
    let (status, _) = app
        .send(Method::POST, "/api/v1/titles/", Some(admin.as_str()), Some(unknown_category))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_one_review_per_title() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice", Role::User).await;
    let id = app.title("Dune").await;
    let uri = format!("/api/v1/titles/{id}/reviews/");

    let (status, body) = app
        .send(Method::POST, &uri, Some(alice.as_str()), Some(json!({"text": "Spice", "score": 9})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author"], "alice");

    let (status, body) = app
        .send(Method::POST, &uri, Some(alice.as_str()), Some(json!({"text": "Again", "score": 3})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, bob) = app.user("bob", Role::User).await;
    for score in [0, 11] {
        let (status, _) = app
            .send(Method::POST, &uri, Some(bob.as_str()), Some(json!({"text": "Meh", "score": score})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app
        .send(Method::POST, "/api/v1/titles/999/reviews/", Some(bob.as_str()), Some(json!({"text": "?", "score": 5})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_edit_permissions() {
    let app = TestApp::new().await;
    let (_, author) = app.user("author", Role::User).await;
    let (_, stranger) = app.user("stranger", Role::User).await;
    let (_, moderator) = app.user("moderator", Role::Moderator).await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let id = app.title("Solaris").await;

    let (_, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/titles/{id}/reviews/"),
            Some(author.as_str()),
            Some(json!({"text": "Ocean", "score": 8})),
        )
        .await;
    let review = format!("/api/v1/titles/{id}/reviews/{}/", body["id"]);

    let (status, _) = app
        .send(Method::PATCH, &review, None, Some(json!({"score": 1})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::PATCH, &review, Some(stranger.as_str()), Some(json!({"score": 1})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::DELETE, &review, Some(stranger.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::PATCH, &review, Some(author.as_str()), Some(json!({"score": 9})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 9);
    assert_eq!(body["text"], "Ocean");

    let (status, body) = app
        .send(Method::PUT, &review, Some(moderator.as_str()), Some(json!({"text": "Edited", "score": 5})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Edited");
    assert_eq!(body["author"], "author");

    let (status, _) = app.send(Method::DELETE, &review, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::GET, &review, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments() {
    let app = TestApp::new().await;
    let (_, author) = app.user("author", Role::User).await;
    let (_, stranger) = app.user("stranger", Role::User).await;
    let first = app.title("First").await;
    let second = app.title("Second").await;

    let (_, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/titles/{first}/reviews/"),
            Some(author.as_str()),
            Some(json!({"text": "Good", "score": 7})),
        )
        .await;
    let review_id = body["id"].as_i64().unwrap();
    let comments = format!("/api/v1/titles/{first}/reviews/{review_id}/comments/");

    let (status, body) = app
        .send(Method::POST, &comments, Some(stranger.as_str()), Some(json!({"text": "Agreed"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["review"], review_id);
    assert_eq!(body["author"], "stranger");
    let comment = format!("{comments}{}/", body["id"]);

    let (status, body) = app.send(Method::GET, &comments, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = app
        .send(Method::PATCH, &comment, Some(author.as_str()), Some(json!({"text": "Hijack"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::PATCH, &comment, Some(stranger.as_str()), Some(json!({"text": "Strongly agreed"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Strongly agreed");

    // Review exists, but under another title
    let mismatched = format!("/api/v1/titles/{second}/reviews/{review_id}/comments/");
    let (status, _) = app.send(Method::GET, &mismatched, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(Method::POST, &mismatched, Some(stranger.as_str()), Some(json!({"text": "Lost"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::DELETE, &comment, Some(stranger.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_user_administration() {
    let app = TestApp::new().await;
    let (_, reader) = app.user("reader", Role::User).await;
    let (_, moderator) = app.user("moderator", Role::Moderator).await;
    let (_, admin) = app.user("boss", Role::Admin).await;

    let (status, _) = app.send(Method::GET, "/api/v1/users/", Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::GET, "/api/v1/users/", Some(moderator.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::GET, "/api/v1/users/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(Method::GET, "/api/v1/users/?search=read", Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let new_user = json!({"username": "critic", "email": "critic@example.com", "role": "moderator"});
    let (status, body) = app
        .send(Method::POST, "/api/v1/users/", Some(admin.as_str()), Some(new_user.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "moderator");

    let (status, _) = app
        .send(Method::POST, "/api/v1/users/", Some(admin.as_str()), Some(new_user))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::PATCH, "/api/v1/users/critic/", Some(admin.as_str()), Some(json!({"bio": "Harsh"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Harsh");

    let (status, _) = app
        .send(Method::PUT, "/api/v1/users/critic/", Some(admin.as_str()), Some(json!({"bio": "x"})))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = app.send(Method::DELETE, "/api/v1/users/critic/", Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::GET, "/api/v1/users/critic/", Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_self_service_cannot_change_role() {
    let app = TestApp::new().await;
    let (_, reader) = app.user("reader", Role::User).await;

    let (status, _) = app.send(Method::GET, "/api/v1/users/me/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let patch = json!({"role": "admin", "first_name": "Rea"});
    let (status, body) = app
        .send(Method::PATCH, "/api/v1/users/me/", Some(reader.as_str()), Some(patch))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");
    assert_eq!(body["first_name"], "Rea");
}

#[tokio::test]
async fn test_denied_writes_report_access_before_body() {
    let app = TestApp::new().await;
    let (_, reader) = app.user("reader", Role::User).await;
    let (_, author) = app.user("author", Role::User).await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let title = app.title("Heat").await;

    let (status, _) = app
        .send(Method::POST, "/api/v1/categories/", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::POST, "/api/v1/titles/", None, Some(json!({"year": 99999})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bad_slug = json!({"name": "Bad", "slug": "bad slug"});
    let (status, _) = app
        .send(Method::POST, "/api/v1/genres/", Some(reader.as_str()), Some(bad_slug.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(Method::POST, "/api/v1/genres/", Some(admin.as_str()), Some(bad_slug))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::PATCH, "/api/v1/users/me/", None, Some(json!({"email": "nope"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reviews = format!("/api/v1/titles/{title}/reviews/");
    let (_, body) = app
        .send(Method::POST, &reviews, Some(author.as_str()), Some(json!({"text": "Tense", "score": 9})))
        .await;
    let review = format!("{reviews}{}/", body["id"]);

    let (status, _) = app
        .send(Method::PATCH, &review, Some(reader.as_str()), Some(json!({"score": 11})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(Method::PUT, &review, None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let comments = format!("{review}comments/");
    let (_, body) = app
        .send(Method::POST, &comments, Some(author.as_str()), Some(json!({"text": "Thanks"})))
        .await;
    let comment = format!("{comments}{}/", body["id"]);
    let (status, _) = app
        .send(Method::PUT, &comment, Some(reader.as_str()), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Permitted requests still get their body checked
    let (status, _) = app
        .send(Method::PATCH, &review, Some(author.as_str()), Some(json!({"score": 11})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_query_and_path() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::GET, "/api/v1/categories/?offset=18446744073709551615", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["next"], Value::Null);
    assert_eq!(body["results"], json!([]));

    let (status, body) = app.send(Method::GET, "/api/v1/titles/?limit=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app.send(Method::GET, "/api/v1/titles/abc/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_staff_moderate_comments() {
    let app = TestApp::new().await;
    let (_, author) = app.user("author", Role::User).await;
    let (_, commenter) = app.user("commenter", Role::User).await;
    let (_, moderator) = app.user("moderator", Role::Moderator).await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let title = app.title("Alien").await;

    let (_, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/titles/{title}/reviews/"),
            Some(author.as_str()),
            Some(json!({"text": "Scary", "score": 8})),
        )
        .await;
    let comments = format!("/api/v1/titles/{title}/reviews/{}/comments/", body["id"]);

    let mut urls = Vec::new();
    for text in ["First", "Second"] {
        let (status, body) = app
            .send(Method::POST, &comments, Some(commenter.as_str()), Some(json!({"text": text})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        urls.push(format!("{comments}{}/", body["id"]));
    }

    for (token, text) in [(&moderator, "Moderated"), (&admin, "Administered")] {
        let (status, body) = app
            .send(Method::PATCH, &urls[0], Some(token.as_str()), Some(json!({"text": text})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], text);
        assert_eq!(body["author"], "commenter");
    }

    let (status, _) = app.send(Method::DELETE, &urls[0], Some(moderator.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::DELETE, &urls[1], Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.send(Method::GET, &comments, None, None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_catalog_deletion_keeps_titles() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let repo = app.repo();

    let category = repo.create_category("Films".into(), "films".into()).await.unwrap();
    let drama = repo.create_genre("Drama".into(), "drama".into()).await.unwrap();
    let crime = repo.create_genre("Crime".into(), "crime".into()).await.unwrap();
    let title = repo
        .create_title(NewTitle {
            name: "The Godfather".into(),
            year: 1972,
            description: None,
            category_id: Some(category.id),
            genre_ids: vec![drama.id, crime.id],
        })
        .await
        .unwrap()
        .title
        .id;
    let url = format!("/api/v1/titles/{title}/");

    let (status, _) = app
        .send(Method::DELETE, "/api/v1/categories/films/", Some(admin.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send(Method::DELETE, "/api/v1/genres/drama/", Some(admin.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(Method::GET, &url, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], Value::Null);
    assert_eq!(body["genre"], json!([{"name": "Crime", "slug": "crime"}]));
}

#[tokio::test]
async fn test_user_deletion_removes_their_content() {
    let app = TestApp::new().await;
    let (_, leaving) = app.user("leaving", Role::User).await;
    let (_, staying) = app.user("staying", Role::User).await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let title = app.title("Jaws").await;
    let reviews = format!("/api/v1/titles/{title}/reviews/");

    let (_, body) = app
        .send(Method::POST, &reviews, Some(leaving.as_str()), Some(json!({"text": "Meh", "score": 4})))
        .await;
    let leaving_review = format!("{reviews}{}/", body["id"]);
    let (_, body) = app
        .send(Method::POST, &reviews, Some(staying.as_str()), Some(json!({"text": "Great", "score": 9})))
        .await;
    let staying_comments = format!("{reviews}{}/comments/", body["id"]);

    let (status, _) = app
        .send(
            Method::POST,
            &staying_comments,
            Some(leaving.as_str()),
            Some(json!({"text": "Disagree"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send(
            Method::POST,
            &format!("{leaving_review}comments/"),
            Some(staying.as_str()),
            Some(json!({"text": "Harsh"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(Method::DELETE, "/api/v1/users/leaving/", Some(admin.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.send(Method::GET, &reviews, None, None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["author"], "staying");

    let (_, body) = app.send(Method::GET, &staying_comments, None, None).await;
    assert_eq!(body["count"], 0);

    let (status, _) = app.send(Method::GET, &leaving_review, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.send(Method::GET, &format!("/api/v1/titles/{title}/"), None, None).await;
    assert_eq!(body["rating"], 9.0);
}
