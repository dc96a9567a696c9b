//! Row layouts of the fixture files
//!
//! Column names match the CSV header rows; extra columns are ignored and
//! empty optional cells read as `None`.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use yamdb_common::db::models::Role;

/// `category.csv` and `genre.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct SlugRow {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

/// `users.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// `titles.csv`; `category` is a category id
#[derive(Debug, Clone, Deserialize)]
pub struct TitleRow {
    pub id: i32,
    pub name: String,
    pub year: i32,
    #[serde(default)]
    pub category: Option<i32>,
}

/// `review.csv`; `author` is a user id
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRow {
    pub id: i32,
    pub title_id: i32,
    pub text: String,
    pub author: i32,
    pub score: i32,
    pub pub_date: DateTime<FixedOffset>,
}

/// `comments.csv`; `author` is a user id
#[derive(Debug, Clone, Deserialize)]
pub struct CommentRow {
    pub id: i32,
    pub review_id: i32,
    pub text: String,
    pub author: i32,
    pub pub_date: DateTime<FixedOffset>,
}

/// `genre_title.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct GenreTitleRow {
    pub id: i32,
    pub title_id: i32,
    pub genre_id: i32,
}
