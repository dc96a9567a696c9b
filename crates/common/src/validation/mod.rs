//! Field validators shared by request payloads
//!
//! Plugged into `validator` derives with `#[validate(custom(function = ...))]`.

use chrono::{Datelike, Utc};
use regex_lite::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use validator::ValidationError;

/// Letters, digits and `. @ + - _`
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"));

/// Path segment of the self-service profile, never a valid username
pub const RESERVED_USERNAME: &str = "me";

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username == RESERVED_USERNAME {
        return Err(invalid(
            "reserved",
            format!("Username \"{}\" is not allowed", RESERVED_USERNAME),
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(invalid(
            "pattern",
            "Username may contain only letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err(invalid(
            "pattern",
            "Slug may contain only latin letters, digits, hyphens and underscores".to_string(),
        ))
    }
}

/// Release years cannot lie in the future
pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    let current = Utc::now().year();
    if year > current {
        return Err(invalid(
            "future_year",
            format!("Year {} is later than the current year {}", year, current),
        ));
    }
    Ok(())
}
