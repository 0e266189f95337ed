use std::sync::LazyLock;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use regex::Regex;

use crate::error::AppError;

pub const MAX_USERNAME_LENGTH: usize = 32;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N} _.\-]").expect("constant pattern"));

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("constant pattern"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("constant pattern"));

/// Cleans a display name. `None` when nothing usable is left.
pub fn sanitize_username(input: &str) -> Option<String> {
    let s = DISALLOWED.replace_all(input, "");
    let s = SPACES.replace_all(s.trim(), " ");

    let s: String = s.chars().take(MAX_USERNAME_LENGTH).collect();
    let s = s.trim_end();

    (!s.is_empty()).then(|| s.to_string())
}

pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn require_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), AppError> {
    let email = non_empty(email).ok_or(AppError::MissingCredentials)?;
    // passwords are taken as typed
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or(AppError::MissingCredentials)?;

    Ok((email, password))
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(AppError::InvalidField("email"))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingToken)
}
