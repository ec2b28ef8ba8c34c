//! Input validation for API requests.
//!
//! Validators return `Result<(), String>` with a client-facing message. For
//! collecting several of them into one ApiError, use the
//! `ValidationErrorBuilder` from the `error` module.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{MAX_RATING, MIN_RATING};

/// Longest accepted title or name
const MAX_TITLE_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

lazy_static! {
    /// Loose address check: something@something.tld
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^\s@]+@[^\s@]+\.[^\s@]+$"
    ).unwrap();

    /// HTTP/HTTPS URL with a host
    static ref HTTP_URL_REGEX: Regex = Regex::new(
        r"^https?://[a-zA-Z0-9][-a-zA-Z0-9.]*(:\d+)?(/\S*)?$"
    ).unwrap();
}

/// Parse a path or query id; `entity` names it in the error message
pub fn parse_id(raw: &str, entity: &str) -> Result<i64, String> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(format!("Invalid {} id", entity)),
    }
}

/// Validate a required, bounded text field such as a movie or genre title
pub fn validate_title(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }

    if value.chars().count() > MAX_TITLE_LEN {
        return Err(format!("{} is too long (max {} characters)", field, MAX_TITLE_LEN));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LEN));
    }

    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(format!("Password is too long (max {} characters)", MAX_PASSWORD_LEN));
    }

    Ok(())
}

pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<(), String> {
    if password != confirmation {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}

pub fn validate_rating(rating: i64) -> Result<(), String> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING));
    }
    Ok(())
}

/// Validate an optional trailer URL; empty means "no trailer"
pub fn validate_trailer_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Ok(());
    }

    if url.len() > 2048 {
        return Err("Trailer URL is too long (max 2048 characters)".to_string());
    }

    if !HTTP_URL_REGEX.is_match(url) {
        return Err("Trailer URL must be an HTTP(S) URL".to_string());
    }

    Ok(())
}

/// Parse a boolean flag the way query strings spell it.
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`; anything else
/// is `None`.
pub fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse an optional `YYYY-MM-DD` date; blank means absent
pub fn parse_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| "Date of release must be formatted as YYYY-MM-DD".to_string())
}
