//! Book (catalog title) and category models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Book category lookup entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

/// Full book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i16>,
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub added_date: DateTime<Utc>,
}

/// Short book representation for search results
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub nb_copies: Option<i64>,
    pub nb_available: Option<i64>,
}

/// Book query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must have 1 to 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i16>,
    #[validate(custom(function = validate_isbn))]
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must have 1 to 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i16>,
    #[validate(custom(function = validate_isbn))]
    pub isbn: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
}

/// ISBN check: 10 or 13 digits once separators are stripped,
/// final character of an ISBN-10 may be 'X'
fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    let compact: String = isbn
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .collect();

    let valid = match compact.len() {
        10 => {
            compact[..9].chars().all(|c| c.is_ascii_digit())
                && compact
                    .chars()
                    .last()
                    .map(|c| c.is_ascii_digit() || c == 'X')
                    .unwrap_or(false)
        }
        13 => compact.chars().all(|c| c.is_ascii_digit()) && compact.starts_with("97"),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("isbn"))
    }
}
