//! Book model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

/// Normalize a text value for the (title, publisher) uniqueness key:
/// surrounding whitespace removed, lowercased.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// Generated at creation, never changes
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub author: String,
    pub publisher: String,
    /// Number of pages (> 0)
    pub page_count: i64,
    /// Copies on hand (>= 0)
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build a new record from validated input with a fresh id.
    pub fn new(data: &CreateBook) -> AppResult<Self> {
        data.check()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title: data.title.trim().to_string(),
            category: data.category.trim().to_string(),
            author: data.author.trim().to_string(),
            publisher: data.publisher.trim().to_string(),
            page_count: data.page_count,
            stock: data.stock,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn title_key(&self) -> String {
        normalize_key(&self.title)
    }

    pub fn publisher_key(&self) -> String {
        normalize_key(&self.publisher)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Registration request (also the web form payload)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub category: String,
    #[validate(custom(function = "not_blank"))]
    pub author: String,
    #[validate(custom(function = "not_blank"))]
    pub publisher: String,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub page_count: i64,
    /// Initial stock; zero is allowed
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: i64,
}

impl CreateBook {
    /// Validate and map failures to [`AppError::InvalidValue`]
    pub fn check(&self) -> AppResult<()> {
        self.validate().map_err(AppError::from)
    }
}

/// Stock update form
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStock {
    /// New absolute stock value (>= 0)
    pub stock: i64,
}
