//! Display and export projections of [`Book`] records.
//!
//! These are pure functions; nothing here touches storage.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Book;

/// Books with fewer copies than this are flagged as low stock
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Spreadsheet columns, in output order
pub const EXPORT_COLUMNS: [&str; 7] = [
    "Title",
    "Category",
    "Author",
    "Publisher",
    "PageCount",
    "Stock",
    "ID",
];

/// Coarse stock classification used for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Low,
    High,
}

/// A book annotated with display-only attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DisplayBook {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub author: String,
    pub publisher: String,
    pub page_count: i64,
    pub stock: i64,
    /// `stock < 5`; computed on every read, never stored
    pub low_stock: bool,
    pub stock_level: StockLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn is_low_stock(stock: i64) -> bool {
    stock < LOW_STOCK_THRESHOLD
}

pub fn annotate(book: Book) -> DisplayBook {
    let low_stock = is_low_stock(book.stock);
    DisplayBook {
        id: book.id,
        title: book.title,
        category: book.category,
        author: book.author,
        publisher: book.publisher,
        page_count: book.page_count,
        stock: book.stock,
        low_stock,
        stock_level: if low_stock {
            StockLevel::Low
        } else {
            StockLevel::High
        },
        created_at: book.created_at,
        updated_at: book.updated_at,
    }
}

/// Primitive cell value of an export row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExportValue {
    Text(String),
    Integer(i64),
}

/// Column name to value, iterating in [`EXPORT_COLUMNS`] order
pub type ExportRow = IndexMap<&'static str, ExportValue>;

pub fn to_export_row(book: &Book) -> ExportRow {
    let values = [
        ExportValue::Text(book.title.clone()),
        ExportValue::Text(book.category.clone()),
        ExportValue::Text(book.author.clone()),
        ExportValue::Text(book.publisher.clone()),
        ExportValue::Integer(book.page_count),
        ExportValue::Integer(book.stock),
        ExportValue::Text(book.id.to_string()),
    ];
    EXPORT_COLUMNS.into_iter().zip(values).collect()
}

const TITLE_WIDTH: usize = 40;
const COLUMN_WIDTH: usize = 15;

/// Header line of the console catalog table
pub fn table_header() -> String {
    format!(
        "{:<tw$} | {:<cw$} | {:<cw$} | {:<cw$} | {:<cw$} | STOCK",
        "TITLE",
        "CATEGORY",
        "AUTHOR",
        "PUBLISHER",
        "PAGES",
        tw = TITLE_WIDTH,
        cw = COLUMN_WIDTH
    )
}

/// One console table line; low-stock rows are marked with `!`
pub fn table_row(book: &DisplayBook) -> String {
    let marker = if book.low_stock { " !" } else { "" };
    format!(
        "{:<tw$} | {:<cw$} | {:<cw$} | {:<cw$} | {:<cw$} | {}{}",
        book.title,
        book.category,
        book.author,
        book.publisher,
        book.page_count,
        book.stock,
        marker,
        tw = TITLE_WIDTH,
        cw = COLUMN_WIDTH
    )
}
