//! Book catalog endpoints

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    catalog::{annotate, pagination::lenient_page, DisplayBook, SearchMode},
    error::{AppError, AppResult},
    models::{CreateBook, UpdateStock},
    services::catalog::RegisterAction,
    AppState,
};

/// Query parameters for listing books
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Page number (default: 1, values below 1 are treated as 1)
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
    /// Case-insensitive search term
    #[serde(default)]
    pub q: String,
    /// `text` (title, author, publisher) or `category`
    #[serde(default)]
    pub mode: SearchMode,
}

/// One page of books
#[derive(Serialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<DisplayBook>,
    /// Current page number
    pub page: i64,
    /// Books per page
    pub per_page: i64,
    /// Number of books matching the search
    pub total: i64,
    pub total_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
    /// Search term echoed back
    pub q: String,
    pub mode: SearchMode,
}

/// Result of a registration
#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub action: RegisterAction,
    /// Copies added when an existing book was restocked
    pub added: i64,
    pub book: DisplayBook,
}

/// List books with search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "One page of books", body = BookListResponse),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<BookQuery>, AppError>,
) -> AppResult<Json<BookListResponse>> {
    let page = state
        .services
        .catalog
        .search(&query.q, query.mode, query.page)
        .await?;

    Ok(Json(BookListResponse {
        books: page.items,
        page: page.info.page,
        per_page: page.info.per_page,
        total: page.info.total,
        total_pages: page.info.total_pages,
        has_previous: page.info.has_previous,
        has_next: page.info.has_next,
        q: query.q,
        mode: query.mode,
    }))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = DisplayBook),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<DisplayBook>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(annotate(book)))
}

/// Register a book (form submission).
///
/// When a book with the same title and publisher exists, its stock is
/// increased by the submitted stock instead.
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body(content = CreateBook, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Book created", body = RegisterResponse),
        (status = 200, description = "Existing book restocked", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    WithRejection(Form(data), _): WithRejection<Form<CreateBook>, AppError>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let registration = state.services.catalog.register(data).await?;

    let status = match registration.action {
        RegisterAction::Created => StatusCode::CREATED,
        RegisterAction::Restocked => StatusCode::OK,
    };

    Ok((
        status,
        Json(RegisterResponse {
            action: registration.action,
            added: registration.added,
            book: annotate(registration.book),
        }),
    ))
}

/// Set the stock of a book (form submission)
#[utoipa::path(
    post,
    path = "/books/{id}/stock",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body(content = UpdateStock, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Stock updated", body = DisplayBook),
        (status = 400, description = "Negative or malformed stock", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_stock(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Form(data), _): WithRejection<Form<UpdateStock>, AppError>,
) -> AppResult<Json<DisplayBook>> {
    let book = state.services.catalog.update_stock(id, data.stock).await?;
    Ok(Json(annotate(book)))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub const NO_DATA_MESSAGE: &str = "No data to export";

/// Download the whole inventory as a spreadsheet
#[utoipa::path(
    get,
    path = "/books/export",
    tag = "books",
    responses(
        (status = 200, description = "Spreadsheet attachment, or a plain-text notice when the catalog is empty")
    )
)]
pub async fn export_books(State(state): State<AppState>) -> AppResult<Response> {
    let Some(file) = state.services.catalog.export().await? else {
        return Ok((StatusCode::OK, NO_DATA_MESSAGE).into_response());
    };

    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(file.bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}
