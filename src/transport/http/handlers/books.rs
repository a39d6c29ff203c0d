use crate::domain::auth::Permission;
use crate::transport::http::error::ApiError;
use crate::transport::http::extract::AuthUser;
use crate::transport::http::handlers::common::ok;
use crate::transport::http::types::{
    ApiResponse, AppState, CategoriesResponse, PriceRangeQuery, ReloadResponse, SearchQuery,
    TopRatedQuery,
};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use tracing::info;

const DEFAULT_TOP_RATED: usize = 20;

#[utoipa::path(
    get,
    path = "/api/v1/books",
    responses((status = 200, description = "All books in store order", body = ApiResponse))
)]
pub async fn list_books_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let catalog = state.catalog.read().await;
    ok(catalog.get_all())
}

#[utoipa::path(
    get,
    path = "/api/v1/books/{id}",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book", body = ApiResponse),
        (status = 400, description = "Id is not an integer", body = ApiResponse),
        (status = 404, description = "No book with this id", body = ApiResponse)
    )
)]
pub async fn get_book_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(format!("Invalid book id: {}", e)))?;
    let catalog = state.catalog.read().await;
    match catalog.get_by_id(id) {
        Some(book) => ok(book),
        None => Err(ApiError::NotFound(format!("Book with id {} not found", id))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/books/search",
    params(SearchQuery),
    responses((status = 200, description = "Books matching every given filter", body = ApiResponse))
)]
pub async fn search_books_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let catalog = state.catalog.read().await;
    ok(catalog.search(query.title.as_deref(), query.category.as_deref()))
}

#[utoipa::path(
    get,
    path = "/api/v1/books/top-rated",
    params(TopRatedQuery),
    responses((status = 200, description = "Highest rated books, ties in store order", body = ApiResponse))
)]
pub async fn top_rated_handler(
    State(state): State<AppState>,
    Query(query): Query<TopRatedQuery>,
) -> Result<Response, ApiError> {
    let catalog = state.catalog.read().await;
    ok(catalog.top_rated(query.limit.unwrap_or(DEFAULT_TOP_RATED)))
}

#[utoipa::path(
    get,
    path = "/api/v1/books/price-range",
    params(PriceRangeQuery),
    responses((status = 200, description = "Books priced within the inclusive range", body = ApiResponse))
)]
pub async fn price_range_handler(
    State(state): State<AppState>,
    Query(query): Query<PriceRangeQuery>,
) -> Result<Response, ApiError> {
    let catalog = state.catalog.read().await;
    ok(catalog.filter_by_price(query.min, query.max))
}

#[utoipa::path(
    post,
    path = "/api/v1/books/reload",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Catalog re-read from its source", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 403, description = "Admin permission required", body = ApiResponse),
        (status = 503, description = "Source unreadable; previous records kept", body = ApiResponse)
    )
)]
pub async fn reload_books_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let claims = user.require(Permission::Admin)?;
    let records_loaded = state.catalog.write().await.reload()?;
    info!("Catalog reloaded by {}: {} records", claims.username, records_loaded);
    ok(ReloadResponse { records_loaded })
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Distinct categories, sorted", body = ApiResponse))
)]
pub async fn list_categories_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let categories = state.catalog.read().await.distinct_categories();
    ok(CategoriesResponse {
        total: categories.len(),
        categories,
    })
}
