use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    backfill::quote::{self, StockDetail},
    context::Context,
    database::table::stock::{Stock, StockBrief},
    web::error::{validate_code, ApiError},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /api/stock/{code}：抓取最新資料後回傳明細
pub async fn detail(
    State(ctx): State<Context>,
    Path(code): Path<String>,
) -> Result<Json<StockDetail>, ApiError> {
    validate_code(&code)?;

    quote::refresh(&ctx, &code, None)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Stock not found"))
}

/// GET /api/stocks
pub async fn list(State(ctx): State<Context>) -> Result<Json<Vec<Stock>>, ApiError> {
    Stock::fetch_all(ctx.db.pool())
        .await
        .map(Json)
        .map_err(|why| ApiError::internal("Failed to fetch stocks", why))
}

/// GET /api/search?q=
pub async fn search(
    State(ctx): State<Context>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<StockBrief>>, ApiError> {
    let keyword = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q,
        _ => return Ok(Json(Vec::new())),
    };

    Stock::search(ctx.db.pool(), keyword)
        .await
        .map(Json)
        .map_err(|why| ApiError::internal("Search failed", why))
}
