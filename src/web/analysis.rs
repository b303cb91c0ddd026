use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    context::Context,
    database::table::stock_analysis::StockAnalysis,
    web::error::{validate_code, ApiError},
};

/// GET /api/analysis/{code}：最新一筆分析，不觸發抓取
pub async fn latest(
    State(ctx): State<Context>,
    Path(code): Path<String>,
) -> Result<Json<StockAnalysis>, ApiError> {
    validate_code(&code)?;

    match StockAnalysis::fetch_latest(ctx.db.pool(), &code).await {
        Ok(Some(analysis)) => Ok(Json(analysis)),
        Ok(None) => Err(ApiError::not_found("Analysis not found")),
        Err(why) => Err(ApiError::internal("Failed to fetch analysis", why)),
    }
}
