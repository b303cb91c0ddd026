use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    backfill::quote,
    context::Context,
    database::table::holding_stock::{Holding, HoldingStock},
    web::error::{validate_code, ApiError},
};

/// POST /api/holdings 的內容
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRequest {
    pub code: String,
    pub name: Option<String>,
    pub avg_price: i64,
    pub weight: i64,
}

impl HoldingRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_code(&self.code)?;
        if self.avg_price < 0 {
            return Err(ApiError::bad_request("avgPrice must not be negative"));
        }
        if !(0..=100).contains(&self.weight) {
            return Err(ApiError::bad_request("weight must be between 0 and 100"));
        }
        Ok(())
    }
}

/// GET /api/holdings
pub async fn list(State(ctx): State<Context>) -> Result<Json<Vec<Holding>>, ApiError> {
    HoldingStock::fetch_all_joined(ctx.db.pool())
        .await
        .map(Json)
        .map_err(|why| ApiError::internal("Failed to fetch holdings", why))
}

/// POST /api/holdings：先抓取個股資料，寫入持股後依成本重新分析
pub async fn upsert(
    State(ctx): State<Context>,
    payload: Result<Json<HoldingRequest>, JsonRejection>,
) -> Result<Json<Holding>, ApiError> {
    let Json(req) = payload.map_err(|why| ApiError::bad_request(why.body_text()))?;
    req.validate()?;

    let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    if quote::refresh(&ctx, &req.code, name).await.is_none() {
        return Err(ApiError::not_found("Stock not found"));
    }

    HoldingStock::new(&req.code, req.avg_price, req.weight)
        .upsert(ctx.db.pool())
        .await
        .map_err(|why| ApiError::internal("Failed to add/update holding", why))?;

    // 以新的平均成本重新判斷投資意見
    quote::reanalyze(&ctx, &req.code)
        .await
        .map_err(|why| ApiError::internal("Failed to add/update holding", why))?;

    match HoldingStock::fetch_one_joined(ctx.db.pool(), &req.code).await {
        Ok(Some(holding)) => Ok(Json(holding)),
        Ok(None) => Err(ApiError::not_found("Stock not found")),
        Err(why) => Err(ApiError::internal("Failed to add/update holding", why)),
    }
}

/// DELETE /api/holdings/{code}
pub async fn remove(
    State(ctx): State<Context>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    validate_code(&code)?;

    HoldingStock::delete(ctx.db.pool(), &code)
        .await
        .map_err(|why| ApiError::internal("Failed to delete holding", why))?;

    Ok(Json(json!({ "success": true })))
}
