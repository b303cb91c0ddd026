use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    backfill::quote::{self, StockDetail},
    calculation::valuation::{self, PROBABILITY_FORMULA},
    context::Context,
    database::table::recommended_stock::{RecommendedStock, Recommendation},
    logging,
    util::text::{figure_or_dash, with_thousands},
    web::error::ApiError,
};

/// 推薦清單中的一筆，只收錄現價低於合理價的股票
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub code: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub reason: String,
    pub score: i64,
    pub fair_price: i64,
    pub current_price: i64,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    pub roe: Option<f64>,
    pub target_price: Option<i64>,
    pub probability: Option<i64>,
    pub probability_formula: &'static str,
    pub opinion: Option<String>,
    pub detailed_analysis: [String; 3],
}

impl RecommendationItem {
    /// 現價未知或已達合理價時回傳 None
    fn undervalued(rec: Recommendation, detail: StockDetail) -> Option<Self> {
        let current = detail.stock.price?;
        if current >= rec.fair_price {
            return None;
        }

        let stock = detail.stock;
        let detailed_analysis = [
            rec.reason.clone(),
            format!(
                "현재가({}원)가 적정가({}원) 대비 저평가되어 있음",
                with_thousands(current),
                with_thousands(rec.fair_price)
            ),
            format!(
                "주요 지표: PER {}, PBR {}, ROE {}",
                figure_or_dash(stock.per),
                figure_or_dash(stock.pbr),
                figure_or_dash(stock.roe)
            ),
        ];

        Some(RecommendationItem {
            probability: valuation::probability(rec.fair_price, current, rec.score),
            code: rec.code,
            name: rec.name.or(stock.name),
            category: rec.category.or(stock.category),
            reason: rec.reason,
            score: rec.score,
            fair_price: rec.fair_price,
            current_price: current,
            per: stock.per,
            pbr: stock.pbr,
            roe: stock.roe,
            target_price: stock.target_price,
            probability_formula: PROBABILITY_FORMULA,
            opinion: detail.analysis.map(|a| a.opinion),
            detailed_analysis,
        })
    }
}

/// GET /api/recommendations：逐檔刷新後篩出低於合理價者，依分數遞減
pub async fn list(State(ctx): State<Context>) -> Result<Json<Vec<RecommendationItem>>, ApiError> {
    let recommendations = RecommendedStock::fetch_all_with_stock(ctx.db.pool())
        .await
        .map_err(|why| ApiError::internal("Failed to fetch recommendations", why))?;

    let mut items = Vec::with_capacity(recommendations.len());
    for rec in recommendations {
        let detail = match quote::refresh(&ctx, &rec.code, rec.name.as_deref()).await {
            Some(detail) => detail,
            None => {
                logging::warn_file_async(format!("No data for recommendation {}", rec.code));
                continue;
            }
        };

        if let Some(item) = RecommendationItem::undervalued(rec, detail) {
            items.push(item);
        }
    }

    items.sort_by(|a, b| b.score.cmp(&a.score));

    Ok(Json(items))
}
