//! REST API，全部以 JSON 回應並開放 CORS。

use std::time::Instant;

use anyhow::{Context as _, Result};
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{config, context::Context, logging};

pub mod analysis;
pub mod error;
pub mod holding;
pub mod recommendation;
pub mod stock;

/// 組合所有路由，`/charts` 直接提供走勢圖圖檔
pub fn router(ctx: Context) -> Router {
    let charts = ServeDir::new(&ctx.charts_dir);

    Router::new()
        .route("/health", get(health))
        .route("/api/stock/{code}", get(stock::detail))
        .route("/api/stocks", get(stock::list))
        .route("/api/search", get(stock::search))
        .route("/api/holdings", get(holding::list).post(holding::upsert))
        .route("/api/holdings/{code}", delete(holding::remove))
        .route("/api/recommendations", get(recommendation::list))
        .route("/api/analysis/{code}", get(analysis::latest))
        .nest_service("/charts", charts)
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// 綁定 `system.host:system.port` 並處理請求直到程式結束
pub async fn serve(ctx: Context, settings: &config::System) -> Result<()> {
    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    logging::info_file_async(format!("Server running on http://{}", addr));

    axum::serve(listener, router(ctx))
        .await
        .context("Web server stopped unexpectedly")
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    let response = next.run(req).await;

    logging::debug_file_async(format!(
        "{} {} -> {} in {:?}",
        method,
        uri,
        response.status(),
        started.elapsed()
    ));

    response
}
