use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::{
    calculation::{
        opinion,
        trend::TrendSignal,
        valuation::{self, Fundamentals},
    },
    context::Context,
    crawler::naver::{investor::InvestorFlow, item::ItemSummary},
    database::table::{
        holding_stock::HoldingStock,
        stock::Stock,
        stock_analysis::StockAnalysis,
        stock_history::StockHistory,
    },
    declare, logging,
    util::datetime,
};

/// 計算趨勢時使用的交易日數
pub const HISTORY_LIMIT: i64 = 40;

/// 個股明細，`/api/stock/{code}` 的回應內容
#[derive(Serialize, Debug, Clone)]
pub struct StockDetail {
    #[serde(flatten)]
    pub stock: Stock,
    #[serde(rename = "targetPrice")]
    pub target_price: Option<i64>,
    /// 最近 40 個交易日的收盤價，依日期遞增
    pub history: Vec<StockHistory>,
    /// 最近 20 個交易日的法人買賣超，抓取失敗或使用舊資料時為空
    #[serde(rename = "investorData")]
    pub investor_data: Vec<InvestorFlow>,
    pub trend: Option<TrendSignal>,
    #[serde(rename = "fairPrice")]
    pub fair_price: Option<i64>,
    /// 最新一筆分析，欄位攤平在明細最上層；沒有分析時不輸出
    #[serde(flatten)]
    pub analysis: Option<LatestAnalysis>,
}

/// 明細中的分析欄位：`opinion`、`analysis`、`advice`、`tossUrl`、`chartPath`
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestAnalysis {
    #[serde(skip)]
    pub id: i64,
    pub opinion: String,
    pub analysis: String,
    pub advice: String,
    pub toss_url: String,
    pub chart_path: Option<String>,
}

impl From<StockAnalysis> for LatestAnalysis {
    fn from(row: StockAnalysis) -> Self {
        LatestAnalysis {
            id: row.id,
            opinion: row.opinion,
            analysis: row.analysis,
            advice: row.advice,
            toss_url: row.toss_url,
            chart_path: row.chart_path,
        }
    }
}

/// 抓取並寫入單一股票的最新資料。
///
/// 抓不到日線或寫入失敗時改用資料庫中的既有資料；連既有資料也沒有時回傳 None。
/// `fallback_name` 優先於其他來源的名稱。
pub async fn refresh(
    ctx: &Context,
    code: &str,
    fallback_name: Option<&str>,
) -> Option<StockDetail> {
    match scrape_and_store(ctx, code, fallback_name).await {
        Ok(Some(detail)) => return Some(detail),
        Ok(None) => {
            logging::warn_file_async(format!("No price history for {}, using stored data", code));
        }
        Err(why) => {
            logging::error_file_async(format!(
                "Failed to refresh {} because {:?}, using stored data",
                code, why
            ));
        }
    }

    match stored(ctx, code).await {
        Ok(detail) => detail,
        Err(why) => {
            logging::error_file_async(format!(
                "Failed to read stored data of {} because {:?}",
                code, why
            ));
            None
        }
    }
}

/// 資料庫中的既有資料
pub async fn stored(ctx: &Context, code: &str) -> Result<Option<StockDetail>> {
    let stock = match Stock::fetch_one(ctx.db.pool(), code).await? {
        Some(stock) => stock,
        None => return Ok(None),
    };
    let history = StockHistory::fetch_latest(ctx.db.pool(), code, HISTORY_LIMIT).await?;
    let analysis = StockAnalysis::fetch_latest(ctx.db.pool(), code).await?;

    Ok(Some(assemble(stock, history, Vec::new(), analysis)))
}

/// 以資料庫中的日線與基本面重新產生一筆分析，不觸發抓取。
///
/// 持股成本變更後使用，讓投資意見反映新的平均成本。股票不存在或日線不足時回傳 None。
pub async fn reanalyze(ctx: &Context, code: &str) -> Result<Option<LatestAnalysis>> {
    let stock = match Stock::fetch_one(ctx.db.pool(), code).await? {
        Some(stock) => stock,
        None => return Ok(None),
    };
    let history = StockHistory::fetch_latest(ctx.db.pool(), code, HISTORY_LIMIT).await?;
    let analysis = analyze(ctx, code, &history, &fundamentals_of(&stock)).await?;

    Ok(analysis.map(LatestAnalysis::from))
}

async fn scrape_and_store(
    ctx: &Context,
    code: &str,
    fallback_name: Option<&str>,
) -> Result<Option<StockDetail>> {
    let (start, end) = datetime::lookback_window(Local::now().date_naive(), ctx.history_days);
    let prices = ctx.source.price_history(code, &start, &end).await?;
    let latest_close = match prices.last() {
        Some(last) => last.close,
        None => return Ok(None),
    };

    let rows: Vec<StockHistory> = prices
        .iter()
        .map(|p| StockHistory::new(p.date.clone(), p.close))
        .collect();
    StockHistory::upsert_many(&ctx.db, code, &rows).await?;

    let investor_data = ctx.source.investor_flows(code).await.unwrap_or_else(|why| {
        logging::error_file_async(format!(
            "Failed to fetch investor flows of {} because {:?}",
            code, why
        ));
        Vec::new()
    });

    let summary = ctx.source.item_summary(code).await.unwrap_or_else(|why| {
        logging::error_file_async(format!(
            "Failed to fetch item summary of {} because {:?}",
            code, why
        ));
        ItemSummary::default()
    });

    let existing = Stock::fetch_one(ctx.db.pool(), code).await?;
    let name = resolve_name(
        code,
        fallback_name,
        existing.as_ref().and_then(|s| s.name.as_deref()),
        summary.name.as_deref(),
    );

    let quote = Stock {
        code: code.to_string(),
        name: Some(name),
        price: Some(latest_close),
        change: Some("0".to_string()),
        change_rate: Some("0.00".to_string()),
        per: summary.per,
        pbr: summary.pbr,
        roe: summary.roe,
        target_price: summary.target_price,
        ..Default::default()
    };
    quote.upsert_quote(ctx.db.pool()).await?;

    if let Some(industry) = summary.industry.as_deref() {
        let category = declare::category_of_industry(Some(industry));
        Stock::fill_category_if_empty(ctx.db.pool(), code, category).await?;
    }

    let history = StockHistory::fetch_latest(ctx.db.pool(), code, HISTORY_LIMIT).await?;
    let analysis = analyze(ctx, code, &history, &fundamentals_of(&quote)).await?;
    let stock = Stock::fetch_one(ctx.db.pool(), code).await?.unwrap_or(quote);

    logging::info_file_async(format!(
        "Refreshed {} {} with {} prices and {} investor rows",
        code,
        stock.name.as_deref().unwrap_or_default(),
        prices.len(),
        investor_data.len()
    ));

    Ok(Some(assemble(stock, history, investor_data, analysis)))
}

/// 計算趨勢、合理價與投資意見，並新增一筆分析紀錄
async fn analyze(
    ctx: &Context,
    code: &str,
    history: &[StockHistory],
    fundamentals: &Fundamentals,
) -> Result<Option<StockAnalysis>> {
    let prices: Vec<i64> = history.iter().map(|h| h.price).collect();
    let signal = match TrendSignal::from_history(&prices) {
        Some(signal) => signal,
        None => return Ok(None),
    };

    let fair = valuation::fair_price(fundamentals, signal.latest);
    let avg_price = HoldingStock::fetch_one(ctx.db.pool(), code)
        .await?
        .map(|h| h.avg_price);
    let verdict = opinion::classify(&signal, fair, avg_price);
    let composition = opinion::compose(&signal, fundamentals, fair, verdict, avg_price);

    let mut analysis = StockAnalysis::new(
        code,
        &composition.analysis,
        &composition.advice,
        verdict.as_ref(),
        chart_path(ctx, code).await,
    );
    analysis.id = analysis.insert(ctx.db.pool()).await?;

    Ok(Some(analysis))
}

/// 走勢圖存在時回傳其對外路徑
async fn chart_path(ctx: &Context, code: &str) -> Option<String> {
    let file_name = format!("{}.png", code);
    match tokio::fs::metadata(ctx.charts_dir.join(&file_name)).await {
        Ok(meta) if meta.is_file() => Some(format!("/charts/{}", file_name)),
        _ => None,
    }
}

fn fundamentals_of(stock: &Stock) -> Fundamentals {
    Fundamentals {
        per: stock.per,
        pbr: stock.pbr,
        roe: stock.roe,
        target_price: stock.target_price,
    }
}

fn assemble(
    stock: Stock,
    history: Vec<StockHistory>,
    investor_data: Vec<InvestorFlow>,
    analysis: Option<StockAnalysis>,
) -> StockDetail {
    let prices: Vec<i64> = history.iter().map(|h| h.price).collect();
    let trend = TrendSignal::from_history(&prices);
    let fair_price = stock
        .price
        .and_then(|price| valuation::fair_price(&fundamentals_of(&stock), price));

    StockDetail {
        target_price: stock.target_price,
        stock,
        history,
        investor_data,
        trend,
        fair_price,
        analysis: analysis.map(LatestAnalysis::from),
    }
}

/// 名稱優先順序：呼叫端提供的名稱、資料庫中不等於代號的名稱、頁面標題、代號
fn resolve_name(
    code: &str,
    fallback_name: Option<&str>,
    stored_name: Option<&str>,
    scraped_name: Option<&str>,
) -> String {
    fn usable(name: Option<&str>) -> Option<&str> {
        name.map(str::trim).filter(|n| !n.is_empty())
    }

    usable(fallback_name)
        .or_else(|| usable(stored_name).filter(|n| *n != code))
        .or_else(|| usable(scraped_name))
        .unwrap_or(code)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::testing::{context, daily_prices, FakeSource},
        declare::Opinion,
    };

    fn summary() -> ItemSummary {
        ItemSummary {
            name: Some("삼성전자".to_string()),
            per: Some(13.45),
            pbr: Some(1.21),
            roe: Some(9.04),
            target_price: Some(110_000),
            industry: Some("반도체와반도체장비".to_string()),
        }
    }

    fn flow(date: &str) -> InvestorFlow {
        InvestorFlow {
            date: date.to_string(),
            close: 1000,
            volume: 10,
            institution: 5,
            foreign: -2,
            individual: -3,
        }
    }

    #[test]
    fn test_resolve_name() {
        assert_eq!(resolve_name("005930", Some("삼성"), Some("삼성전자"), None), "삼성");
        assert_eq!(resolve_name("005930", None, Some("삼성전자"), Some("X")), "삼성전자");
        assert_eq!(resolve_name("005930", None, Some("005930"), Some("삼성전자")), "삼성전자");
        assert_eq!(resolve_name("005930", Some(" "), None, None), "005930");
    }

    #[tokio::test]
    async fn test_refresh_stores_everything() {
        let mut source = FakeSource::default();
        source.prices.insert(
            "005930".to_string(),
            daily_prices(45, |i| 70_000 + i as i64 * 100),
        );
        source
            .flows
            .insert("005930".to_string(), vec![flow("20240101"), flow("20240102")]);
        source.summaries.insert("005930".to_string(), summary());
        let (ctx, fake) = context(source).await;

        let detail = refresh(&ctx, "005930", None).await.unwrap();

        assert_eq!(detail.stock.name.as_deref(), Some("삼성전자"));
        assert_eq!(detail.stock.price, Some(74_400));
        assert_eq!(detail.stock.change.as_deref(), Some("0"));
        assert_eq!(detail.stock.change_rate.as_deref(), Some("0.00"));
        assert_eq!(detail.stock.category.as_deref(), Some("기술/IT"));
        assert_eq!(detail.history.len(), HISTORY_LIMIT as usize);
        assert!(detail.history.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(detail.investor_data.len(), 2);
        assert_eq!(detail.fair_price, Some(110_000));

        let analysis = detail.analysis.unwrap();
        assert_eq!(analysis.opinion, Opinion::Positive.to_string());
        assert_eq!(analysis.toss_url, "https://tossinvest.com/stocks/A005930");
        assert_eq!(analysis.chart_path, None);
        assert!(analysis.id > 0);

        let (rows,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stock_history WHERE code = '005930'")
                .fetch_one(ctx.db.pool())
                .await
                .unwrap();
        assert_eq!(rows, 45);

        let calls = fake.calls();
        assert!(calls[0].starts_with("price_history:005930:"));
        assert_eq!(calls[1], "investor_flows:005930");
        assert_eq!(calls[2], "item_summary:005930");
    }

    #[tokio::test]
    async fn test_refresh_keeps_existing_category_and_tolerates_partial_failures() {
        let mut source = FakeSource::default();
        source
            .prices
            .insert("000660".to_string(), daily_prices(3, |_| 150_000));
        let (ctx, _) = context(source).await;
        Stock::upsert_identity(ctx.db.pool(), "000660", "SK하이닉스", "IT/반도체")
            .await
            .unwrap();

        let detail = refresh(&ctx, "000660", None).await.unwrap();

        assert_eq!(detail.stock.name.as_deref(), Some("SK하이닉스"));
        assert_eq!(detail.stock.category.as_deref(), Some("IT/반도체"));
        assert!(detail.investor_data.is_empty());
        assert_eq!(detail.stock.per, None);
        assert_eq!(detail.fair_price, None);
        // 5 日線不足
        assert_eq!(detail.analysis.unwrap().opinion, "중립적");
    }

    #[tokio::test]
    async fn test_refresh_falls_back_to_stored_data() {
        let mut source = FakeSource::default();
        source.prices.insert("035720".to_string(), Vec::new());
        let (ctx, _) = context(source).await;

        assert!(refresh(&ctx, "035720", None).await.is_none());
        assert!(refresh(&ctx, "999999", None).await.is_none());

        Stock::upsert_identity(ctx.db.pool(), "035720", "카카오", "플랫폼")
            .await
            .unwrap();
        StockHistory::upsert_many(
            &ctx.db,
            "035720",
            &[StockHistory::new("20240102".to_string(), 45_000)],
        )
        .await
        .unwrap();

        let detail = refresh(&ctx, "035720", Some("카카오")).await.unwrap();
        assert_eq!(detail.stock.name.as_deref(), Some("카카오"));
        assert_eq!(detail.history.len(), 1);
        assert!(detail.investor_data.is_empty());
        assert!(detail.analysis.is_none());

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["code"], "035720");
        assert!(json["investorData"].as_array().unwrap().is_empty());
        assert_eq!(json["history"][0]["price"], 45_000);
        assert!(json.get("opinion").is_none());
    }

    #[tokio::test]
    async fn test_refresh_uses_holding_cost() {
        let mut source = FakeSource::default();
        // 持續下跌：5 日線在 20 日線之下
        source.prices.insert(
            "005380".to_string(),
            daily_prices(30, |i| 300_000 - i as i64 * 3_000),
        );
        let (ctx, _) = context(source).await;
        Stock::upsert_identity(ctx.db.pool(), "005380", "현대차", "자동차")
            .await
            .unwrap();
        HoldingStock::new("005380", 280_000, 20)
            .upsert(ctx.db.pool())
            .await
            .unwrap();

        let detail = refresh(&ctx, "005380", None).await.unwrap();
        assert_eq!(detail.stock.price, Some(213_000));
        assert_eq!(detail.analysis.unwrap().opinion, "매도");
    }

    #[tokio::test]
    async fn test_reanalyze_after_cost_change() {
        let mut source = FakeSource::default();
        source.prices.insert(
            "005380".to_string(),
            daily_prices(30, |i| 300_000 - i as i64 * 3_000),
        );
        let (ctx, fake) = context(source).await;

        let detail = refresh(&ctx, "005380", Some("현대차")).await.unwrap();
        assert_eq!(detail.analysis.unwrap().opinion, "부정적");
        let scraped = fake.calls().len();

        HoldingStock::new("005380", 280_000, 20)
            .upsert(ctx.db.pool())
            .await
            .unwrap();
        let analysis = reanalyze(&ctx, "005380").await.unwrap().unwrap();

        assert_eq!(analysis.opinion, "매도");
        assert!(!analysis.advice.is_empty());
        assert_eq!(fake.calls().len(), scraped);
        assert_eq!(
            StockAnalysis::fetch_latest(ctx.db.pool(), "005380")
                .await
                .unwrap()
                .unwrap()
                .id,
            analysis.id
        );
        assert!(reanalyze(&ctx, "999999").await.unwrap().is_none());
    }
}
