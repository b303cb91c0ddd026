use anyhow::Result;

use crate::{
    backfill::quote,
    context::Context,
    database::table::{holding_stock::HoldingStock, recommended_stock::RecommendedStock},
    logging,
};

/// 依序刷新所有持股，再刷新所有推薦股
pub async fn execute(ctx: &Context) -> Result<()> {
    let holdings = HoldingStock::fetch_codes(ctx.db.pool()).await?;
    let recommendations = RecommendedStock::fetch_all_with_stock(ctx.db.pool()).await?;
    let mut refreshed = 0;
    let mut failed = 0;

    let targets = holdings
        .iter()
        .map(|code| (code.as_str(), None))
        .chain(
            recommendations
                .iter()
                .map(|rec| (rec.code.as_str(), rec.name.as_deref())),
        );

    for (i, (code, name)) in targets.enumerate() {
        if i > 0 {
            tokio::time::sleep(ctx.request_interval).await;
        }

        match quote::refresh(ctx, code, name).await {
            Some(_) => refreshed += 1,
            None => failed += 1,
        }
    }

    logging::info_file_async(format!(
        "Refreshed {} stocks ({} holdings, {} recommendations), {} without data",
        refreshed,
        holdings.len(),
        recommendations.len(),
        failed
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::testing::{context, daily_prices, FakeSource},
        database::table::stock::Stock,
    };

    #[tokio::test]
    async fn test_execute_refreshes_holdings_first() {
        let mut source = FakeSource::default();
        source
            .prices
            .insert("005380".to_string(), daily_prices(10, |i| 250_000 + i as i64));
        let (ctx, fake) = context(source).await;
        ctx.db.seed_recommendations().await.unwrap();
        HoldingStock::new("005380", 240_000, 10)
            .upsert(ctx.db.pool())
            .await
            .unwrap();

        execute(&ctx).await.unwrap();

        let calls: Vec<String> = fake
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("price_history:"))
            .collect();
        // 持股一次，推薦股 20 檔
        assert_eq!(calls.len(), 21);
        assert!(calls[0].starts_with("price_history:005380:"));

        let stock = Stock::fetch_one(ctx.db.pool(), "005380")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.price, Some(250_009));
        assert_eq!(stock.name.as_deref(), Some("현대차"));
    }
}
