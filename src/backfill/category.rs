use anyhow::Result;

use crate::{
    context::Context,
    database::table::stock::Stock,
    declare, logging,
};

/// 依個股主頁上的產業名稱重新設定所有股票的看板分類。
///
/// 查不到產業時歸為「기타/미분류」，請求之間間隔 `request_interval`。
/// 回傳更新的筆數。
pub async fn update(ctx: &Context) -> Result<usize> {
    let stocks = Stock::fetch_all(ctx.db.pool()).await?;
    let mut updated = 0;

    logging::info_file_async(format!("Starting categorization for {} stocks", stocks.len()));

    for (i, stock) in stocks.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(ctx.request_interval).await;
        }

        let industry = match ctx.source.item_summary(&stock.code).await {
            Ok(summary) => summary.industry,
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to fetch industry of {} because {:?}",
                    stock.code, why
                ));
                None
            }
        };
        let category = declare::category_of_industry(industry.as_deref());

        match Stock::update_category(ctx.db.pool(), &stock.code, category).await {
            Ok(_) => {
                logging::debug_file_async(format!(
                    "[{}] {} | Industry: {} -> Category: {}",
                    stock.code,
                    stock.name.as_deref().unwrap_or_default(),
                    industry.as_deref().unwrap_or("-"),
                    category
                ));
                updated += 1;
            }
            Err(why) => logging::error_file_async(format!("{:?}", why)),
        }
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::testing::{context, FakeSource},
        crawler::naver::item::ItemSummary,
    };

    fn industry(name: &str) -> ItemSummary {
        ItemSummary {
            industry: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_update_maps_industries() {
        let mut source = FakeSource::default();
        source
            .summaries
            .insert("005930".to_string(), industry("반도체와반도체장비"));
        source
            .summaries
            .insert("068270".to_string(), industry("생물공학"));
        source
            .summaries
            .insert("003550".to_string(), industry("복합기업"));
        let (ctx, _) = context(source).await;

        for (code, name) in [
            ("005930", "삼성전자"),
            ("068270", "셀트리온"),
            ("003550", "LG"),
            ("999990", "상장폐지"),
        ] {
            Stock::upsert_identity(ctx.db.pool(), code, name, "")
                .await
                .unwrap();
        }

        assert_eq!(update(&ctx).await.unwrap(), 4);

        let category = |code: &'static str| {
            let pool = ctx.db.pool().clone();
            async move {
                Stock::fetch_one(&pool, code)
                    .await
                    .unwrap()
                    .and_then(|s| s.category)
                    .unwrap()
            }
        };
        assert_eq!(category("005930").await, "기술/IT");
        assert_eq!(category("068270").await, "바이오/헬스케어");
        assert_eq!(category("003550").await, declare::DEFAULT_CATEGORY);
        assert_eq!(category("999990").await, declare::UNCLASSIFIED_CATEGORY);
    }
}
