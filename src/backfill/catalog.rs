use anyhow::{Context as _, Result};

use crate::{
    context::Context,
    crawler::naver::industry::{ListedStock, MAX_STOCKS},
    database::table::stock::Stock,
    declare::INDUSTRY_CATEGORIES,
    logging,
};

/// 依看板分類造訪對應的產業頁，每個分類收集至多 20 檔並寫入 `stocks`。
///
/// 單一產業頁失敗只記錄錯誤，不影響其他分類。回傳寫入的筆數。
pub async fn collect(ctx: &Context) -> Result<usize> {
    let mut total = 0;

    for (category, industry_nos) in INDUSTRY_CATEGORIES {
        let stocks = gather(ctx, category, industry_nos).await;
        if stocks.is_empty() {
            logging::warn_file_async(format!("No stocks collected for {}", category));
            continue;
        }

        let mut tx = ctx.db.tx().await?;
        for stock in &stocks {
            Stock::upsert_identity(&mut *tx, &stock.code, &stock.name, &stock.category).await?;
        }
        tx.commit()
            .await
            .with_context(|| format!("Failed to commit catalog of {}", category))?;

        logging::info_file_async(format!("Saved {} stocks for {}", stocks.len(), category));
        total += stocks.len();
    }

    Ok(total)
}

async fn gather(ctx: &Context, category: &str, industry_nos: &[i32]) -> Vec<ListedStock> {
    let mut stocks: Vec<ListedStock> = Vec::with_capacity(MAX_STOCKS);

    for (i, no) in industry_nos.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(ctx.request_interval).await;
        }

        match ctx.source.industry_stocks(*no, category).await {
            Ok(found) => {
                for stock in found {
                    if !stocks.iter().any(|s| s.code == stock.code) {
                        stocks.push(stock);
                    }
                }
            }
            Err(why) => logging::error_file_async(format!(
                "Failed to fetch industry {} for {} because {:?}",
                no, category, why
            )),
        }

        if stocks.len() >= MAX_STOCKS {
            break;
        }
    }

    stocks.truncate(MAX_STOCKS);
    stocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{context, FakeSource};

    fn listed(range: std::ops::Range<u32>) -> Vec<ListedStock> {
        range
            .map(|i| ListedStock {
                code: format!("{:06}", i),
                name: format!("종목{}", i),
                category: String::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_collect_stops_at_twenty_per_category() {
        let mut source = FakeSource::default();
        // IT/반도체: 266 已有 20 檔，不應再造訪 274
        source.industries.insert(266, listed(100_000..100_025));
        source.industries.insert(274, listed(200_000..200_005));
        // 플랫폼: 261 只有 5 檔，繼續造訪 262 (含重複)
        source.industries.insert(261, listed(300_000..300_005));
        source.industries.insert(262, listed(300_003..300_010));
        let (ctx, fake) = context(source).await;

        let total = collect(&ctx).await.unwrap();
        assert_eq!(total, 30);

        let calls = fake.calls();
        assert!(calls.contains(&"industry_stocks:266".to_string()));
        assert!(!calls.contains(&"industry_stocks:274".to_string()));
        assert!(calls.contains(&"industry_stocks:262".to_string()));

        let stock = Stock::fetch_one(ctx.db.pool(), "300009")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.category.as_deref(), Some("플랫폼"));
        assert!(Stock::fetch_one(ctx.db.pool(), "100020")
            .await
            .unwrap()
            .is_none());
    }
}
