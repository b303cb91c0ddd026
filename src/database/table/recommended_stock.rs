use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteQueryResult, SqliteExecutor};

/// 推薦股資料列（`recommended_stocks`）。
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct RecommendedStock {
    pub code: String,
    /// 推薦理由。
    pub reason: String,
    /// 人工設定的合理價。
    pub fair_price: i64,
    /// 推薦分數 (0~100)。
    pub score: i64,
}

/// 推薦股與個股名稱、分類的合併結果
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub code: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub reason: String,
    pub fair_price: i64,
    pub score: i64,
}

impl RecommendedStock {
    pub fn new(code: &str, reason: &str, fair_price: i64, score: i64) -> Self {
        RecommendedStock {
            code: code.to_string(),
            reason: reason.to_string(),
            fair_price,
            score,
        }
    }

    /// 新增或更新推薦股，股票需已存在於 `stocks`。
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn upsert<'e, E>(&self, executor: E) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
INSERT INTO recommended_stocks (code, reason, fair_price, score)
VALUES (?, ?, ?, ?)
ON CONFLICT (code) DO UPDATE SET
    reason = excluded.reason,
    fair_price = excluded.fair_price,
    score = excluded.score
"#,
        )
        .bind(&self.code)
        .bind(&self.reason)
        .bind(self.fair_price)
        .bind(self.score)
        .execute(executor)
        .await
        .with_context(|| format!("Failed to upsert({}) into recommended_stocks", self.code))
    }

    /// 所有推薦股，依分數遞減
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fetch_all_with_stock<'e, E>(executor: E) -> Result<Vec<Recommendation>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Recommendation>(
            r#"
SELECT r.code, s.name, s.category, r.reason, r.fair_price, r.score
FROM recommended_stocks r
JOIN stocks s ON r.code = s.code
ORDER BY r.score DESC, r.code
"#,
        )
        .fetch_all(executor)
        .await
        .context("Failed to RecommendedStock::fetch_all_with_stock() from database")
    }
}
