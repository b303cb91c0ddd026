use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteQueryResult, SqliteExecutor};

use crate::database::table::stock::Stock;

const SELECT_JOINED: &str = r#"
SELECT
    s.code, s.name, s.category, s.price, s.change, s.change_rate,
    s.per, s.pbr, s.roe, s.target_price, s.last_updated,
    h.avg_price, h.weight,
    (SELECT a.opinion FROM stock_analysis a WHERE a.code = s.code ORDER BY a.id DESC LIMIT 1) AS opinion
FROM stocks s
JOIN holding_stocks h ON s.code = h.code
"#;

/// 持股資料列（`holding_stocks`）。
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct HoldingStock {
    pub code: String,
    /// 平均買進成本。
    pub avg_price: i64,
    /// 投資組合占比 (%)。
    pub weight: i64,
}

/// 持股與個股資料的合併結果，附上報酬率與最新投資意見
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Holding {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stock: Stock,
    pub avg_price: Option<i64>,
    pub weight: Option<i64>,
    pub opinion: Option<String>,
    /// (現價 - 成本) / 成本 × 100，取到小數第二位
    #[sqlx(skip)]
    pub profit_rate: Option<f64>,
}

impl Holding {
    fn with_profit_rate(mut self) -> Self {
        self.profit_rate = profit_rate(self.stock.price, self.avg_price);
        self
    }
}

/// 成本不大於 0 或缺少現價時無法計算
pub fn profit_rate(price: Option<i64>, avg_price: Option<i64>) -> Option<f64> {
    match (price, avg_price) {
        (Some(price), Some(avg)) if avg > 0 => {
            let rate = (price - avg) as f64 / avg as f64 * 100.0;
            Some((rate * 100.0).round() / 100.0)
        }
        _ => None,
    }
}

impl HoldingStock {
    pub fn new(code: &str, avg_price: i64, weight: i64) -> Self {
        HoldingStock {
            code: code.to_string(),
            avg_price,
            weight,
        }
    }

    /// 新增或更新持股，`last_updated` 設為現在。
    ///
    /// # Errors
    /// 當 SQL 執行失敗 (包含股票不存在於 `stocks`) 時回傳錯誤。
    pub async fn upsert<'e, E>(&self, executor: E) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
INSERT INTO holding_stocks (code, avg_price, weight, last_updated)
VALUES (?, ?, ?, CURRENT_TIMESTAMP)
ON CONFLICT (code) DO UPDATE SET
    avg_price = excluded.avg_price,
    weight = excluded.weight,
    last_updated = CURRENT_TIMESTAMP
"#,
        )
        .bind(&self.code)
        .bind(self.avg_price)
        .bind(self.weight)
        .execute(executor)
        .await
        .with_context(|| format!("Failed to upsert({}) into holding_stocks", self.code))
    }

    /// 刪除持股，不存在時不視為錯誤
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn delete<'e, E>(executor: E, code: &str) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("DELETE FROM holding_stocks WHERE code = ?")
            .bind(code)
            .execute(executor)
            .await
            .with_context(|| format!("Failed to delete({}) from holding_stocks", code))
    }

    /// 所有持股代號
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fetch_codes<'e, E>(executor: E) -> Result<Vec<String>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar::<_, String>("SELECT code FROM holding_stocks ORDER BY code")
            .fetch_all(executor)
            .await
            .context("Failed to HoldingStock::fetch_codes() from database")
    }

    /// 取得單一持股的成本，供投資意見判斷
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fetch_one<'e, E>(executor: E, code: &str) -> Result<Option<HoldingStock>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, HoldingStock>(
            r#"
SELECT code, COALESCE(avg_price, 0) AS avg_price, COALESCE(weight, 0) AS weight
FROM holding_stocks
WHERE code = ?
"#,
        )
        .bind(code)
        .fetch_optional(executor)
        .await
        .with_context(|| format!("Failed to HoldingStock::fetch_one({}) from database", code))
    }

    /// 所有持股與其個股資料
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fetch_all_joined<'e, E>(executor: E) -> Result<Vec<Holding>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!("{} ORDER BY s.category, s.name", SELECT_JOINED);
        let rows = sqlx::query_as::<_, Holding>(&sql)
            .fetch_all(executor)
            .await
            .context("Failed to HoldingStock::fetch_all_joined() from database")?;

        Ok(rows.into_iter().map(Holding::with_profit_rate).collect())
    }

    /// 單一持股與其個股資料
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fetch_one_joined<'e, E>(executor: E, code: &str) -> Result<Option<Holding>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!("{} WHERE s.code = ?", SELECT_JOINED);
        let row = sqlx::query_as::<_, Holding>(&sql)
            .bind(code)
            .fetch_optional(executor)
            .await
            .with_context(|| {
                format!("Failed to HoldingStock::fetch_one_joined({}) from database", code)
            })?;

        Ok(row.map(Holding::with_profit_rate))
    }
}
