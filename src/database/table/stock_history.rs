use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteQueryResult, SqliteExecutor};

use crate::database::Database;

/// 單日收盤價（`stock_history`）。
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct StockHistory {
    /// `YYYYMMDD`
    pub date: String,
    pub price: i64,
}

impl StockHistory {
    pub fn new(date: String, price: i64) -> Self {
        StockHistory { date, price }
    }

    /// 在同一個 transaction 內寫入多筆收盤價，任一筆失敗即全部回滾。
    ///
    /// # Errors
    /// 當 transaction 或 SQL 執行失敗時回傳錯誤。
    pub async fn upsert_many(db: &Database, code: &str, rows: &[StockHistory]) -> Result<u64> {
        let mut tx = db.tx().await?;
        let mut affected = 0;

        for row in rows {
            let result = sqlx::query(
                r#"
INSERT INTO stock_history (code, date, price)
VALUES (?, ?, ?)
ON CONFLICT (code, date) DO UPDATE SET price = excluded.price
"#,
            )
            .bind(code)
            .bind(&row.date)
            .bind(row.price)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(r) => affected += r.rows_affected(),
                Err(why) => {
                    tx.rollback().await?;
                    return Err(anyhow!(
                        "Failed to upsert stock_history({}, {}) because: {:?}",
                        code,
                        row.date,
                        why
                    ));
                }
            }
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit stock_history of {}", code))?;

        Ok(affected)
    }

    /// 最近 `limit` 筆收盤價，依日期遞增
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fetch_latest<'e, E>(
        executor: E,
        code: &str,
        limit: i64,
    ) -> Result<Vec<StockHistory>>
    where
        E: SqliteExecutor<'e>,
    {
        let mut rows = sqlx::query_as::<_, StockHistory>(
            "SELECT date, price FROM stock_history WHERE code = ? ORDER BY date DESC LIMIT ?",
        )
        .bind(code)
        .bind(limit)
        .fetch_all(executor)
        .await
        .with_context(|| format!("Failed to StockHistory::fetch_latest({}) from database", code))?;

        rows.reverse();
        Ok(rows)
    }

    /// 刪除 `cutoff` (`YYYYMMDD`) 之前的資料
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn delete_before<'e, E>(executor: E, cutoff: &str) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("DELETE FROM stock_history WHERE date < ?")
            .bind(cutoff)
            .execute(executor)
            .await
            .with_context(|| format!("Failed to delete stock_history before {}", cutoff))
    }
}
