use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, Sqlite, SqlitePool, Transaction,
};

use crate::{config, declare::SEED_RECOMMENDATIONS, logging};

pub mod table;

/// 建表語句，皆可重複執行
const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS stocks (
    code TEXT PRIMARY KEY,
    name TEXT,
    category TEXT,
    price INTEGER,
    change TEXT,
    change_rate TEXT,
    per REAL,
    pbr REAL,
    roe REAL,
    target_price INTEGER,
    last_updated DATETIME DEFAULT CURRENT_TIMESTAMP
)"#,
    r#"
CREATE TABLE IF NOT EXISTS holding_stocks (
    code TEXT PRIMARY KEY,
    avg_price INTEGER,
    weight INTEGER,
    last_updated DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (code) REFERENCES stocks (code)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS stock_history (
    code TEXT,
    date TEXT,
    price INTEGER,
    PRIMARY KEY (code, date)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS recommended_stocks (
    code TEXT PRIMARY KEY,
    reason TEXT,
    fair_price INTEGER,
    score INTEGER,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (code) REFERENCES stocks (code)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS stock_analysis (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT,
    analysis TEXT,
    advice TEXT,
    opinion TEXT,
    toss_url TEXT,
    chart_path TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (code) REFERENCES stocks (code)
)"#,
    "CREATE INDEX IF NOT EXISTS idx_stock_analysis_code ON stock_analysis (code, id)",
];

/// SQLite 連線池封裝。
///
/// 由啟動流程建立一次，之後以 clone 的方式傳給 Web 與排程使用。
#[derive(Debug, Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// 開啟 (必要時建立) `settings.path` 上的資料庫檔案。
    ///
    /// # Errors
    /// 當路徑不合法或無法開啟檔案時回傳錯誤。
    pub async fn connect(settings: &config::Sqlite) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", settings.path))
            .with_context(|| format!("Invalid sqlite path {}", settings.path))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open sqlite database {}", settings.path))?;

        Ok(Database { pool })
    }

    /// 測試用的記憶體資料庫，已完成建表
    #[cfg(test)]
    pub async fn memory() -> Result<Self> {
        // 每條連線各自擁有一個 :memory: 資料庫，只能有一條
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Database { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// 取得連線池參考。
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 從目前連線池建立一筆 transaction。
    ///
    /// # Errors
    /// 當 `BEGIN` 失敗時回傳錯誤。
    pub async fn tx(&self) -> Result<Transaction<'_, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// 建表並升級舊版資料表結構
    ///
    /// # Errors
    /// 任何一個步驟失敗即回傳錯誤，已完成的步驟不會回復。
    pub async fn migrate(&self) -> Result<()> {
        for sql in SCHEMA {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute schema statement: {}", sql.trim()))?;
        }

        self.add_column_if_missing("stocks", "category", "TEXT").await?;
        // ALTER TABLE 不接受 CURRENT_TIMESTAMP 預設值，改為補上既有資料
        if self
            .add_column_if_missing("recommended_stocks", "created_at", "DATETIME")
            .await?
        {
            sqlx::query(
                "UPDATE recommended_stocks SET created_at = CURRENT_TIMESTAMP WHERE created_at IS NULL",
            )
            .execute(&self.pool)
            .await
            .context("Failed to backfill recommended_stocks.created_at")?;
        }

        let columns = self.columns_of("stocks").await?;

        if columns.iter().any(|c| c == "avg_price") && columns.iter().any(|c| c == "weight") {
            let moved = sqlx::query(
                r#"
INSERT INTO holding_stocks (code, avg_price, weight)
SELECT code, avg_price, weight FROM stocks WHERE avg_price IS NOT NULL
ON CONFLICT (code) DO UPDATE SET
    avg_price = excluded.avg_price,
    weight = excluded.weight
"#,
            )
            .execute(&self.pool)
            .await
            .context("Failed to move legacy holdings into holding_stocks")?;
            logging::info_file_async(format!(
                "Moved {} legacy holdings into holding_stocks",
                moved.rows_affected()
            ));
        }

        Ok(())
    }

    /// 寫入預設的推薦股，同時更新其名稱與分類
    ///
    /// # Errors
    /// 寫入失敗時回傳錯誤並回滾整批資料。
    pub async fn seed_recommendations(&self) -> Result<()> {
        let mut tx = self.tx().await?;

        for seed in SEED_RECOMMENDATIONS.iter() {
            table::stock::Stock::upsert_identity(&mut *tx, seed.code, seed.name, seed.category)
                .await?;
            table::recommended_stock::RecommendedStock::new(
                seed.code,
                seed.reason,
                seed.fair_price,
                seed.score,
            )
            .upsert(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .context("Failed to commit seed recommendations")?;

        Ok(())
    }

    /// 欄位不存在時新增，回傳是否有新增
    async fn add_column_if_missing(
        &self,
        table: &str,
        column: &str,
        definition: &str,
    ) -> Result<bool> {
        if self.columns_of(table).await?.iter().any(|c| c == column) {
            return Ok(false);
        }

        sqlx::query(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition))
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to add {}.{}", table, column))?;
        logging::info_file_async(format!("Added column {}.{}", table, column));

        Ok(true)
    }

    async fn columns_of(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to read table_info of {}", table))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }
}
