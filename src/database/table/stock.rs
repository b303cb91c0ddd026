use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{sqlite::SqliteQueryResult, SqliteExecutor};

/// 搜尋結果最多筆數
const SEARCH_LIMIT: i64 = 10;

const SELECT_STOCK: &str = r#"
SELECT code, name, category, price, change, change_rate, per, pbr, roe, target_price, last_updated
FROM stocks
"#;

/// 個股資料列（`stocks`）。
///
/// 欄位名稱原樣輸出給看板使用。
#[derive(sqlx::FromRow, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Stock {
    /// 六位數股票代號。
    pub code: String,
    pub name: Option<String>,
    /// 看板分類，例如 IT/반도체。
    pub category: Option<String>,
    /// 最新收盤價。
    pub price: Option<i64>,
    pub change: Option<String>,
    pub change_rate: Option<String>,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    pub roe: Option<f64>,
    /// 分析師共識目標價。
    pub target_price: Option<i64>,
    pub last_updated: Option<NaiveDateTime>,
}

/// 搜尋用的精簡資料
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct StockBrief {
    pub code: String,
    pub name: Option<String>,
    pub category: Option<String>,
}

impl Stock {
    /// 只寫入代號、名稱與分類，已存在時覆蓋名稱與分類。
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn upsert_identity<'e, E>(
        executor: E,
        code: &str,
        name: &str,
        category: &str,
    ) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
INSERT INTO stocks (code, name, category)
VALUES (?, ?, ?)
ON CONFLICT (code) DO UPDATE SET
    name = excluded.name,
    category = excluded.category
"#,
        )
        .bind(code)
        .bind(name)
        .bind(category)
        .execute(executor)
        .await
        .with_context(|| format!("Failed to upsert_identity({}) into stocks", code))
    }

    /// 寫入最新報價與基本面數據，`last_updated` 設為現在。
    ///
    /// 不會變更 `category`。
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn upsert_quote<'e, E>(&self, executor: E) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
INSERT INTO stocks (code, name, price, change, change_rate, per, pbr, roe, target_price, last_updated)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
ON CONFLICT (code) DO UPDATE SET
    name = excluded.name,
    price = excluded.price,
    change = excluded.change,
    change_rate = excluded.change_rate,
    per = excluded.per,
    pbr = excluded.pbr,
    roe = excluded.roe,
    target_price = excluded.target_price,
    last_updated = CURRENT_TIMESTAMP
"#,
        )
        .bind(&self.code)
        .bind(&self.name)
        .bind(self.price)
        .bind(&self.change)
        .bind(&self.change_rate)
        .bind(self.per)
        .bind(self.pbr)
        .bind(self.roe)
        .bind(self.target_price)
        .execute(executor)
        .await
        .with_context(|| format!("Failed to upsert_quote({}) into stocks", self.code))
    }

    /// 分類尚未設定時才寫入
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fill_category_if_empty<'e, E>(
        executor: E,
        code: &str,
        category: &str,
    ) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            "UPDATE stocks SET category = ? WHERE code = ? AND (category IS NULL OR category = '')",
        )
        .bind(category)
        .bind(code)
        .execute(executor)
        .await
        .with_context(|| format!("Failed to fill_category_if_empty({}) of stocks", code))
    }

    /// 覆寫分類
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn update_category<'e, E>(
        executor: E,
        code: &str,
        category: &str,
    ) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("UPDATE stocks SET category = ? WHERE code = ?")
            .bind(category)
            .bind(code)
            .execute(executor)
            .await
            .with_context(|| format!("Failed to update_category({}) of stocks", code))
    }

    /// 取得單一股票
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤；查無資料時回傳 `Ok(None)`。
    pub async fn fetch_one<'e, E>(executor: E, code: &str) -> Result<Option<Stock>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Stock>(&format!("{} WHERE code = ?", SELECT_STOCK))
            .bind(code)
            .fetch_optional(executor)
            .await
            .with_context(|| format!("Failed to Stock::fetch_one({}) from database", code))
    }

    /// 取得所有股票，依分類、名稱排序
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fetch_all<'e, E>(executor: E) -> Result<Vec<Stock>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Stock>(&format!("{} ORDER BY category, name", SELECT_STOCK))
            .fetch_all(executor)
            .await
            .context("Failed to Stock::fetch_all() from database")
    }

    /// 名稱或代號包含 `keyword` 的股票，最多 10 筆
    ///
    /// `%` 與 `_` 視為一般字元。
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn search<'e, E>(executor: E, keyword: &str) -> Result<Vec<StockBrief>>
    where
        E: SqliteExecutor<'e>,
    {
        let pattern = format!("%{}%", escape_like(keyword));

        sqlx::query_as::<_, StockBrief>(
            r#"
SELECT code, name, category
FROM stocks
WHERE name LIKE ?1 ESCAPE '\' OR code LIKE ?1 ESCAPE '\'
LIMIT ?2
"#,
        )
        .bind(pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(executor)
        .await
        .with_context(|| format!("Failed to Stock::search({}) from database", keyword))
    }
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn quote(code: &str, name: &str, price: i64) -> Stock {
        Stock {
            code: code.to_string(),
            name: Some(name.to_string()),
            price: Some(price),
            change: Some("0".to_string()),
            change_rate: Some("0.00".to_string()),
            per: Some(12.5),
            pbr: None,
            roe: Some(9.0),
            target_price: Some(90000),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_quote_keeps_category() {
        let db = Database::memory().await.unwrap();
        Stock::upsert_identity(db.pool(), "005930", "삼성전자", "IT/반도체")
            .await
            .unwrap();
        quote("005930", "삼성전자", 74300)
            .upsert_quote(db.pool())
            .await
            .unwrap();

        let stock = Stock::fetch_one(db.pool(), "005930").await.unwrap().unwrap();
        assert_eq!(stock.category.as_deref(), Some("IT/반도체"));
        assert_eq!(stock.price, Some(74300));
        assert_eq!(stock.change_rate.as_deref(), Some("0.00"));
        assert_eq!(stock.pbr, None);
        assert!(stock.last_updated.is_some());

        assert!(Stock::fetch_one(db.pool(), "999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fill_category_if_empty() {
        let db = Database::memory().await.unwrap();
        quote("000660", "SK하이닉스", 150000)
            .upsert_quote(db.pool())
            .await
            .unwrap();

        Stock::fill_category_if_empty(db.pool(), "000660", "기술/IT")
            .await
            .unwrap();
        Stock::fill_category_if_empty(db.pool(), "000660", "소비재/서비스")
            .await
            .unwrap();
        let stock = Stock::fetch_one(db.pool(), "000660").await.unwrap().unwrap();
        assert_eq!(stock.category.as_deref(), Some("기술/IT"));

        Stock::update_category(db.pool(), "000660", "IT/반도체")
            .await
            .unwrap();
        let stock = Stock::fetch_one(db.pool(), "000660").await.unwrap().unwrap();
        assert_eq!(stock.category.as_deref(), Some("IT/반도체"));
    }

    #[tokio::test]
    async fn test_fetch_all_and_search() {
        let db = Database::memory().await.unwrap();
        Stock::upsert_identity(db.pool(), "005380", "현대차", "자동차")
            .await
            .unwrap();
        Stock::upsert_identity(db.pool(), "005930", "삼성전자", "IT/반도체")
            .await
            .unwrap();
        Stock::upsert_identity(db.pool(), "006400", "삼성SDI", "2차전지")
            .await
            .unwrap();

        let all = Stock::fetch_all(db.pool()).await.unwrap();
        let codes: Vec<&str> = all.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["006400", "005930", "005380"]);

        let found = Stock::search(db.pool(), "삼성").await.unwrap();
        assert_eq!(found.len(), 2);

        let found = Stock::search(db.pool(), "0053").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_deref(), Some("현대차"));

        assert!(Stock::search(db.pool(), "%").await.unwrap().is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c\\"), "a\\%b\\_c\\\\");
        assert_eq!(escape_like("삼성"), "삼성");
    }
}
