use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{sqlite::SqliteQueryResult, SqliteExecutor};

/// 個股分析紀錄（`stock_analysis`），每次刷新新增一筆。
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct StockAnalysis {
    pub id: i64,
    pub code: String,
    /// 技術面與估值的說明文字。
    pub analysis: String,
    /// 操作建議。
    pub advice: String,
    /// 投資意見標籤，例如 긍정적。
    pub opinion: String,
    pub toss_url: String,
    /// 走勢圖的對外路徑，圖檔不存在時為 None。
    pub chart_path: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

/// 토스증권個股頁
pub fn toss_url(code: &str) -> String {
    format!("https://tossinvest.com/stocks/A{}", code)
}

impl StockAnalysis {
    pub fn new(
        code: &str,
        analysis: &str,
        advice: &str,
        opinion: &str,
        chart_path: Option<String>,
    ) -> Self {
        StockAnalysis {
            id: 0,
            code: code.to_string(),
            analysis: analysis.to_string(),
            advice: advice.to_string(),
            opinion: opinion.to_string(),
            toss_url: toss_url(code),
            chart_path,
            created_at: None,
        }
    }

    /// 新增一筆分析，回傳新的 id
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn insert<'e, E>(&self, executor: E) -> Result<i64>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
INSERT INTO stock_analysis (code, analysis, advice, opinion, toss_url, chart_path, created_at)
VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
"#,
        )
        .bind(&self.code)
        .bind(&self.analysis)
        .bind(&self.advice)
        .bind(&self.opinion)
        .bind(&self.toss_url)
        .bind(&self.chart_path)
        .execute(executor)
        .await
        .with_context(|| format!("Failed to insert({}) into stock_analysis", self.code))?;

        Ok(result.last_insert_rowid())
    }

    /// 最新的一筆分析
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn fetch_latest<'e, E>(executor: E, code: &str) -> Result<Option<StockAnalysis>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, StockAnalysis>(
            r#"
SELECT id, code, analysis, advice, opinion, toss_url, chart_path, created_at
FROM stock_analysis
WHERE code = ?
ORDER BY id DESC
LIMIT 1
"#,
        )
        .bind(code)
        .fetch_optional(executor)
        .await
        .with_context(|| format!("Failed to StockAnalysis::fetch_latest({}) from database", code))
    }

    /// 刪除超過 `days` 天的分析紀錄
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn delete_older_than<'e, E>(executor: E, days: i64) -> Result<SqliteQueryResult>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("DELETE FROM stock_analysis WHERE created_at < datetime('now', ?)")
            .bind(format!("-{} days", days.max(0)))
            .execute(executor)
            .await
            .with_context(|| format!("Failed to delete stock_analysis older than {} days", days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{table::stock::Stock, Database};

    #[tokio::test]
    async fn test_insert_and_fetch_latest() {
        let db = Database::memory().await.unwrap();
        Stock::upsert_identity(db.pool(), "005930", "삼성전자", "IT/반도체")
            .await
            .unwrap();

        let first = StockAnalysis::new("005930", "첫번째", "관망", "중립적", None)
            .insert(db.pool())
            .await
            .unwrap();
        let second = StockAnalysis::new(
            "005930",
            "두번째",
            "분할 매수",
            "긍정적",
            Some("/charts/005930.png".to_string()),
        )
        .insert(db.pool())
        .await
        .unwrap();
        assert!(second > first);

        let latest = StockAnalysis::fetch_latest(db.pool(), "005930")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.opinion, "긍정적");
        assert_eq!(latest.toss_url, "https://tossinvest.com/stocks/A005930");
        assert_eq!(latest.chart_path.as_deref(), Some("/charts/005930.png"));
        assert!(latest.created_at.is_some());

        assert!(StockAnalysis::fetch_latest(db.pool(), "000660")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let db = Database::memory().await.unwrap();
        Stock::upsert_identity(db.pool(), "005930", "삼성전자", "IT/반도체")
            .await
            .unwrap();
        StockAnalysis::new("005930", "최근", "관망", "중립적", None)
            .insert(db.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO stock_analysis (code, analysis, advice, opinion, toss_url, created_at) VALUES ('005930', '예전', '관망', '중립적', '', datetime('now', '-45 days'))",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let result = StockAnalysis::delete_older_than(db.pool(), 30)
            .await
            .unwrap();
        assert_eq!(result.rows_affected(), 1);

        let latest = StockAnalysis::fetch_latest(db.pool(), "005930")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.analysis, "최근");
    }
}
