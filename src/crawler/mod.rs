//! 外部行情來源
//!
//! 所有來源都實作 [`MarketSource`]，資料流程只依賴此 trait，
//! 測試時以假資料替換即可，不需要連網。

use anyhow::Result;
use async_trait::async_trait;

use crate::crawler::naver::{
    industry::ListedStock, investor::InvestorFlow, item::ItemSummary, price_history::DailyPrice,
};

/// 네이버 증권
pub mod naver;

#[async_trait]
pub trait MarketSource: Send + Sync {
    /// 取得 `[start, end]` (`YYYYMMDD`) 期間的日線，依日期遞增
    async fn price_history(&self, code: &str, start: &str, end: &str) -> Result<Vec<DailyPrice>>;

    /// 取得最近 20 個交易日的法人買賣超，依日期遞增
    async fn investor_flows(&self, code: &str) -> Result<Vec<InvestorFlow>>;

    /// 取得個股主頁上的名稱、本益比、股價淨值比、ROE、目標價與產業
    async fn item_summary(&self, code: &str) -> Result<ItemSummary>;

    /// 取得產業分類頁上的個股 (最多 20 檔)
    async fn industry_stocks(&self, industry_no: i32, category: &str) -> Result<Vec<ListedStock>>;
}
