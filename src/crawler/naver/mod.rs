//! # 네이버 증권採集模組
//!
//! - **日線 (`price_history`)**：`siseJson.naver` 回傳的類 JSON 陣列。
//! - **投資人動向 (`investor`)**：`item/frgn.naver` 的機構/外資買賣超表格。
//! - **個股主頁 (`item`)**：PER、PBR、ROE、目標價、名稱與產業。
//! - **產業分類 (`industry`)**：`sise/sise_group_detail.naver` 的個股清單。
//!
//! HTML 頁面皆為 EUC-KR，經 `util::http::get_use_euc_kr` 解碼後以 CSS Selector 解析。

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    config,
    crawler::{
        naver::{
            industry::ListedStock, investor::InvestorFlow, item::ItemSummary,
            price_history::DailyPrice,
        },
        MarketSource,
    },
};

pub mod industry;
pub mod investor;
pub mod item;
pub mod price_history;

/// 네이버 증권採集器
#[derive(Debug, Clone)]
pub struct Naver {
    api_host: String,
    web_host: String,
}

impl Naver {
    pub fn new(settings: &config::Naver) -> Self {
        Naver {
            api_host: settings.api_host.clone(),
            web_host: settings.web_host.clone(),
        }
    }
}

#[async_trait]
impl MarketSource for Naver {
    async fn price_history(&self, code: &str, start: &str, end: &str) -> Result<Vec<DailyPrice>> {
        price_history::visit(&self.api_host, code, start, end).await
    }

    async fn investor_flows(&self, code: &str) -> Result<Vec<InvestorFlow>> {
        investor::visit(&self.web_host, code).await
    }

    async fn item_summary(&self, code: &str) -> Result<ItemSummary> {
        item::visit(&self.web_host, code).await
    }

    async fn industry_stocks(&self, industry_no: i32, category: &str) -> Result<Vec<ListedStock>> {
        industry::visit(&self.web_host, industry_no, category).await
    }
}
