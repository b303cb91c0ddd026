//! 執行期共用資源。
//!
//! 資料庫連線池與行情來源在啟動時建立一次，之後由 Web、排程與
//! backfill 流程以參考或 clone 的方式共用，不再使用全域變數。

use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{config, crawler::MarketSource, database::Database};

#[derive(Clone)]
pub struct Context {
    pub db: Database,
    pub source: Arc<dyn MarketSource>,
    /// 日線回溯的日曆天數
    pub history_days: i64,
    /// 批次作業中兩次請求之間的間隔
    pub request_interval: Duration,
    /// 走勢圖圖檔目錄
    pub charts_dir: PathBuf,
}

impl Context {
    pub fn new(db: Database, source: Arc<dyn MarketSource>, settings: &config::App) -> Self {
        Context {
            db,
            source,
            history_days: settings.naver.history_days,
            request_interval: Duration::from_millis(settings.naver.request_interval_ms),
            charts_dir: PathBuf::from(&settings.web.charts_dir),
        }
    }
}
