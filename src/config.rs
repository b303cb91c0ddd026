use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub system: System,
    #[serde(default)]
    pub sqlite: Sqlite,
    #[serde(default)]
    pub naver: Naver,
    #[serde(default)]
    pub web: Web,
    #[serde(default)]
    pub retention: Retention,
    #[serde(default)]
    pub scheduler: Scheduler,
}

const SYSTEM_HOST: &str = "SYSTEM_HOST";
const SYSTEM_PORT: &str = "SYSTEM_PORT";
/// 常見的部署平台以 PORT 指定埠號
const PORT: &str = "PORT";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct System {
    pub host: String,
    pub port: u16,
}

impl Default for System {
    fn default() -> Self {
        System {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

const SQLITE_PATH: &str = "SQLITE_PATH";
const SQLITE_MAX_CONNECTIONS: &str = "SQLITE_MAX_CONNECTIONS";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Sqlite {
    /// 資料庫檔案路徑
    pub path: String,
    pub max_connections: u32,
}

impl Default for Sqlite {
    fn default() -> Self {
        Sqlite {
            path: "stocks.db".to_string(),
            max_connections: 4,
        }
    }
}

const NAVER_API_HOST: &str = "NAVER_API_HOST";
const NAVER_WEB_HOST: &str = "NAVER_WEB_HOST";
const NAVER_HISTORY_DAYS: &str = "NAVER_HISTORY_DAYS";
const NAVER_REQUEST_INTERVAL_MS: &str = "NAVER_REQUEST_INTERVAL_MS";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Naver {
    /// 日線報價 (siseJson) 的主機
    pub api_host: String,
    /// 個股頁、投資人頁與產業頁的主機
    pub web_host: String,
    /// 回溯的日曆天數，需涵蓋 40 個交易日
    pub history_days: i64,
    /// 批次作業中兩次請求的間隔
    pub request_interval_ms: u64,
}

impl Default for Naver {
    fn default() -> Self {
        Naver {
            api_host: "api.finance.naver.com".to_string(),
            web_host: "finance.naver.com".to_string(),
            history_days: 65,
            request_interval_ms: 100,
        }
    }
}

const WEB_CHARTS_DIR: &str = "WEB_CHARTS_DIR";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Web {
    /// 走勢圖圖檔目錄，對外掛在 /charts
    pub charts_dir: String,
}

impl Default for Web {
    fn default() -> Self {
        Web {
            charts_dir: "charts".to_string(),
        }
    }
}

const RETENTION_HISTORY_DAYS: &str = "RETENTION_HISTORY_DAYS";
const RETENTION_ANALYSIS_DAYS: &str = "RETENTION_ANALYSIS_DAYS";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Retention {
    /// stock_history 保留天數
    pub history_days: i64,
    /// stock_analysis 保留天數
    pub analysis_days: i64,
}

impl Default for Retention {
    fn default() -> Self {
        Retention {
            history_days: 180,
            analysis_days: 30,
        }
    }
}

const SCHEDULER_ENABLED: &str = "SCHEDULER_ENABLED";
const SCHEDULER_REFRESH_CRON: &str = "SCHEDULER_REFRESH_CRON";
const SCHEDULER_RETENTION_CRON: &str = "SCHEDULER_RETENTION_CRON";
const SCHEDULER_CATALOG_CRON: &str = "SCHEDULER_CATALOG_CRON";

/// 排程設定，cron 皆為 UTC
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Scheduler {
    pub enabled: bool,
    pub refresh_cron: String,
    pub retention_cron: String,
    pub catalog_cron: String,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler {
            enabled: true,
            // 16:00 KST 收盤後
            refresh_cron: "0 0 7 * * Mon-Fri".to_string(),
            // 03:00 KST
            retention_cron: "0 0 18 * * *".to_string(),
            // 週日 05:00 KST
            catalog_cron: "0 0 20 * * Sat".to_string(),
        }
    }
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        logging::error_file_async(format!(
            "I can't read the config context because {:?}",
            why
        ));
        App::from_env()
    })
});

impl App {
    pub fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::from_env())
    }

    /// 以預設值為底，從 env 中讀取設定值
    fn from_env() -> Self {
        App::default().override_with_env()
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(host) = env::var(SYSTEM_HOST) {
            self.system.host = host;
        }

        if let Some(port) = env_parse(PORT) {
            self.system.port = port;
        }

        if let Some(port) = env_parse(SYSTEM_PORT) {
            self.system.port = port;
        }

        if let Ok(path) = env::var(SQLITE_PATH) {
            self.sqlite.path = path;
        }

        if let Some(max) = env_parse(SQLITE_MAX_CONNECTIONS) {
            self.sqlite.max_connections = max;
        }

        if let Ok(host) = env::var(NAVER_API_HOST) {
            self.naver.api_host = host;
        }

        if let Ok(host) = env::var(NAVER_WEB_HOST) {
            self.naver.web_host = host;
        }

        if let Some(days) = env_parse(NAVER_HISTORY_DAYS) {
            self.naver.history_days = days;
        }

        if let Some(ms) = env_parse(NAVER_REQUEST_INTERVAL_MS) {
            self.naver.request_interval_ms = ms;
        }

        if let Ok(dir) = env::var(WEB_CHARTS_DIR) {
            self.web.charts_dir = dir;
        }

        if let Some(days) = env_parse(RETENTION_HISTORY_DAYS) {
            self.retention.history_days = days;
        }

        if let Some(days) = env_parse(RETENTION_ANALYSIS_DAYS) {
            self.retention.analysis_days = days;
        }

        if let Some(enabled) = env_parse(SCHEDULER_ENABLED) {
            self.scheduler.enabled = enabled;
        }

        if let Ok(cron) = env::var(SCHEDULER_REFRESH_CRON) {
            self.scheduler.refresh_cron = cron;
        }

        if let Ok(cron) = env::var(SCHEDULER_RETENTION_CRON) {
            self.scheduler.retention_cron = cron;
        }

        if let Ok(cron) = env::var(SCHEDULER_CATALOG_CRON) {
            self.scheduler.catalog_cron = cron;
        }

        self
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            logging::error_file_async(format!("Failed to parse env {}={}", key, value));
            None
        }
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let app = App::default();
        assert_eq!(app.system.port, 3001);
        assert_eq!(app.sqlite.path, "stocks.db");
        assert_eq!(app.naver.history_days, 65);
        assert_eq!(app.retention.analysis_days, 30);
        assert!(app.scheduler.enabled);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "system": { "port": 8080 }, "retention": { "history_days": 90 } }"#;
        let app: App = serde_json::from_str(json).unwrap();
        assert_eq!(app.system.port, 8080);
        assert_eq!(app.system.host, "0.0.0.0");
        assert_eq!(app.retention.history_days, 90);
        assert_eq!(app.retention.analysis_days, 30);
        assert_eq!(app.naver.web_host, "finance.naver.com");
    }

    #[tokio::test]
    #[ignore]
    async fn test_init() {
        dotenv::dotenv().ok();
        logging::debug_file_async(format!("SETTINGS: {:#?}\r\n", *SETTINGS));
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}
