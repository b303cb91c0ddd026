use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Response};
use tokio::sync::Semaphore;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};

use crate::{logging::Logger, util};

pub mod element;

/// A semaphore for limiting concurrent requests.
///
/// 同一時間最多 2 個請求，避免被目標網站封禁。
static SEMAPHORE: Lazy<Semaphore> = Lazy::new(|| Semaphore::new(2));

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// 入口網站只檢查是否為瀏覽器，固定的 UA 即可
const USER_AGENT: &str = "Mozilla/5.0";

const REFERER: &str = "https://finance.naver.com/";

/// HTTP 請求失敗時的最大重試次數。
const MAX_RETRIES: usize = 2;

/// An asynchronous trait that provides a method to force convert a reqwest::Response body
/// from EUC-KR encoding to UTF-8 encoding.
///
/// The legacy item pages are EUC-KR regardless of the charset header.
#[async_trait]
pub trait TextForceEucKr {
    async fn text_force_euc_kr(self) -> Result<String>;
}

#[async_trait]
impl TextForceEucKr for Response {
    async fn text_force_euc_kr(self) -> Result<String> {
        util::text::euc_kr_2_utf8(self.bytes().await?.as_ref())
    }
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        // reqwest 使用 rustls-no-provider，需先安裝 ring；重複安裝會回傳 Err，可忽略
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut headers = header::HeaderMap::new();
        headers.insert(header::REFERER, header::HeaderValue::from_static(REFERER));

        Client::builder()
            .brotli(true)
            .gzip(true)
            .zstd(true)
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(15))
            .tcp_nodelay(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and returns the response as text.
///
/// # Arguments
///
/// * `url`: The URL to send the GET request to, query string included.
pub async fn get(url: &str) -> Result<String> {
    send(url)
        .await?
        .text()
        .await
        .map_err(|e| anyhow!("Error parsing response text: {:?}", e))
}

/// Performs an HTTP GET request and returns the body decoded from EUC-KR.
pub async fn get_use_euc_kr(url: &str) -> Result<String> {
    send(url)
        .await?
        .text_force_euc_kr()
        .await
        .map_err(|e| anyhow!("Error parsing response text use EUC-KR: {:?}", e))
}

/// Sends a GET request with bounded retries.
///
/// A transport error or a non-success status counts as a failed attempt. The
/// delay between attempts grows exponentially with jitter.
///
/// # Errors
///
/// Returns the last error once `MAX_RETRIES` retries are exhausted.
async fn send(url: &str) -> Result<Response> {
    let client = get_client()?;
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(100)
        .max_delay(Duration::from_secs(2))
        .map(jitter)
        .take(MAX_RETRIES);
    let mut attempt = 0;

    Retry::start(strategy, || {
        attempt += 1;
        send_once(client, url, attempt)
    })
    .await
    .map_err(|why| {
        anyhow!(
            "Failed to send request to {} after {} retries; last error: {:?}",
            url,
            MAX_RETRIES,
            why
        )
    })
}

async fn send_once(client: &Client, url: &str, attempt: usize) -> Result<Response> {
    let msg = format!("Attempt {} to send GET:{}", attempt, url);
    let permit = SEMAPHORE.acquire().await;
    let start = Instant::now();
    let res = client.get(url).send().await;
    let elapsed = start.elapsed().as_millis();
    drop(permit);

    match res.and_then(Response::error_for_status) {
        Ok(response) => {
            LOGGER.info(format!("{} {} ms", msg, elapsed));
            Ok(response)
        }
        Err(why) => {
            LOGGER.error(format!("{} failed because {:?}. {} ms", msg, why, elapsed));
            Err(anyhow!(why))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    #[test]
    fn test_get_client_is_singleton() {
        let first = get_client().unwrap() as *const Client;
        let second = get_client().unwrap() as *const Client;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_send_gives_up_after_retries() {
        // 連接埠 1 不會有服務，每次嘗試都被拒絕
        let err = send("http://127.0.0.1:1/").await.unwrap_err();
        assert!(err
            .to_string()
            .contains(&format!("after {} retries", MAX_RETRIES)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_get_use_euc_kr() {
        dotenv::dotenv().ok();
        match get_use_euc_kr("https://finance.naver.com/item/main.naver?code=005930").await {
            Ok(html) => logging::debug_file_async(format!("html length: {}", html.len())),
            Err(why) => logging::debug_file_async(format!("Failed to get because {:?}", why)),
        }
    }
}
