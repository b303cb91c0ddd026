use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::util::{self, text};

/// 一列日線：`["20240205", 74300, 75000, 73800, 74300, 9876543, 54.12]`
///
/// 標題列為單引號，不會被匹配；數值欄位有無雙引號皆可。
static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\["(\d{8})","?(\d+)"?,"?(\d+)"?,"?(\d+)"?,"?(\d+)"?,"?(\d+)"?(?:,"?([\d.]+)"?)?\]"#,
    )
    .expect("Failed to compile siseJson row regex")
});

/// 單日行情
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPrice {
    /// `YYYYMMDD`
    pub date: String,
    pub open: i64,
    pub high: i64,
    pub low: i64,
    /// 收盤價
    pub close: i64,
    pub volume: i64,
    /// 外國人持股比率 (%)
    pub foreign_rate: Option<f64>,
}

/// 取得指定期間的日線
pub async fn visit(host: &str, code: &str, start: &str, end: &str) -> Result<Vec<DailyPrice>> {
    let url = format!(
        "https://{host}/siseJson.naver?symbol={symbol}&requestType=1&startTime={start}&endTime={end}&timeframe=day",
        host = host,
        symbol = urlencoding::encode(code),
        start = start,
        end = end
    );
    let body = util::http::get(&url)
        .await
        .with_context(|| format!("Failed to fetch price history of {}", code))?;

    Ok(parse(&body))
}

/// 解析 siseJson 的回應，無法辨識的列直接略過
pub fn parse(body: &str) -> Vec<DailyPrice> {
    let cleaned = text::strip_whitespace(body);

    ROW.captures_iter(&cleaned)
        .filter_map(|caps| {
            Some(DailyPrice {
                date: caps.get(1)?.as_str().to_string(),
                open: caps.get(2)?.as_str().parse().ok()?,
                high: caps.get(3)?.as_str().parse().ok()?,
                low: caps.get(4)?.as_str().parse().ok()?,
                close: caps.get(5)?.as_str().parse().ok()?,
                volume: caps.get(6)?.as_str().parse().ok()?,
                foreign_rate: caps.get(7).and_then(|m| m.as_str().parse().ok()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    const BODY: &str = r#"
 [['날짜', '시가', '고가', '저가', '종가', '거래량', '외국인소진율'],
["20240205", 74300, 75000, 73800, 74300, 12345678, 54.12],
["20240206", "74500", "74900", "73900", "74400", "9876543", "54.2"],

["20240207", 75000, 75800, 74600, 75700, 15000000, 54.31]
]
"#;

    #[test]
    fn test_parse_rows_in_source_order() {
        let rows = parse(BODY);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, "20240205");
        assert_eq!(rows[0].close, 74300);
        assert_eq!(rows[1].open, 74500);
        assert_eq!(rows[1].foreign_rate, Some(54.2));
        assert_eq!(rows[2].close, 75700);
        assert_eq!(rows[2].volume, 15_000_000);
    }

    #[test]
    fn test_parse_tolerates_missing_foreign_rate_and_garbage() {
        let rows = parse(r#"[["20240205", 100, 110, 90, 105, 1000]], <html>error</html>"#);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].foreign_rate, None);

        assert!(parse("").is_empty());
        assert!(parse("[['날짜', '시가']]").is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        match visit("api.finance.naver.com", "005930", "20240101", "20240301").await {
            Ok(rows) => logging::debug_file_async(format!("rows: {}", rows.len())),
            Err(why) => logging::debug_file_async(format!("Failed to visit because {:?}", why)),
        }
    }
}
