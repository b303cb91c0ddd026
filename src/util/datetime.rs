use chrono::{Duration, NaiveDate};

/// 日期的 `YYYYMMDD` 表示，stock_history.date 與 siseJson 皆使用此格式
pub fn to_compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// 回傳 `[today - days, today]` 的起迄日 (皆為 `YYYYMMDD`)
pub fn lookback_window(today: NaiveDate, days: i64) -> (String, String) {
    let start = today - Duration::days(days.max(0));
    (to_compact(start), to_compact(today))
}

/// 將 `2024.02.05` 這類以點分隔的日期轉為 `20240205`，不合法時回傳 None
pub fn dotted_to_compact(date_str: &str) -> Option<String> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y.%m.%d")
        .ok()
        .map(to_compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookback_window() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let (start, end) = lookback_window(today, 65);
        assert_eq!(start, "20231227");
        assert_eq!(end, "20240301");
    }

    #[test]
    fn test_dotted_to_compact() {
        assert_eq!(dotted_to_compact("2024.02.05"), Some("20240205".to_string()));
        assert_eq!(dotted_to_compact(" 2024.12.31 "), Some("20241231".to_string()));
        assert_eq!(dotted_to_compact("2024.13.01"), None);
        assert_eq!(dotted_to_compact("거래일"), None);
    }
}
