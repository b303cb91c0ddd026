use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::util::{self, datetime, http::element, text};

/// 保留的交易日數
const MAX_ROWS: usize = 20;

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table.type2 tr").expect("Failed to parse investor row selector")
});

/// 單日的機構與外資淨買超
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorFlow {
    /// `YYYYMMDD`
    pub date: String,
    pub close: i64,
    pub volume: i64,
    pub institution: i64,
    pub foreign: i64,
    /// 以 -(機構 + 外資) 估算，忽略其他法人
    pub individual: i64,
}

pub async fn visit(host: &str, code: &str) -> Result<Vec<InvestorFlow>> {
    let url = format!(
        "https://{host}/item/frgn.naver?code={code}",
        host = host,
        code = urlencoding::encode(code)
    );
    let html = util::http::get_use_euc_kr(&url)
        .await
        .with_context(|| format!("Failed to fetch investor page of {}", code))?;
    let flows = parse(&html);

    if flows.is_empty() {
        return Err(anyhow!("No investor rows found for {} at {}", code, url));
    }

    Ok(flows)
}

/// 解析 frgn 頁的日別表格
///
/// 欄位順序：日期、收盤、漲跌、漲跌幅、成交量、機構、外資、外資持股、外資比率。
/// 第一欄不是日期的列（標題、分隔線、交易員資訊）略過。回傳依日期遞增。
pub fn parse(html: &str) -> Vec<InvestorFlow> {
    let document = Html::parse_document(html);
    let mut flows: Vec<InvestorFlow> = document
        .select(&ROW_SELECTOR)
        .filter_map(|row| parse_row(&element::cell_texts(&row)))
        .take(MAX_ROWS)
        .collect();

    flows.reverse();
    flows
}

fn parse_row(cells: &[String]) -> Option<InvestorFlow> {
    if cells.len() < 7 {
        return None;
    }

    let date = datetime::dotted_to_compact(&cells[0])?;
    let close = text::parse_i64(&cells[1], None).ok()?;
    let volume = text::parse_i64(&cells[4], None).ok()?;
    let institution = text::parse_i64(&cells[5], None).ok()?;
    let foreign = text::parse_i64(&cells[6], None).ok()?;

    Some(InvestorFlow {
        date,
        close,
        volume,
        institution,
        foreign,
        individual: -(institution + foreign),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    fn row(date: &str, close: &str, volume: &str, inst: &str, foreign: &str) -> String {
        format!(
            r#"<tr onmouseover="mouseOver(this)">
<td class="tc"><span class="tah p10 gray03">{date}</span></td>
<td class="num"><span class="tah p11">{close}</span></td>
<td class="num"><img src="ico_up.gif"><span class="tah p11 red02">500</span></td>
<td class="num"><span class="tah p11 red01">+0.67%</span></td>
<td class="num"><span class="tah p11">{volume}</span></td>
<td class="num"><span class="tah p11 red01">{inst}</span></td>
<td class="num"><span class="tah p11 blue01">{foreign}</span></td>
<td class="num"><span class="tah p11">3,210,000,000</span></td>
<td class="num"><span class="tah p11">53.80%</span></td>
</tr>"#
        )
    }

    #[test]
    fn test_parse_keeps_latest_twenty_oldest_first() {
        let mut rows = String::new();
        rows.push_str(r#"<tr><th>날짜</th><th>종가</th></tr><tr><td colspan="9"></td></tr>"#);
        // 頁面上最新的日期在最上面
        for day in (1..=25).rev() {
            rows.push_str(&row(
                &format!("2024.01.{:02}", day),
                "74,300",
                "12,345,678",
                "+1,000",
                "-3,500",
            ));
        }
        let html = format!(
            r#"<html><body><table class="type2"><tr><td>거래원</td></tr></table><table class="type2">{}</table></body></html>"#,
            rows
        );

        let flows = parse(&html);
        assert_eq!(flows.len(), 20);
        assert_eq!(flows.first().unwrap().date, "20240106");
        assert_eq!(flows.last().unwrap().date, "20240125");

        let latest = flows.last().unwrap();
        assert_eq!(latest.close, 74300);
        assert_eq!(latest.volume, 12_345_678);
        assert_eq!(latest.institution, 1000);
        assert_eq!(latest.foreign, -3500);
        assert_eq!(latest.individual, 2500);
    }

    #[test]
    fn test_parse_without_table() {
        assert!(parse("<html><body>점검 중</body></html>").is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        match visit("finance.naver.com", "005930").await {
            Ok(flows) => logging::debug_file_async(format!("flows: {:#?}", flows)),
            Err(why) => logging::debug_file_async(format!("Failed to visit because {:?}", why)),
        }
    }
}
