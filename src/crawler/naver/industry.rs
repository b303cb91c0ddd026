use std::collections::HashSet;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::util;

/// 每個產業頁最多取用的股票數
pub const MAX_STOCKS: usize = 20;

static ITEM_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href^="/item/main.naver?code="]"#)
        .expect("Failed to parse item link selector")
});

/// 產業頁上列出的一檔股票
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedStock {
    pub code: String,
    pub name: String,
    /// 看板上的分類，而非入口網站的產業名稱
    pub category: String,
}

pub async fn visit(host: &str, industry_no: i32, category: &str) -> Result<Vec<ListedStock>> {
    let url = format!(
        "https://{host}/sise/sise_group_detail.naver?type=upjong&no={no}",
        host = host,
        no = industry_no
    );
    let html = util::http::get_use_euc_kr(&url)
        .await
        .with_context(|| format!("Failed to fetch industry page {}", industry_no))?;

    Ok(parse(&html, category))
}

pub fn parse(html: &str, category: &str) -> Vec<ListedStock> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut stocks = Vec::with_capacity(MAX_STOCKS);

    for link in document.select(&ITEM_LINK_SELECTOR) {
        let code = match link
            .value()
            .attr("href")
            .and_then(|href| href.strip_prefix("/item/main.naver?code="))
        {
            Some(code) if is_stock_code(code) => code,
            _ => continue,
        };

        let name = link.text().collect::<String>().trim().to_string();
        if name.is_empty() || !seen.insert(code.to_string()) {
            continue;
        }

        stocks.push(ListedStock {
            code: code.to_string(),
            name,
            category: category.to_string(),
        });

        if stocks.len() >= MAX_STOCKS {
            break;
        }
    }

    stocks
}

/// 六位數字的股票代號
pub fn is_stock_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    #[test]
    fn test_parse_unique_codes() {
        let html = r#"<table class="type_5">
<tr><td class="name"><a href="/item/main.naver?code=005930">삼성전자</a></td></tr>
<tr><td class="name"><a href="/item/main.naver?code=000660">SK하이닉스</a></td></tr>
<tr><td><a href="/item/main.naver?code=005930">삼성전자</a></td></tr>
<tr><td><a href="/item/main.naver?code=0059">broken</a></td></tr>
<tr><td><a href="/item/main.naver?code=042700&amp;page=1">한미반도체</a></td></tr>
<tr><td><a href="/sise/sise_index.naver?code=KOSPI">코스피</a></td></tr>
</table>"#;

        let stocks = parse(html, "IT/반도체");
        assert_eq!(stocks.len(), 2);
        assert_eq!(stocks[0].code, "005930");
        assert_eq!(stocks[0].name, "삼성전자");
        assert_eq!(stocks[1].code, "000660");
        assert!(stocks.iter().all(|s| s.category == "IT/반도체"));
    }

    #[test]
    fn test_parse_caps_at_twenty() {
        let links: String = (0..30)
            .map(|i| format!(r#"<a href="/item/main.naver?code={:06}">종목{}</a>"#, 100000 + i, i))
            .collect();
        let stocks = parse(&format!("<div>{}</div>", links), "조선");
        assert_eq!(stocks.len(), MAX_STOCKS);
        assert_eq!(stocks.last().unwrap().code, "100019");
    }

    #[test]
    fn test_is_stock_code() {
        assert!(is_stock_code("005930"));
        assert!(!is_stock_code("00593"));
        assert!(!is_stock_code("00593A"));
        assert!(!is_stock_code("０05930"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        match visit("finance.naver.com", 278, "IT/반도체").await {
            Ok(stocks) => logging::debug_file_async(format!("stocks: {:#?}", stocks)),
            Err(why) => logging::debug_file_async(format!("Failed to visit because {:?}", why)),
        }
    }
}
