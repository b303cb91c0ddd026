use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::util::{self, http::element, text};

static TARGET_CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.rwidth td").expect("Failed to parse rwidth selector"));
static BAR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.bar").expect("Failed to parse bar selector"));
static EM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("em").expect("Failed to parse em selector"));
static TR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Failed to parse tr selector"));
static ROE_HEADER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th.th_cop_anal13").expect("Failed to parse ROE selector"));

/// 年度欄位位於第四個 td
const ROE_ANNUAL_COLUMN: usize = 3;

/// 個股主頁上的基本面摘要，頁面缺少的欄位為 None
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub name: Option<String>,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    pub roe: Option<f64>,
    /// 分析師共識目標價
    pub target_price: Option<i64>,
    /// 產業名稱，例如 반도체와반도체장비
    pub industry: Option<String>,
}

pub async fn visit(host: &str, code: &str) -> Result<ItemSummary> {
    let url = format!(
        "https://{host}/item/main.naver?code={code}",
        host = host,
        code = urlencoding::encode(code)
    );
    let html = util::http::get_use_euc_kr(&url)
        .await
        .with_context(|| format!("Failed to fetch item page of {}", code))?;

    Ok(parse(&html))
}

pub fn parse(html: &str) -> ItemSummary {
    let document = Html::parse_document(html);

    ItemSummary {
        name: parse_name(&document),
        per: element::document_f64(&document, "#_per"),
        pbr: element::document_f64(&document, "#_pbr"),
        roe: parse_roe(&document),
        target_price: parse_target_price(&document),
        industry: element::document_value(&document, r#"a[href*="type=upjong"]"#),
    }
}

/// `<title>삼성전자 : Npay 증권</title>`
fn parse_name(document: &Html) -> Option<String> {
    let title = element::document_value(document, "title")?;
    let name = title.split(" : ").next()?.trim();

    if name.is_empty() || name == title.trim() {
        return None;
    }

    Some(name.to_string())
}

/// 投資意見表格中 `l` 分隔符號之後的數字
fn parse_target_price(document: &Html) -> Option<i64> {
    document
        .select(&TARGET_CELL_SELECTOR)
        .find(|cell| cell.select(&BAR_SELECTOR).next().is_some())
        .and_then(|cell| cell.select(&EM_SELECTOR).last())
        .and_then(|em| text::parse_i64(&em.text().collect::<String>(), None).ok())
        .filter(|price| *price > 0)
}

fn parse_roe(document: &Html) -> Option<f64> {
    let row = document
        .select(&TR_SELECTOR)
        .find(|tr| tr.select(&ROE_HEADER_SELECTOR).next().is_some())?;

    roe_from_row(&row)
}

fn roe_from_row(row: &ElementRef) -> Option<f64> {
    let cells = element::cell_texts(row);

    cells
        .get(ROE_ANNUAL_COLUMN)
        .and_then(|v| parse_figure(v))
        .or_else(|| cells.iter().find_map(|v| parse_figure(v)))
}

/// "-" 與空字串代表沒有資料
fn parse_figure(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value == "-" {
        return None;
    }

    text::parse_f64(value, None).ok()
}
