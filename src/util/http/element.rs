use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::util::text;

/// Extracts the trimmed text of the first element matching `css_selector` under `element`.
///
/// Returns `None` when the selector is invalid, nothing matches, or the text is empty.
pub fn parse_value(element: &ElementRef, css_selector: &str) -> Option<String> {
    let selector = Selector::parse(css_selector).ok()?;
    element
        .select(&selector)
        .next()
        .map(|v| v.text().collect::<String>().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Same as [`parse_value`] but starting from the document root.
pub fn document_value(document: &Html, css_selector: &str) -> Option<String> {
    parse_value(&document.root_element(), css_selector)
}

/// Extracts the value of the specified CSS selector and converts it to an `f64`.
///
/// Figures rendered as "-" or "N/A" become `None`.
pub fn document_f64(document: &Html, css_selector: &str) -> Option<f64> {
    document_value(document, css_selector).and_then(|v| text::parse_f64(&v, None).ok())
}

/// 取得元素底下每個 `td` 的文字（已 trim）
pub fn cell_texts(row: &ElementRef) -> Vec<String> {
    static TD: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("td").ok());

    match TD.as_ref() {
        Some(td) => row
            .select(td)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect(),
        None => Vec::new(),
    }
}
