use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};
use encoding_rs::EUC_KR;

const NUMBER_ESCAPE_CHAR: &[char] = &['원', '%', ',', ' ', '"', '\n', '\r', '\t'];

/// Converts an EUC-KR encoded byte slice to a UTF-8 `String`.
///
/// Malformed sequences are replaced with U+FFFD rather than failing the
/// whole page, the same way a browser would render it.
///
/// # Returns
///
/// * `Result<String>`: the decoded text, or an error if the input is empty.
pub fn euc_kr_2_utf8(data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Err(anyhow!("Failed to EUC_KR.decode because the body is empty"));
    }

    let (text, _, _) = EUC_KR.decode(data);
    Ok(text.into_owned())
}

/// 移除所有空白字元，siseJson 的列在不同版本間會混入換行與 tab
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parses an `i64` value from a given string.
///
/// Thousands separators and the characters in `NUMBER_ESCAPE_CHAR` are removed
/// before parsing, so "1,234원" parses as 1234.
pub fn parse_i64(s: &str, escape_chars: Option<Vec<char>>) -> Result<i64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    i64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as i64 because: {:?}", cleaned, why))
}

/// Parses an `f64` value from a given string.
///
/// A lone "-" or "N/A" is how the portal renders a missing figure, callers
/// treat the error as "absent".
pub fn parse_f64(s: &str, escape_chars: Option<Vec<char>>) -> Result<f64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    let value = f64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as f64 because: {:?}", cleaned, why))?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(anyhow!("'{}' is not a finite number", cleaned))
    }
}

/// Removes a set of escape characters from a given string.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}

/// 以千分位逗號格式化整數，例如 1234567 -> "1,234,567"
pub fn with_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if n < 0 {
        out.push('-');
    }

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// 缺少的指標顯示為 "-"
pub fn figure_or_dash(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}
