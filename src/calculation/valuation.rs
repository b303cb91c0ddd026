use serde::Serialize;

/// 推算合理價時要求的報酬率 (%)
const REQUIRED_RETURN: f64 = 10.0;

/// 上漲機率的計算式，原樣回傳給看板顯示
pub const PROBABILITY_FORMULA: &str = "P = (Fair/Current * 50) + (Score * 0.5)";

/// 個股基本面指標
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    pub roe: Option<f64>,
    pub target_price: Option<i64>,
}

/// 合理價。
///
/// 有分析師共識目標價時直接採用；否則以 ROE 推算：
/// 每股淨值 = 現價 / PBR，合理價 = 每股淨值 × ROE / 10。
/// 兩者皆無法使用時回傳 None。
pub fn fair_price(fundamentals: &Fundamentals, price: i64) -> Option<i64> {
    if let Some(target) = fundamentals.target_price.filter(|t| *t > 0) {
        return Some(target);
    }

    let pbr = fundamentals.pbr.filter(|v| v.is_finite() && *v > 0.0)?;
    let roe = fundamentals.roe.filter(|v| v.is_finite() && *v > 0.0)?;
    if price <= 0 {
        return None;
    }

    let bps = price as f64 / pbr;
    let fair = (bps * roe / REQUIRED_RETURN).round();

    (fair > 0.0).then_some(fair as i64)
}

/// 上漲機率：`min(100, round(fair / current × 50 + score / 2))`
///
/// 現價不大於 0 時無法計算。
pub fn probability(fair: i64, current: i64, score: i64) -> Option<i64> {
    if current <= 0 {
        return None;
    }

    let p = (fair as f64 / current as f64 * 50.0 + score as f64 / 2.0).round() as i64;
    Some(p.min(100))
}

/// 現價相對合理價的上漲空間 (%)，取到小數第一位
pub fn upside(fair: i64, current: i64) -> Option<f64> {
    if current <= 0 {
        return None;
    }

    let rate = (fair - current) as f64 / current as f64 * 100.0;
    Some((rate * 10.0).round() / 10.0)
}
