use serde::Serialize;

/// 短期均線天數
pub const SHORT_WINDOW: usize = 5;
/// 長期均線天數
pub const LONG_WINDOW: usize = 20;

/// 現價相對 5 日線的位置
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Direction {
    Up,
    Down,
}

/// 5 日線與 20 日線的排列
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Alignment {
    /// 5 日線在 20 日線之上 (정배열)
    Bullish,
    Mixed,
}

/// 由收盤價序列算出的最新趨勢
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSignal {
    /// 最新收盤價
    pub latest: i64,
    pub sma5: Option<i64>,
    pub sma20: Option<i64>,
    pub direction: Direction,
    pub alignment: Alignment,
    /// |現價 - 5 日線| / 5 日線 × 100，取到小數第二位
    pub deviation_rate: Option<f64>,
}

/// 簡單移動平均。
///
/// 第 `i` 個值為 `prices[i + 1 - window ..= i]` 的平均 (四捨五入)，
/// 資料不足 `window` 筆的位置為 None。
pub fn sma(prices: &[i64], window: usize) -> Vec<Option<i64>> {
    if window == 0 {
        return vec![None; prices.len()];
    }

    let mut result = Vec::with_capacity(prices.len());
    let mut sum: i64 = 0;

    for (i, price) in prices.iter().enumerate() {
        sum += price;
        if i >= window {
            sum -= prices[i - window];
        }

        if i + 1 < window {
            result.push(None);
        } else {
            result.push(Some((sum as f64 / window as f64).round() as i64));
        }
    }

    result
}

impl TrendSignal {
    /// `prices` 依日期遞增；沒有任何價格時回傳 None
    pub fn from_history(prices: &[i64]) -> Option<TrendSignal> {
        let latest = *prices.last()?;
        let sma5 = sma(prices, SHORT_WINDOW).last().copied().flatten();
        let sma20 = sma(prices, LONG_WINDOW).last().copied().flatten();

        let direction = match sma5 {
            Some(short) if latest > short => Direction::Up,
            _ => Direction::Down,
        };

        let alignment = match (sma5, sma20) {
            (Some(short), Some(long)) if short > long => Alignment::Bullish,
            _ => Alignment::Mixed,
        };

        let deviation_rate = sma5.filter(|short| *short > 0).map(|short| {
            let rate = (latest - short).abs() as f64 / short as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        });

        Some(TrendSignal {
            latest,
            sma5,
            sma20,
            direction,
            alignment,
            deviation_rate,
        })
    }

    pub fn is_bullish(&self) -> bool {
        self.alignment == Alignment::Bullish
    }
}
