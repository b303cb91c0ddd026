use crate::{
    calculation::{
        trend::{Direction, TrendSignal},
        valuation::{self, Fundamentals},
    },
    declare::Opinion,
    util::text::{figure_or_dash, with_thousands},
};

/// 持股跌破成本此比例且趨勢轉弱時建議賣出
const STOP_LOSS_RATIO: f64 = 0.9;
/// 現價高於合理價此比例時不再給予正面意見
const OVERVALUED_RATIO: f64 = 1.2;
/// 現價低於合理價此比例時不再給予負面意見
const UNDERVALUED_RATIO: f64 = 0.8;

/// 分析說明與操作建議
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub analysis: String,
    pub advice: String,
}

/// 依趨勢、合理價與 (持股時的) 平均成本給出投資意見。
///
/// 5 日線無法計算時一律為中立。
pub fn classify(signal: &TrendSignal, fair: Option<i64>, avg_price: Option<i64>) -> Opinion {
    let sma5 = match signal.sma5 {
        Some(v) => v,
        None => return Opinion::Neutral,
    };
    let price = signal.latest;

    if let Some(avg) = avg_price.filter(|v| *v > 0) {
        if (price as f64) <= avg as f64 * STOP_LOSS_RATIO && !signal.is_bullish() {
            return Opinion::Sell;
        }

        if signal.is_bullish() && price >= sma5 {
            return Opinion::AddMore;
        }
    }

    if signal.is_bullish() && price > sma5 {
        return match fair {
            Some(f) if price as f64 >= f as f64 * OVERVALUED_RATIO => Opinion::Neutral,
            _ => Opinion::Positive,
        };
    }

    let falling = signal.sma20.map(|long| sma5 < long).unwrap_or(false);
    if price < sma5 && falling {
        return match fair {
            Some(f) if price as f64 <= f as f64 * UNDERVALUED_RATIO => Opinion::Neutral,
            _ => Opinion::Negative,
        };
    }

    Opinion::Neutral
}

/// 產生看板上顯示的分析說明與操作建議
pub fn compose(
    signal: &TrendSignal,
    fundamentals: &Fundamentals,
    fair: Option<i64>,
    opinion: Opinion,
    avg_price: Option<i64>,
) -> Composition {
    let mut sentences = Vec::with_capacity(5);
    let price = with_thousands(signal.latest);

    match (signal.sma5, signal.deviation_rate) {
        (Some(sma5), Some(rate)) => {
            let position = match signal.direction {
                Direction::Up => "위",
                Direction::Down => "아래",
            };
            sentences.push(format!(
                "현재가 {}원은 5일 이동평균({}원) {}에 있으며 이격도는 {:.2}%입니다.",
                price,
                with_thousands(sma5),
                position,
                rate
            ));
        }
        _ => sentences.push(format!(
            "현재가는 {}원이며 이동평균을 계산하기에 거래일 데이터가 부족합니다.",
            price
        )),
    }

    if let (Some(sma5), Some(sma20)) = (signal.sma5, signal.sma20) {
        if signal.is_bullish() {
            sentences.push(format!(
                "5일선({}원)이 20일선({}원) 위에 있는 정배열 상태입니다.",
                with_thousands(sma5),
                with_thousands(sma20)
            ));
        } else {
            sentences.push(format!(
                "5일선({}원)이 20일선({}원) 아래에 있어 추세가 약합니다.",
                with_thousands(sma5),
                with_thousands(sma20)
            ));
        }
    }

    match fair.and_then(|f| valuation::upside(f, signal.latest).map(|u| (f, u))) {
        Some((f, upside)) if upside >= 0.0 => sentences.push(format!(
            "적정가는 {}원으로 현재가 대비 {:.1}% 상승 여력이 있습니다.",
            with_thousands(f),
            upside
        )),
        Some((f, upside)) => sentences.push(format!(
            "적정가는 {}원으로 현재가가 {:.1}% 높게 거래되고 있습니다.",
            with_thousands(f),
            -upside
        )),
        None => sentences.push("적정가를 산정할 지표가 부족합니다.".to_string()),
    }

    sentences.push(format!(
        "주요 지표: PER {}, PBR {}, ROE {}",
        figure_or_dash(fundamentals.per),
        figure_or_dash(fundamentals.pbr),
        figure_or_dash(fundamentals.roe)
    ));

    if let Some(avg) = avg_price.filter(|v| *v > 0) {
        let rate = (signal.latest - avg) as f64 / avg as f64 * 100.0;
        sentences.push(format!(
            "평균 단가 {}원 대비 수익률은 {:.2}%입니다.",
            with_thousands(avg),
            rate
        ));
    }

    Composition {
        analysis: sentences.join(" "),
        advice: advice(opinion).to_string(),
    }
}

fn advice(opinion: Opinion) -> &'static str {
    match opinion {
        Opinion::Positive => "상승 추세가 유효합니다. 5일선 지지 여부를 확인하며 분할 매수를 고려하세요.",
        Opinion::Neutral => "뚜렷한 방향성이 없습니다. 추세가 확인될 때까지 관망을 권합니다.",
        Opinion::Negative => "단기 하락 추세입니다. 신규 매수는 보류하고 20일선 회복을 기다리세요.",
        Opinion::AddMore => "보유 종목이 상승 추세에 있습니다. 평균 단가를 고려해 추가 매수를 검토하세요.",
        Opinion::Sell => "평균 단가 대비 10% 이상 하락했고 추세가 약합니다. 비중 축소를 검토하세요.",
    }
}
