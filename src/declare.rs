use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// 投資意見
///
/// 資料庫與 API 皆以韓文標籤儲存與輸出。
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Opinion {
    /// 긍정적
    #[strum(serialize = "긍정적")]
    #[serde(rename = "긍정적")]
    Positive,
    /// 중립적
    #[strum(serialize = "중립적")]
    #[serde(rename = "중립적")]
    Neutral,
    /// 부정적
    #[strum(serialize = "부정적")]
    #[serde(rename = "부정적")]
    Negative,
    /// 추가매수，僅用於持股
    #[strum(serialize = "추가매수")]
    #[serde(rename = "추가매수")]
    AddMore,
    /// 매도，僅用於持股
    #[strum(serialize = "매도")]
    #[serde(rename = "매도")]
    Sell,
}

/// 看板分類與其對應的入口網站產業編號，依序造訪直到湊滿 20 檔
pub const INDUSTRY_CATEGORIES: &[(&str, &[i32])] = &[
    // 반도체와반도체장비, IT서비스
    ("IT/반도체", &[266, 274]),
    // 인터넷, 소프트웨어
    ("플랫폼", &[261, 262]),
    // 자동차, 자동차부품
    ("자동차", &[281, 282]),
    // 전기제품
    ("2차전지", &[271]),
    // 철강, 석유와가스
    ("에너지/철강", &[301, 290]),
    // 제약, 생물공학
    ("바이오", &[304, 307]),
    // 은행, 증권
    ("금융", &[310, 311]),
    // 화장품, 가정용품
    ("화장품/소비재", &[277, 303]),
    ("유통", &[293]),
    ("엔터테인먼트", &[308]),
    ("조선", &[284]),
];

/// 產業名稱關鍵字對應的看板分類，依序比對，先符合者優先
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "기술/IT",
        &[
            "반도체", "디스플레이", "IT", "하드웨어", "통신장비", "전자제품", "컴퓨터", "핸드셋",
            "소프트웨어", "네트워크장비",
        ],
    ),
    (
        "바이오/헬스케어",
        &["제약", "생물공학", "의료기기", "건강관리", "바이오"],
    ),
    ("자동차/모빌리티", &["자동차", "부품", "타이어"]),
    (
        "에너지/소재",
        &[
            "전기제품", "화학", "철강", "비철금속", "에너지장비",
            "석유", "가스", "2차전지", "배터리",
        ],
    ),
    ("금융/지주", &["은행", "증권", "보험", "지주사", "금융"]),
    (
        "소비재/서비스",
        &[
            "식품", "화장품", "소매", "백화점", "섬유", "의류", "의복", "생활용품", "악기", "레저",
            "가구", "유통", "음식료",
        ],
    ),
    (
        "엔터테인먼트/미디어",
        &["게임", "양방향미디어", "방송", "광고", "영화", "콘텐츠", "기획사", "포털"],
    ),
    (
        "조선/기계/방산",
        &["조선", "기계", "항공우주", "건설", "방산", "방위산업"],
    ),
];

/// 產業名稱無法對應任何關鍵字時的分類
pub const DEFAULT_CATEGORY: &str = "소비재/서비스";

/// 查不到產業名稱時的分類
pub const UNCLASSIFIED_CATEGORY: &str = "기타/미분류";

/// 預設的推薦股
#[derive(Debug, Copy, Clone)]
pub struct SeedRecommendation {
    pub code: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub reason: &'static str,
    pub fair_price: i64,
    pub score: i64,
}

const fn seed(
    code: &'static str,
    name: &'static str,
    category: &'static str,
    reason: &'static str,
    fair_price: i64,
    score: i64,
) -> SeedRecommendation {
    SeedRecommendation {
        code,
        name,
        category,
        reason,
        fair_price,
        score,
    }
}

pub const SEED_RECOMMENDATIONS: [SeedRecommendation; 20] = [
    seed("005930", "삼성전자", "IT/반도체", "실적 턴어라운드 및 HBM 수요 기대", 85000, 92),
    seed(
        "000660",
        "SK하이닉스",
        "IT/반도체",
        "HBM 시장 독점적 지위 및 메모리 단가 상승",
        210000,
        95,
    ),
    seed("035420", "NAVER", "플랫폼", "AI 검색 엔진 경쟁력 및 광고 수익 회복", 230000, 88),
    seed("035720", "카카오", "플랫폼", "카카오톡 비즈니스 모델 고도화", 65000, 82),
    seed("005380", "현대차", "자동차", "하이브리드/전기차 점유율 확대 및 고배당", 280000, 90),
    seed("000270", "기아", "자동차", "역대급 수익성 지속 및 주주환원 강화", 140000, 91),
    seed("373220", "LG에너지솔루션", "2차전지", "글로벌 수주 잔고 압도적 1위", 450000, 85),
    seed("006400", "삼성SDI", "2차전지", "차세대 배터리 수익성 위주 성장", 420000, 84),
    seed("005490", "POSCO홀딩스", "에너지/철강", "리튬 사업 가치 가시화", 480000, 83),
    seed("207940", "삼성바이오로직스", "바이오", "압도적인 CMO 생산 능력 및 수주", 1050000, 89),
    seed("068270", "셀트리온", "바이오", "짐펜트라 등 신약 매출 본격화", 220000, 87),
    seed("105560", "KB금융", "금융", "밸류업 프로그램 최대 수혜주", 95000, 93),
    seed("055550", "신한지주", "금융", "안정적 배당 및 자사주 소각", 62000, 86),
    seed(
        "090430",
        "아모레퍼시픽",
        "화장품/소비재",
        "코스알엑스 실적 반영 및 서구권 매출 증대",
        180000,
        81,
    ),
    seed("139480", "이마트", "유통", "자회사 구조조정 및 본업 수익성 개선", 85000, 78),
    seed(
        "051910",
        "LG화학",
        "화학/2차전지",
        "양극재 비중 확대에 따른 밸류에이션 재평가",
        500000,
        80,
    ),
    seed("096770", "SK이노베이션", "에너지", "SK E&S 합병에 따른 재무 건전성 확보", 140000, 79),
    seed(
        "352820",
        "하이브",
        "엔터테인먼트",
        "위버스 플랫폼 수익화 및 아티스트 라인업 다변화",
        250000,
        83,
    ),
    seed("329180", "HD현대중공업", "조선", "조선 업황 슈퍼사이클 진입 및 선가 상승", 210000, 94),
    seed("012330", "현대모비스", "자동차", "전동화 부품 매출 비중 확대", 270000, 84),
];

/// 依產業名稱決定看板分類
pub fn category_of_industry(industry: Option<&str>) -> &'static str {
    let industry = match industry.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return UNCLASSIFIED_CATEGORY,
    };

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| industry.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}
