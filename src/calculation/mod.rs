/// 依趨勢、合理價與持股成本給出投資意見
pub mod opinion;
/// 移動平均與趨勢訊號
pub mod trend;
/// 合理價與上漲機率
pub mod valuation;
