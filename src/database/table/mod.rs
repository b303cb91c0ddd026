/// 持股
pub mod holding_stock;
/// 推薦股
pub mod recommended_stock;
/// 個股基本資料與最新報價
pub mod stock;
/// 個股分析紀錄
pub mod stock_analysis;
/// 日收盤價
pub mod stock_history;
