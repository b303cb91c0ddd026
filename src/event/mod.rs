/// 每週重建股票清單與分類
pub mod catalog;
/// 收盤後刷新持股與推薦股
pub mod refresh;
/// 清除過期的日線與分析紀錄
pub mod retention;
