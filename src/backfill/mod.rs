/// 依產業頁收集各分類的股票
pub mod catalog;
/// 依個股的產業名稱重新分類
pub mod category;
/// 抓取單一股票的行情、投資人動向與基本面並寫入資料庫
pub mod quote;
