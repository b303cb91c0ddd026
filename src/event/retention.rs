use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};

use crate::{
    context::Context,
    database::table::{stock_analysis::StockAnalysis, stock_history::StockHistory},
    logging,
    util::datetime,
};

/// 刪除超過保留天數的日線與分析紀錄
pub async fn execute(ctx: &Context, history_days: i64, analysis_days: i64) -> Result<()> {
    let cutoff = history_cutoff(Local::now().date_naive(), history_days);
    let history = StockHistory::delete_before(ctx.db.pool(), &cutoff).await?;
    let analysis = StockAnalysis::delete_older_than(ctx.db.pool(), analysis_days).await?;

    logging::info_file_async(format!(
        "Retention removed {} stock_history rows before {} and {} stock_analysis rows older than {} days",
        history.rows_affected(),
        cutoff,
        analysis.rows_affected(),
        analysis_days
    ));

    Ok(())
}

/// 日線保留的最早日期 (`YYYYMMDD`)
fn history_cutoff(today: NaiveDate, days: i64) -> String {
    datetime::to_compact(today - Duration::days(days.max(0)))
}
