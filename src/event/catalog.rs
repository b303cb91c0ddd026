use anyhow::Result;

use crate::{
    backfill::{catalog, category},
    context::Context,
    logging,
};

/// 先依產業頁收集股票，再依個股產業重新分類
pub async fn execute(ctx: &Context) -> Result<()> {
    let collected = catalog::collect(ctx).await?;
    logging::info_file_async(format!("Stock collection completed: {}", collected));

    let categorized = category::update(ctx).await?;
    logging::info_file_async(format!("Category update completed: {}", categorized));

    Ok(())
}
