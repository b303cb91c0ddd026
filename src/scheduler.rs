use std::{env, future::Future};

use anyhow::{Error, Result};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::{config, context::Context, event, logging};

/// 啟動排程
pub async fn start(sched: &JobScheduler, ctx: Context, settings: &config::App) -> Result<()> {
    run_cron(sched, ctx, settings).await?;

    logging::info_file_async(format!(
        "StockBoard scheduler started\r\nRust OS/Arch: {}/{}\r\n",
        env::consts::OS,
        env::consts::ARCH
    ));

    Ok(())
}

async fn run_cron(
    sched: &JobScheduler,
    ctx: Context,
    settings: &config::App,
) -> std::result::Result<(), JobSchedulerError> {
    //                 sec  min   hour   day of month   month   day of week   year
    //let expression = "0   30   9,12,15     1,15       May-Aug  Mon,Wed,Fri  2018/2";
    // UTC 時間
    let retention = settings.retention.clone();
    let refresh_ctx = ctx.clone();
    let retention_ctx = ctx.clone();
    let catalog_ctx = ctx;

    let jobs = vec![
        // 收盤後刷新持股與推薦股
        create_job(&settings.scheduler.refresh_cron, move || {
            let ctx = refresh_ctx.clone();
            async move { event::refresh::execute(&ctx).await }
        }),
        // 清除過期的日線與分析紀錄
        create_job(&settings.scheduler.retention_cron, move || {
            let ctx = retention_ctx.clone();
            let retention = retention.clone();
            async move {
                event::retention::execute(&ctx, retention.history_days, retention.analysis_days)
                    .await
            }
        }),
        // 重建股票清單與分類
        create_job(&settings.scheduler.catalog_cron, move || {
            let ctx = catalog_ctx.clone();
            async move { event::catalog::execute(&ctx).await }
        }),
    ];

    for job in jobs.into_iter().flatten() {
        sched.add(job).await?;
    }

    sched.start().await
}

fn create_job<F, Fut>(cron_expr: &str, task: F) -> Result<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    let expr = cron_expr.to_string();
    let job = Job::new_async(cron_expr, move |_uuid, _l| {
        let task = task.clone();
        let expr = expr.clone();
        Box::pin(async move {
            if let Err(why) = task().await {
                logging::error_file_async(format!(
                    "Failed to execute task({}) because {:?}",
                    expr, why
                ));
            }
        })
    });

    job.map_err(|why| {
        logging::error_file_async(format!(
            "Failed to create job({}) because {:?}",
            cron_expr, why
        ));
        why.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_job_rejects_invalid_cron() {
        assert!(create_job("0 0 7 * * Mon-Fri", || async { Ok(()) }).is_ok());
        assert!(create_job("not a cron", || async { Ok(()) }).is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn test_every_second() {
        dotenv::dotenv().ok();
        let sched = JobScheduler::new().await.unwrap();
        let job = create_job("* * * * * *", || async {
            logging::debug_file_async(format!("now: {:?}", chrono::Local::now()));
            Ok(())
        })
        .unwrap();
        sched.add(job).await.unwrap();
        sched.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    }
}
