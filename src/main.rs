use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::JobScheduler;

use crate::{
    config::SETTINGS, context::Context, crawler::naver::Naver, database::Database,
};

pub mod backfill;
pub mod calculation;
pub mod config;
pub mod context;
pub mod crawler;
pub mod database;
pub mod declare;
pub mod event;
pub mod logging;
pub mod scheduler;
pub mod util;
pub mod web;

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let db = Database::connect(&SETTINGS.sqlite).await?;
    db.migrate().await?;
    if let Err(why) = db.seed_recommendations().await {
        logging::error_file_async(format!("Failed to seed recommendations because {:?}", why));
    }

    let source = Arc::new(Naver::new(&SETTINGS.naver));
    let ctx = Context::new(db, source, &SETTINGS);

    // 保留 JobScheduler 直到程式結束
    let _sched = if SETTINGS.scheduler.enabled {
        let sched = JobScheduler::new().await?;
        scheduler::start(&sched, ctx.clone(), &SETTINGS).await?;
        Some(sched)
    } else {
        logging::info_file_async("Scheduler disabled".to_string());
        None
    };

    logging::info_console(format!(
        "StockBoard listening on {}:{}",
        SETTINGS.system.host, SETTINGS.system.port
    ));

    web::serve(ctx, &SETTINGS.system).await
}
