//! Cron trigger for scan cycles.
//!
//! Every tick runs one full cycle on its own task. A slow cycle can overlap
//! the next tick; the ListingStore's per-term lock keeps the two from racing
//! on the same term.

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::error::Result;
use crate::scanner::Scanner;

pub async fn start_scheduler(cron_expression: &str, scanner: Scanner) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let scan_job = Job::new_async(cron_expression, move |_uuid, _lock| {
        let scanner = scanner.clone();
        Box::pin(async move {
            scanner.run_cycle().await;
        })
    })?;

    scheduler.add(scan_job).await?;
    scheduler.start().await?;

    info!("Scheduler started (cron: {cron_expression})");
    Ok(scheduler)
}
