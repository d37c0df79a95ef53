//! Background email retry
//!
//! Runs [`retry_failed_emails`] every `scheduler.retry_interval_secs` until
//! the cancellation token fires. An interval of 0 disables the task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use creatorhub_common::time;

use crate::email::{retry_failed_emails, RetryReport};
use crate::AppState;

/// Run one retry pass, logging the outcome
pub async fn run_once(state: &AppState) -> Option<RetryReport> {
    match retry_failed_emails(
        &state.db,
        state.mailer.as_ref(),
        state.config.scheduler.batch_size,
        time::now(),
    )
    .await
    {
        Ok(report) => {
            if report.examined == 0 {
                debug!("Email retry run: nothing to do");
            }
            Some(report)
        }
        Err(e) => {
            error!("Email retry run failed: {}", e);
            None
        }
    }
}

/// Spawn the periodic retry task
///
/// Returns `None` when the scheduler is disabled.
pub fn spawn_email_retry(state: AppState, cancel: CancellationToken) -> Option<JoinHandle<()>> {
    let secs = state.config.scheduler.retry_interval_secs;
    if secs == 0 {
        info!("Email retry scheduler disabled");
        return None;
    }

    info!(interval_secs = secs, "Email retry scheduler started");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so startup stays quiet
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Email retry scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    run_once(&state).await;
                }
            }
        }
    }))
}
