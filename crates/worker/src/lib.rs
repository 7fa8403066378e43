//! Background jobs for CaseTrack.
//!
//! Currently a single job: the handover acknowledgement SLA sweep. Runs on
//! a fixed interval using `tokio::time::interval` and stops when the
//! cancellation token fires; no locks are held between runs.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use casetrack_engine::CustodyEngine;

/// How often the SLA sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300); // 5 minutes

/// Run the handover SLA sweep loop.
///
/// Stamps `overdue_at` / `reminder_sent_at` / `escalation_sent_at` on
/// breached handovers each pass. Runs until `cancel` is triggered;
/// cancellation simply stops the schedule.
pub async fn run_sla_sweep(engine: CustodyEngine, cancel: CancellationToken) {
    let interval_secs: u64 = std::env::var("SLA_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(SWEEP_INTERVAL.as_secs());

    tracing::info!(interval_secs, "Handover SLA sweep started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Handover SLA sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match engine.sweep_overdue(Utc::now()).await {
                    Ok(summary) => {
                        if summary.newly_overdue.is_empty()
                            && summary.reminders.is_empty()
                            && summary.escalations.is_empty()
                        {
                            tracing::debug!("SLA sweep: nothing to stamp");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "SLA sweep failed");
                    }
                }
            }
        }
    }
}
