//! Calendar trigger seam.
//!
//! The core never talks to a calendar API directly. A `CalendarSource`
//! collaborator supplies parsed upcoming events; `trigger_poll` upserts them
//! idempotently and reports honest counts. `run_poll_loop` drives the same
//! path on an interval for deployments without an external cron.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::service::MeetingService;
use crate::types::{CalendarEvent, PollOutcome, SyncOutcome};

/// External calendar collaborator. Implementations own auth, paging, and
/// retries; the core only consumes the parsed events.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn fetch_upcoming(&self) -> Result<Vec<CalendarEvent>, String>;
}

/// Run one poll pass: fetch upcoming events and sync each into the store.
///
/// `processed_meetings` counts events that synced successfully and
/// `new_meetings` those that created a meeting, so new ≤ processed ≤
/// attempted. A per-event failure is logged and excluded from the counts;
/// it never aborts the pass.
pub async fn trigger_poll(
    service: &MeetingService,
    source: &dyn CalendarSource,
) -> Result<PollOutcome, String> {
    let events = source.fetch_upcoming().await?;
    let attempted = events.len();

    let mut outcome = PollOutcome::default();
    for event in &events {
        match service.sync_from_trigger(event) {
            Ok((_, SyncOutcome::New)) => {
                outcome.new_meetings += 1;
                outcome.processed_meetings += 1;
            }
            Ok(_) => outcome.processed_meetings += 1,
            Err(e) => {
                log::warn!(
                    "trigger_poll: sync failed for event {}: {}",
                    event.calendar_event_id,
                    e
                );
            }
        }
    }

    log::info!(
        "trigger_poll: attempted={} processed={} new={}",
        attempted,
        outcome.processed_meetings,
        outcome.new_meetings
    );
    Ok(outcome)
}

/// Background polling loop.
///
/// Sleeps `interval` between passes; a failed pass is logged and the loop
/// continues.
pub async fn run_poll_loop(
    service: Arc<MeetingService>,
    source: Arc<dyn CalendarSource>,
    interval: Duration,
) {
    log::info!("Calendar poll loop: started (interval {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        match trigger_poll(&service, source.as_ref()).await {
            Ok(outcome) if outcome.new_meetings > 0 => {
                log::info!(
                    "Calendar poll: {} new meeting(s)",
                    outcome.new_meetings
                );
            }
            Ok(_) => {}
            Err(e) => log::warn!("Calendar poll failed: {}", e),
        }
    }
}
