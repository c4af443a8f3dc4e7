//! Boundary operations over the shared store.
//!
//! Within a single meeting, transitions are serialized through a keyed lock
//! registry so two concurrent `advance` calls cannot both succeed from the
//! same source state; unrelated meetings proceed independently. Steering
//! updates serialize behind their own lock, independent of any meeting.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::db::{DbError, MeetingDb};
use crate::error::CoreError;
use crate::feedback;
use crate::lifecycle;
use crate::steering;
use crate::types::{
    CalendarEvent, Meeting, MeetingStatus, MeetingSummary, SteeringPatch, SteeringProfile,
    SyncOutcome, TransitionPayload,
};

pub struct MeetingService {
    db: Mutex<MeetingDb>,
    meeting_locks: DashMap<String, Arc<Mutex<()>>>,
    steering_lock: Mutex<()>,
}

impl MeetingService {
    /// Open the service over the default database path.
    pub fn open() -> Result<Self, DbError> {
        Ok(Self::new(MeetingDb::open()?))
    }

    /// Open the service over an explicit database path.
    pub fn open_at(path: &Path) -> Result<Self, DbError> {
        Ok(Self::new(MeetingDb::open_at(path.to_path_buf())?))
    }

    fn new(db: MeetingDb) -> Self {
        Self {
            db: Mutex::new(db),
            meeting_locks: DashMap::new(),
            steering_lock: Mutex::new(()),
        }
    }

    /// Per-meeting writer lock, created on first use. The guard releases on
    /// every exit path, including failures.
    fn meeting_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.meeting_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // =========================================================================
    // Meetings
    // =========================================================================

    /// All meetings as dashboard rows, soonest first, TBD last.
    pub fn list_meetings(&self) -> Result<Vec<MeetingSummary>, CoreError> {
        Ok(self.db.lock().list_summaries()?)
    }

    pub fn get_meeting(&self, id: &str) -> Result<Meeting, CoreError> {
        self.db
            .lock()
            .get_meeting(id)?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// Idempotent trigger ingestion: re-delivery of the same calendar event
    /// refreshes metadata on the existing meeting instead of duplicating it.
    pub fn create_or_update_from_trigger(
        &self,
        event: &CalendarEvent,
    ) -> Result<Meeting, CoreError> {
        self.sync_from_trigger(event).map(|(meeting, _)| meeting)
    }

    /// Trigger ingestion that also reports whether the event was new,
    /// changed, or already up to date (the poll path needs the counts).
    pub fn sync_from_trigger(
        &self,
        event: &CalendarEvent,
    ) -> Result<(Meeting, SyncOutcome), CoreError> {
        if event.calendar_event_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "Calendar event id must be non-empty".to_string(),
            ));
        }

        let (meeting, outcome) = self.db.lock().upsert_from_trigger(event)?;
        if outcome == SyncOutcome::New {
            log::info!(
                "Meeting {}: created from calendar event {}",
                meeting.id,
                meeting.calendar_event_id
            );
        }
        Ok((meeting, outcome))
    }

    /// Advance a meeting's lifecycle, writing the transition and its payload
    /// atomically.
    pub fn advance(
        &self,
        id: &str,
        target: MeetingStatus,
        payload: TransitionPayload,
    ) -> Result<Meeting, CoreError> {
        let lock = self.meeting_lock(id);
        let _guard = lock.lock();

        let meeting = self
            .db
            .lock()
            .get_meeting(id)?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        // Enriched stamps which profile version produced the run. When the
        // job didn't report one, fall back to the current version.
        let mut payload = payload;
        if target == MeetingStatus::Enriched && payload.steering_version.is_none() {
            let version = {
                let db = self.db.lock();
                steering::get_or_init(&db)?.version
            };
            payload.steering_version = Some(version);
        }

        let from = meeting.status;
        let updated = lifecycle::apply_transition(meeting, target, payload)?;
        self.db.lock().persist_meeting(&updated)?;

        log::info!("Meeting {}: {} -> {}", id, from, target);
        Ok(updated)
    }

    /// Record feedback on a drafted meeting (latest write wins) and move it
    /// to `FeedbackGiven`.
    pub fn submit_feedback(
        &self,
        id: &str,
        score: u8,
        notes: Option<String>,
    ) -> Result<Meeting, CoreError> {
        let lock = self.meeting_lock(id);
        let _guard = lock.lock();

        let meeting = self
            .db
            .lock()
            .get_meeting(id)?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        let updated = feedback::apply_feedback(meeting, score, notes)?;
        self.db.lock().persist_meeting(&updated)?;

        log::info!("Meeting {}: feedback recorded (score={})", id, score);
        Ok(updated)
    }

    // =========================================================================
    // Steering
    // =========================================================================

    /// Current steering profile, bootstrapping the default on first read.
    pub fn get_steering_profile(&self) -> Result<SteeringProfile, CoreError> {
        let _guard = self.steering_lock.lock();
        let db = self.db.lock();
        Ok(steering::get_or_init(&db)?)
    }

    /// Apply a sparse profile update; returns the full updated profile.
    pub fn update_steering_profile(
        &self,
        patch: SteeringPatch,
    ) -> Result<SteeringProfile, CoreError> {
        let _guard = self.steering_lock.lock();
        let db = self.db.lock();
        Ok(steering::update_profile(&db, patch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attendee, Insight, ListPatch, WeightsPatch};

    fn open_test_service(dir: &tempfile::TempDir) -> MeetingService {
        MeetingService::open_at(&dir.path().join("test.db")).unwrap()
    }

    fn make_event(event_id: &str) -> CalendarEvent {
        CalendarEvent {
            calendar_event_id: event_id.to_string(),
            title: "Acme Intro".to_string(),
            scheduled_at: None,
            attendees: vec![Attendee {
                name: Some("Dana".to_string()),
                email: Some("dana@acme.test".to_string()),
                response_status: None,
            }],
            company: Some("Acme".to_string()),
            role: Some("CTO".to_string()),
        }
    }

    #[test]
    fn test_end_to_end_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_test_service(&dir);

        let meeting = service.create_or_update_from_trigger(&make_event("evt1")).unwrap();
        let id = meeting.id.clone();
        assert_eq!(meeting.status, MeetingStatus::New);
        assert_eq!(
            meeting.primary_contact().unwrap().email.as_deref(),
            Some("dana@acme.test")
        );

        service
            .advance(&id, MeetingStatus::Enriching, TransitionPayload::empty())
            .unwrap();
        assert_eq!(service.get_meeting(&id).unwrap().status, MeetingStatus::Enriching);

        let insights = vec![Insight {
            text: "Raised series B".to_string(),
            why: "Budget signal".to_string(),
            priority: 1,
        }];
        service
            .advance(
                &id,
                MeetingStatus::Enriched,
                TransitionPayload {
                    insights: Some(insights.clone()),
                    ..TransitionPayload::default()
                },
            )
            .unwrap();
        let enriched = service.get_meeting(&id).unwrap();
        assert_eq!(enriched.status, MeetingStatus::Enriched);
        assert_eq!(enriched.insights, insights);
        // Version stamped from the bootstrapped profile
        assert_eq!(enriched.steering_version_at_run, Some(1));

        service
            .advance(
                &id,
                MeetingStatus::Drafted,
                TransitionPayload {
                    draft_refs: Some(vec!["d1".to_string()]),
                    ..TransitionPayload::default()
                },
            )
            .unwrap();
        assert_eq!(service.get_meeting(&id).unwrap().status, MeetingStatus::Drafted);

        let done = service.submit_feedback(&id, 1, Some("good".to_string())).unwrap();
        assert_eq!(done.status, MeetingStatus::FeedbackGiven);
        assert_eq!(service.get_meeting(&id).unwrap().feedback.unwrap().score, 1);
    }

    #[test]
    fn test_advance_unknown_meeting_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_test_service(&dir);

        let err = service
            .advance("missing", MeetingStatus::Enriching, TransitionPayload::empty())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_illegal_advance_leaves_status_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_test_service(&dir);

        let meeting = service.create_or_update_from_trigger(&make_event("evt1")).unwrap();
        let err = service
            .advance(
                &meeting.id,
                MeetingStatus::Drafted,
                TransitionPayload {
                    draft_refs: Some(vec!["d1".to_string()]),
                    ..TransitionPayload::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(service.get_meeting(&meeting.id).unwrap().status, MeetingStatus::New);
    }

    #[test]
    fn test_trigger_twice_yields_one_meeting() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_test_service(&dir);

        let first = service.create_or_update_from_trigger(&make_event("evt1")).unwrap();
        let second = service.create_or_update_from_trigger(&make_event("evt1")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(service.list_meetings().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_advance_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let service = std::sync::Arc::new(open_test_service(&dir));

        let meeting = service.create_or_update_from_trigger(&make_event("evt1")).unwrap();
        let id = meeting.id;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                let id = id.clone();
                std::thread::spawn(move || {
                    service.advance(&id, MeetingStatus::Enriching, TransitionPayload::empty())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one advance should win the race");
        for result in results {
            if let Err(err) = result {
                assert!(matches!(err, CoreError::InvalidTransition { .. }));
            }
        }
        assert_eq!(
            service.get_meeting(&id).unwrap().status,
            MeetingStatus::Enriching
        );
    }

    #[test]
    fn test_steering_version_monotonic_through_service() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_test_service(&dir);

        let initial = service.get_steering_profile().unwrap();
        assert_eq!(initial.version, 1);

        let updated = service
            .update_steering_profile(SteeringPatch {
                weights: Some(WeightsPatch {
                    news: Some(1.7),
                    ..WeightsPatch::default()
                }),
                ..SteeringPatch::default()
            })
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.weights.news, 1.0);
        assert!(updated.updated_at >= initial.updated_at);

        let again = service
            .update_steering_profile(SteeringPatch {
                key_pains: Some(ListPatch::Text("slow ramp\nno attribution".to_string())),
                ..SteeringPatch::default()
            })
            .unwrap();
        assert_eq!(again.version, 3);
        assert_eq!(again.key_pains, vec!["slow ramp", "no attribution"]);
        // Weight change from the previous update is retained
        assert_eq!(again.weights.news, 1.0);
    }
}
