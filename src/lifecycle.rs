//! Meeting lifecycle state machine.
//!
//! Transitions are validated against a legality table and applied to a
//! loaded meeting together with their payload, so status and payload always
//! land in the same persisted write. Re-opening a terminal meeting is a
//! distinct arm from forward progress: prior run output and feedback are
//! kept until the new run overwrites them.

use std::collections::HashSet;

use chrono::Utc;

use crate::error::CoreError;
use crate::types::{Competitor, Meeting, MeetingStatus, TransitionPayload};

/// Legality table for status transitions.
///
/// Forward arcs follow the enrichment pipeline; `Error` is reachable from
/// any in-flight state; `New` is reachable only from the two terminal
/// states (a fresh "run now" request).
pub fn transition_allowed(from: MeetingStatus, to: MeetingStatus) -> bool {
    use MeetingStatus::*;

    matches!(
        (from, to),
        (New, Enriching)
            | (Enriching, Enriched)
            | (Enriched, Drafted)
            | (Drafted, FeedbackGiven)
            | (Enriching, Error)
            | (Enriched, Error)
            | (Drafted, Error)
            | (FeedbackGiven, New)
            | (Error, New)
    )
}

/// Apply a transition request to a loaded meeting.
///
/// Returns the updated meeting, or fails without touching it:
/// `InvalidTransition` when the arc is not in the legality table,
/// `PreconditionUnmet` when the target requires payload the request lacks.
pub fn apply_transition(
    mut meeting: Meeting,
    target: MeetingStatus,
    payload: TransitionPayload,
) -> Result<Meeting, CoreError> {
    let from = meeting.status;
    if !transition_allowed(from, target) {
        return Err(CoreError::InvalidTransition { from, to: target });
    }

    match target {
        MeetingStatus::New => {
            // Re-open: insights/hooks/drafts/feedback stay as audit trail
            // until the new run overwrites them. error_message exists only
            // on Error rows.
            meeting.error_message = None;
        }
        MeetingStatus::Enriching => {}
        MeetingStatus::Enriched => {
            let insights = payload.insights.ok_or_else(|| {
                CoreError::PreconditionUnmet(
                    "Enriched requires an insights payload (an empty list is valid)".to_string(),
                )
            })?;
            meeting.insights = insights;
            if let Some(hooks) = payload.hooks {
                meeting.hooks = hooks;
            }
            if let Some(competitors) = payload.competitors {
                meeting.competitors = dedup_competitors(competitors);
            }
            if let Some(version) = payload.steering_version {
                meeting.steering_version_at_run = Some(version);
            }
        }
        MeetingStatus::Drafted => {
            let draft_refs = payload
                .draft_refs
                .filter(|refs| !refs.is_empty())
                .ok_or_else(|| {
                    CoreError::PreconditionUnmet(
                        "Drafted requires at least one draft ref".to_string(),
                    )
                })?;
            meeting.draft_refs = draft_refs;
        }
        MeetingStatus::FeedbackGiven => {
            if meeting.feedback.is_none() {
                return Err(CoreError::PreconditionUnmet(
                    "FeedbackGiven requires a recorded feedback score".to_string(),
                ));
            }
        }
        MeetingStatus::Error => {
            let message = payload
                .error_message
                .filter(|msg| !msg.trim().is_empty())
                .ok_or_else(|| {
                    CoreError::PreconditionUnmet("Error requires an error message".to_string())
                })?;
            // Run output keeps its last successful values; only the status
            // and message change.
            meeting.error_message = Some(message);
        }
    }

    meeting.status = target;
    meeting.updated_at = Utc::now();
    Ok(meeting)
}

/// Competitors are a set keyed by name; first occurrence wins.
fn dedup_competitors(competitors: Vec<Competitor>) -> Vec<Competitor> {
    let mut seen = HashSet::new();
    competitors
        .into_iter()
        .filter(|c| seen.insert(c.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Feedback, Hook, Insight};

    fn make_meeting(status: MeetingStatus) -> Meeting {
        let now = Utc::now();
        Meeting {
            id: "m1".to_string(),
            calendar_event_id: "evt1".to_string(),
            title: "Acme Intro".to_string(),
            scheduled_at: Some(now),
            company: Some("Acme".to_string()),
            role: Some("CTO".to_string()),
            attendees: Vec::new(),
            status,
            insights: Vec::new(),
            hooks: Vec::new(),
            competitors: Vec::new(),
            draft_refs: Vec::new(),
            feedback: None,
            steering_version_at_run: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_insight(text: &str, priority: u32) -> Insight {
        Insight {
            text: text.to_string(),
            why: "relevant".to_string(),
            priority,
        }
    }

    #[test]
    fn test_skipping_ahead_is_invalid() {
        let err = apply_transition(
            make_meeting(MeetingStatus::New),
            MeetingStatus::Drafted,
            TransitionPayload {
                draft_refs: Some(vec!["d1".to_string()]),
                ..TransitionPayload::default()
            },
        )
        .unwrap_err();

        match err {
            CoreError::InvalidTransition { from, to } => {
                assert_eq!(from, MeetingStatus::New);
                assert_eq!(to, MeetingStatus::Drafted);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_forward_walk() {
        let meeting = make_meeting(MeetingStatus::New);

        let meeting =
            apply_transition(meeting, MeetingStatus::Enriching, TransitionPayload::empty())
                .unwrap();
        assert_eq!(meeting.status, MeetingStatus::Enriching);

        let insights = vec![make_insight("Raised series B", 1)];
        let meeting = apply_transition(
            meeting,
            MeetingStatus::Enriched,
            TransitionPayload {
                insights: Some(insights.clone()),
                hooks: Some(vec![Hook {
                    text: "Congrats on the raise".to_string(),
                    source: "news".to_string(),
                }]),
                steering_version: Some(2),
                ..TransitionPayload::default()
            },
        )
        .unwrap();
        assert_eq!(meeting.status, MeetingStatus::Enriched);
        assert_eq!(meeting.insights, insights);
        assert_eq!(meeting.steering_version_at_run, Some(2));

        let meeting = apply_transition(
            meeting,
            MeetingStatus::Drafted,
            TransitionPayload {
                draft_refs: Some(vec!["d1".to_string()]),
                ..TransitionPayload::default()
            },
        )
        .unwrap();
        assert_eq!(meeting.status, MeetingStatus::Drafted);
        assert_eq!(meeting.draft_refs, vec!["d1"]);
    }

    #[test]
    fn test_enriched_accepts_empty_insights() {
        let meeting = make_meeting(MeetingStatus::Enriching);
        let meeting = apply_transition(
            meeting,
            MeetingStatus::Enriched,
            TransitionPayload {
                insights: Some(Vec::new()),
                ..TransitionPayload::default()
            },
        )
        .unwrap();
        assert_eq!(meeting.status, MeetingStatus::Enriched);
        assert!(meeting.insights.is_empty());
    }

    #[test]
    fn test_enriched_without_insights_payload_fails() {
        let err = apply_transition(
            make_meeting(MeetingStatus::Enriching),
            MeetingStatus::Enriched,
            TransitionPayload::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::PreconditionUnmet(_)));
    }

    #[test]
    fn test_drafted_requires_nonempty_refs() {
        let err = apply_transition(
            make_meeting(MeetingStatus::Enriched),
            MeetingStatus::Drafted,
            TransitionPayload {
                draft_refs: Some(Vec::new()),
                ..TransitionPayload::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::PreconditionUnmet(_)));
    }

    #[test]
    fn test_error_requires_message_and_keeps_output() {
        let mut meeting = make_meeting(MeetingStatus::Enriched);
        meeting.insights = vec![make_insight("kept", 1)];

        let err = apply_transition(
            meeting.clone(),
            MeetingStatus::Error,
            TransitionPayload::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::PreconditionUnmet(_)));

        let failed = apply_transition(
            meeting,
            MeetingStatus::Error,
            TransitionPayload {
                error_message: Some("Draft service unavailable".to_string()),
                ..TransitionPayload::default()
            },
        )
        .unwrap();
        assert_eq!(failed.status, MeetingStatus::Error);
        assert_eq!(failed.error_message.as_deref(), Some("Draft service unavailable"));
        assert_eq!(failed.insights.len(), 1);
    }

    #[test]
    fn test_feedback_given_requires_recorded_feedback() {
        let err = apply_transition(
            make_meeting(MeetingStatus::Drafted),
            MeetingStatus::FeedbackGiven,
            TransitionPayload::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::PreconditionUnmet(_)));

        let mut meeting = make_meeting(MeetingStatus::Drafted);
        meeting.feedback = Some(Feedback {
            score: 1,
            notes: None,
        });
        let meeting = apply_transition(
            meeting,
            MeetingStatus::FeedbackGiven,
            TransitionPayload::empty(),
        )
        .unwrap();
        assert_eq!(meeting.status, MeetingStatus::FeedbackGiven);
    }

    #[test]
    fn test_reopen_preserves_history() {
        let mut meeting = make_meeting(MeetingStatus::Error);
        meeting.insights = vec![make_insight("prior run", 1)];
        meeting.draft_refs = vec!["d1".to_string()];
        meeting.feedback = Some(Feedback {
            score: 0,
            notes: Some("too generic".to_string()),
        });
        meeting.steering_version_at_run = Some(4);
        meeting.error_message = Some("enrichment timed out".to_string());

        let reopened =
            apply_transition(meeting, MeetingStatus::New, TransitionPayload::empty()).unwrap();
        assert_eq!(reopened.status, MeetingStatus::New);
        assert!(reopened.error_message.is_none());
        assert_eq!(reopened.insights.len(), 1);
        assert_eq!(reopened.draft_refs, vec!["d1"]);
        assert_eq!(reopened.feedback.as_ref().unwrap().score, 0);
        assert_eq!(reopened.steering_version_at_run, Some(4));
    }

    #[test]
    fn test_reopen_only_from_terminal_states() {
        for status in [
            MeetingStatus::New,
            MeetingStatus::Enriching,
            MeetingStatus::Enriched,
            MeetingStatus::Drafted,
        ] {
            let err = apply_transition(
                make_meeting(status),
                MeetingStatus::New,
                TransitionPayload::empty(),
            )
            .unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidTransition { .. }),
                "reopen from {status} should be invalid"
            );
        }

        for status in [MeetingStatus::FeedbackGiven, MeetingStatus::Error] {
            assert!(status.is_terminal());
            let mut meeting = make_meeting(status);
            if status == MeetingStatus::Error {
                meeting.error_message = Some("boom".to_string());
            }
            assert!(apply_transition(meeting, MeetingStatus::New, TransitionPayload::empty())
                .is_ok());
        }
    }

    #[test]
    fn test_competitors_dedup_by_name() {
        let meeting = apply_transition(
            make_meeting(MeetingStatus::Enriching),
            MeetingStatus::Enriched,
            TransitionPayload {
                insights: Some(Vec::new()),
                competitors: Some(vec![
                    Competitor {
                        name: "CompetitorX".to_string(),
                        positioning: Some("incumbent".to_string()),
                    },
                    Competitor {
                        name: "CompetitorX".to_string(),
                        positioning: None,
                    },
                    Competitor {
                        name: "CompetitorY".to_string(),
                        positioning: None,
                    },
                ]),
                ..TransitionPayload::default()
            },
        )
        .unwrap();

        assert_eq!(meeting.competitors.len(), 2);
        assert_eq!(meeting.competitors[0].positioning.as_deref(), Some("incumbent"));
    }
}
