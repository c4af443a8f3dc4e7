//! Feedback capture and its advisory coupling to steering.
//!
//! Recording feedback closes a meeting's loop; translating it into a
//! steering change is a human edit through the profile update path, so
//! every behavior change stays auditable via the profile version.

use chrono::Utc;

use crate::error::CoreError;
use crate::types::{Feedback, Meeting, MeetingStatus};

/// Record a judgment on a drafted meeting.
///
/// Latest write wins: a second submission replaces the first rather than
/// appending. Fails `InvalidState` before drafts exist and `Validation` for
/// a score outside {0, 1}.
pub fn apply_feedback(
    mut meeting: Meeting,
    score: u8,
    notes: Option<String>,
) -> Result<Meeting, CoreError> {
    if score > 1 {
        return Err(CoreError::Validation(format!(
            "Feedback score must be 0 or 1, got {score}"
        )));
    }

    if !matches!(
        meeting.status,
        MeetingStatus::Drafted | MeetingStatus::FeedbackGiven
    ) {
        return Err(CoreError::InvalidState(format!(
            "Feedback requires a drafted meeting (status is {})",
            meeting.status
        )));
    }

    meeting.feedback = Some(Feedback { score, notes });
    meeting.status = MeetingStatus::FeedbackGiven;
    meeting.updated_at = Utc::now();
    Ok(meeting)
}

/// Scan negative feedback notes for profile edits worth surfacing next to
/// the steering editor. Never mutates the profile.
pub fn suggest_profile_edits(score: u8, notes: Option<&str>) -> Vec<String> {
    if score != 0 {
        return Vec::new();
    }

    let text = notes.unwrap_or("").to_lowercase();
    let mut suggestions = Vec::new();

    if text.contains("generic") || text.contains("specific") {
        suggestions.push("Add a specificity rule, e.g. \"Be more specific\"".to_string());
    }
    if text.contains("news") {
        suggestions.push("Raise the news weight".to_string());
    }
    if text.contains("role") || text.contains("pain") {
        suggestions.push("Raise the role-pains weight".to_string());
    }
    if text.contains("competitor") {
        suggestions.push("Raise the competitors weight".to_string());
    }

    suggestions
}
