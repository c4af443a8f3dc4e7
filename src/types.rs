//! Domain types shared across the enrichment core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a meeting.
///
/// `FeedbackGiven` and `Error` are terminal; the only way out of either is a
/// re-open back to `New` (a fresh "run now" request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeetingStatus {
    New,
    Enriching,
    Enriched,
    Drafted,
    FeedbackGiven,
    Error,
}

impl MeetingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MeetingStatus::FeedbackGiven | MeetingStatus::Error)
    }
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingStatus::New => write!(f, "New"),
            MeetingStatus::Enriching => write!(f, "Enriching"),
            MeetingStatus::Enriched => write!(f, "Enriched"),
            MeetingStatus::Drafted => write!(f, "Drafted"),
            MeetingStatus::FeedbackGiven => write!(f, "FeedbackGiven"),
            MeetingStatus::Error => write!(f, "Error"),
        }
    }
}

impl std::str::FromStr for MeetingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(MeetingStatus::New),
            "Enriching" => Ok(MeetingStatus::Enriching),
            "Enriched" => Ok(MeetingStatus::Enriched),
            "Drafted" => Ok(MeetingStatus::Drafted),
            "FeedbackGiven" => Ok(MeetingStatus::FeedbackGiven),
            "Error" => Ok(MeetingStatus::Error),
            _ => Err(format!("Unknown meeting status: {}", s)),
        }
    }
}

/// A calendar attendee. The first entry of a meeting's attendee list is the
/// primary contact by convention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub response_status: Option<String>,
}

/// A ranked research finding produced by the enrichment run.
/// Lower `priority` = more important.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub text: String,
    pub why: String,
    pub priority: u32,
}

/// A short personalization line with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub text: String,
    pub source: String,
}

/// A competitor surfaced by the enrichment run, unique by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub name: String,
    #[serde(default)]
    pub positioning: Option<String>,
}

/// Human judgment on a meeting's output. At most one live record per
/// meeting; a later submission overwrites an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// 0 = thumbs down, 1 = thumbs up.
    pub score: u8,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One record per calendar booking, from trigger through feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub calendar_event_id: String,
    pub title: String,
    /// `None` means "time TBD".
    pub scheduled_at: Option<DateTime<Utc>>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub attendees: Vec<Attendee>,
    pub status: MeetingStatus,
    pub insights: Vec<Insight>,
    pub hooks: Vec<Hook>,
    pub competitors: Vec<Competitor>,
    pub draft_refs: Vec<String>,
    pub feedback: Option<Feedback>,
    /// Steering profile version that produced the current insights/hooks.
    pub steering_version_at_run: Option<i64>,
    /// Present iff `status == Error`.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// First attendee, by convention the person outreach is addressed to.
    pub fn primary_contact(&self) -> Option<&Attendee> {
        self.attendees.first()
    }
}

/// Listing row for the meeting dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummary {
    pub id: String,
    pub title: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: MeetingStatus,
}

/// Raw steering weights as entered, each in `[0, 1]`, not required to sum
/// to 1. Normalization happens at read time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteeringWeights {
    pub news: f64,
    pub role_pains: f64,
    pub competitors: f64,
}

/// Weights projected onto a convex combination (sum 1), or all zero when
/// there is no ranking signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedWeights {
    pub news: f64,
    pub role_pains: f64,
    pub competitors: f64,
}

impl NormalizedWeights {
    /// All-zero projection: callers fall back to insertion order.
    pub fn is_unranked(&self) -> bool {
        self.news == 0.0 && self.role_pains == 0.0 && self.competitors == 0.0
    }
}

/// The persisted steering configuration shaping enrichment output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteeringProfile {
    pub product_focus: String,
    pub icp: String,
    pub key_pains: Vec<String>,
    pub disallowed_claims: Vec<String>,
    pub competitor_list: Vec<String>,
    pub weights: SteeringWeights,
    pub specificity_rules: Vec<String>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// A list-field patch: either explicit entries, or free text split on
/// commas/newlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListPatch {
    Items(Vec<String>),
    Text(String),
}

/// Sparse weight overrides; omitted weights keep their prior value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightsPatch {
    pub news: Option<f64>,
    pub role_pains: Option<f64>,
    pub competitors: Option<f64>,
}

/// Sparse steering profile update. Omitted fields retain prior values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SteeringPatch {
    pub product_focus: Option<String>,
    pub icp: Option<String>,
    pub key_pains: Option<ListPatch>,
    pub disallowed_claims: Option<ListPatch>,
    pub competitor_list: Option<ListPatch>,
    pub weights: Option<WeightsPatch>,
    pub specificity_rules: Option<ListPatch>,
}

/// A parsed calendar event delivered by the trigger collaborator.
/// `calendar_event_id` is the idempotency key across re-deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub calendar_event_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Outcome of syncing one calendar event into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    New,
    Changed,
    Unchanged,
}

/// Counts reported back from one poll pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOutcome {
    pub new_meetings: u32,
    pub processed_meetings: u32,
}

/// Fields an external job hands over alongside a transition request.
/// Which fields are required depends on the target status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransitionPayload {
    pub insights: Option<Vec<Insight>>,
    pub hooks: Option<Vec<Hook>>,
    pub competitors: Option<Vec<Competitor>>,
    pub draft_refs: Option<Vec<String>>,
    /// Steering profile version the enrichment run actually used.
    pub steering_version: Option<i64>,
    pub error_message: Option<String>,
}

impl TransitionPayload {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_round_trips() {
        for status in [
            MeetingStatus::New,
            MeetingStatus::Enriching,
            MeetingStatus::Enriched,
            MeetingStatus::Drafted,
            MeetingStatus::FeedbackGiven,
            MeetingStatus::Error,
        ] {
            let parsed: MeetingStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_status_from_str_rejects_unknown() {
        assert!("Pending".parse::<MeetingStatus>().is_err());
    }

    #[test]
    fn test_list_patch_accepts_items_or_text() {
        let items: ListPatch = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(items, ListPatch::Items(vec!["a".to_string(), "b".to_string()]));

        let text: ListPatch = serde_json::from_str(r#""a, b""#).unwrap();
        assert_eq!(text, ListPatch::Text("a, b".to_string()));
    }

    #[test]
    fn test_steering_patch_tolerates_sparse_json() {
        let patch: SteeringPatch =
            serde_json::from_str(r#"{"weights": {"news": 0.9}}"#).unwrap();
        assert_eq!(patch.weights.unwrap().news, Some(0.9));
        assert!(patch.product_focus.is_none());
        assert!(patch.key_pains.is_none());
    }
}
