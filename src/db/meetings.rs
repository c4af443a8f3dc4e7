use super::*;

use chrono::Utc;
use rusqlite::params;

use crate::types::{
    CalendarEvent, Feedback, Meeting, MeetingStatus, MeetingSummary, SyncOutcome,
};

const MEETING_COLUMNS: &str = "id, calendar_event_id, title, scheduled_at, company, role,
             attendees, status, insights, hooks, competitors, draft_refs,
             feedback_score, feedback_notes, steering_version_at_run, error_message,
             created_at, updated_at";

/// Raw row image before JSON/timestamp decoding.
struct MeetingRow {
    id: String,
    calendar_event_id: String,
    title: String,
    scheduled_at: Option<String>,
    company: Option<String>,
    role: Option<String>,
    attendees: String,
    status: String,
    insights: String,
    hooks: String,
    competitors: String,
    draft_refs: String,
    feedback_score: Option<i64>,
    feedback_notes: Option<String>,
    steering_version_at_run: Option<i64>,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_meeting_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MeetingRow> {
    Ok(MeetingRow {
        id: row.get(0)?,
        calendar_event_id: row.get(1)?,
        title: row.get(2)?,
        scheduled_at: row.get(3)?,
        company: row.get(4)?,
        role: row.get(5)?,
        attendees: row.get(6)?,
        status: row.get(7)?,
        insights: row.get(8)?,
        hooks: row.get(9)?,
        competitors: row.get(10)?,
        draft_refs: row.get(11)?,
        feedback_score: row.get(12)?,
        feedback_notes: row.get(13)?,
        steering_version_at_run: row.get(14)?,
        error_message: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn decode_meeting(row: MeetingRow) -> Result<Meeting, DbError> {
    let status = row
        .status
        .parse::<MeetingStatus>()
        .map_err(|_| DbError::UnknownStatus(row.status.clone()))?;

    let feedback = row.feedback_score.map(|score| Feedback {
        score: score as u8,
        notes: row.feedback_notes.clone(),
    });

    Ok(Meeting {
        id: row.id,
        calendar_event_id: row.calendar_event_id,
        title: row.title,
        scheduled_at: parse_timestamp_opt("scheduled_at", row.scheduled_at.as_deref())?,
        company: row.company,
        role: row.role,
        attendees: from_json("attendees", &row.attendees)?,
        status,
        insights: from_json("insights", &row.insights)?,
        hooks: from_json("hooks", &row.hooks)?,
        competitors: from_json("competitors", &row.competitors)?,
        draft_refs: from_json("draft_refs", &row.draft_refs)?,
        feedback,
        steering_version_at_run: row.steering_version_at_run,
        error_message: row.error_message,
        created_at: parse_timestamp("created_at", &row.created_at)?,
        updated_at: parse_timestamp("updated_at", &row.updated_at)?,
    })
}

impl MeetingDb {
    // =========================================================================
    // Meetings
    // =========================================================================

    /// Look up a single meeting by its ID.
    pub fn get_meeting(&self, id: &str) -> Result<Option<Meeting>, DbError> {
        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], map_meeting_row)?;

        match rows.next() {
            Some(row) => Ok(Some(decode_meeting(row?)?)),
            None => Ok(None),
        }
    }

    /// Look up a meeting by its calendar event ID (the trigger idempotency key).
    pub fn get_meeting_by_calendar_event_id(
        &self,
        calendar_event_id: &str,
    ) -> Result<Option<Meeting>, DbError> {
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE calendar_event_id = ?1 LIMIT 1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![calendar_event_id], map_meeting_row)?;

        match rows.next() {
            Some(row) => Ok(Some(decode_meeting(row?)?)),
            None => Ok(None),
        }
    }

    /// List all meetings as dashboard rows, soonest first. Meetings without a
    /// scheduled time ("TBD") sort last.
    pub fn list_summaries(&self) -> Result<Vec<MeetingSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, scheduled_at, company, role, status
             FROM meetings
             ORDER BY scheduled_at IS NULL, scheduled_at ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, title, scheduled_at, company, role, status) = row?;
            summaries.push(MeetingSummary {
                id,
                title,
                scheduled_at: parse_timestamp_opt("scheduled_at", scheduled_at.as_deref())?,
                company,
                role,
                status: status
                    .parse::<MeetingStatus>()
                    .map_err(|_| DbError::UnknownStatus(status.clone()))?,
            });
        }
        Ok(summaries)
    }

    /// Insert or update a meeting from a calendar trigger delivery.
    ///
    /// Idempotent on `calendar_event_id`: re-delivery of the same event
    /// refreshes title/time/attendees/company/role but never touches
    /// lifecycle state or run output.
    pub fn upsert_from_trigger(
        &self,
        event: &CalendarEvent,
    ) -> Result<(Meeting, SyncOutcome), DbError> {
        match self.get_meeting_by_calendar_event_id(&event.calendar_event_id)? {
            None => {
                let now = Utc::now();
                let meeting = Meeting {
                    id: uuid::Uuid::new_v4().to_string(),
                    calendar_event_id: event.calendar_event_id.clone(),
                    title: event.title.clone(),
                    scheduled_at: event.scheduled_at,
                    company: event.company.clone(),
                    role: event.role.clone(),
                    attendees: event.attendees.clone(),
                    status: MeetingStatus::New,
                    insights: Vec::new(),
                    hooks: Vec::new(),
                    competitors: Vec::new(),
                    draft_refs: Vec::new(),
                    feedback: None,
                    steering_version_at_run: None,
                    error_message: None,
                    created_at: now,
                    updated_at: now,
                };
                self.insert_meeting(&meeting)?;
                Ok((meeting, SyncOutcome::New))
            }
            Some(mut existing) => {
                let changed = existing.title != event.title
                    || existing.scheduled_at != event.scheduled_at
                    || existing.attendees != event.attendees
                    || existing.company != event.company
                    || existing.role != event.role;
                if !changed {
                    return Ok((existing, SyncOutcome::Unchanged));
                }

                existing.title = event.title.clone();
                existing.scheduled_at = event.scheduled_at;
                existing.company = event.company.clone();
                existing.role = event.role.clone();
                existing.attendees = event.attendees.clone();
                existing.updated_at = Utc::now();

                self.conn.execute(
                    "UPDATE meetings
                     SET title = ?1, scheduled_at = ?2, company = ?3, role = ?4,
                         attendees = ?5, updated_at = ?6
                     WHERE id = ?7",
                    params![
                        existing.title,
                        existing.scheduled_at.map(|dt| dt.to_rfc3339()),
                        existing.company,
                        existing.role,
                        to_json("attendees", &existing.attendees)?,
                        existing.updated_at.to_rfc3339(),
                        existing.id,
                    ],
                )?;
                Ok((existing, SyncOutcome::Changed))
            }
        }
    }

    fn insert_meeting(&self, meeting: &Meeting) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO meetings (
                id, calendar_event_id, title, scheduled_at, company, role,
                attendees, status, insights, hooks, competitors, draft_refs,
                feedback_score, feedback_notes, steering_version_at_run, error_message,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                meeting.id,
                meeting.calendar_event_id,
                meeting.title,
                meeting.scheduled_at.map(|dt| dt.to_rfc3339()),
                meeting.company,
                meeting.role,
                to_json("attendees", &meeting.attendees)?,
                meeting.status.to_string(),
                to_json("insights", &meeting.insights)?,
                to_json("hooks", &meeting.hooks)?,
                to_json("competitors", &meeting.competitors)?,
                to_json("draft_refs", &meeting.draft_refs)?,
                meeting.feedback.as_ref().map(|f| f.score as i64),
                meeting.feedback.as_ref().and_then(|f| f.notes.clone()),
                meeting.steering_version_at_run,
                meeting.error_message,
                meeting.created_at.to_rfc3339(),
                meeting.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Write a meeting's full mutable state in one statement, so a status
    /// change and its payload land together or not at all.
    pub fn persist_meeting(&self, meeting: &Meeting) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE meetings
             SET title = ?1, scheduled_at = ?2, company = ?3, role = ?4,
                 attendees = ?5, status = ?6, insights = ?7, hooks = ?8,
                 competitors = ?9, draft_refs = ?10, feedback_score = ?11,
                 feedback_notes = ?12, steering_version_at_run = ?13,
                 error_message = ?14, updated_at = ?15
             WHERE id = ?16",
            params![
                meeting.title,
                meeting.scheduled_at.map(|dt| dt.to_rfc3339()),
                meeting.company,
                meeting.role,
                to_json("attendees", &meeting.attendees)?,
                meeting.status.to_string(),
                to_json("insights", &meeting.insights)?,
                to_json("hooks", &meeting.hooks)?,
                to_json("competitors", &meeting.competitors)?,
                to_json("draft_refs", &meeting.draft_refs)?,
                meeting.feedback.as_ref().map(|f| f.score as i64),
                meeting.feedback.as_ref().and_then(|f| f.notes.clone()),
                meeting.steering_version_at_run,
                meeting.error_message,
                meeting.updated_at.to_rfc3339(),
                meeting.id,
            ],
        )?;
        Ok(())
    }
}
