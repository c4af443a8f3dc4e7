//! One-shot calendar poll against a prepline database.
//!
//! Reads parsed calendar events from a JSON file (the file stands in for
//! the calendar collaborator), syncs them, and prints the poll counts as
//! JSON.
//!
//! Usage: prepline-poll <events.json> [db-path]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use prepline::poll::{trigger_poll, CalendarSource};
use prepline::service::MeetingService;
use prepline::types::CalendarEvent;

struct FileCalendarSource {
    path: PathBuf,
}

#[async_trait]
impl CalendarSource for FileCalendarSource {
    async fn fetch_upcoming(&self) -> Result<Vec<CalendarEvent>, String> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", self.path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse {}: {}", self.path.display(), e))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let events_path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: prepline-poll <events.json> [db-path]");
            std::process::exit(1);
        }
    };

    let service = match args.next() {
        Some(db_path) => MeetingService::open_at(Path::new(&db_path)),
        None => MeetingService::open(),
    };
    let service = match service {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let source = FileCalendarSource { path: events_path };
    match trigger_poll(&service, &source).await {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to encode outcome: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Poll failed: {e}");
            std::process::exit(1);
        }
    }
}
