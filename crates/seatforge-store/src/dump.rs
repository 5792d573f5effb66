//! Diagnostic snapshots of the whole store.

use std::fmt::Write as _;
use std::str::FromStr;

use seatforge_protocol::{EventId, SeatMap};
use serde::{Deserialize, Serialize};

use crate::Event;

/// How [`EventStore::dump_all`](crate::EventStore::dump_all) renders events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    /// `Event: <id>` followed by one line per row, seats separated by
    /// spaces.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for DumpFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown dump format `{other}` (expected text or json)")),
        }
    }
}

/// One event's id and seat grid at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// The event's id.
    pub event_id: EventId,
    /// Its seats.
    #[serde(flatten)]
    pub seats: SeatMap,
}

impl EventSnapshot {
    /// Copies an event under its shared lock.
    pub async fn capture(event: &Event) -> Self {
        Self {
            event_id: event.id(),
            seats: event.snapshot().await,
        }
    }

    /// Renders the snapshot in the given format, newline-terminated.
    pub fn render(&self, format: DumpFormat) -> std::io::Result<String> {
        match format {
            DumpFormat::Text => {
                let mut out = String::new();
                // Writing into a String cannot fail.
                let _ = write!(out, "Event: {}\n{}", self.event_id, self.seats);
                Ok(out)
            }
            DumpFormat::Json => {
                let mut out = serde_json::to_string(self).map_err(std::io::Error::other)?;
                out.push('\n');
                Ok(out)
            }
        }
    }
}
