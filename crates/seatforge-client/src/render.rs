//! Text rendering of responses for command-line clients.

use std::fmt::Write as _;

use seatforge_protocol::EventId;

/// Renders a `list` response: one `Event: <id>` line per event, or
/// `No events` for an empty store.
///
/// Seat maps need no helper here; [`SeatMap`](seatforge_protocol::SeatMap)
/// implements `Display` in the matching row format.
pub fn render_event_list(ids: &[EventId]) -> String {
    if ids.is_empty() {
        return "No events\n".to_string();
    }
    let mut out = String::new();
    for id in ids {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "Event: {id}");
    }
    out
}
