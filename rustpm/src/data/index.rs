use rusqlite::{Connection, OpenFlags};
use std::error::Error;
use std::path::Path;

use pmcore::data::peak::EventId;

/// One `(event_number, timestamp)` entry of a file's event index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventIndexEntry {
    pub event: EventId,
    pub time: u64,
}

/// Read the event index of one input file, in file order, aligned with
/// the event keys used by the PMap tables.
pub fn read_event_index(path: &Path) -> Result<Vec<EventIndexEntry>, Box<dyn Error>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let columns: Vec<&str> = vec!["event", "time"];
    let query = format!("SELECT {} FROM events ORDER BY rowid", columns.join(", "));

    let entries: Result<Vec<EventIndexEntry>, _> = conn
        .prepare(&query)?
        .query_map([], |row| {
            Ok(EventIndexEntry {
                event: row.get(0)?,
                time: row.get(1)?,
            })
        })?
        .collect();

    Ok(entries?)
}
