extern crate rusqlite;

use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

use itertools::Itertools;
use pmcore::data::peak::{EventId, Peak, PeakId, PeakMap, SensorCharges, SensorId, SiMap};

/// PMap contents of one input file, keyed by event number.
///
/// An event missing from one of the maps simply has no reconstructed
/// peaks of that class; callers substitute an empty map.
#[derive(Debug, Default)]
pub struct PMapSet {
    pub s1: BTreeMap<EventId, PeakMap>,
    pub s2: BTreeMap<EventId, PeakMap>,
    pub s2si: BTreeMap<EventId, SiMap>,
}

/// Load result distinguishing readable PMaps from the recognized
/// "no data" condition. Only `Empty` may be skipped by the caller;
/// every other failure is a hard error.
#[derive(Debug)]
pub enum PMapLoad {
    Loaded(PMapSet),
    Empty,
}

struct S12Row {
    event: EventId,
    peak: PeakId,
    time: f64,
    ene: f64,
}

struct SiRow {
    event: EventId,
    peak: PeakId,
    nsipm: SensorId,
    ene: f64,
}

fn missing_table(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("no such table"))
}

fn read_s12_rows(conn: &Connection, table: &str) -> Result<Option<Vec<S12Row>>, Box<dyn Error>> {
    let columns: Vec<&str> = vec!["event", "peak", "time", "ene"];
    let query = format!("SELECT {} FROM {} ORDER BY rowid", columns.join(", "), table);

    let mut stmt = match conn.prepare(&query) {
        Ok(stmt) => stmt,
        Err(err) if missing_table(&err) => return Ok(None),
        Err(err) => return Err(Box::new(err)),
    };

    let rows: Result<Vec<S12Row>, _> = stmt
        .query_map([], |row| {
            Ok(S12Row {
                event: row.get(0)?,
                peak: row.get(1)?,
                time: row.get(2)?,
                ene: row.get(3)?,
            })
        })?
        .collect();

    Ok(Some(rows?))
}

fn read_si_rows(conn: &Connection, table: &str) -> Result<Option<Vec<SiRow>>, Box<dyn Error>> {
    let columns: Vec<&str> = vec!["event", "peak", "nsipm", "ene"];
    let query = format!("SELECT {} FROM {} ORDER BY rowid", columns.join(", "), table);

    let mut stmt = match conn.prepare(&query) {
        Ok(stmt) => stmt,
        Err(err) if missing_table(&err) => return Ok(None),
        Err(err) => return Err(Box::new(err)),
    };

    let rows: Result<Vec<SiRow>, _> = stmt
        .query_map([], |row| {
            Ok(SiRow {
                event: row.get(0)?,
                peak: row.get(1)?,
                nsipm: row.get(2)?,
                ene: row.get(3)?,
            })
        })?
        .collect();

    Ok(Some(rows?))
}

fn group_s12(rows: Vec<S12Row>) -> BTreeMap<EventId, PeakMap> {
    let mut out: BTreeMap<EventId, PeakMap> = BTreeMap::new();
    // Sample order within a peak follows row order, i.e. time order
    for ((event, peak), samples) in rows
        .into_iter()
        .map(|r| ((r.event, r.peak), (r.time, r.ene)))
        .into_group_map()
    {
        let (time, energy): (Vec<f64>, Vec<f64>) = samples.into_iter().unzip();
        out.entry(event).or_default().insert(peak, Peak::new(time, energy));
    }
    out
}

fn group_si(rows: Vec<SiRow>) -> BTreeMap<EventId, SiMap> {
    let mut out: BTreeMap<EventId, SiMap> = BTreeMap::new();
    for ((event, peak, nsipm), charges) in rows
        .into_iter()
        .map(|r| ((r.event, r.peak, r.nsipm), r.ene))
        .into_group_map()
    {
        out.entry(event)
            .or_default()
            .entry(peak)
            .or_insert_with(SensorCharges::default)
            .traces
            .insert(nsipm, charges);
    }
    out
}

/// Load the S1/S2/S2Si PMaps of one input file.
///
/// A file with a missing PMap table, or with all three tables empty, is
/// reported as [`PMapLoad::Empty`] so the caller can skip it and move on;
/// any other failure propagates.
pub fn load_pmaps(path: &Path) -> Result<PMapLoad, Box<dyn Error>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let s1_rows = read_s12_rows(&conn, "pmaps_s1")?;
    let s2_rows = read_s12_rows(&conn, "pmaps_s2")?;
    let si_rows = read_si_rows(&conn, "pmaps_s2si")?;

    let (s1_rows, s2_rows, si_rows) = match (s1_rows, s2_rows, si_rows) {
        (Some(s1), Some(s2), Some(si)) => (s1, s2, si),
        _ => return Ok(PMapLoad::Empty),
    };

    if s1_rows.is_empty() && s2_rows.is_empty() && si_rows.is_empty() {
        return Ok(PMapLoad::Empty);
    }

    Ok(PMapLoad::Loaded(PMapSet {
        s1: group_s12(s1_rows),
        s2: group_s12(s2_rows),
        s2si: group_si(si_rows),
    }))
}
