use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use pmcore::data::event::KrEvent;

/// Append-only sink for accepted events.
///
/// One JSON line per event, written in acceptance order; there is no
/// deduplication and no update of already-written records.
pub struct KrWriter {
    writer: BufWriter<File>,
}

impl KrWriter {
    pub fn create(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = File::create(path)
            .map_err(|e| format!("cannot create output file {}: {}", path.display(), e))?;
        Ok(KrWriter {
            writer: BufWriter::new(file),
        })
    }

    /// Persist one accepted event.
    pub fn write(&mut self, event: &KrEvent) -> Result<(), Box<dyn Error>> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush buffered records; call once at the end of the run.
    pub fn finish(mut self) -> Result<(), Box<dyn Error>> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read back a file written by [`KrWriter`], in write order.
pub fn read_kr_events(path: &Path) -> Result<Vec<KrEvent>, Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}
