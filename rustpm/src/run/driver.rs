use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use itertools::Itertools;

use pmcore::data::peak::{PeakMap, SiMap};
use pmcore::selection::select::EventSelector;

use crate::data::index::{read_event_index, EventIndexEntry};
use crate::data::kr::KrWriter;
use crate::data::pmaps::{load_pmaps, PMapLoad, PMapSet};

/// Driver state over one run's files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    MaxReached,
}

/// Per-run event counters, owned by the driver and reset at run start.
/// `nevt_out <= nevt_in` holds at all times.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunCounters {
    pub nevt_in: u64,
    pub nevt_out: u64,
}

impl RunCounters {
    /// Accepted fraction; `None` when no event was seen.
    pub fn ratio(&self) -> Option<f64> {
        if self.nevt_in == 0 {
            None
        } else {
            Some(self.nevt_out as f64 / self.nevt_in as f64)
        }
    }
}

/// Sequential event-loop driver.
///
/// Iterates input files in sorted order and their events in file order,
/// applies the selector to each event, forwards accepted records to the
/// sink, and enforces the global event cap. Strictly single-threaded;
/// reaching the cap is the only cancellation signal and stops this file
/// and every remaining one.
pub struct RunDriver {
    selector: EventSelector,
    nmax: i64,
    nprint: u64,
    counters: RunCounters,
    state: LoopState,
}

impl RunDriver {
    pub fn new(selector: EventSelector, nmax: i64, nprint: u64) -> Self {
        RunDriver {
            selector,
            nmax,
            nprint,
            counters: RunCounters::default(),
            state: LoopState::Running,
        }
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Process all input files, writing accepted events to `writer`.
    ///
    /// Files whose PMap load reports the recognized empty condition are
    /// skipped; any other load failure aborts the run.
    pub fn run(&mut self, files_in: &[String], writer: &mut KrWriter) -> Result<RunCounters, Box<dyn Error>> {
        self.counters = RunCounters::default();
        self.state = LoopState::Running;

        let files: Vec<PathBuf> = files_in.iter().sorted().map(PathBuf::from).collect();
        for path in &files {
            print!("Opening {}... ", path.display());
            std::io::stdout().flush().ok();

            match load_pmaps(path)? {
                PMapLoad::Empty => {
                    println!("Empty file. Skipping.");
                    continue;
                }
                PMapLoad::Loaded(pmaps) => {
                    let index = read_event_index(path)?;
                    self.event_loop(&index, &pmaps, writer)?;
                }
            }

            if self.state == LoopState::MaxReached {
                println!("Max events reached");
                break;
            } else {
                println!("OK");
            }
        }

        Ok(self.counters)
    }

    fn event_loop(
        &mut self,
        index: &[EventIndexEntry],
        pmaps: &PMapSet,
        writer: &mut KrWriter,
    ) -> Result<(), Box<dyn Error>> {
        let empty_peaks = PeakMap::new();
        let empty_si = SiMap::new();

        for entry in index {
            self.counters.nevt_in += 1;

            // An event absent from a PMap table has no peaks of that class
            let s1 = pmaps.s1.get(&entry.event).unwrap_or(&empty_peaks);
            let s2 = pmaps.s2.get(&entry.event).unwrap_or(&empty_peaks);
            let si = pmaps.s2si.get(&entry.event).unwrap_or(&empty_si);

            if let Some(evt) = self.selector.select_event(entry.event, entry.time, s1, s2, si) {
                self.counters.nevt_out += 1;
                writer.write(&evt)?;
            }

            if self.counters.nevt_in % self.nprint == 0 {
                println!("{} evts analyzed", self.counters.nevt_in);
            }

            if self.max_events_reached() {
                self.state = LoopState::MaxReached;
                break;
            }
        }

        Ok(())
    }

    fn max_events_reached(&self) -> bool {
        self.nmax >= 0 && self.counters.nevt_in >= self.nmax as u64
    }

    /// Print the end-of-run counts. The ratio is reported as undefined
    /// when no event was read instead of dividing by zero.
    pub fn print_summary(&self) {
        let ratio = match self.counters.ratio() {
            Some(r) => format!("{}", r),
            None => "undefined".to_string(),
        };
        println!();
        println!("Number of events in : {}", self.counters.nevt_in);
        println!("Number of events out: {}", self.counters.nevt_out);
        println!("Ratio               : {}", ratio);
    }
}
