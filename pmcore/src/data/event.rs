use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::data::peak::{EventId, PeakId};

/// Summary of one kept S2 peak, including the drift value derived from
/// its delay with respect to the chosen S1 peak.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct S2Record {
    pub peak: PeakId,
    pub time: f64,
    pub energy: f64,
    pub width: f64,
    pub height: f64,
    pub charge: f64,
    pub n_sipm: usize,
    pub z: f64,
}

/// Accepted-event record handed to the output sink.
///
/// Created only for events that pass every criterion; carries the chosen
/// S1 peak's summary and one `S2Record` per kept S2 peak (at least one,
/// at most the configured cap).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KrEvent {
    pub event: EventId,
    pub time: u64,
    pub s1_peak: PeakId,
    pub s1_time: f64,
    pub s1_energy: f64,
    pub s1_width: f64,
    pub s1_height: f64,
    pub s2: Vec<S2Record>,
}

impl Display for KrEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KrEvent(event: {}, s1 peak: {}, s2 peaks: {})",
            self.event,
            self.s1_peak,
            self.s2.len()
        )
    }
}
