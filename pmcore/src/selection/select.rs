use crate::data::event::KrEvent;
use crate::data::peak::{EventId, PeakMap, SiMap};
use crate::selection::criteria::PeakCriteria;
use crate::selection::filter::{filter_s1_peaks, filter_s2_peaks};
use crate::selection::reduce::reduce;

/// Event-level acceptance: composes the peak filters and the reducer
/// into the single entry point the event loop consumes.
///
/// Criteria are fixed at construction and shared read-only across all
/// events of a run; `select_event` is a pure function of its inputs.
#[derive(Clone, Debug)]
pub struct EventSelector {
    pub s1: PeakCriteria,
    pub s2: PeakCriteria,
    pub s2_nmax: usize,
    pub drift_v: f64,
}

impl EventSelector {
    pub fn new(s1: PeakCriteria, s2: PeakCriteria, s2_nmax: usize, drift_v: f64) -> Self {
        EventSelector {
            s1,
            s2,
            s2_nmax,
            drift_v,
        }
    }

    /// Decide one event.
    ///
    /// Returns the fully-populated record for an accepted event, `None`
    /// for a rejected one. Rejection is a normal outcome, never an error.
    pub fn select_event(
        &self,
        event: EventId,
        time: u64,
        s1_map: &PeakMap,
        s2_map: &PeakMap,
        si_map: &SiMap,
    ) -> Option<KrEvent> {
        // A failed multiplicity check rejects the event outright
        let s1_out = filter_s1_peaks(s1_map, &self.s1);
        if !s1_out.multiplicity_ok {
            return None;
        }
        let s2_out = filter_s2_peaks(s2_map, si_map, &self.s2);
        if !s2_out.multiplicity_ok {
            return None;
        }

        let reduction = reduce(
            &s1_out.passing,
            &s2_out.passing,
            s1_map,
            s2_map,
            si_map,
            self.s2.ethr,
            self.s2_nmax,
            self.drift_v,
        )?;

        let s1 = s1_map.get(&reduction.s1_peak)?;
        Some(KrEvent {
            event,
            time,
            s1_peak: reduction.s1_peak,
            s1_time: s1.peak_time(),
            s1_energy: s1.energy_above(self.s1.ethr),
            s1_width: s1.width(),
            s1_height: s1.height(),
            s2: reduction.s2,
        })
    }
}
