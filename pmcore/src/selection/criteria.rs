use serde::{Deserialize, Serialize};

use crate::selection::filter::PeakSummary;

/// Acceptance bounds for one peak class (S1 or S2).
///
/// All bounds are inclusive. Unconstrained sides are 0 for minima and
/// `f64::INFINITY` (`usize::MAX` for counts) for maxima. A criteria set
/// is built once from configuration and shared read-only across all
/// events of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeakCriteria {
    // Multiplicity bounds on the raw peak count per event
    pub nmin: usize,
    pub nmax: usize,

    // Energy bounds
    pub emin: f64,
    pub emax: f64,

    // Time-width bounds
    pub lmin: f64,
    pub lmax: f64,

    // Height bounds
    pub hmin: f64,
    pub hmax: f64,

    // Per-sample threshold applied when integrating a peak
    pub ethr: f64,

    // Sensor-count bounds, meaningful for S2 peaks only
    pub nsipm_min: usize,
    pub nsipm_max: usize,
}

impl Default for PeakCriteria {
    /// Fully unconstrained bounds.
    fn default() -> Self {
        Self {
            nmin: 0,
            nmax: usize::MAX,
            emin: 0.0,
            emax: f64::INFINITY,
            lmin: 0.0,
            lmax: f64::INFINITY,
            hmin: 0.0,
            hmax: f64::INFINITY,
            ethr: 0.0,
            nsipm_min: 0,
            nsipm_max: usize::MAX,
        }
    }
}

impl PeakCriteria {
    /// Production S1 bounds: exactly one primary peak per event.
    pub fn s1_defaults() -> Self {
        Self {
            nmin: 1,
            nmax: 1,
            ..Self::default()
        }
    }

    /// Production S2 bounds: at least one ionization peak, at least one
    /// contributing sensor.
    pub fn s2_defaults() -> Self {
        Self {
            nmin: 1,
            nsipm_min: 1,
            ..Self::default()
        }
    }

    /// Check the event-level multiplicity bound for this peak class.
    #[inline]
    pub fn multiplicity_ok(&self, n_peaks: usize) -> bool {
        self.nmin <= n_peaks && n_peaks <= self.nmax
    }

    /// Check if a peak summary passes every bound of this criteria set.
    #[inline]
    pub fn passes(&self, s: &PeakSummary) -> bool {
        // Energy check
        if s.energy < self.emin || s.energy > self.emax {
            return false;
        }

        // Width check
        if s.width < self.lmin || s.width > self.lmax {
            return false;
        }

        // Height check
        if s.height < self.hmin || s.height > self.hmax {
            return false;
        }

        // Sensor-count check, only for classes that carry a sensor map
        if let Some(n) = s.n_sensors {
            if n < self.nsipm_min || n > self.nsipm_max {
                return false;
            }
        }

        true
    }
}
