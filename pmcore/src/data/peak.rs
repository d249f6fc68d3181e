use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use itertools::izip;
use serde::{Deserialize, Serialize};

/// Integer id of a peak within one event.
pub type PeakId = i32;
/// Event number as recorded in the PMap tables.
pub type EventId = i64;
/// Hardware id of a charge-collecting sensor.
pub type SensorId = i64;

/// Reconstructed signal peak with associated sample times and amplitudes.
///
/// Peaks are built upstream and never mutated here; the selection stage
/// only reads the derived quantities below.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Peak {
    pub time: Vec<f64>,
    pub energy: Vec<f64>,
}

impl Peak {
    /// Constructs a new `Peak`.
    ///
    /// # Arguments
    ///
    /// * `time` - A vector of sample times.
    /// * `energy` - A vector of sample amplitudes corresponding to the times.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use pmcore::data::peak::Peak;
    /// let peak = Peak::new(vec![100.0, 125.0], vec![10.0, 20.0]);
    /// assert_eq!(peak.height(), 20.0);
    /// ```
    pub fn new(time: Vec<f64>, energy: Vec<f64>) -> Self {
        Peak { time, energy }
    }

    /// Integrated energy: sum of the samples strictly above `ethr`.
    /// Samples at or below the threshold contribute zero.
    pub fn energy_above(&self, ethr: f64) -> f64 {
        self.energy.iter().filter(|&&e| e > ethr).sum()
    }

    /// Time span covered by the samples with nonzero amplitude.
    /// A peak with no such sample has zero width.
    pub fn width(&self) -> f64 {
        let mut first = None;
        let mut last = None;
        for (t, e) in izip!(&self.time, &self.energy) {
            if *e > 0.0 {
                if first.is_none() {
                    first = Some(*t);
                }
                last = Some(*t);
            }
        }
        match (first, last) {
            (Some(t0), Some(t1)) => t1 - t0,
            _ => 0.0,
        }
    }

    /// Maximum amplitude, zero for an empty peak.
    pub fn height(&self) -> f64 {
        self.energy.iter().cloned().fold(0.0, f64::max)
    }

    /// Time of the maximum-amplitude sample. This is the reference time a
    /// primary (S1) peak contributes to the drift computation.
    pub fn peak_time(&self) -> f64 {
        izip!(&self.time, &self.energy)
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(t, _)| *t)
            .unwrap_or(0.0)
    }

    /// Time of the first sample. This is the reference time a secondary
    /// (S2) peak contributes to the drift computation.
    pub fn start_time(&self) -> f64 {
        self.time.first().copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

impl Display for Peak {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Peak(samples: {}, height: {})", self.len(), self.height())
    }
}

/// Per-sensor charge traces of one S2 peak.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SensorCharges {
    pub traces: BTreeMap<SensorId, Vec<f64>>,
}

impl SensorCharges {
    pub fn new(traces: BTreeMap<SensorId, Vec<f64>>) -> Self {
        SensorCharges { traces }
    }

    fn integrate(trace: &[f64], ethr: f64) -> f64 {
        trace.iter().filter(|&&q| q > ethr).sum()
    }

    /// Number of sensors with nonzero integrated charge, integrating each
    /// trace with the same per-sample threshold used for peak energies.
    pub fn n_sensors(&self, ethr: f64) -> usize {
        self.traces
            .values()
            .filter(|trace| Self::integrate(trace, ethr) > 0.0)
            .count()
    }

    /// Integrated charge summed over all sensors.
    pub fn total_charge(&self, ethr: f64) -> f64 {
        self.traces
            .values()
            .map(|trace| Self::integrate(trace, ethr))
            .sum()
    }
}

/// Peaks of one class (S1 or S2) for a single event, keyed by peak id.
/// The ordered map gives deterministic ascending-id iteration.
pub type PeakMap = BTreeMap<PeakId, Peak>;

/// Sensor-charge breakdowns of one event's S2 peaks, keyed by peak id.
pub type SiMap = BTreeMap<PeakId, SensorCharges>;
