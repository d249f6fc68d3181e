use crate::data::peak::{Peak, PeakId, PeakMap, SensorCharges, SiMap};
use crate::selection::criteria::PeakCriteria;

/// Derived quantities of one peak, measured against a `PeakCriteria`.
#[derive(Clone, Debug, PartialEq)]
pub struct PeakSummary {
    pub peak: PeakId,
    pub energy: f64,
    pub width: f64,
    pub height: f64,
    /// Sensor multiplicity; `None` for peak classes without sensor maps.
    pub n_sensors: Option<usize>,
}

/// Outcome of filtering one event's peaks of a single class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOutcome {
    /// Whether the event-level multiplicity bound held.
    pub multiplicity_ok: bool,
    /// Ids of the peaks that individually passed, ascending.
    pub passing: Vec<PeakId>,
}

impl FilterOutcome {
    fn rejected() -> Self {
        FilterOutcome {
            multiplicity_ok: false,
            passing: Vec::new(),
        }
    }
}

fn summarize_s1(peak_id: PeakId, peak: &Peak, ethr: f64) -> PeakSummary {
    PeakSummary {
        peak: peak_id,
        energy: peak.energy_above(ethr),
        width: peak.width(),
        height: peak.height(),
        n_sensors: None,
    }
}

fn summarize_s2(peak_id: PeakId, peak: &Peak, si: Option<&SensorCharges>, ethr: f64) -> PeakSummary {
    PeakSummary {
        peak: peak_id,
        energy: peak.energy_above(ethr),
        width: peak.width(),
        height: peak.height(),
        // An S2 peak with no sensor entry has zero sensor multiplicity
        n_sensors: Some(si.map(|s| s.n_sensors(ethr)).unwrap_or(0)),
    }
}

/// Filter an event's S1 peaks.
///
/// The multiplicity bound is authoritative: when it fails, the event
/// fails for this peak class, no peak is evaluated and the outcome
/// carries no survivors. Out-of-range peaks are silently excluded,
/// never reported as errors.
pub fn filter_s1_peaks(peaks: &PeakMap, criteria: &PeakCriteria) -> FilterOutcome {
    if !criteria.multiplicity_ok(peaks.len()) {
        return FilterOutcome::rejected();
    }

    let passing = peaks
        .iter()
        .filter(|&(id, peak)| criteria.passes(&summarize_s1(*id, peak, criteria.ethr)))
        .map(|(id, _)| *id)
        .collect();

    FilterOutcome {
        multiplicity_ok: true,
        passing,
    }
}

/// Filter an event's S2 peaks against the criteria and their per-sensor
/// charge breakdowns. Same contract as [`filter_s1_peaks`], with the
/// sensor-count bound evaluated in addition.
pub fn filter_s2_peaks(peaks: &PeakMap, si: &SiMap, criteria: &PeakCriteria) -> FilterOutcome {
    if !criteria.multiplicity_ok(peaks.len()) {
        return FilterOutcome::rejected();
    }

    let passing = peaks
        .iter()
        .filter(|&(id, peak)| criteria.passes(&summarize_s2(*id, peak, si.get(id), criteria.ethr)))
        .map(|(id, _)| *id)
        .collect();

    FilterOutcome {
        multiplicity_ok: true,
        passing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::peak::Peak;
    use rand::Rng;
    use std::collections::BTreeMap;

    fn single_sample_peak(time: f64, energy: f64) -> Peak {
        Peak::new(vec![time], vec![energy])
    }

    #[test]
    fn test_multiplicity_failure_short_circuits() {
        let criteria = PeakCriteria {
            nmin: 1,
            nmax: 1,
            emin: 1e9, // would reject every peak if evaluated
            ..PeakCriteria::default()
        };
        let mut peaks = PeakMap::new();
        peaks.insert(0, single_sample_peak(100.0, 10.0));
        peaks.insert(1, single_sample_peak(200.0, 20.0));

        let outcome = filter_s1_peaks(&peaks, &criteria);
        assert!(!outcome.multiplicity_ok);
        assert!(outcome.passing.is_empty());
    }

    #[test]
    fn test_out_of_range_peaks_silently_excluded() {
        let criteria = PeakCriteria {
            emin: 15.0,
            emax: 100.0,
            ..PeakCriteria::default()
        };
        let mut peaks = PeakMap::new();
        peaks.insert(3, single_sample_peak(100.0, 10.0));
        peaks.insert(1, single_sample_peak(200.0, 20.0));
        peaks.insert(2, single_sample_peak(300.0, 500.0));

        let outcome = filter_s1_peaks(&peaks, &criteria);
        assert!(outcome.multiplicity_ok);
        assert_eq!(outcome.passing, vec![1]);
    }

    #[test]
    fn test_upper_energy_bound_is_inclusive() {
        let criteria = PeakCriteria {
            emax: 100.0,
            ..PeakCriteria::default()
        };
        let mut at_bound = PeakMap::new();
        at_bound.insert(0, single_sample_peak(0.0, 100.0));
        assert_eq!(filter_s1_peaks(&at_bound, &criteria).passing, vec![0]);

        let mut above_bound = PeakMap::new();
        above_bound.insert(0, single_sample_peak(0.0, 100.0001));
        assert!(filter_s1_peaks(&above_bound, &criteria).passing.is_empty());
    }

    #[test]
    fn test_zero_sample_peak_needs_zero_admitting_bounds() {
        let mut peaks = PeakMap::new();
        peaks.insert(0, Peak::default());

        let permissive = PeakCriteria::default();
        assert_eq!(filter_s1_peaks(&peaks, &permissive).passing, vec![0]);

        let demanding = PeakCriteria {
            emin: 0.1,
            ..PeakCriteria::default()
        };
        assert!(filter_s1_peaks(&peaks, &demanding).passing.is_empty());
    }

    #[test]
    fn test_s2_sensor_count_bound() {
        let criteria = PeakCriteria {
            nsipm_min: 2,
            nsipm_max: 10,
            ..PeakCriteria::default()
        };
        let mut peaks = PeakMap::new();
        peaks.insert(0, single_sample_peak(1000.0, 50.0));
        peaks.insert(1, single_sample_peak(2000.0, 50.0));

        let mut si = SiMap::new();
        let mut traces = BTreeMap::new();
        traces.insert(10, vec![5.0]);
        traces.insert(11, vec![3.0]);
        traces.insert(12, vec![1.0]);
        si.insert(0, SensorCharges::new(traces));
        // Peak 1 has no sensor entry: multiplicity zero, below nsipm_min

        let outcome = filter_s2_peaks(&peaks, &si, &criteria);
        assert!(outcome.multiplicity_ok);
        assert_eq!(outcome.passing, vec![0]);
    }

    #[test]
    fn test_passing_ids_are_ascending() {
        let criteria = PeakCriteria::default();
        let mut peaks = PeakMap::new();
        for id in [7, 2, 9, 4] {
            peaks.insert(id, single_sample_peak(id as f64, 1.0));
        }
        let outcome = filter_s1_peaks(&peaks, &criteria);
        assert_eq!(outcome.passing, vec![2, 4, 7, 9]);
    }

    #[test]
    fn test_filter_is_idempotent_on_random_peaks() {
        let mut rng = rand::thread_rng();
        let criteria = PeakCriteria {
            emin: 20.0,
            emax: 80.0,
            lmin: 0.5,
            ..PeakCriteria::default()
        };

        let mut peaks = PeakMap::new();
        for id in 0..50 {
            let n = rng.gen_range(1..6);
            let t0 = rng.gen_range(0.0..1000.0);
            let time: Vec<f64> = (0..n).map(|i| t0 + i as f64).collect();
            let energy: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..40.0)).collect();
            peaks.insert(id, Peak::new(time, energy));
        }

        let first = filter_s1_peaks(&peaks, &criteria);
        let second = filter_s1_peaks(&peaks, &criteria);
        assert_eq!(first, second);
    }
}
