use crate::data::event::S2Record;
use crate::data::peak::{PeakId, PeakMap, SiMap};

/// Final peak selection for one accepted event.
#[derive(Clone, Debug)]
pub struct Reduction {
    pub s1_peak: PeakId,
    pub s2: Vec<S2Record>,
}

/// Reduce the filtered peak sets to the single accepted (S1, S2) pairing.
///
/// Exactly one S1 survivor is required. The S1 multiplicity bounds
/// already enforce this upstream; the re-check here is intentional double
/// enforcement, not redundancy. An event without S2 survivors is rejected
/// regardless of its S1 content.
///
/// At most `s2_nmax` S2 peaks are kept even when more passed per-peak
/// filtering; the lowest peak ids win. Each kept peak yields its own
/// drift value `z = (s2 start time - s1 peak time) * drift_v`.
#[allow(clippy::too_many_arguments)]
pub fn reduce(
    s1_passing: &[PeakId],
    s2_passing: &[PeakId],
    s1_map: &PeakMap,
    s2_map: &PeakMap,
    si_map: &SiMap,
    ethr: f64,
    s2_nmax: usize,
    drift_v: f64,
) -> Option<Reduction> {
    if s1_passing.len() != 1 {
        return None;
    }
    if s2_passing.is_empty() {
        return None;
    }

    let s1_peak = s1_passing[0];
    let t0 = s1_map.get(&s1_peak)?.peak_time();

    let mut s2 = Vec::new();
    for peak_id in s2_passing.iter().take(s2_nmax) {
        let peak = s2_map.get(peak_id)?;
        let si = si_map.get(peak_id);
        s2.push(S2Record {
            peak: *peak_id,
            time: peak.start_time(),
            energy: peak.energy_above(ethr),
            width: peak.width(),
            height: peak.height(),
            charge: si.map(|s| s.total_charge(ethr)).unwrap_or(0.0),
            n_sipm: si.map(|s| s.n_sensors(ethr)).unwrap_or(0),
            z: (peak.start_time() - t0) * drift_v,
        });
    }

    Some(Reduction { s1_peak, s2 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::peak::Peak;

    fn peak_at(time: f64, energy: f64) -> Peak {
        Peak::new(vec![time], vec![energy])
    }

    fn maps() -> (PeakMap, PeakMap, SiMap) {
        let mut s1 = PeakMap::new();
        s1.insert(0, peak_at(100.0, 10.0));

        let mut s2 = PeakMap::new();
        s2.insert(0, peak_at(400.0, 50.0));
        s2.insert(1, peak_at(700.0, 60.0));

        (s1, s2, SiMap::new())
    }

    #[test]
    fn test_requires_exactly_one_s1() {
        let (s1, s2, si) = maps();
        assert!(reduce(&[], &[0], &s1, &s2, &si, 0.0, 1, 1.0).is_none());
        assert!(reduce(&[0, 1], &[0], &s1, &s2, &si, 0.0, 1, 1.0).is_none());
    }

    #[test]
    fn test_requires_at_least_one_s2() {
        let (s1, s2, si) = maps();
        assert!(reduce(&[0], &[], &s1, &s2, &si, 0.0, 1, 1.0).is_none());
    }

    #[test]
    fn test_cap_keeps_lowest_peak_ids() {
        let (s1, s2, si) = maps();
        let reduction = reduce(&[0], &[0, 1], &s1, &s2, &si, 0.0, 1, 1.0).unwrap();
        assert_eq!(reduction.s2.len(), 1);
        assert_eq!(reduction.s2[0].peak, 0);
        assert!((reduction.s2[0].z - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_s2_events_carry_one_drift_value_each() {
        let (s1, s2, si) = maps();
        let reduction = reduce(&[0], &[0, 1], &s1, &s2, &si, 0.0, 5, 2.0).unwrap();
        assert_eq!(reduction.s2.len(), 2);
        assert!((reduction.s2[0].z - 600.0).abs() < 1e-9);
        assert!((reduction.s2[1].z - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_drift_uses_s1_peak_time_and_s2_start_time() {
        let mut s1 = PeakMap::new();
        // Maximum sits on the middle sample: reference time 110
        s1.insert(4, Peak::new(vec![100.0, 110.0, 120.0], vec![1.0, 9.0, 2.0]));

        let mut s2 = PeakMap::new();
        s2.insert(2, Peak::new(vec![500.0, 510.0], vec![30.0, 80.0]));

        let reduction = reduce(&[4], &[2], &s1, &s2, &SiMap::new(), 0.0, 1, 1.0).unwrap();
        assert_eq!(reduction.s1_peak, 4);
        assert!((reduction.s2[0].z - 390.0).abs() < 1e-9);
    }
}
