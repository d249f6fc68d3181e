use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use pmcore::selection::criteria::PeakCriteria;
use pmcore::selection::select::EventSelector;

fn default_compression() -> String {
    "ZLIB4".to_string()
}

fn default_nprint() -> u64 {
    10000
}

fn default_nevents() -> i64 {
    -1
}

fn default_drift_v() -> f64 {
    1.0
}

fn default_s2_nmax() -> usize {
    1
}

fn default_nsipm_min() -> usize {
    1
}

fn default_nsipm_max() -> usize {
    usize::MAX
}

fn unbounded() -> f64 {
    f64::INFINITY
}

/// Flat run configuration, read once at startup.
///
/// Omitted bounds are unconstrained on that side; omitted counts follow
/// the production defaults. Unknown keys are rejected so a misspelled
/// bound cannot silently fall back to a wrong value.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Input PMap files, processed in sorted order.
    pub files_in: Vec<String>,
    /// Output path for the accepted-event records.
    pub file_out: String,
    /// Accepted for compatibility with existing run files; the line-based
    /// sink does not compress.
    #[serde(default = "default_compression")]
    pub compression: String,
    /// Progress message interval, in input events.
    #[serde(default = "default_nprint")]
    pub nprint: u64,
    /// Global event cap across all files; negative means unbounded.
    #[serde(default = "default_nevents")]
    pub nevents: i64,
    /// Ignore `nevents` and process every event.
    #[serde(default)]
    pub run_all: bool,
    /// Drift velocity converting an S2-S1 time delay into a z coordinate.
    #[serde(default = "default_drift_v")]
    pub drift_v: f64,

    #[serde(default)]
    pub s1_emin: f64,
    #[serde(default = "unbounded")]
    pub s1_emax: f64,
    #[serde(default)]
    pub s1_lmin: f64,
    #[serde(default = "unbounded")]
    pub s1_lmax: f64,
    #[serde(default)]
    pub s1_hmin: f64,
    #[serde(default = "unbounded")]
    pub s1_hmax: f64,
    #[serde(default)]
    pub s1_ethr: f64,

    /// Maximum number of S2 peaks kept per accepted event.
    #[serde(default = "default_s2_nmax")]
    pub s2_nmax: usize,
    #[serde(default)]
    pub s2_emin: f64,
    #[serde(default = "unbounded")]
    pub s2_emax: f64,
    #[serde(default)]
    pub s2_lmin: f64,
    #[serde(default = "unbounded")]
    pub s2_lmax: f64,
    #[serde(default)]
    pub s2_hmin: f64,
    #[serde(default = "unbounded")]
    pub s2_hmax: f64,
    #[serde(default = "default_nsipm_min")]
    pub s2_nsipm_min: usize,
    #[serde(default = "default_nsipm_max")]
    pub s2_nsipm_max: usize,
    #[serde(default)]
    pub s2_ethr: f64,
}

impl RunConfig {
    /// Read and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path)
            .map_err(|e| format!("cannot open config file {}: {}", path.display(), e))?;
        let config: RunConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| format!("invalid config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject impossible parameter combinations before any event is read.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.files_in.is_empty() {
            return Err("files_in must name at least one input file".into());
        }
        if self.nprint == 0 {
            return Err("nprint must be positive".into());
        }
        if self.s2_nmax == 0 {
            return Err("s2_nmax must be at least 1".into());
        }
        if !self.drift_v.is_finite() || self.drift_v <= 0.0 {
            return Err("drift_v must be positive and finite".into());
        }

        let ranges = [
            ("s1_e", self.s1_emin, self.s1_emax),
            ("s1_l", self.s1_lmin, self.s1_lmax),
            ("s1_h", self.s1_hmin, self.s1_hmax),
            ("s2_e", self.s2_emin, self.s2_emax),
            ("s2_l", self.s2_lmin, self.s2_lmax),
            ("s2_h", self.s2_hmin, self.s2_hmax),
        ];
        for (name, lo, hi) in ranges {
            if lo > hi {
                return Err(format!("{}min exceeds {}max", name, name).into());
            }
        }
        if self.s2_nsipm_min > self.s2_nsipm_max {
            return Err("s2_nsipm_min exceeds s2_nsipm_max".into());
        }

        Ok(())
    }

    /// S1 acceptance bounds; the multiplicity range is pinned to exactly
    /// one primary peak, as in the production configuration.
    pub fn s1_criteria(&self) -> PeakCriteria {
        PeakCriteria {
            emin: self.s1_emin,
            emax: self.s1_emax,
            lmin: self.s1_lmin,
            lmax: self.s1_lmax,
            hmin: self.s1_hmin,
            hmax: self.s1_hmax,
            ethr: self.s1_ethr,
            ..PeakCriteria::s1_defaults()
        }
    }

    /// S2 acceptance bounds. The multiplicity range stays `[1, unbounded]`:
    /// `s2_nmax` caps the reducer output instead of rejecting the event.
    pub fn s2_criteria(&self) -> PeakCriteria {
        PeakCriteria {
            emin: self.s2_emin,
            emax: self.s2_emax,
            lmin: self.s2_lmin,
            lmax: self.s2_lmax,
            hmin: self.s2_hmin,
            hmax: self.s2_hmax,
            nsipm_min: self.s2_nsipm_min,
            nsipm_max: self.s2_nsipm_max,
            ethr: self.s2_ethr,
            ..PeakCriteria::s2_defaults()
        }
    }

    /// The configured event selector, immutable for the whole run.
    pub fn selector(&self) -> EventSelector {
        EventSelector::new(
            self.s1_criteria(),
            self.s2_criteria(),
            self.s2_nmax,
            self.drift_v,
        )
    }

    /// Effective event cap: negative means unbounded.
    pub fn nmax(&self) -> i64 {
        if self.run_all {
            -1
        } else {
            self.nevents
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<RunConfig, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_minimal_config_gets_production_defaults() {
        let config = parse(r#"{"files_in": ["a.db"], "file_out": "out.jsonl"}"#).unwrap();
        config.validate().unwrap();

        assert_eq!(config.nprint, 10000);
        assert_eq!(config.nevents, -1);
        assert_eq!(config.s2_nmax, 1);
        assert_eq!(config.s2_nsipm_min, 1);
        assert_eq!(config.compression, "ZLIB4");
        assert!(config.s1_emax.is_infinite());

        let s1 = config.s1_criteria();
        assert_eq!((s1.nmin, s1.nmax), (1, 1));
        let s2 = config.s2_criteria();
        assert_eq!(s2.nmin, 1);
        assert_eq!(s2.nmax, usize::MAX);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = parse(r#"{"files_in": ["a.db"], "file_out": "o", "s1_emn": 3.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_numeric_bound_is_rejected() {
        let result = parse(r#"{"files_in": ["a.db"], "file_out": "o", "s1_emax": "high"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_range_fails_validation() {
        let config =
            parse(r#"{"files_in": ["a.db"], "file_out": "o", "s2_emin": 10.0, "s2_emax": 5.0}"#)
                .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_file_list_fails_validation() {
        let config = parse(r#"{"files_in": [], "file_out": "o"}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_all_overrides_the_event_cap() {
        let config = parse(
            r#"{"files_in": ["a.db"], "file_out": "o", "nevents": 100, "run_all": true}"#,
        )
        .unwrap();
        assert_eq!(config.nmax(), -1);
    }
}
