//! Data types for primer-dimer screening

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{Result, ScreenError};
use super::jmer_index::MAX_JMER_LEN;
use super::primers::Primer;
use super::tail_index::MAX_TAIL_LEN;

/// Thread count configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadCount {
    /// Use all available CPU cores
    Auto,
    /// Use a specific number of threads
    Fixed(usize),
}

impl Default for ThreadCount {
    fn default() -> Self {
        Self::Auto
    }
}

impl ThreadCount {
    /// Get the actual number of threads to use
    pub fn get_count(&self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Self::Fixed(n) => (*n).max(1),
        }
    }
}

/// Range of tail configurations to tabulate alongside a screening run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailSweepParams {
    pub min_tail_len: usize,
    pub max_tail_len: usize,
    /// Budgets 0..=max_mismatches are tried for every tail length
    pub max_mismatches: i32,
}

impl Default for TailSweepParams {
    fn default() -> Self {
        Self {
            min_tail_len: 5,
            max_tail_len: 8,
            max_mismatches: 3,
        }
    }
}

/// Screening parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenParams {
    /// Length of the 3' tail indexed for complementarity
    pub tail_len: usize,
    /// Hamming budget when expanding tails (the 3' base always matches)
    pub max_mismatches: i32,
    /// j-mer length for signature overlap
    pub jmer_len: usize,
    /// Minimum shared j-mers for a pair to be reported
    pub minimum_matching_jmers: u32,
    /// Minimum complementary run length for a pair to be reported; 0 disables
    pub minimum_lcs: usize,
    /// Leading block of primers used for pass-rate proportions
    pub sample_size: usize,
    pub thread_count: ThreadCount,
    #[serde(default)]
    pub tail_sweep: Option<TailSweepParams>,
}

impl Default for ScreenParams {
    fn default() -> Self {
        Self {
            tail_len: 5,
            max_mismatches: 1,
            jmer_len: 4,
            minimum_matching_jmers: 2,
            minimum_lcs: 0,
            sample_size: 1000,
            thread_count: ThreadCount::Auto,
            tail_sweep: None,
        }
    }
}

impl ScreenParams {
    pub fn validate(&self) -> Result<()> {
        if self.tail_len == 0 || self.tail_len > MAX_TAIL_LEN {
            return Err(ScreenError::invalid_argument(format!(
                "tail_len must be between 1 and {}, got {}",
                MAX_TAIL_LEN, self.tail_len
            )));
        }
        if self.max_mismatches < 0 {
            return Err(ScreenError::invalid_argument(format!(
                "max_mismatches must be nonnegative, got {}",
                self.max_mismatches
            )));
        }
        if self.jmer_len == 0 || self.jmer_len > MAX_JMER_LEN {
            return Err(ScreenError::invalid_argument(format!(
                "jmer_len must be between 1 and {}, got {}",
                MAX_JMER_LEN, self.jmer_len
            )));
        }
        if let Some(sweep) = &self.tail_sweep {
            if sweep.min_tail_len == 0
                || sweep.min_tail_len > sweep.max_tail_len
                || sweep.max_tail_len > MAX_TAIL_LEN
            {
                return Err(ScreenError::invalid_argument(format!(
                    "tail sweep range {}..={} must lie within 1..={}",
                    sweep.min_tail_len, sweep.max_tail_len, MAX_TAIL_LEN
                )));
            }
            if sweep.max_mismatches < 0 {
                return Err(ScreenError::invalid_argument(
                    "tail sweep max_mismatches must be nonnegative",
                ));
            }
        }
        Ok(())
    }
}

/// A primer pair flagged as a likely dimer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimerCandidate {
    pub primer_a: usize,
    pub primer_b: usize,
    pub name_a: String,
    pub name_b: String,
    pub jmer_matches: u32,
    /// Longest complementary run, when the LCS filter was enabled
    pub lcs: Option<usize>,
}

/// Pass rates of each filter over the leading sample block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleProportions {
    pub sample_size: usize,
    pub tail_fraction: f64,
    pub jmer_fraction: f64,
}

/// One tail configuration in a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub tail_len: usize,
    pub max_mismatches: i32,
    pub index_entries: usize,
    pub mean_hit_fraction: f64,
    /// Chance of an exact random tail occurring in a primer (budget 0 only)
    pub expected_hit_fraction: Option<f64>,
}

/// Complete screening results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResults {
    pub params: ScreenParams,
    pub primers: Vec<Primer>,
    pub tail_hit_fraction: f64,
    pub mean_shared_jmers: f64,
    /// Shared j-mer count -> number of ordered pairs
    #[serde(default)]
    pub jmer_histogram: BTreeMap<u32, usize>,
    pub sample: SampleProportions,
    pub candidates: Vec<DimerCandidate>,
    #[serde(default)]
    pub sweep: Vec<SweepRow>,
}

impl ScreeningResults {
    /// Fraction of all ordered primer pairs reported as candidates
    pub fn candidate_fraction(&self) -> f64 {
        let n = self.primers.len();
        if n == 0 {
            return 0.0;
        }
        self.candidates.len() as f64 / (n * n) as f64
    }

    /// Names of the partners flagged for each primer, in primer order.
    pub fn partners_by_primer(&self) -> Vec<(String, Vec<String>)> {
        let mut partners: Vec<Vec<String>> = vec![Vec::new(); self.primers.len()];
        for candidate in &self.candidates {
            partners[candidate.primer_a].push(candidate.name_b.clone());
        }
        self.primers
            .iter()
            .zip(partners)
            .filter(|(_, names)| !names.is_empty())
            .map(|(primer, names)| (primer.name.clone(), names))
            .collect()
    }
}

/// Progress update during screening
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub step: usize,
    pub total_steps: usize,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(ScreenParams::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut params = ScreenParams::default();
        params.max_mismatches = -1;
        assert!(matches!(
            params.validate(),
            Err(ScreenError::InvalidArgument(_))
        ));

        let mut params = ScreenParams::default();
        params.tail_len = 0;
        assert!(params.validate().is_err());

        let mut params = ScreenParams::default();
        params.jmer_len = MAX_JMER_LEN + 1;
        assert!(params.validate().is_err());

        let mut params = ScreenParams::default();
        params.tail_sweep = Some(TailSweepParams {
            min_tail_len: 6,
            max_tail_len: 5,
            max_mismatches: 1,
        });
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_params_json_roundtrip_defaults_sweep() {
        let json = r#"{
            "tail_len": 6, "max_mismatches": 2, "jmer_len": 4,
            "minimum_matching_jmers": 3, "minimum_lcs": 0, "sample_size": 10,
            "thread_count": {"Fixed": 2}
        }"#;
        let params: ScreenParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.tail_len, 6);
        assert_eq!(params.thread_count, ThreadCount::Fixed(2));
        assert_eq!(params.tail_sweep, None);
    }

    #[test]
    fn test_thread_count() {
        assert_eq!(ThreadCount::Fixed(3).get_count(), 3);
        assert_eq!(ThreadCount::Fixed(0).get_count(), 1);
        assert!(ThreadCount::Auto.get_count() >= 1);
    }
}
