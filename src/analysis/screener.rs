//! Primer-dimer screening pipeline
//!
//! Runs the tail index and the j-mer signature index over a primer set,
//! combines their thresholds into a candidate list and, optionally, checks
//! each candidate's longest complementary run.

use rayon::prelude::*;
use std::sync::mpsc::Sender;

use super::alignment::{dimer_alignment, dimer_lcs, EditAlignment};
use super::codec::NUMBER_OF_BASES;
use super::error::{Result, ScreenError};
use super::jmer_index::match_jmers;
use super::matrix::{CountMatrix, HitMatrix};
use super::primers::Primer;
use super::tail_index::{match_tails, TailIndex};
use super::types::{
    DimerCandidate, ProgressUpdate, SampleProportions, ScreenParams, ScreeningResults,
    SweepRow, TailSweepParams,
};

/// Run the complete screening analysis
pub fn run_screening(
    primers: &[Primer],
    params: &ScreenParams,
    progress_tx: Option<Sender<ProgressUpdate>>,
) -> Result<ScreeningResults> {
    params.validate()?;

    let total_steps = if params.tail_sweep.is_some() { 4 } else { 3 };
    let progress = |step: usize, message: String| {
        if let Some(tx) = &progress_tx {
            let _ = tx.send(ProgressUpdate {
                step,
                total_steps,
                message,
            });
        }
    };

    log::info!(
        "Screening {} primers: tail_len={}, max_mismatches={}, j={}, minimum_matching_jmers={}, minimum_lcs={}",
        primers.len(),
        params.tail_len,
        params.max_mismatches,
        params.jmer_len,
        params.minimum_matching_jmers,
        params.minimum_lcs
    );

    with_thread_pool(params.thread_count.get_count(), || {
        progress(1, "Matching primer tails...".to_string());
        let tail_hits = match_tails(primers, params.tail_len, params.max_mismatches)?;

        progress(2, "Counting shared j-mers...".to_string());
        let jmer_hits = match_jmers(primers, params.jmer_len)?;

        progress(3, "Collecting dimer candidates...".to_string());
        let candidates = collect_candidates(primers, &tail_hits, &jmer_hits, params)?;
        let sample = sample_proportions(
            &tail_hits,
            &jmer_hits,
            params.sample_size,
            params.minimum_matching_jmers,
        );

        let sweep = match &params.tail_sweep {
            Some(sweep_params) => {
                progress(4, "Sweeping tail configurations...".to_string());
                sweep_tail_configurations(primers, sweep_params)?
            }
            None => Vec::new(),
        };

        log::info!(
            "Found {} dimer candidates among {} primers",
            candidates.len(),
            primers.len()
        );

        Ok(ScreeningResults {
            params: params.clone(),
            primers: primers.to_vec(),
            tail_hit_fraction: tail_hits.mean_hit_fraction(),
            mean_shared_jmers: jmer_hits.mean(),
            jmer_histogram: jmer_hits.histogram(),
            sample,
            candidates,
            sweep,
        })
    })
}

/// Run `f` on a dedicated pool, or on the global pool if one can't be built.
fn with_thread_pool<T: Send>(num_threads: usize, f: impl FnOnce() -> T + Send) -> T {
    match rayon::ThreadPoolBuilder::new().num_threads(num_threads).build() {
        Ok(pool) => pool.install(f),
        Err(e) => {
            log::warn!("Could not build a {}-thread pool ({}), using the global pool", num_threads, e);
            f()
        }
    }
}

/// Ordered pairs passing the tail test, the j-mer threshold and, when
/// enabled, the complementary-run threshold.
fn collect_candidates(
    primers: &[Primer],
    tail_hits: &HitMatrix,
    jmer_hits: &CountMatrix,
    params: &ScreenParams,
) -> Result<Vec<DimerCandidate>> {
    let rows: Vec<Vec<DimerCandidate>> = (0..primers.len())
        .into_par_iter()
        .map(|i| -> Result<Vec<DimerCandidate>> {
            let mut row = Vec::new();
            for k in 0..primers.len() {
                if !tail_hits.get(i, k) {
                    continue;
                }
                let jmer_matches = jmer_hits.get(i, k);
                if jmer_matches < params.minimum_matching_jmers {
                    continue;
                }
                let lcs = if params.minimum_lcs > 0 {
                    let lcs = dimer_lcs(&primers[i].sequence, &primers[k].sequence)?;
                    if lcs < params.minimum_lcs {
                        continue;
                    }
                    Some(lcs)
                } else {
                    None
                };
                row.push(DimerCandidate {
                    primer_a: i,
                    primer_b: k,
                    name_a: primers[i].name.clone(),
                    name_b: primers[k].name.clone(),
                    jmer_matches,
                    lcs,
                });
            }
            Ok(row)
        })
        .collect::<Result<_>>()?;

    Ok(rows.into_iter().flatten().collect())
}

/// Pass rates of the tail and j-mer filters over the leading
/// `sample_size x sample_size` block of pairs.
pub fn sample_proportions(
    tail_hits: &HitMatrix,
    jmer_hits: &CountMatrix,
    sample_size: usize,
    minimum_matching_jmers: u32,
) -> SampleProportions {
    let size = sample_size.min(tail_hits.len()).min(jmer_hits.len());
    if size == 0 {
        return SampleProportions::default();
    }

    let mut tail_count = 0usize;
    let mut jmer_count = 0usize;
    for i in 0..size {
        for k in 0..size {
            if tail_hits.get(i, k) {
                tail_count += 1;
            }
            if jmer_hits.get(i, k) >= minimum_matching_jmers {
                jmer_count += 1;
            }
        }
    }

    let pairs = (size * size) as f64;
    SampleProportions {
        sample_size: size,
        tail_fraction: tail_count as f64 / pairs,
        jmer_fraction: jmer_count as f64 / pairs,
    }
}

/// Tabulate index size and hit rate for every tail length and mismatch
/// budget in `sweep`, reusing one index between configurations.
pub fn sweep_tail_configurations(
    primers: &[Primer],
    sweep: &TailSweepParams,
) -> Result<Vec<SweepRow>> {
    if sweep.max_mismatches < 0 {
        return Err(ScreenError::invalid_argument(
            "tail sweep max_mismatches must be nonnegative",
        ));
    }
    let longest = primers.iter().map(Primer::len).max().unwrap_or(0);
    let mut index = TailIndex::new(sweep.min_tail_len)?;
    let mut rows = Vec::new();

    for tail_len in sweep.min_tail_len..=sweep.max_tail_len {
        index.reconfigure(tail_len)?;
        for max_mismatches in 0..=sweep.max_mismatches {
            index.load(primers, max_mismatches)?;
            let hit = index.match_primers(primers)?;
            let row = SweepRow {
                tail_len,
                max_mismatches,
                index_entries: index.total_entries(),
                mean_hit_fraction: hit.mean_hit_fraction(),
                expected_hit_fraction: (max_mismatches == 0)
                    .then(|| expected_substring_probability(tail_len, longest)),
            };
            log::debug!(
                "Sweep tail_len={} max_mismatches={}: {} entries, hit fraction {:.6}",
                row.tail_len,
                row.max_mismatches,
                row.index_entries,
                row.mean_hit_fraction
            );
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Expected occurrences of a fixed random `substring_len`-mer in a random
/// sequence of `target_len` bases.
pub fn expected_substring_probability(substring_len: usize, target_len: usize) -> f64 {
    if target_len < substring_len {
        return 0.0;
    }
    let windows = (target_len - substring_len + 1) as f64;
    windows * (1.0 / NUMBER_OF_BASES as f64).powi(substring_len as i32)
}

/// Edit-distance alignment of a candidate pair (first primer reverse
/// complemented).
pub fn align_candidate(primers: &[Primer], candidate: &DimerCandidate) -> Result<EditAlignment> {
    let (Some(a), Some(b)) = (
        primers.get(candidate.primer_a),
        primers.get(candidate.primer_b),
    ) else {
        return Err(ScreenError::invalid_argument(format!(
            "candidate ({}, {}) is outside a set of {} primers",
            candidate.primer_a,
            candidate.primer_b,
            primers.len()
        )));
    };
    dimer_alignment(&a.sequence, &b.sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::ThreadCount;
    use std::sync::mpsc::channel;

    fn scenario_primers() -> Vec<Primer> {
        vec![
            Primer::new("P1", "ATCGATCGA").unwrap(),
            Primer::new("P2", "TCGATCGAT").unwrap(),
        ]
    }

    fn scenario_params() -> ScreenParams {
        ScreenParams {
            tail_len: 5,
            max_mismatches: 0,
            jmer_len: 4,
            minimum_matching_jmers: 1,
            minimum_lcs: 0,
            sample_size: 1000,
            thread_count: ThreadCount::Fixed(2),
            tail_sweep: None,
        }
    }

    #[test]
    fn test_screening_reports_complementary_pair() {
        let primers = scenario_primers();
        let (tx, rx) = channel();
        let results = run_screening(&primers, &scenario_params(), Some(tx)).unwrap();

        let pairs: Vec<(usize, usize)> = results
            .candidates
            .iter()
            .map(|c| (c.primer_a, c.primer_b))
            .collect();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
        assert_eq!(results.candidates[0].name_b, "P2");
        assert_eq!(results.candidates[0].jmer_matches, 1);
        assert_eq!(results.candidates[0].lcs, None);
        assert!((results.candidate_fraction() - 0.5).abs() < 1e-12);

        assert_eq!(results.jmer_histogram.get(&0), Some(&2));
        assert_eq!(results.jmer_histogram.get(&1), Some(&2));
        assert_eq!(results.jmer_histogram.len(), 2);

        assert_eq!(results.sample.sample_size, 2);
        assert!((results.sample.tail_fraction - 1.0).abs() < 1e-12);
        assert!((results.sample.jmer_fraction - 0.5).abs() < 1e-12);

        let updates: Vec<ProgressUpdate> = rx.try_iter().collect();
        assert_eq!(updates.len(), 3);
        assert!(updates.iter().all(|u| u.total_steps == 3));
    }

    #[test]
    fn test_lcs_threshold_filters_candidates() {
        let primers = scenario_primers();
        let mut params = scenario_params();

        params.minimum_lcs = 9;
        let results = run_screening(&primers, &params, None).unwrap();
        assert_eq!(results.candidates.len(), 2);
        assert_eq!(results.candidates[0].lcs, Some(9));

        params.minimum_lcs = 10;
        let results = run_screening(&primers, &params, None).unwrap();
        assert!(results.candidates.is_empty());
    }

    #[test]
    fn test_partners_by_primer() {
        let primers = scenario_primers();
        let results = run_screening(&primers, &scenario_params(), None).unwrap();
        let partners = results.partners_by_primer();
        assert_eq!(
            partners,
            vec![
                ("P1".to_string(), vec!["P2".to_string()]),
                ("P2".to_string(), vec!["P1".to_string()]),
            ]
        );
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let primers = scenario_primers();
        let mut params = scenario_params();
        params.max_mismatches = -2;
        assert!(matches!(
            run_screening(&primers, &params, None),
            Err(ScreenError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sweep_rows() {
        let primers = scenario_primers();
        let sweep = TailSweepParams {
            min_tail_len: 5,
            max_tail_len: 6,
            max_mismatches: 1,
        };
        let rows = sweep_tail_configurations(&primers, &sweep).unwrap();
        assert_eq!(rows.len(), 4);

        assert_eq!((rows[0].tail_len, rows[0].max_mismatches), (5, 0));
        assert_eq!(rows[0].index_entries, 2);
        assert_eq!(rows[1].index_entries, 2 * 13);
        assert_eq!(rows[1].expected_hit_fraction, None);
        let expected = rows[0].expected_hit_fraction.unwrap();
        assert!((expected - 5.0 / 1024.0).abs() < 1e-12);

        assert_eq!(rows[2].tail_len, 6);
        assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.mean_hit_fraction)));
    }

    #[test]
    fn test_screening_with_sweep() {
        let primers = scenario_primers();
        let mut params = scenario_params();
        params.tail_sweep = Some(TailSweepParams {
            min_tail_len: 4,
            max_tail_len: 5,
            max_mismatches: 0,
        });
        let results = run_screening(&primers, &params, None).unwrap();
        assert_eq!(results.sweep.len(), 2);
    }

    #[test]
    fn test_expected_substring_probability() {
        assert!((expected_substring_probability(5, 25) - 21.0 / 1024.0).abs() < 1e-12);
        assert_eq!(expected_substring_probability(10, 5), 0.0);
    }

    #[test]
    fn test_align_candidate() {
        let primers = scenario_primers();
        let results = run_screening(&primers, &scenario_params(), None).unwrap();
        let alignment = align_candidate(&primers, &results.candidates[0]).unwrap();
        // RC(P1) == P2
        assert_eq!(alignment.cost, 0);

        let mut bogus = results.candidates[0].clone();
        bogus.primer_b = 7;
        assert!(align_candidate(&primers, &bogus).is_err());
    }
}
