//! Hamming-bounded variant enumeration for primer tails
//!
//! Position 0 of the anchor is the 3' base of the primer it was taken from
//! (tails are reverse-complemented before expansion) and is never mutated.

use std::collections::BTreeSet;

use super::codec::{validate_sequence, BASES, NUMBER_OF_BASES};
use super::error::{Result, ScreenError};

/// All k-subsets of `{0, 1, ..., n-1}`, each sorted ascending, in
/// lexicographic order.
pub fn k_subsets(n: usize, k: usize) -> Result<Vec<Vec<usize>>> {
    if k < 1 {
        return Err(ScreenError::invalid_argument(format!(
            "k-subset size must be >= 1, got {}",
            k
        )));
    }
    if k > n {
        return Err(ScreenError::invalid_argument(format!(
            "k-subset size {} exceeds range size {}",
            k, n
        )));
    }

    let mut subsets = Vec::new();
    let mut indexes: Vec<usize> = (0..k).collect();

    loop {
        subsets.push(indexes.clone());

        // Rightmost index that can still advance without running off the end
        let Some(i) = (0..k).rev().find(|&i| indexes[i] < n - k + i) else {
            break;
        };
        indexes[i] += 1;
        for j in (i + 1)..k {
            indexes[j] = indexes[j - 1] + 1;
        }
    }

    Ok(subsets)
}

/// Every string within Hamming distance `max_mismatches` of `anchor` that
/// keeps `anchor[0]` unchanged.
///
/// A budget larger than the anchor is clamped to the anchor length, and only
/// positions `1..len` are ever mutated. The result includes variants at any
/// distance up to the budget, the anchor itself among them.
pub fn expand_mismatches(anchor: &str, max_mismatches: i32) -> Result<BTreeSet<String>> {
    if max_mismatches < 0 {
        return Err(ScreenError::invalid_argument(format!(
            "max_mismatches must be nonnegative, got {}",
            max_mismatches
        )));
    }
    validate_sequence(anchor)?;

    let len = anchor.len();
    let budget = (max_mismatches as usize).min(len);
    let mutable_positions = len.saturating_sub(1);
    let subset_size = budget.min(mutable_positions);

    let mut variants = BTreeSet::new();
    if subset_size == 0 {
        variants.insert(anchor.to_string());
        return Ok(variants);
    }

    let assignments = NUMBER_OF_BASES
        .checked_pow(subset_size as u32)
        .ok_or_else(|| {
            ScreenError::invalid_argument(format!(
                "{} mismatches over a {}-base anchor is too many variants to enumerate",
                subset_size, len
            ))
        })?;
    let mut buffer = anchor.as_bytes().to_vec();

    for subset in k_subsets(mutable_positions, subset_size)? {
        buffer.copy_from_slice(anchor.as_bytes());

        // Count in base 4 over the chosen positions; digit i drives subset[i].
        for counter in 0..assignments {
            let mut digits = counter;
            for &offset in &subset {
                buffer[offset + 1] = BASES[digits % NUMBER_OF_BASES];
                digits /= NUMBER_OF_BASES;
            }
            variants.insert(buffer.iter().map(|&b| char::from(b)).collect());
        }
    }

    Ok(variants)
}
