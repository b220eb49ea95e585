//! Inverted hash index over reverse-complemented primer tails
//!
//! Each primer's 3' tail is reverse-complemented, expanded to every variant
//! within the mismatch budget, and the primer index is filed under the hash of
//! each variant. Sliding a window of the same length over another primer and
//! probing the table then finds every tail it could anneal to.

use rayon::prelude::*;

use super::codec::{hash_into, reverse_complement_bytes, table_size};
use super::error::{Result, ScreenError};
use super::matrix::HitMatrix;
use super::mismatch::expand_mismatches;
use super::primers::Primer;

/// Longest supported tail (4^12 buckets)
pub const MAX_TAIL_LEN: usize = 12;

#[derive(Debug, Clone)]
pub struct TailIndex {
    tail_len: usize,
    max_mismatches: i32,
    buckets: Vec<Vec<usize>>,
}

impl TailIndex {
    /// Create an empty index for tails of `tail_len` bases.
    pub fn new(tail_len: usize) -> Result<Self> {
        Ok(Self {
            tail_len,
            max_mismatches: 0,
            buckets: vec![Vec::new(); checked_table_size(tail_len)?],
        })
    }

    /// Build an index over `primers` in one pass.
    pub fn build(primers: &[Primer], tail_len: usize, max_mismatches: i32) -> Result<Self> {
        let mut index = Self::new(tail_len)?;
        index.load(primers, max_mismatches)?;
        Ok(index)
    }

    /// Replace the contents of the index with the tails of `primers`.
    ///
    /// All variant hashes are computed before anything is written, so on error
    /// the index keeps its previous contents.
    pub fn load(&mut self, primers: &[Primer], max_mismatches: i32) -> Result<()> {
        let tail_len = self.tail_len;
        let size = self.buckets.len();

        let entries: Vec<Vec<usize>> = primers
            .par_iter()
            .map(|primer| -> Result<Vec<usize>> {
                if primer.len() < tail_len {
                    return Err(ScreenError::invalid_argument(format!(
                        "primer '{}' ({} bp) is shorter than the tail length {}",
                        primer.name,
                        primer.len(),
                        tail_len
                    )));
                }
                let tail = &primer.sequence.as_bytes()[primer.len() - tail_len..];
                let tail_rc: String = reverse_complement_bytes(tail)?
                    .into_iter()
                    .map(char::from)
                    .collect();
                expand_mismatches(&tail_rc, max_mismatches)?
                    .iter()
                    .map(|variant| hash_into(variant.as_bytes(), size))
                    .collect()
            })
            .collect::<Result<_>>()?;

        self.clear();
        self.max_mismatches = max_mismatches;
        for (primer_index, hashes) in entries.into_iter().enumerate() {
            for hash in hashes {
                self.buckets[hash].push(primer_index);
            }
        }

        log::debug!(
            "Tail index: tail_len={}, max_mismatches={}, {} entries, largest bucket {}",
            self.tail_len,
            self.max_mismatches,
            self.total_entries(),
            self.largest_bucket()
        );
        Ok(())
    }

    /// Empty every bucket, keeping the table allocation.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// Switch to a different tail length, emptying the index.
    pub fn reconfigure(&mut self, tail_len: usize) -> Result<()> {
        let size = checked_table_size(tail_len)?;
        self.clear();
        self.buckets.resize_with(size, Vec::new);
        self.tail_len = tail_len;
        Ok(())
    }

    pub fn tail_len(&self) -> usize {
        self.tail_len
    }

    pub fn max_mismatches(&self) -> i32 {
        self.max_mismatches
    }

    pub fn table_size(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of (bucket, primer) entries
    pub fn total_entries(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn largest_bucket(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Primers whose tail variants hash to the same bucket as `window`.
    pub fn probe(&self, window: &[u8]) -> Result<&[usize]> {
        if window.len() != self.tail_len {
            return Err(ScreenError::invalid_argument(format!(
                "probe window of {} bases does not match tail length {}",
                window.len(),
                self.tail_len
            )));
        }
        let hash = hash_into(window, self.buckets.len())?;
        Ok(&self.buckets[hash])
    }

    /// Sorted, deduplicated primer indices hit by any window of `sequence`.
    pub fn hits_for(&self, sequence: &[u8]) -> Result<Vec<usize>> {
        let mut hits = Vec::new();
        if self.tail_len == 0 || sequence.len() < self.tail_len {
            return Ok(hits);
        }
        for window in sequence.windows(self.tail_len) {
            hits.extend_from_slice(self.probe(window)?);
        }
        hits.sort_unstable();
        hits.dedup();
        Ok(hits)
    }

    /// Probe every primer against the index and mark symmetric hits.
    ///
    /// Rows are probed in parallel; the matrix is filled afterwards.
    pub fn match_primers(&self, primers: &[Primer]) -> Result<HitMatrix> {
        let rows: Vec<Vec<usize>> = primers
            .par_iter()
            .map(|primer| self.hits_for(primer.sequence.as_bytes()))
            .collect::<Result<_>>()?;

        let mut hit = HitMatrix::new(primers.len());
        for (i, row) in rows.iter().enumerate() {
            for &k in row {
                hit.set(i, k, true);
            }
        }
        Ok(hit)
    }
}

/// Build a tail index and probe every primer against it.
pub fn match_tails(primers: &[Primer], tail_len: usize, max_mismatches: i32) -> Result<HitMatrix> {
    let index = TailIndex::build(primers, tail_len, max_mismatches)?;
    let hit = index.match_primers(primers)?;
    log::info!(
        "Tail matching (tail_len={}, max_mismatches={}): mean hit fraction {:.6}",
        tail_len,
        max_mismatches,
        hit.mean_hit_fraction()
    );
    Ok(hit)
}

fn checked_table_size(tail_len: usize) -> Result<usize> {
    if tail_len == 0 || tail_len > MAX_TAIL_LEN {
        return Err(ScreenError::invalid_argument(format!(
            "tail length must be between 1 and {}, got {}",
            MAX_TAIL_LEN, tail_len
        )));
    }
    table_size(tail_len)
}
