//! j-mer presence signatures and pairwise overlap counts
//!
//! Each primer is cut into non-overlapping windows of `j` bases (stride `j`,
//! a trailing partial window is dropped). A forward table records which
//! primers carry each j-mer, and a second table does the same for the
//! reverse-complemented primers. The number of j-mers the reverse complement
//! of one primer shares with another primer's forward partition is a cheap,
//! position-independent complementarity signal.

use rayon::prelude::*;

use super::codec::{hash_into, reverse_complement_bytes, table_size};
use super::error::{Result, ScreenError};
use super::matrix::CountMatrix;
use super::primers::Primer;

/// Longest supported j-mer (4^8 buckets, one primer bitset each)
pub const MAX_JMER_LEN: usize = 8;

const WORD_BITS: usize = u64::BITS as usize;

/// j-mer hash -> set of primer indices, stored as one bitset per bucket.
#[derive(Debug, Clone)]
pub struct PresenceTable {
    jmer_len: usize,
    primer_count: usize,
    words_per_bucket: usize,
    bits: Vec<u64>,
    /// Distinct bucket hashes per primer, ascending
    signatures: Vec<Vec<usize>>,
}

impl PresenceTable {
    /// Mark every non-overlapping j-mer of each primer (or of its reverse
    /// complement when `use_reverse_complement` is set).
    pub fn build(primers: &[Primer], jmer_len: usize, use_reverse_complement: bool) -> Result<Self> {
        if jmer_len == 0 || jmer_len > MAX_JMER_LEN {
            return Err(ScreenError::invalid_argument(format!(
                "j-mer length must be between 1 and {}, got {}",
                MAX_JMER_LEN, jmer_len
            )));
        }
        let size = table_size(jmer_len)?;

        let signatures: Vec<Vec<usize>> = primers
            .par_iter()
            .map(|primer| -> Result<Vec<usize>> {
                let sequence = if use_reverse_complement {
                    reverse_complement_bytes(primer.sequence.as_bytes())?
                } else {
                    primer.sequence.as_bytes().to_vec()
                };
                let mut hashes = sequence
                    .chunks_exact(jmer_len)
                    .map(|jmer| hash_into(jmer, size))
                    .collect::<Result<Vec<_>>>()?;
                hashes.sort_unstable();
                hashes.dedup();
                Ok(hashes)
            })
            .collect::<Result<_>>()?;

        let words_per_bucket = primers.len().div_ceil(WORD_BITS);
        let mut bits = vec![0u64; size * words_per_bucket];
        for (primer_index, hashes) in signatures.iter().enumerate() {
            for &hash in hashes {
                bits[hash * words_per_bucket + primer_index / WORD_BITS] |=
                    1u64 << (primer_index % WORD_BITS);
            }
        }

        Ok(Self {
            jmer_len,
            primer_count: primers.len(),
            words_per_bucket,
            bits,
            signatures,
        })
    }

    pub fn jmer_len(&self) -> usize {
        self.jmer_len
    }

    pub fn primer_count(&self) -> usize {
        self.primer_count
    }

    pub fn table_size(&self) -> usize {
        if self.words_per_bucket == 0 {
            return 0;
        }
        self.bits.len() / self.words_per_bucket
    }

    /// Whether `primer` carries the j-mer hashed to `bucket`
    #[inline]
    pub fn contains(&self, bucket: usize, primer: usize) -> bool {
        let word = self.bits[bucket * self.words_per_bucket + primer / WORD_BITS];
        word >> (primer % WORD_BITS) & 1 == 1
    }

    /// Buckets marked for `primer`
    pub fn signature(&self, primer: usize) -> &[usize] {
        &self.signatures[primer]
    }
}

/// Forward and reverse-complement presence tables over one primer set.
#[derive(Debug, Clone)]
pub struct JmerSignatureIndex {
    forward: PresenceTable,
    reverse_complement: PresenceTable,
}

impl JmerSignatureIndex {
    pub fn build(primers: &[Primer], jmer_len: usize) -> Result<Self> {
        Ok(Self {
            forward: PresenceTable::build(primers, jmer_len, false)?,
            reverse_complement: PresenceTable::build(primers, jmer_len, true)?,
        })
    }

    pub fn forward(&self) -> &PresenceTable {
        &self.forward
    }

    pub fn reverse_complement(&self) -> &PresenceTable {
        &self.reverse_complement
    }

    /// Distinct j-mers set in the reverse-complement table for `i` and in the
    /// forward table for `k`.
    pub fn shared_jmers(&self, i: usize, k: usize) -> u32 {
        self.reverse_complement
            .signature(i)
            .iter()
            .filter(|&&bucket| self.forward.contains(bucket, k))
            .count() as u32
    }

    /// Count matrix over all unordered pairs. Each pair (i, k) with i <= k is
    /// scored once and stored at both (i, k) and (k, i).
    pub fn match_primers(&self) -> CountMatrix {
        let n = self.forward.primer_count();
        let rows: Vec<Vec<u32>> = (0..n)
            .into_par_iter()
            .map(|i| (i..n).map(|k| self.shared_jmers(i, k)).collect())
            .collect();

        let mut counts = CountMatrix::new(n);
        for (i, row) in rows.into_iter().enumerate() {
            for (offset, count) in row.into_iter().enumerate() {
                counts.set(i, i + offset, count);
            }
        }
        counts
    }
}

/// Build both presence tables and count shared j-mers for every pair.
pub fn match_jmers(primers: &[Primer], jmer_len: usize) -> Result<CountMatrix> {
    let index = JmerSignatureIndex::build(primers, jmer_len)?;
    let counts = index.match_primers();
    log::info!(
        "j-mer matching (j={}): mean shared j-mers {:.4}, max {}",
        jmer_len,
        counts.mean(),
        counts.max()
    );
    Ok(counts)
}
