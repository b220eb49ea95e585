//! Symmetric n x n matrices over primer pairs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dense n x n matrix whose writes always land on both (i, k) and (k, i).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetricMatrix<T> {
    size: usize,
    cells: Vec<T>,
}

/// Tail-hit flags per primer pair
pub type HitMatrix = SymmetricMatrix<bool>;

/// Shared j-mer counts per primer pair
pub type CountMatrix = SymmetricMatrix<u32>;

impl<T: Copy + Default> SymmetricMatrix<T> {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![T::default(); size * size],
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn get(&self, i: usize, k: usize) -> T {
        self.cells[i * self.size + k]
    }

    /// Set the value for the unordered pair {i, k}.
    #[inline]
    pub fn set(&mut self, i: usize, k: usize, value: T) {
        self.cells[i * self.size + k] = value;
        self.cells[k * self.size + i] = value;
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.cells[i * self.size..(i + 1) * self.size]
    }
}

impl<T: Copy + PartialEq> SymmetricMatrix<T> {
    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| {
            (i + 1..self.size).all(|k| {
                self.cells[i * self.size + k] == self.cells[k * self.size + i]
            })
        })
    }
}

impl HitMatrix {
    /// Number of primers flagged against primer `i`
    pub fn row_hits(&self, i: usize) -> usize {
        self.row(i).iter().filter(|&&hit| hit).count()
    }

    /// Average over primers of the fraction of the collection each one hits.
    pub fn mean_hit_fraction(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        let total: usize = (0..self.size).map(|i| self.row_hits(i)).sum();
        total as f64 / (self.size * self.size) as f64
    }
}

impl CountMatrix {
    pub fn mean(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let total: u64 = self.cells.iter().map(|&c| c as u64).sum();
        total as f64 / self.cells.len() as f64
    }

    pub fn max(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Count value -> number of ordered pairs carrying it
    pub fn histogram(&self) -> BTreeMap<u32, usize> {
        let mut histogram = BTreeMap::new();
        for &count in &self.cells {
            *histogram.entry(count).or_insert(0) += 1;
        }
        histogram
    }
}
