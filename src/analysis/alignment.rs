//! Exact dynamic-programming alignment: global edit distance with traceback,
//! and longest common substring.
//!
//! For primer-dimer scoring the first sequence is reverse-complemented by the
//! caller (see [`dimer_alignment`]) so that the alignment models the two
//! primers annealing 3' end to 3' end.

use std::fmt;

use super::codec::reverse_complement;
use super::error::Result;

/// Step taken into a cell on the way back to (0, 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Consume one base of each sequence
    Diagonal,
    /// Consume a base of the row sequence (B) only
    Up,
    /// Consume a base of the column sequence (A) only
    Left,
}

impl Direction {
    pub fn symbol(self) -> char {
        match self {
            Self::Diagonal => 'D',
            Self::Up => 'U',
            Self::Left => 'L',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub cost: u32,
    pub direction: Direction,
}

/// (len(B) + 1) x (len(A) + 1) grid of costs and back-pointers
#[derive(Debug, Clone)]
pub struct AlignmentTable {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl AlignmentTable {
    fn new(rows: usize, cols: usize) -> Self {
        let mut cells = vec![
            Cell {
                cost: 0,
                direction: Direction::Diagonal,
            };
            rows * cols
        ];
        for c in 0..cols {
            cells[c] = Cell {
                cost: c as u32,
                direction: Direction::Left,
            };
        }
        for r in 0..rows {
            cells[r * cols] = Cell {
                cost: r as u32,
                direction: Direction::Up,
            };
        }
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.cols + col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row * self.cols + col] = cell;
    }

    /// Cost/direction grid, one table row per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for r in 0..self.rows {
            for c in 0..self.cols {
                let cell = self.cell(r, c);
                out.push_str(&format!("{:2} {} ", cell.cost, cell.direction.symbol()));
            }
            out.push('\n');
        }
        out
    }
}

/// Three aligned strands: sequence A, match markers, sequence B
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignmentTrace {
    pub top: String,
    pub middle: String,
    pub bottom: String,
}

impl fmt::Display for AlignmentTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.top)?;
        writeln!(f, "{}", self.middle)?;
        write!(f, "{}", self.bottom)
    }
}

#[derive(Debug, Clone)]
pub struct EditAlignment {
    pub cost: u32,
    pub trace: AlignmentTrace,
    pub table: AlignmentTable,
}

/// Global edit distance between `seq_a` (table columns) and `seq_b` (table
/// rows), with traceback.
///
/// Ties between equal-cost moves resolve Diagonal, then Up, then Left; this
/// only affects the traceback, never the cost.
pub fn global_edit_distance(seq_a: &str, seq_b: &str) -> EditAlignment {
    let a = seq_a.as_bytes();
    let b = seq_b.as_bytes();
    let rows = b.len() + 1;
    let cols = a.len() + 1;
    let mut table = AlignmentTable::new(rows, cols);

    for r in 1..rows {
        for c in 1..cols {
            let substitution = u32::from(a[c - 1] != b[r - 1]);
            let mut best = Cell {
                cost: table.cell(r - 1, c - 1).cost + substitution,
                direction: Direction::Diagonal,
            };
            let up = table.cell(r - 1, c).cost + 1;
            if up < best.cost {
                best = Cell {
                    cost: up,
                    direction: Direction::Up,
                };
            }
            let left = table.cell(r, c - 1).cost + 1;
            if left < best.cost {
                best = Cell {
                    cost: left,
                    direction: Direction::Left,
                };
            }
            table.set(r, c, best);
        }
    }

    let cost = table.cell(rows - 1, cols - 1).cost;
    let trace = traceback(&table, a, b);
    EditAlignment { cost, trace, table }
}

/// Walk back-pointers from the bottom-right corner to (0, 0).
fn traceback(table: &AlignmentTable, a: &[u8], b: &[u8]) -> AlignmentTrace {
    let mut top = Vec::with_capacity(a.len() + b.len());
    let mut middle = Vec::with_capacity(a.len() + b.len());
    let mut bottom = Vec::with_capacity(a.len() + b.len());

    let (mut row, mut col) = (b.len(), a.len());
    while row + col != 0 {
        let direction = table.cell(row, col).direction;
        if row == 0 || (col != 0 && direction == Direction::Left) {
            top.push(a[col - 1]);
            middle.push(b' ');
            bottom.push(b' ');
            col -= 1;
        } else if col == 0 || direction == Direction::Up {
            top.push(b' ');
            middle.push(b' ');
            bottom.push(b[row - 1]);
            row -= 1;
        } else {
            top.push(a[col - 1]);
            middle.push(if a[col - 1] == b[row - 1] { b'|' } else { b' ' });
            bottom.push(b[row - 1]);
            row -= 1;
            col -= 1;
        }
    }

    let finish = |mut strand: Vec<u8>| -> String {
        strand.reverse();
        strand.into_iter().map(char::from).collect()
    };
    AlignmentTrace {
        top: finish(top),
        middle: finish(middle),
        bottom: finish(bottom),
    }
}

/// Length of the longest run of consecutive positions where the two
/// sequences agree exactly.
pub fn longest_common_substring(seq_a: &str, seq_b: &str) -> usize {
    let a = seq_a.as_bytes();
    let b = seq_b.as_bytes();
    let mut prev = vec![0usize; a.len() + 1];
    let mut curr = vec![0usize; a.len() + 1];
    let mut longest = 0;

    for r in 1..=b.len() {
        for c in 1..=a.len() {
            curr[c] = if a[c - 1] == b[r - 1] { prev[c - 1] + 1 } else { 0 };
            longest = longest.max(curr[c]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    longest
}

/// Align the reverse complement of `primer_a` against `primer_b`.
pub fn dimer_alignment(primer_a: &str, primer_b: &str) -> Result<EditAlignment> {
    let a_rc = reverse_complement(primer_a)?;
    Ok(global_edit_distance(&a_rc, primer_b))
}

/// Longest exact complementary run between two primers.
pub fn dimer_lcs(primer_a: &str, primer_b: &str) -> Result<usize> {
    let a_rc = reverse_complement(primer_a)?;
    Ok(longest_common_substring(&a_rc, primer_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bio::alignment::distance::levenshtein;

    #[test]
    fn test_identical_sequences() {
        let s = "ATCGGCTAAC";
        let result = global_edit_distance(s, s);
        assert_eq!(result.cost, 0);
        assert_eq!(result.trace.top, s);
        assert_eq!(result.trace.bottom, s);
        assert_eq!(result.trace.middle, "|".repeat(s.len()));
    }

    #[test]
    fn test_empty_inputs() {
        let result = global_edit_distance("", "ACGT");
        assert_eq!(result.cost, 4);
        assert_eq!(result.trace.top, "    ");
        assert_eq!(result.trace.bottom, "ACGT");

        let result = global_edit_distance("ACG", "");
        assert_eq!(result.cost, 3);
        assert_eq!(result.trace.top, "ACG");
        assert_eq!(result.trace.bottom, "   ");

        let result = global_edit_distance("", "");
        assert_eq!(result.cost, 0);
        assert_eq!(result.trace, AlignmentTrace::default());
    }

    #[test]
    fn test_boundaries_are_pure_indel_cost() {
        let result = global_edit_distance("ACGTA", "TTG");
        for c in 0..result.table.cols() {
            assert_eq!(result.table.cell(0, c).cost, c as u32);
        }
        for r in 0..result.table.rows() {
            assert_eq!(result.table.cell(r, 0).cost, r as u32);
        }
    }

    #[test]
    fn test_regression_cgat_atcg() {
        let result = global_edit_distance("CGAT", "ATCG");
        assert_eq!(result.cost, 4);
        assert_eq!(result.trace.to_string(), "CGAT\n    \nATCG");

        // Cells where the tie-break order decides the back-pointer
        let t = &result.table;
        assert_eq!(t.cell(1, 2), Cell { cost: 2, direction: Direction::Diagonal });
        assert_eq!(t.cell(1, 4), Cell { cost: 3, direction: Direction::Left });
        assert_eq!(t.cell(3, 4), Cell { cost: 3, direction: Direction::Up });
        assert_eq!(t.cell(4, 1), Cell { cost: 3, direction: Direction::Up });
        assert_eq!(t.cell(4, 3), Cell { cost: 3, direction: Direction::Left });
        assert_eq!(t.cell(4, 4), Cell { cost: 4, direction: Direction::Diagonal });
    }

    #[test]
    fn test_traceback_with_gap() {
        let result = global_edit_distance("ACGT", "AGT");
        assert_eq!(result.cost, 1);
        assert_eq!(result.trace.top, "ACGT");
        assert_eq!(result.trace.middle, "| ||");
        assert_eq!(result.trace.bottom, "A GT");
    }

    #[test]
    fn test_render() {
        let result = global_edit_distance("A", "A");
        assert_eq!(result.table.render(), " 0 U  1 L \n 1 U  0 D \n");
    }

    #[test]
    fn test_cost_matches_levenshtein() {
        let pairs = [
            ("ATCGATCGA", "TCGATCGAT"),
            ("GGGCCCAAATTT", "GGCCAATT"),
            ("CAGTTGACCA", "TGGTCAACTG"),
            ("A", "TTTTT"),
            ("ACGTACGTAC", "CATGCATG"),
        ];
        for (a, b) in pairs {
            let result = global_edit_distance(a, b);
            assert_eq!(result.cost, levenshtein(a.as_bytes(), b.as_bytes()), "{} vs {}", a, b);

            // Strands reproduce the inputs and the unmarked columns sum to the cost
            assert_eq!(result.trace.top.replace(' ', ""), a);
            assert_eq!(result.trace.bottom.replace(' ', ""), b);
            let edits = result.trace.middle.chars().filter(|&ch| ch != '|').count();
            assert_eq!(edits as u32, result.cost);
        }
    }

    #[test]
    fn test_longest_common_substring() {
        let s = "ATCGGCTA";
        assert_eq!(longest_common_substring(s, s), s.len());
        assert_eq!(longest_common_substring("AAAA", "TTTT"), 0);
        assert_eq!(longest_common_substring("ATCGGA", "TTCGGT"), 4);
        assert_eq!(longest_common_substring("", "ACGT"), 0);
        assert_eq!(longest_common_substring("ACGT", ""), 0);
    }

    #[test]
    fn test_dimer_alignment_reverse_complements_first_primer() {
        // RC(ATCG) = CGAT
        let result = dimer_alignment("ATCG", "ATCG").unwrap();
        assert_eq!(result.cost, 4);
        assert_eq!(result.trace.top, "CGAT");

        // A primer against its own reverse complement anneals perfectly
        let result = dimer_alignment("GGATCCTT", "AAGGATCC").unwrap();
        assert_eq!(result.cost, 0);
        assert_eq!(dimer_lcs("GGATCCTT", "AAGGATCC").unwrap(), 8);
        assert!(dimer_alignment("GGNT", "ACGT").is_err());
    }
}
