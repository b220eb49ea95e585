//! Primer ingestion from delimited text and FASTA

use std::path::Path;

use bio::io::fasta;
use serde::{Deserialize, Serialize};

use super::codec::validate_sequence;
use super::error::{Result, ScreenError};

/// A named primer. Its identity in a screening run is its index in the
/// collection it was loaded into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Primer {
    pub name: String,
    pub sequence: String,
}

impl Primer {
    /// Build a primer, rejecting empty sequences and bases outside {A, T, C, G}.
    pub fn new(name: impl Into<String>, sequence: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let sequence = sequence.into();
        if sequence.is_empty() {
            return Err(ScreenError::InvalidPrimer {
                name,
                source: Box::new(ScreenError::invalid_argument("empty sequence")),
            });
        }
        if let Err(e) = validate_sequence(&sequence) {
            return Err(ScreenError::InvalidPrimer {
                name,
                source: Box::new(e),
            });
        }
        Ok(Self { name, sequence })
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Parse `name,sequence[,...]` lines. Fields after the sequence are ignored,
/// sequences are upper-cased, and blank or `#` lines are skipped.
pub fn parse_primer_table(text: &str) -> Result<Vec<Primer>> {
    let mut primers = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split(',');
        let name = fields.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ScreenError::ParseError {
                line: i + 1,
                msg: "missing primer name".to_string(),
            });
        }
        let Some(sequence) = fields.next() else {
            return Err(ScreenError::ParseError {
                line: i + 1,
                msg: format!("missing sequence for primer '{}'", name),
            });
        };

        let sequence = sequence.trim();
        if sequence.is_empty() {
            return Err(ScreenError::ParseError {
                line: i + 1,
                msg: format!("empty sequence for primer '{}'", name),
            });
        }

        primers.push(Primer::new(name, sequence.to_ascii_uppercase())?);
    }

    ensure_not_empty(primers)
}

/// Parse primers from FASTA records.
pub fn parse_primer_fasta(text: &str) -> Result<Vec<Primer>> {
    let reader = fasta::Reader::new(text.as_bytes());
    let mut primers = Vec::new();

    for record in reader.records() {
        let record = record?;
        let sequence = String::from_utf8_lossy(record.seq()).to_ascii_uppercase();
        primers.push(Primer::new(record.id(), sequence)?);
    }

    ensure_not_empty(primers)
}

/// Parse primers, choosing FASTA when the text starts with a `>` header.
pub fn parse_primers(text: &str) -> Result<Vec<Primer>> {
    if text.trim_start().starts_with('>') {
        parse_primer_fasta(text)
    } else {
        parse_primer_table(text)
    }
}

pub fn read_primers(path: impl AsRef<Path>) -> Result<Vec<Primer>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let primers = parse_primers(&text)?;
    log::info!(
        "Loaded {} primers from {}",
        primers.len(),
        path.as_ref().display()
    );
    Ok(primers)
}

fn ensure_not_empty(primers: Vec<Primer>) -> Result<Vec<Primer>> {
    if primers.is_empty() {
        return Err(ScreenError::invalid_argument("no primers found in input"));
    }
    Ok(primers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        let text = "P1,atcgatcga,25nm,STD\nP2, TCGATCGAT \n\n# comment\nP3,GGGCCC";
        let primers = parse_primer_table(text).unwrap();
        assert_eq!(primers.len(), 3);
        assert_eq!(primers[0].name, "P1");
        assert_eq!(primers[0].sequence, "ATCGATCGA");
        assert_eq!(primers[1].sequence, "TCGATCGAT");
        assert_eq!(primers[2].len(), 6);
    }

    #[test]
    fn test_parse_table_missing_sequence() {
        let err = parse_primer_table("P1,ACGT\nP2").unwrap_err();
        assert!(matches!(err, ScreenError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_parse_table_empty_sequence() {
        let err = parse_primer_table("P0,ACGT\nP1,\n").unwrap_err();
        assert!(matches!(err, ScreenError::ParseError { line: 2, .. }));
        assert!(matches!(
            parse_primer_table("P1,  ,25nm"),
            Err(ScreenError::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            Primer::new("P1", ""),
            Err(ScreenError::InvalidPrimer { .. })
        ));
    }

    #[test]
    fn test_read_primers_from_file() {
        let path = std::env::temp_dir()
            .join(format!("dimerscreen_primers_{}.csv", std::process::id()));
        std::fs::write(&path, "fwd,ACGTAC\nrev,ttgcaa\n").unwrap();
        let primers = read_primers(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(primers.len(), 2);
        assert_eq!(primers[1].sequence, "TTGCAA");

        assert!(matches!(
            read_primers(path.with_extension("missing")),
            Err(ScreenError::Io(_))
        ));
    }

    #[test]
    fn test_parse_table_invalid_base_names_primer() {
        let err = parse_primer_table("good,ACGT\nbad,ACNT").unwrap_err();
        match err {
            ScreenError::InvalidPrimer { name, source } => {
                assert_eq!(name, "bad");
                assert!(matches!(
                    *source,
                    ScreenError::InvalidBase { base: 'N', position: 2 }
                ));
            }
            other => panic!("expected InvalidPrimer, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_fasta() {
        let text = ">fwd_1 some description\nACGTAC\nGGTT\n>rev_1\nttgcaa\n";
        let primers = parse_primers(text).unwrap();
        assert_eq!(primers.len(), 2);
        assert_eq!(primers[0].name, "fwd_1");
        assert_eq!(primers[0].sequence, "ACGTACGGTT");
        assert_eq!(primers[1].sequence, "TTGCAA");
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(
            parse_primers("\n\n"),
            Err(ScreenError::InvalidArgument(_))
        ));
    }
}
