//! Base encoding, reverse complement and positional hashing over {A, T, C, G}

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::error::{Result, ScreenError};

/// Number of symbols in the alphabet, and the radix of the positional hash
pub const NUMBER_OF_BASES: usize = 4;

/// Bases in code order: A=0, T=1, C=2, G=3
pub const BASES: [u8; NUMBER_OF_BASES] = [b'A', b'T', b'C', b'G'];

const NO_CODE: u8 = u8::MAX;

/// ASCII byte -> base code lookup. Unrecognised bytes map to `NO_CODE`.
static BASE_CODE: Lazy<[u8; 256]> = Lazy::new(|| {
    let mut table = [NO_CODE; 256];
    for (code, &base) in BASES.iter().enumerate() {
        table[base as usize] = code as u8;
    }
    table
});

/// Watson-Crick complement mapping
pub static COMPLEMENT: Lazy<HashMap<u8, u8>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(b'A', b'T');
    map.insert(b'T', b'A');
    map.insert(b'C', b'G');
    map.insert(b'G', b'C');
    map
});

#[inline]
fn code_at(base: u8, position: usize) -> Result<u8> {
    match BASE_CODE[base as usize] {
        NO_CODE => Err(ScreenError::InvalidBase {
            base: base as char,
            position,
        }),
        code => Ok(code),
    }
}

/// Encode a single base as 0..4 (A, T, C, G).
#[inline]
pub fn encode_base(base: u8) -> Result<u8> {
    code_at(base, 0)
}

/// Check if a character is one of A, T, C, G
#[inline]
pub fn is_standard_base(base: u8) -> bool {
    BASE_CODE[base as usize] != NO_CODE
}

/// True iff every character of `seq` is in {A, T, C, G}.
pub fn is_valid_sequence(seq: &str) -> bool {
    seq.bytes().all(is_standard_base)
}

/// Like [`is_valid_sequence`], but reports the first offending base.
pub fn validate_sequence(seq: &str) -> Result<()> {
    for (position, base) in seq.bytes().enumerate() {
        code_at(base, position)?;
    }
    Ok(())
}

/// Reverse complement of raw sequence bytes.
pub fn reverse_complement_bytes(seq: &[u8]) -> Result<Vec<u8>> {
    seq.iter()
        .enumerate()
        .rev()
        .map(|(position, &base)| {
            COMPLEMENT.get(&base).copied().ok_or(ScreenError::InvalidBase {
                base: base as char,
                position,
            })
        })
        .collect()
}

/// Compute the reverse complement of a DNA sequence
pub fn reverse_complement(seq: &str) -> Result<String> {
    let bytes = reverse_complement_bytes(seq.as_bytes())?;
    // Every byte came out of COMPLEMENT, so this is plain ASCII.
    Ok(bytes.into_iter().map(char::from).collect())
}

/// Number of buckets needed to hold every hash of a `key_len`-base key.
pub fn table_size(key_len: usize) -> Result<usize> {
    u32::try_from(key_len)
        .ok()
        .and_then(|exp| NUMBER_OF_BASES.checked_pow(exp))
        .ok_or(ScreenError::HashOverflow {
            len: key_len,
            table_size: usize::MAX,
        })
}

/// Positional base-4 hash with the first character as the lowest-order digit:
/// `sum(code(seq[i]) * 4^i)`.
///
/// Distinct sequences of the same length always hash to distinct values in
/// `[0, 4^len)`. Fails with `HashOverflow` if the value does not fit `usize`.
pub fn hash_sequence(seq: &[u8]) -> Result<usize> {
    let mut hash = 0usize;
    for (position, &base) in seq.iter().enumerate().rev() {
        let code = code_at(base, position)? as usize;
        hash = hash
            .checked_mul(NUMBER_OF_BASES)
            .and_then(|h| h.checked_add(code))
            .ok_or(ScreenError::HashOverflow {
                len: seq.len(),
                table_size: usize::MAX,
            })?;
    }
    Ok(hash)
}

/// Hash `seq` and check the result addresses a table of `table_size` buckets.
///
/// A key longer than the table was sized for is a configuration defect; it is
/// reported rather than folded back into range.
pub fn hash_into(seq: &[u8], table_size: usize) -> Result<usize> {
    let hash = hash_sequence(seq)?;
    if hash >= table_size {
        return Err(ScreenError::HashOverflow {
            len: seq.len(),
            table_size,
        });
    }
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_encode_base() {
        assert_eq!(encode_base(b'A').unwrap(), 0);
        assert_eq!(encode_base(b'T').unwrap(), 1);
        assert_eq!(encode_base(b'C').unwrap(), 2);
        assert_eq!(encode_base(b'G').unwrap(), 3);
        assert!(matches!(
            encode_base(b'N'),
            Err(ScreenError::InvalidBase { base: 'N', .. })
        ));
        assert!(encode_base(b'a').is_err());
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement("ATCG").unwrap(), "CGAT");
        assert_eq!(reverse_complement("AAAC").unwrap(), "GTTT");
        assert_eq!(reverse_complement("").unwrap(), "");
    }

    #[test]
    fn test_reverse_complement_is_involution() {
        for seq in ["ATCGATCGA", "GGGCCCAAATTT", "A", "TCGATCGAT", "CAGTTGACCA"] {
            let rc = reverse_complement(seq).unwrap();
            assert_eq!(reverse_complement(&rc).unwrap(), seq);
        }
    }

    #[test]
    fn test_reverse_complement_reports_original_position() {
        match reverse_complement("ACNT") {
            Err(ScreenError::InvalidBase { base, position }) => {
                assert_eq!(base, 'N');
                assert_eq!(position, 2);
            }
            other => panic!("expected InvalidBase, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_sequence() {
        assert!(is_valid_sequence("ATCGGCTA"));
        assert!(is_valid_sequence(""));
        assert!(!is_valid_sequence("ATCGX"));
        assert!(!is_valid_sequence("atcg"));
        assert!(matches!(
            validate_sequence("ATU"),
            Err(ScreenError::InvalidBase { base: 'U', position: 2 })
        ));
    }

    #[test]
    fn test_hash_first_char_is_lowest_digit() {
        assert_eq!(hash_sequence(b"A").unwrap(), 0);
        assert_eq!(hash_sequence(b"G").unwrap(), 3);
        assert_eq!(hash_sequence(b"TA").unwrap(), 1);
        assert_eq!(hash_sequence(b"AT").unwrap(), 4);
        assert_eq!(hash_sequence(b"CGT").unwrap(), 2 + 3 * 4 + 16);
        assert_eq!(hash_sequence(b"GGGGG").unwrap(), 1023);
        assert_eq!(hash_sequence(b"").unwrap(), 0);
    }

    #[test]
    fn test_hash_is_injective_and_in_range() {
        let len = 4;
        let size = table_size(len).unwrap();
        assert_eq!(size, 256);

        let mut seen = HashSet::new();
        for n in 0..size {
            let seq: Vec<u8> = (0..len)
                .map(|i| BASES[(n / NUMBER_OF_BASES.pow(i as u32)) % NUMBER_OF_BASES])
                .collect();
            let hash = hash_into(&seq, size).unwrap();
            assert!(hash < size);
            assert!(seen.insert(hash), "collision for {:?}", seq);
        }
        assert_eq!(seen.len(), size);
    }

    #[test]
    fn test_hash_into_rejects_oversized_key() {
        let size = table_size(5).unwrap();
        assert!(hash_into(b"GGGGG", size).is_ok());
        assert!(matches!(
            hash_into(b"GGGGGG", size),
            Err(ScreenError::HashOverflow { len: 6, table_size: 1024 })
        ));
    }

    #[test]
    fn test_hash_overflow_on_huge_key() {
        let key = vec![b'G'; 64];
        assert!(matches!(
            hash_sequence(&key),
            Err(ScreenError::HashOverflow { .. })
        ));
        assert!(table_size(64).is_err());
    }
}
