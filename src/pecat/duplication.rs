//! Tandem-duplication explanation of a read as a chain of target
//! alignments whose reference spans step backward at each junction.

use crate::pecat::alignment::{Alignment, Indel, Strand};
use crate::pecat::outcome::RefJunction;
use crate::pecat::params::MAX_JUNCTION_GAP;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DupClass {
    /// One junction.
    Simple,
    /// Two or more identical junctions.
    Iterated,
    /// Anything else.
    Complex,
}

impl DupClass {
    pub fn subcategory(&self) -> &'static str {
        match self {
            DupClass::Simple => "simple",
            DupClass::Iterated => "iterated",
            DupClass::Complex => "complex",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Duplication {
    pub class: DupClass,
    pub junctions: Vec<RefJunction>,
    pub indels: Vec<Indel>,
    /// Chain alignments carrying registered SNV matches.
    pub snv_alignments: Vec<Alignment>,
    /// The full alignment chain explaining the read.
    pub merged_alignments: Vec<Alignment>,
}

/// Orders alignments by read interval and checks that together they cover
/// the whole read with gaps of at most `MAX_JUNCTION_GAP` bases. Requires at
/// least two same-strand pieces. Returns the chain in read order.
pub fn chain_covering_read<'a>(
    alignments: &[&'a Alignment],
    read_len: usize,
) -> Option<Vec<&'a Alignment>> {
    if alignments.len() < 2 || read_len == 0 {
        return None;
    }
    let strand = alignments[0].strand;
    if alignments.iter().any(|al| al.strand != strand) {
        return None;
    }

    let mut chain: Vec<&Alignment> = alignments.to_vec();
    chain.sort_by_key(|al| al.read_interval(read_len));

    let (first_start, mut covered_to) = chain[0].read_interval(read_len);
    if first_start > MAX_JUNCTION_GAP {
        return None;
    }
    for al in &chain[1..] {
        let (start, end) = al.read_interval(read_len);
        if start > covered_to + MAX_JUNCTION_GAP {
            return None;
        }
        covered_to = covered_to.max(end);
    }
    if covered_to + MAX_JUNCTION_GAP < read_len {
        return None;
    }
    Some(chain)
}

/// Reference junctions between consecutive chain pieces. Every junction must
/// step backward on the reference (revisit already-covered bases); a forward
/// step means the chain is not a duplication.
pub fn junctions_of(chain: &[&Alignment]) -> Option<Vec<RefJunction>> {
    let mut junctions = Vec::with_capacity(chain.len() - 1);
    for pair in chain.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let junction = match prev.strand {
            Strand::Forward => {
                if next.ref_start >= prev.ref_end() {
                    return None;
                }
                (next.ref_start, prev.ref_end())
            }
            Strand::Reverse => {
                if next.ref_end() <= prev.ref_start {
                    return None;
                }
                (prev.ref_start, next.ref_end())
            }
        };
        junctions.push(junction);
    }
    Some(junctions)
}

pub fn classify_junctions(junctions: &[RefJunction]) -> DupClass {
    match junctions {
        [_] => DupClass::Simple,
        [first, rest @ ..] if rest.iter().all(|j| j == first) => DupClass::Iterated,
        _ => DupClass::Complex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pecat::cigar::Cigar;

    fn piece(ref_start: i64, cigar: &str) -> Alignment {
        Alignment {
            ref_name: "amplicon".to_string(),
            ref_start,
            strand: Strand::Forward,
            cigar: Cigar::from_text(cigar).unwrap(),
            query: vec![b'A'; Cigar::from_text(cigar).unwrap().query_len()],
            mapq: 60,
        }
    }

    #[test]
    fn two_piece_chain_yields_one_junction() {
        let a = piece(40, "80M80S");
        let b = piece(40, "80S80M");
        let als = [&a, &b];
        let chain = chain_covering_read(&als, 160).unwrap();
        let junctions = junctions_of(&chain).unwrap();
        assert_eq!(junctions, vec![(40, 120)]);
        assert_eq!(classify_junctions(&junctions), DupClass::Simple);
    }

    #[test]
    fn identical_junctions_are_iterated() {
        let junctions = vec![(40, 120), (40, 120)];
        assert_eq!(classify_junctions(&junctions), DupClass::Iterated);
        let mixed = vec![(40, 120), (60, 130)];
        assert_eq!(classify_junctions(&mixed), DupClass::Complex);
    }

    #[test]
    fn forward_reference_step_is_not_a_duplication() {
        let a = piece(0, "80M80S");
        let b = piece(100, "80S80M");
        let als = [&a, &b];
        let chain = chain_covering_read(&als, 160).unwrap();
        assert!(junctions_of(&chain).is_none());
    }

    #[test]
    fn uncovered_read_is_not_a_chain() {
        let a = piece(40, "40M120S");
        let b = piece(40, "120S40M");
        let als = [&a, &b];
        assert!(chain_covering_read(&als, 160).is_none());
    }
}
