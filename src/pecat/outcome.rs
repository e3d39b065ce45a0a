//! Structured description of what changed in a read, and its canonical
//! string form.

use crate::pecat::alignment::{Indel, IndelKind};
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

/// Reference junction of a duplicated segment: the duplicated span
/// `(start, end)` on the target.
pub type RefJunction = (i64, i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing coordinate-bearing to report.
    NotApplicable,
    Deletion(Indel),
    Insertion(Indel),
    /// Reference positions carrying unexplained single-nucleotide variants.
    Mismatches(BTreeSet<i64>),
    /// Ordered reference junctions of a duplication.
    Duplication(Vec<RefJunction>),
}

impl Outcome {
    pub fn from_indel(indel: Indel) -> Outcome {
        match indel.kind {
            IndelKind::Deletion => Outcome::Deletion(indel),
            IndelKind::Insertion => Outcome::Insertion(indel),
        }
    }

    /// Re-expresses every held coordinate relative to `anchor`
    /// (`p -> p - anchor`). Total; `NotApplicable` is unaffected.
    pub fn anchor_shifted(&self, anchor: i64) -> Outcome {
        match self {
            Outcome::NotApplicable => Outcome::NotApplicable,
            Outcome::Deletion(indel) => Outcome::Deletion(Indel {
                ref_start: indel.ref_start - anchor,
                ..indel.clone()
            }),
            Outcome::Insertion(indel) => Outcome::Insertion(Indel {
                ref_start: indel.ref_start - anchor,
                ..indel.clone()
            }),
            Outcome::Mismatches(positions) => {
                Outcome::Mismatches(positions.iter().map(|p| p - anchor).collect())
            }
            Outcome::Duplication(junctions) => Outcome::Duplication(
                junctions.iter().map(|(s, e)| (s - anchor, e - anchor)).collect(),
            ),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NotApplicable => write!(f, "n/a"),
            Outcome::Deletion(indel) => write!(f, "D:{}:{}", indel.ref_start, indel.len),
            Outcome::Insertion(indel) => write!(
                f,
                "I:{}:{}",
                indel.ref_start,
                String::from_utf8_lossy(&indel.inserted)
            ),
            Outcome::Mismatches(positions) => {
                write!(f, "M:{}", positions.iter().join(";"))
            }
            Outcome::Duplication(junctions) => write!(
                f,
                "Dup:{}",
                junctions.iter().map(|(s, e)| format!("{}..{}", s, e)).join(",")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pecat::alignment::Indel;

    #[test]
    fn anchor_shift_round_trip() {
        let outcomes = [
            Outcome::NotApplicable,
            Outcome::Deletion(Indel::deletion(120, 4)),
            Outcome::Insertion(Indel::insertion(98, b"GATC".to_vec())),
            Outcome::Mismatches([95, 101, 140].into_iter().collect()),
            Outcome::Duplication(vec![(40, 120), (40, 120)]),
        ];
        for outcome in outcomes {
            assert_eq!(outcome.anchor_shifted(100).anchor_shifted(-100), outcome);
        }
    }

    #[test]
    fn canonical_rendering() {
        assert_eq!(Outcome::NotApplicable.to_string(), "n/a");
        assert_eq!(Outcome::Deletion(Indel::deletion(-2, 4)).to_string(), "D:-2:4");
        assert_eq!(
            Outcome::Insertion(Indel::insertion(7, b"GT".to_vec())).to_string(),
            "I:7:GT"
        );
        assert_eq!(
            Outcome::Mismatches([11, 3].into_iter().collect()).to_string(),
            "M:3;11"
        );
        assert_eq!(Outcome::Duplication(vec![(40, 120)]).to_string(), "Dup:40..120");
        // Anchor-shifted junctions go negative; the separator must stay
        // distinguishable from a sign.
        assert_eq!(
            Outcome::Duplication(vec![(-60, 20), (-60, 20)]).to_string(),
            "Dup:-60..20,-60..20"
        );
    }

    #[test]
    fn shift_applies_to_every_coordinate() {
        let dup = Outcome::Duplication(vec![(40, 120), (60, 130)]);
        assert_eq!(
            dup.anchor_shifted(100),
            Outcome::Duplication(vec![(-60, 20), (-40, 30)])
        );
    }
}
