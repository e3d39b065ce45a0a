//! Crate-owned CIGAR representation.
//!
//! Alignment records arrive from an external aligner; once converted, all
//! interval arithmetic in the classifier goes through this type.

use crate::utils::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    /// Alignment match (`M`); may be a base match or mismatch.
    Match,
    /// Sequence match (`=`).
    Equal,
    /// Sequence mismatch (`X`).
    Diff,
    /// Insertion to the reference (`I`).
    Ins,
    /// Deletion from the reference (`D`).
    Del,
    /// Soft clip (`S`); bases present in the record sequence.
    SoftClip,
    /// Hard clip (`H`); bases absent from the record sequence.
    HardClip,
}

impl CigarOp {
    pub fn advances_ref(&self) -> bool {
        matches!(self, CigarOp::Match | CigarOp::Equal | CigarOp::Diff | CigarOp::Del)
    }

    pub fn advances_query(&self) -> bool {
        matches!(
            self,
            CigarOp::Match | CigarOp::Equal | CigarOp::Diff | CigarOp::Ins | CigarOp::SoftClip
        )
    }

    pub fn is_aligned(&self) -> bool {
        matches!(self, CigarOp::Match | CigarOp::Equal | CigarOp::Diff)
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, CigarOp::SoftClip | CigarOp::HardClip)
    }

    pub fn to_char(self) -> char {
        match self {
            CigarOp::Match => 'M',
            CigarOp::Equal => '=',
            CigarOp::Diff => 'X',
            CigarOp::Ins => 'I',
            CigarOp::Del => 'D',
            CigarOp::SoftClip => 'S',
            CigarOp::HardClip => 'H',
        }
    }

    pub fn from_char(c: char) -> Result<CigarOp> {
        match c {
            'M' => Ok(CigarOp::Match),
            '=' => Ok(CigarOp::Equal),
            'X' => Ok(CigarOp::Diff),
            'I' => Ok(CigarOp::Ins),
            'D' => Ok(CigarOp::Del),
            'S' => Ok(CigarOp::SoftClip),
            'H' => Ok(CigarOp::HardClip),
            _ => Err(format!("Unsupported CIGAR operation '{}'", c)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cigar {
    pub ops: Vec<(CigarOp, usize)>,
}

impl Cigar {
    pub fn new(ops: Vec<(CigarOp, usize)>) -> Cigar {
        Cigar { ops }
    }

    /// Parses a text CIGAR like "10M1D5M".
    pub fn from_text(text: &str) -> Result<Cigar> {
        let mut ops = Vec::new();
        let mut len: usize = 0;
        for c in text.chars() {
            if let Some(d) = c.to_digit(10) {
                len = len * 10 + d as usize;
            } else {
                if len == 0 {
                    return Err(format!("Invalid CIGAR '{}': zero-length operation", text));
                }
                ops.push((CigarOp::from_char(c)?, len));
                len = 0;
            }
        }
        if len != 0 {
            return Err(format!("Invalid CIGAR '{}': trailing length", text));
        }
        Ok(Cigar { ops })
    }

    /// Number of reference bases consumed.
    pub fn reference_len(&self) -> usize {
        self.ops
            .iter()
            .filter(|(op, _)| op.advances_ref())
            .map(|(_, len)| len)
            .sum()
    }

    /// Number of record-sequence bases consumed (soft clips included, hard
    /// clips excluded).
    pub fn query_len(&self) -> usize {
        self.ops
            .iter()
            .filter(|(op, _)| op.advances_query())
            .map(|(_, len)| len)
            .sum()
    }

    /// Total read length implied by the CIGAR, hard clips included.
    pub fn full_read_len(&self) -> usize {
        self.ops
            .iter()
            .filter(|(op, _)| op.advances_query() || *op == CigarOp::HardClip)
            .map(|(_, len)| len)
            .sum()
    }

    /// Clipped lengths (soft + hard) at the start and end, in record
    /// orientation.
    pub fn clips(&self) -> (usize, usize) {
        let leading = self
            .ops
            .iter()
            .take_while(|(op, _)| op.is_clip())
            .map(|(_, len)| len)
            .sum();
        let trailing = self
            .ops
            .iter()
            .rev()
            .take_while(|(op, _)| op.is_clip())
            .map(|(_, len)| len)
            .sum();
        (leading, trailing)
    }

    /// Record-sequence index of the first aligned base (i.e. the leading
    /// soft-clip length).
    pub fn query_start(&self) -> usize {
        self.ops
            .iter()
            .take_while(|(op, _)| op.is_clip())
            .filter(|(op, _)| *op == CigarOp::SoftClip)
            .map(|(_, len)| len)
            .sum()
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (op, len) in &self.ops {
            write!(f, "{}{}", len, op.to_char())?;
        }
        Ok(())
    }
}

/// Reverse complement of a DNA sequence; non-ACGT bases map to N.
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|b| match b.to_ascii_uppercase() {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            _ => b'N',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_round_trip() {
        let cigar = Cigar::from_text("5S10M2I3D20M4H").unwrap();
        assert_eq!(cigar.to_string(), "5S10M2I3D20M4H");
        assert_eq!(cigar.reference_len(), 33);
        assert_eq!(cigar.query_len(), 37);
        assert_eq!(cigar.full_read_len(), 41);
        assert_eq!(cigar.clips(), (5, 4));
        assert_eq!(cigar.query_start(), 5);
    }

    #[test]
    fn reject_unknown_op() {
        assert!(Cigar::from_text("10M5N").is_err());
        assert!(Cigar::from_text("M").is_err());
    }

    #[test]
    fn revcomp_maps_bases() {
        assert_eq!(revcomp(b"ACGT"), b"ACGT".to_vec());
        assert_eq!(revcomp(b"AACG"), b"CGTT".to_vec());
        assert_eq!(revcomp(b"ANC"), b"GNT".to_vec());
    }
}
