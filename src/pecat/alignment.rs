//! Alignment records as consumed by the classifier.
//!
//! Alignments are produced by an external aligner and converted into this
//! owned form at the I/O edge; the classifier only filters, partitions and
//! merges sets of them.

use crate::pecat::cigar::{Cigar, CigarOp};
use crate::utils::Result;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::Header;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn flipped(&self) -> Strand {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndelKind {
    Deletion,
    Insertion,
}

/// An indel derived from one alignment's operation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indel {
    pub kind: IndelKind,
    /// Deleted reference span start, or the reference position immediately
    /// after which bases are inserted.
    pub ref_start: i64,
    /// Deleted reference length, or number of inserted bases.
    pub len: usize,
    /// Inserted bases (empty for deletions).
    pub inserted: Vec<u8>,
}

impl Indel {
    pub fn deletion(ref_start: i64, len: usize) -> Indel {
        Indel {
            kind: IndelKind::Deletion,
            ref_start,
            len,
            inserted: Vec::new(),
        }
    }

    pub fn insertion(ref_start: i64, inserted: Vec<u8>) -> Indel {
        Indel {
            kind: IndelKind::Insertion,
            ref_start,
            len: inserted.len(),
            inserted,
        }
    }

    /// Reference span touched by the indel (insertions have a zero-length
    /// span at the flanking position).
    pub fn ref_span(&self) -> (i64, i64) {
        match self.kind {
            IndelKind::Deletion => (self.ref_start, self.ref_start + self.len as i64),
            IndelKind::Insertion => (self.ref_start, self.ref_start),
        }
    }

    /// Gap between the indel and a half-open reference window; zero if they
    /// overlap or abut.
    pub fn distance_from(&self, window: (i64, i64)) -> i64 {
        let (start, end) = self.ref_span();
        if end <= window.0 {
            window.0 - end
        } else if start >= window.1 {
            start - window.1
        } else {
            0
        }
    }
}

/// One mapping of a read span to a reference sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub ref_name: String,
    /// 0-based start on the reference.
    pub ref_start: i64,
    pub strand: Strand,
    pub cigar: Cigar,
    /// Record sequence in reference orientation; soft-clipped bases
    /// included, hard-clipped bases absent.
    pub query: Vec<u8>,
    pub mapq: u8,
}

impl Alignment {
    pub fn ref_end(&self) -> i64 {
        self.ref_start + self.cigar.reference_len() as i64
    }

    pub fn ref_span(&self) -> (i64, i64) {
        (self.ref_start, self.ref_end())
    }

    /// Half-open read interval covered by the alignment, in original read
    /// coordinates (strand-aware).
    pub fn read_interval(&self, read_len: usize) -> (usize, usize) {
        let (leading, trailing) = self.cigar.clips();
        let end = read_len.saturating_sub(trailing);
        let start = leading.min(end);
        match self.strand {
            Strand::Forward => (start, end),
            Strand::Reverse => (read_len - end, read_len - start),
        }
    }

    pub fn covers_whole_read(&self, read_len: usize) -> bool {
        self.read_interval(read_len) == (0, read_len)
    }

    /// Length of the overlap between the alignment's reference span and a
    /// half-open reference window.
    pub fn ref_overlap_len(&self, window: (i64, i64)) -> i64 {
        let start = self.ref_start.max(window.0);
        let end = self.ref_end().min(window.1);
        (end - start).max(0)
    }

    /// Walks the aligned (non-indel) columns, yielding
    /// `(query index, query base, reference position, reference base)`.
    /// Positions outside `ref_seq` are skipped.
    pub fn aligned_pairs<'s>(&'s self, ref_seq: &'s [u8]) -> Vec<(usize, u8, i64, u8)> {
        let mut pairs = Vec::new();
        let mut ref_pos = self.ref_start;
        let mut query_pos = 0usize;
        for &(op, len) in &self.cigar.ops {
            match op {
                CigarOp::Match | CigarOp::Equal | CigarOp::Diff => {
                    for i in 0..len {
                        let qi = query_pos + i;
                        let ri = ref_pos + i as i64;
                        if ri >= 0 && (ri as usize) < ref_seq.len() && qi < self.query.len() {
                            pairs.push((qi, self.query[qi], ri, ref_seq[ri as usize]));
                        }
                    }
                    ref_pos += len as i64;
                    query_pos += len;
                }
                CigarOp::Ins | CigarOp::SoftClip => query_pos += len,
                CigarOp::Del => ref_pos += len as i64,
                CigarOp::HardClip => {}
            }
        }
        pairs
    }

    /// Extracts the indels implied by the operation list.
    pub fn indels(&self) -> Vec<Indel> {
        let mut indels = Vec::new();
        let mut ref_pos = self.ref_start;
        let mut query_pos = 0usize;
        for &(op, len) in &self.cigar.ops {
            match op {
                CigarOp::Match | CigarOp::Equal | CigarOp::Diff => {
                    ref_pos += len as i64;
                    query_pos += len;
                }
                CigarOp::Del => {
                    indels.push(Indel::deletion(ref_pos, len));
                    ref_pos += len as i64;
                }
                CigarOp::Ins => {
                    let end = (query_pos + len).min(self.query.len());
                    indels.push(Indel::insertion(ref_pos, self.query[query_pos..end].to_vec()));
                    query_pos += len;
                }
                CigarOp::SoftClip => query_pos += len,
                CigarOp::HardClip => {}
            }
        }
        indels
    }

    /// Converted original-read position for a record-sequence index.
    /// Hard-clipped records index a truncated sequence; the leading
    /// hard-clip length restores the original-read coordinate before the
    /// strand conversion.
    pub fn read_pos(&self, query_index: usize, read_len: usize) -> usize {
        let leading_hard = self.cigar.clips().0 - self.cigar.query_start();
        let index = query_index + leading_hard;
        match self.strand {
            Strand::Forward => index,
            Strand::Reverse => read_len - 1 - index,
        }
    }

    /// Key identifying alignments that explain the same read/reference spans.
    pub fn span_key(&self, read_len: usize) -> (String, (usize, usize), (i64, i64)) {
        (
            self.ref_name.clone(),
            self.read_interval(read_len),
            self.ref_span(),
        )
    }

    /// Converts a mapped SAM record into an `Alignment`; unmapped records
    /// yield `None`. CIGAR operations the classifier does not understand
    /// (reference skips, padding) are a fatal input error.
    pub fn from_record_buf(header: &Header, record: &RecordBuf) -> Result<Option<Alignment>> {
        if record.flags().is_unmapped() {
            return Ok(None);
        }

        let ref_id = record
            .reference_sequence_id()
            .ok_or_else(|| "Mapped record without a reference sequence id".to_string())?;
        let ref_name = header
            .reference_sequences()
            .get_index(ref_id)
            .map(|(name, _)| String::from_utf8_lossy(name.as_ref()).into_owned())
            .ok_or_else(|| format!("Reference sequence id {} not in header", ref_id))?;

        let ref_start = record
            .alignment_start()
            .map(|p| usize::from(p) as i64 - 1)
            .ok_or_else(|| "Mapped record without an alignment start".to_string())?;

        let mut ops = Vec::new();
        for op in record.cigar().as_ref() {
            let converted = match op.kind() {
                Kind::Match => CigarOp::Match,
                Kind::SequenceMatch => CigarOp::Equal,
                Kind::SequenceMismatch => CigarOp::Diff,
                Kind::Insertion => CigarOp::Ins,
                Kind::Deletion => CigarOp::Del,
                Kind::SoftClip => CigarOp::SoftClip,
                Kind::HardClip => CigarOp::HardClip,
                Kind::Skip | Kind::Pad => {
                    return Err(format!(
                        "Unsupported CIGAR operation {:?} in alignment to {}",
                        op.kind(),
                        ref_name
                    ));
                }
            };
            ops.push((converted, op.len()));
        }

        let strand = if record.flags().is_reverse_complemented() {
            Strand::Reverse
        } else {
            Strand::Forward
        };

        Ok(Some(Alignment {
            ref_name,
            ref_start,
            strand,
            cigar: Cigar::new(ops),
            query: record.sequence().as_ref().to_vec(),
            mapq: record.mapping_quality().map(u8::from).unwrap_or(255),
        }))
    }
}

/// Collapses alignments that explain identical read/reference spans,
/// keeping the highest-MAPQ representative of each span.
pub fn make_nonredundant(alignments: Vec<Alignment>, read_len: usize) -> Vec<Alignment> {
    let mut best: HashMap<(String, (usize, usize), (i64, i64)), usize> = HashMap::new();
    let mut kept: Vec<Alignment> = Vec::new();
    for al in alignments {
        let key = al.span_key(read_len);
        match best.get(&key) {
            Some(&i) => {
                if al.mapq > kept[i].mapq {
                    kept[i] = al;
                }
            }
            None => {
                best.insert(key, kept.len());
                kept.push(al);
            }
        }
    }
    kept
}
