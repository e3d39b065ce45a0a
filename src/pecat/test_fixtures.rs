//! Shared fixtures for classifier tests: a small synthetic target with two
//! pegRNAs, one registered SNV per reference and one nonspecific candidate
//! genome.

use crate::pecat::alignment::{Alignment, Strand};
use crate::pecat::annotation::{
    CutWindow, Feature, IntendedDeletion, RawAnnotation, SidePair, TargetAnnotation,
};
use crate::pecat::cigar::Cigar;
use crate::pecat::read::SeqRead;
use std::collections::HashMap;

pub const TARGET_LEN: usize = 200;
pub const PEG_LEN: usize = 60;

fn synth_seq(len: usize, phase: usize) -> String {
    (0..len)
        .map(|i| match (i + phase) % 4 {
            0 => 'A',
            1 => 'C',
            2 => 'G',
            _ => 'T',
        })
        .collect()
}

fn feature(ref_name: &str, name: &str, start: i64, end: i64, strand: Strand) -> Feature {
    Feature {
        ref_name: ref_name.to_string(),
        name: name.to_string(),
        start,
        end,
        strand,
    }
}

/// Annotation skeleton; `intended_deletion` is `(start, length)` on the
/// target.
pub fn raw_annotation(intended_deletion: Option<(i64, usize)>) -> RawAnnotation {
    let mut sequences = HashMap::new();
    sequences.insert("amplicon".to_string(), synth_seq(TARGET_LEN, 0));
    sequences.insert("peg-L".to_string(), synth_seq(PEG_LEN, 1));
    sequences.insert("peg-R".to_string(), synth_seq(PEG_LEN, 2));
    sequences.insert("hg19_chr1".to_string(), synth_seq(120, 3));

    let mut snvs = HashMap::new();
    snvs.insert("amplicon".to_string(), vec![100]);
    snvs.insert("peg-L".to_string(), vec![35]);
    snvs.insert("peg-R".to_string(), vec![38]);

    RawAnnotation {
        target: "amplicon".to_string(),
        anchor: 100,
        sequences,
        pegrnas: SidePair {
            left: "peg-L".to_string(),
            right: "peg-R".to_string(),
        },
        features: vec![
            feature("amplicon", "fwd_primer", 0, 20, Strand::Forward),
            feature("amplicon", "rev_primer", 180, 200, Strand::Forward),
            feature("amplicon", "protospacer", 80, 100, Strand::Forward),
            feature("peg-L", "extension", 20, 50, Strand::Reverse),
            feature("peg-L", "overlap", 30, 45, Strand::Reverse),
            feature("peg-R", "extension", 20, 50, Strand::Forward),
            feature("peg-R", "overlap", 30, 45, Strand::Forward),
        ],
        snvs,
        intended_deletion: intended_deletion.map(|(start, length)| IntendedDeletion {
            start,
            length,
        }),
        primers: ["fwd_primer".to_string(), "rev_primer".to_string()],
        cut_window: CutWindow { start: 95, end: 105 },
        organisms: vec!["hg19".to_string(), "e_coli".to_string()],
    }
}

pub fn annotation(intended_deletion: Option<(i64, usize)>) -> TargetAnnotation {
    TargetAnnotation::new(raw_annotation(intended_deletion)).unwrap()
}

/// A read copying a slice of the target sequence.
pub fn read_from_target(
    annotation: &TargetAnnotation,
    name: &str,
    start: usize,
    end: usize,
) -> SeqRead {
    let bases = annotation.sequence("amplicon").unwrap()[start..end].to_vec();
    let quals = vec![40; bases.len()];
    SeqRead::new(name, bases, quals)
}

pub fn aln(
    _annotation: &TargetAnnotation,
    ref_name: &str,
    ref_start: i64,
    strand: Strand,
    cigar: &str,
    query: &[u8],
) -> Alignment {
    let cigar = Cigar::from_text(cigar).unwrap();
    assert_eq!(cigar.query_len(), query.len(), "fixture query/CIGAR mismatch");
    Alignment {
        ref_name: ref_name.to_string(),
        ref_start,
        strand,
        cigar,
        query: query.to_vec(),
        mapq: 60,
    }
}

/// Alignment of 25 read bases to a pegRNA's extension region (reference span
/// 25..50), agreeing or disagreeing with the pegRNA at its registered SNV
/// position.
pub fn pegrna_alignment(
    annotation: &TargetAnnotation,
    pegrna: &str,
    strand: Strand,
    read_len: usize,
    snv_agrees: bool,
) -> Alignment {
    let peg_seq = annotation.sequence(pegrna).unwrap();
    let mut query = vec![b'A'; read_len];
    query[10..35].copy_from_slice(&peg_seq[25..50]);
    if !snv_agrees {
        let snv_pos = *annotation
            .snv_positions(pegrna)
            .unwrap()
            .iter()
            .next()
            .unwrap() as usize;
        let qi = 10 + (snv_pos - 25);
        query[qi] = if query[qi] == b'A' { b'C' } else { b'A' };
    }
    let trailing = read_len - 35;
    aln(
        annotation,
        pegrna,
        25,
        strand,
        &format!("10S25M{}S", trailing),
        &query,
    )
}
