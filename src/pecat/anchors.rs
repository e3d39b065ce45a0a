//! Draw-time anchors for the external diagram renderer.
//!
//! Maps each pegRNA reference name to a `(read offset, reference position)`
//! pair chosen so that diagrams of both pegRNAs line up on their shared
//! overlap region.

use crate::pecat::alignment::Alignment;
use crate::pecat::annotation::Side;
use crate::pecat::facts::ReadFacts;
use crate::pecat::params::ANCHOR_MIN_OVERLAP_LEN;
use std::collections::BTreeMap;

pub type ManualAnchors = BTreeMap<String, (usize, i64)>;

/// Picks, per side, the best expected-strand pegRNA alignment (extension
/// alignments beat equal-overlap alternatives), then anchors both pegRNAs at
/// an overlap offset seen on both sides if one exists, or on either side
/// otherwise. Short overlap regions produce no anchors.
pub fn manual_anchors(facts: &ReadFacts) -> ManualAnchors {
    let annotation = facts.annotation();
    let mut anchors = ManualAnchors::new();

    let left_overlap = match annotation.feature(annotation.pegrna_name(Side::Left), "overlap") {
        Some(feature) => feature,
        None => return anchors,
    };
    let overlap_length = left_overlap.len();

    let mut offset_to_q: [BTreeMap<i64, usize>; 2] = [BTreeMap::new(), BTreeMap::new()];
    for (slot, side) in Side::BOTH.into_iter().enumerate() {
        let pegrna = annotation.pegrna_name(side);
        let overlap = match annotation.feature(pegrna, "overlap") {
            Some(feature) => feature,
            None => continue,
        };
        let expected = annotation.expected_strand(side);
        let best = facts
            .alignments()
            .iter()
            .filter(|al| al.ref_name == pegrna && al.strand == expected)
            .max_by_key(|al| priority_key(facts, al, overlap.interval()));
        if let Some(al) = best {
            offset_to_q[slot] = facts.feature_offset_to_read_pos(al, overlap);
        }
    }

    if overlap_length <= ANCHOR_MIN_OVERLAP_LEN {
        return anchors;
    }

    let shared = offset_to_q[0]
        .keys()
        .find(|offset| offset_to_q[1].contains_key(offset))
        .copied();

    // Prefer an offset present on both sides (anchoring at the floor-mean
    // read position); otherwise fall back to either side's first offset.
    let (anchor_offset, q) = if let Some(offset) = shared {
        let q = (offset_to_q[0][&offset] + offset_to_q[1][&offset]) / 2;
        (offset, q)
    } else if let Some((&offset, &q)) = offset_to_q[0].iter().next() {
        (offset, q)
    } else if let Some((&offset, &q)) = offset_to_q[1].iter().next() {
        (offset, q)
    } else {
        return anchors;
    };

    for side in Side::BOTH {
        let pegrna = annotation.pegrna_name(side);
        if let Some(overlap) = annotation.feature(pegrna, "overlap") {
            if let Some(ref_p) = overlap.position_at(anchor_offset) {
                anchors.insert(pegrna.to_string(), (q, ref_p));
            }
        }
    }
    anchors
}

fn priority_key(
    facts: &ReadFacts,
    al: &Alignment,
    overlap: (i64, i64),
) -> (bool, i64, u8, std::cmp::Reverse<i64>) {
    (
        facts.is_extension_alignment(al),
        al.ref_overlap_len(overlap),
        al.mapq,
        std::cmp::Reverse(al.ref_start),
    )
}
