//! Derived facts about one read's alignment set.
//!
//! All facts are pure functions of the (parsimonious) alignment set and the
//! reference annotation, computed lazily and cached for the lifetime of the
//! read's classification.

use crate::pecat::alignment::{make_nonredundant, Alignment, Indel};
use crate::pecat::annotation::{Feature, Side, TargetAnnotation};
use crate::pecat::duplication::{chain_covering_read, classify_junctions, junctions_of, Duplication};
use crate::pecat::params::{FAR_FROM_CUT_MIN_DISTANCE, MIN_MAPQ, UNINTERESTING_INDEL_MAX_LEN};
use crate::pecat::read::SeqRead;
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Per-alignment agreement with the registered SNV positions of its
/// reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnvSummary {
    /// SNV positions where the read agrees with the alignment's reference.
    pub matches: BTreeSet<i64>,
    /// SNV positions where it disagrees.
    pub mismatches: BTreeSet<i64>,
}

pub struct ReadFacts<'a> {
    read: &'a SeqRead,
    annotation: &'a TargetAnnotation,
    alignments: Vec<Alignment>,
    covering: OnceCell<Option<usize>>,
    extension: OnceCell<[Option<usize>; 2]>,
    flipped: OnceCell<[Vec<usize>; 2]>,
    nonspecific: OnceCell<Vec<usize>>,
    non_primer: OnceCell<usize>,
    duplication: OnceCell<Option<Duplication>>,
}

impl<'a> ReadFacts<'a> {
    pub fn new(
        read: &'a SeqRead,
        annotation: &'a TargetAnnotation,
        alignments: Vec<Alignment>,
    ) -> ReadFacts<'a> {
        let filtered = alignments
            .into_iter()
            .filter(|al| al.mapq >= MIN_MAPQ)
            .collect();
        ReadFacts {
            read,
            annotation,
            alignments: make_nonredundant(filtered, read.len()),
            covering: OnceCell::new(),
            extension: OnceCell::new(),
            flipped: OnceCell::new(),
            nonspecific: OnceCell::new(),
            non_primer: OnceCell::new(),
            duplication: OnceCell::new(),
        }
    }

    pub fn read(&self) -> &SeqRead {
        self.read
    }

    pub fn annotation(&self) -> &TargetAnnotation {
        self.annotation
    }

    pub fn alignments(&self) -> &[Alignment] {
        &self.alignments
    }

    pub fn no_alignments_detected(&self) -> bool {
        self.alignments.is_empty()
    }

    pub fn target_alignments(&self) -> Vec<&Alignment> {
        self.alignments
            .iter()
            .filter(|al| self.annotation.is_target(&al.ref_name))
            .collect()
    }

    /// The unique target alignment whose read coverage spans the full read.
    /// Ties (identical coverage) resolve to the highest MAPQ, then to the
    /// leftmost reference start.
    pub fn single_read_covering_target_alignment(&self) -> Option<&Alignment> {
        let index = self.covering.get_or_init(|| {
            self.alignments
                .iter()
                .enumerate()
                .filter(|(_, al)| {
                    self.annotation.is_target(&al.ref_name)
                        && al.covers_whole_read(self.read.len())
                })
                .max_by_key(|(_, al)| (al.mapq, std::cmp::Reverse(al.ref_start)))
                .map(|(i, _)| i)
        });
        index.map(|i| &self.alignments[i])
    }

    /// Whether the covering alignment begins where sequencing is expected to
    /// start, i.e. inside the read-side primer.
    pub fn starts_at_expected_location(&self) -> bool {
        match self.single_read_covering_target_alignment() {
            Some(al) => self.annotation.read_side_primer().contains(al.ref_start),
            None => false,
        }
    }

    /// Partitions the indels of the given alignments into interesting
    /// (candidate true edits) and uninteresting (short, far from the cut
    /// window) ones.
    pub fn interesting_and_uninteresting_indels(
        &self,
        alignments: &[&Alignment],
    ) -> (Vec<Indel>, Vec<Indel>) {
        let window = self.annotation.cut_window();
        let mut interesting = Vec::new();
        let mut uninteresting = Vec::new();
        for indel in alignments.iter().flat_map(|al| al.indels()) {
            let is_noise = indel.len <= UNINTERESTING_INDEL_MAX_LEN
                && indel.distance_from(window) > FAR_FROM_CUT_MIN_DISTANCE;
            if is_noise {
                uninteresting.push(indel);
            } else {
                interesting.push(indel);
            }
        }
        (interesting, uninteresting)
    }

    /// Classifies every registered SNV position inside the alignment's span
    /// by whether the read agrees with this alignment's reference there.
    /// Absent alignments and alignments with no SNV overlap yield two empty
    /// sets.
    pub fn snv_summary(&self, alignment: Option<&Alignment>) -> SnvSummary {
        let mut summary = SnvSummary::default();
        let al = match alignment {
            Some(al) => al,
            None => return summary,
        };
        let positions = match self.annotation.snv_positions(&al.ref_name) {
            Some(positions) => positions,
            None => return summary,
        };
        let ref_seq = match self.annotation.sequence(&al.ref_name) {
            Some(seq) => seq,
            None => return summary,
        };
        for (_, read_base, ref_pos, ref_base) in al.aligned_pairs(ref_seq) {
            if positions.contains(&ref_pos) {
                if read_base.to_ascii_uppercase() == ref_base {
                    summary.matches.insert(ref_pos);
                } else {
                    summary.mismatches.insert(ref_pos);
                }
            }
        }
        summary
    }

    /// Mismatched positions of a target alignment that are not explained by
    /// the registered SNV table (i.e. unexpected point variants).
    pub fn non_pegrna_snvs(&self, alignment: &Alignment) -> BTreeSet<i64> {
        let registered = self.annotation.snv_positions(&alignment.ref_name);
        let ref_seq = match self.annotation.sequence(&alignment.ref_name) {
            Some(seq) => seq,
            None => return BTreeSet::new(),
        };
        alignment
            .aligned_pairs(ref_seq)
            .into_iter()
            .filter(|(_, read_base, ref_pos, ref_base)| {
                read_base.to_ascii_uppercase() != *ref_base
                    && !registered.is_some_and(|set| set.contains(ref_pos))
            })
            .map(|(_, _, ref_pos, _)| ref_pos)
            .collect()
    }

    /// Number of read bases not aligned to a primer feature of the target.
    pub fn non_primer_nts(&self) -> usize {
        *self.non_primer.get_or_init(|| {
            let primers = self.annotation.primer_features();
            let ref_seq = match self.annotation.sequence(self.annotation.target()) {
                Some(seq) => seq,
                None => return self.read.len(),
            };
            let mut covered: HashSet<usize> = HashSet::new();
            for al in self.target_alignments() {
                for (query_i, _, ref_pos, _) in al.aligned_pairs(ref_seq) {
                    if primers.iter().any(|p| p.contains(ref_pos)) {
                        covered.insert(al.read_pos(query_i, self.read.len()));
                    }
                }
            }
            self.read.len().saturating_sub(covered.len())
        })
    }

    fn extension_indices(&self) -> &[Option<usize>; 2] {
        self.extension.get_or_init(|| {
            let mut best = [None, None];
            for (slot, side) in Side::BOTH.into_iter().enumerate() {
                let pegrna = self.annotation.pegrna_name(side);
                let feature = match self.annotation.feature(pegrna, "extension") {
                    Some(f) => f,
                    None => continue,
                };
                let expected = self.annotation.expected_strand(side);
                best[slot] = self
                    .alignments
                    .iter()
                    .enumerate()
                    .filter(|(_, al)| {
                        al.ref_name == pegrna
                            && al.strand == expected
                            && al.ref_overlap_len(feature.interval()) > 0
                    })
                    .max_by_key(|(_, al)| {
                        (
                            al.ref_overlap_len(feature.interval()),
                            al.mapq,
                            std::cmp::Reverse(al.ref_start),
                        )
                    })
                    .map(|(i, _)| i);
            }
            best
        })
    }

    /// Best alignment of the read to the pegRNA's extension region in the
    /// expected orientation, per side.
    pub fn extension_alignment(&self, side: Side) -> Option<&Alignment> {
        let slot = match side {
            Side::Left => 0,
            Side::Right => 1,
        };
        self.extension_indices()[slot].map(|i| &self.alignments[i])
    }

    pub fn is_extension_alignment(&self, alignment: &Alignment) -> bool {
        Side::BOTH
            .into_iter()
            .any(|side| self.extension_alignment(side) == Some(alignment))
    }

    /// Sides with an extension alignment, in left-to-right order.
    pub fn sides_with_extension(&self) -> Vec<Side> {
        Side::BOTH
            .into_iter()
            .filter(|&side| self.extension_alignment(side).is_some())
            .collect()
    }

    fn flipped_indices(&self) -> &[Vec<usize>; 2] {
        self.flipped.get_or_init(|| {
            let mut flipped = [Vec::new(), Vec::new()];
            for (slot, side) in Side::BOTH.into_iter().enumerate() {
                let pegrna = self.annotation.pegrna_name(side);
                let unexpected = self.annotation.expected_strand(side).flipped();
                flipped[slot] = self
                    .alignments
                    .iter()
                    .enumerate()
                    .filter(|(_, al)| al.ref_name == pegrna && al.strand == unexpected)
                    .map(|(i, _)| i)
                    .collect();
            }
            flipped
        })
    }

    /// Alignments to the side's pegRNA in the unexpected (flipped)
    /// orientation.
    pub fn flipped_alignments(&self, side: Side) -> Vec<&Alignment> {
        let slot = match side {
            Side::Left => 0,
            Side::Right => 1,
        };
        self.flipped_indices()[slot]
            .iter()
            .map(|&i| &self.alignments[i])
            .collect()
    }

    pub fn sides_with_flipped(&self) -> Vec<Side> {
        Side::BOTH
            .into_iter()
            .filter(|&side| !self.flipped_alignments(side).is_empty())
            .collect()
    }

    /// Alignments to registered non-target, non-pegRNA references, best
    /// MAPQ first.
    pub fn nonspecific_amplification(&self) -> Vec<&Alignment> {
        let indices = self.nonspecific.get_or_init(|| {
            let mut candidates: Vec<usize> = self
                .alignments
                .iter()
                .enumerate()
                .filter(|(_, al)| {
                    !self.annotation.is_target(&al.ref_name)
                        && !self.annotation.is_pegrna(&al.ref_name)
                        && self.annotation.organism_of(&al.ref_name).is_some()
                })
                .map(|(i, _)| i)
                .collect();
            candidates.sort_by_key(|&i| {
                let al = &self.alignments[i];
                (std::cmp::Reverse(al.mapq), al.ref_name.clone(), al.ref_start)
            });
            candidates
        });
        indices.iter().map(|&i| &self.alignments[i]).collect()
    }

    fn compute_duplication(&self) -> Option<Duplication> {
        let targets = self.target_alignments();
        let chain = chain_covering_read(&targets, self.read.len())?;
        let junctions = junctions_of(&chain)?;
        let class = classify_junctions(&junctions);
        let indels = chain.iter().flat_map(|al| al.indels()).collect();
        let snv_alignments = chain
            .iter()
            .copied()
            .filter(|&al| !self.snv_summary(Some(al)).matches.is_empty())
            .cloned()
            .collect();
        let merged_alignments = chain.into_iter().cloned().collect();
        Some(Duplication {
            class,
            junctions,
            indels,
            snv_alignments,
            merged_alignments,
        })
    }

    /// Tandem-duplication explanation of the full read, if one exists.
    pub fn duplication(&self) -> Option<&Duplication> {
        self.duplication
            .get_or_init(|| self.compute_duplication())
            .as_ref()
    }

    pub fn duplication_covers_whole_read(&self) -> bool {
        self.duplication().is_some()
    }

    /// Target alignments anchoring the read edges (used as context in
    /// relevant-alignment sets).
    pub fn target_edge_alignments(&self) -> Vec<Alignment> {
        let read_len = self.read.len();
        let mut edges: Vec<Alignment> = Vec::new();
        for edge_pos in [0usize, read_len.saturating_sub(1)] {
            let best = self
                .target_alignments()
                .into_iter()
                .filter(|al| {
                    let (start, end) = al.read_interval(read_len);
                    start <= edge_pos && edge_pos < end
                })
                .max_by_key(|al| (al.mapq, std::cmp::Reverse(al.ref_start)));
            if let Some(al) = best {
                if !edges.contains(al) {
                    edges.push(al.clone());
                }
            }
        }
        edges
    }

    /// Extension alignments of both sides, left first.
    pub fn extension_alignments_list(&self) -> Vec<Alignment> {
        Side::BOTH
            .into_iter()
            .filter_map(|side| self.extension_alignment(side).cloned())
            .collect()
    }

    /// Fallback relevant set for calls that cannot point at a specific
    /// explanation: everything we have.
    pub fn uncategorized_relevant_alignments(&self) -> Vec<Alignment> {
        self.alignments.clone()
    }

    /// Strand-aware offsets of `feature` covered by aligned columns of `al`.
    pub fn covered_feature_offsets(&self, al: &Alignment, feature: &Feature) -> BTreeSet<i64> {
        self.feature_offset_to_read_pos(al, feature)
            .into_keys()
            .collect()
    }

    /// Maps strand-aware feature offsets to the original-read position
    /// aligned there.
    pub fn feature_offset_to_read_pos(
        &self,
        al: &Alignment,
        feature: &Feature,
    ) -> BTreeMap<i64, usize> {
        let mut map = BTreeMap::new();
        if al.ref_name != feature.ref_name {
            return map;
        }
        let ref_seq = match self.annotation.sequence(&al.ref_name) {
            Some(seq) => seq,
            None => return map,
        };
        for (query_i, _, ref_pos, _) in al.aligned_pairs(ref_seq) {
            if let Some(offset) = feature.offset_of(ref_pos) {
                map.insert(offset, al.read_pos(query_i, self.read.len()));
            }
        }
        map
    }

    /// Whether two alignments cover a common strand-aware offset of their
    /// respective features (the features may live on different references).
    pub fn share_feature(
        &self,
        al_a: &Alignment,
        feature_a: &Feature,
        al_b: &Alignment,
        feature_b: &Feature,
    ) -> bool {
        let offsets_a = self.covered_feature_offsets(al_a, feature_a);
        if offsets_a.is_empty() {
            return false;
        }
        let offsets_b = self.covered_feature_offsets(al_b, feature_b);
        offsets_a.intersection(&offsets_b).next().is_some()
    }
}
