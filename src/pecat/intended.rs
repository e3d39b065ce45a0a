//! Decides whether a read represents the intended edit.

use crate::pecat::annotation::Side;
use crate::pecat::facts::ReadFacts;

/// How completely the programmed SNVs were installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnvReplacement {
    /// No SNV position agrees with any pegRNA.
    None,
    /// Mixed agreement and disagreement.
    Partial,
    /// Every observed SNV position agrees, none disagree.
    Full,
}

impl SnvReplacement {
    /// Subcategory string used when the classifier reports an intended edit.
    pub fn subcategory(&self) -> &'static str {
        match self {
            SnvReplacement::None => "none",
            SnvReplacement::Partial => "partial replacement",
            SnvReplacement::Full => "replacement",
        }
    }
}

/// True iff both sides have an extension alignment and those alignments
/// converge on a common offset of the pegRNAs' shared overlap region.
pub fn has_intended_pegrna_overlap(facts: &ReadFacts) -> bool {
    let annotation = facts.annotation();
    let (left, right) = match (
        facts.extension_alignment(Side::Left),
        facts.extension_alignment(Side::Right),
    ) {
        (Some(left), Some(right)) => (left, right),
        _ => return false,
    };
    let left_overlap = annotation.feature(annotation.pegrna_name(Side::Left), "overlap");
    let right_overlap = annotation.feature(annotation.pegrna_name(Side::Right), "overlap");
    match (left_overlap, right_overlap) {
        (Some(lf), Some(rf)) => facts.share_feature(left, lf, right, rf),
        _ => false,
    }
}

/// Aggregates the SNV agreement of both sides' extension alignments.
pub fn intended_snvs_replaced(facts: &ReadFacts) -> SnvReplacement {
    let mut any_replaced = false;
    let mut any_not_replaced = false;
    for side in Side::BOTH {
        let summary = facts.snv_summary(facts.extension_alignment(side));
        any_replaced |= !summary.matches.is_empty();
        any_not_replaced |= !summary.mismatches.is_empty();
    }
    match (any_replaced, any_not_replaced) {
        (false, _) => SnvReplacement::None,
        (true, true) => SnvReplacement::Partial,
        (true, false) => SnvReplacement::Full,
    }
}

/// `Some(tag)` iff the read represents the intended SNV replacement; the tag
/// doubles as the classifier's subcategory. Declared intended deletions are
/// handled by the deletion path and never report as replacement.
pub fn is_intended_replacement(facts: &ReadFacts) -> Option<SnvReplacement> {
    if facts.annotation().intended_deletion().is_some() {
        return None;
    }
    if !has_intended_pegrna_overlap(facts) {
        return None;
    }
    match intended_snvs_replaced(facts) {
        SnvReplacement::None => None,
        replaced => Some(replaced),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pecat::alignment::Strand;
    use crate::pecat::facts::ReadFacts;
    use crate::pecat::test_fixtures::{annotation, pegrna_alignment, read_from_target, TARGET_LEN};

    #[test]
    fn overlap_requires_both_sides() {
        let annotation = annotation(None);
        let read = read_from_target(&annotation, "r", 0, TARGET_LEN);
        let left = pegrna_alignment(&annotation, "peg-L", Strand::Reverse, read.len(), true);
        let facts = ReadFacts::new(&read, &annotation, vec![left]);
        assert!(!has_intended_pegrna_overlap(&facts));
        assert!(is_intended_replacement(&facts).is_none());
    }

    #[test]
    fn matching_snvs_on_both_sides_are_full_replacement() {
        let annotation = annotation(None);
        let read = read_from_target(&annotation, "r", 0, TARGET_LEN);
        let left = pegrna_alignment(&annotation, "peg-L", Strand::Reverse, read.len(), true);
        let right = pegrna_alignment(&annotation, "peg-R", Strand::Forward, read.len(), true);
        let facts = ReadFacts::new(&read, &annotation, vec![left, right]);
        assert!(has_intended_pegrna_overlap(&facts));
        assert_eq!(intended_snvs_replaced(&facts), SnvReplacement::Full);
        assert_eq!(is_intended_replacement(&facts), Some(SnvReplacement::Full));
    }

    #[test]
    fn mixed_agreement_is_partial() {
        let annotation = annotation(None);
        let read = read_from_target(&annotation, "r", 0, TARGET_LEN);
        let left = pegrna_alignment(&annotation, "peg-L", Strand::Reverse, read.len(), true);
        let right = pegrna_alignment(&annotation, "peg-R", Strand::Forward, read.len(), false);
        let facts = ReadFacts::new(&read, &annotation, vec![left, right]);
        assert_eq!(intended_snvs_replaced(&facts), SnvReplacement::Partial);
        assert_eq!(is_intended_replacement(&facts), Some(SnvReplacement::Partial));
    }

    #[test]
    fn declared_deletion_suppresses_replacement() {
        let annotation = annotation(Some((98, 4)));
        let read = read_from_target(&annotation, "r", 0, TARGET_LEN);
        let left = pegrna_alignment(&annotation, "peg-L", Strand::Reverse, read.len(), true);
        let right = pegrna_alignment(&annotation, "peg-R", Strand::Forward, read.len(), true);
        let facts = ReadFacts::new(&read, &annotation, vec![left, right]);
        assert!(is_intended_replacement(&facts).is_none());
    }
}
