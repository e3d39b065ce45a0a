//! The outcome decision tree.
//!
//! One classifier owns one read's derived facts and resolves them into a
//! single `(category, subcategory, details)` call plus the alignments that
//! justify it. Branches are checked in a fixed priority order; the first
//! matching explanation wins.

use crate::pecat::alignment::{make_nonredundant, Alignment, IndelKind};
use crate::pecat::annotation::TargetAnnotation;
use crate::pecat::facts::ReadFacts;
use crate::pecat::intended::is_intended_replacement;
use crate::pecat::outcome::Outcome;
use crate::pecat::params::{
    DELETION_PRIMER_DIMER_MAX_NON_PRIMER_NTS, NONSPECIFIC_MAX_NON_PRIMER_NTS,
    PRIMER_DIMER_LENGTH_SLACK, PRIMER_DIMER_MAX_NON_PRIMER_NTS,
};
use crate::pecat::read::SeqRead;
use crate::pecat::taxonomy::{check_pair, Category};
use crate::utils::Result;

/// A finished call for one read.
#[derive(Debug, Clone)]
pub struct Classification {
    pub category: Category,
    pub subcategory: String,
    /// Canonical outcome string, anchor-relative; `"n/a"` when the call
    /// carries no coordinates.
    pub details: String,
    pub outcome: Option<Outcome>,
    /// Nonredundant alignments supporting the call.
    pub relevant_alignments: Vec<Alignment>,
}

impl Classification {
    fn new(
        category: Category,
        subcategory: impl Into<String>,
        outcome: Option<Outcome>,
        relevant_alignments: Vec<Alignment>,
    ) -> Classification {
        Classification {
            category,
            subcategory: subcategory.into(),
            details: "n/a".to_string(),
            outcome,
            relevant_alignments,
        }
    }

    fn uncategorized(relevant_alignments: Vec<Alignment>) -> Classification {
        Classification::new(
            Category::Uncategorized,
            "uncategorized",
            None,
            relevant_alignments,
        )
    }
}

pub struct ReadClassifier<'a> {
    facts: ReadFacts<'a>,
    cached: Option<Classification>,
}

impl<'a> ReadClassifier<'a> {
    pub fn new(
        read: &'a SeqRead,
        annotation: &'a TargetAnnotation,
        alignments: Vec<Alignment>,
    ) -> ReadClassifier<'a> {
        ReadClassifier {
            facts: ReadFacts::new(read, annotation, alignments),
            cached: None,
        }
    }

    pub fn facts(&self) -> &ReadFacts<'a> {
        &self.facts
    }

    /// Resolves the read to a call. Repeated calls return the same
    /// `Classification`.
    pub fn classify(&mut self) -> Result<Classification> {
        if let Some(call) = &self.cached {
            return Ok(call.clone());
        }

        let mut call = categorize(&self.facts)?;

        call.relevant_alignments =
            make_nonredundant(call.relevant_alignments, self.facts.read().len());
        if let Some(outcome) = &call.outcome {
            let anchor = self.facts.annotation().anchor();
            call.details = outcome.anchor_shifted(anchor).to_string();
        }
        check_pair(
            call.category,
            &call.subcategory,
            self.facts.annotation().organisms(),
        )?;

        self.cached = Some(call.clone());
        Ok(call)
    }
}

fn categorize(facts: &ReadFacts) -> Result<Classification> {
    let annotation = facts.annotation();

    if facts.read().len() <= annotation.combined_primer_length() + PRIMER_DIMER_LENGTH_SLACK {
        let subcategory = if facts.non_primer_nts() <= PRIMER_DIMER_MAX_NON_PRIMER_NTS {
            "primer dimer"
        } else {
            "unknown"
        };
        return Ok(Classification::new(
            Category::NonspecificAmplification,
            subcategory,
            None,
            facts.uncategorized_relevant_alignments(),
        ));
    }

    if facts.no_alignments_detected() {
        return Ok(Classification::uncategorized(Vec::new()));
    }

    if let Some(target_al) = facts.single_read_covering_target_alignment() {
        return categorize_covering(facts, target_al);
    }

    if let Some(dup) = facts.duplication() {
        return Ok(Classification::new(
            Category::Duplication,
            dup.class.subcategory(),
            Some(Outcome::Duplication(dup.junctions.clone())),
            dup.merged_alignments.clone(),
        ));
    }

    let extension_sides = facts.sides_with_extension();
    if !extension_sides.is_empty() {
        if let Some(replaced) = is_intended_replacement(facts) {
            let mut relevant = facts.target_edge_alignments();
            relevant.extend(facts.extension_alignments_list());
            return Ok(Classification::new(
                Category::IntendedEdit,
                replaced.subcategory(),
                Some(Outcome::NotApplicable),
                relevant,
            ));
        }
        let subcategory = side_subcategory(&extension_sides)?;
        let mut relevant = facts.target_edge_alignments();
        relevant.extend(facts.extension_alignments_list());
        return Ok(Classification::new(
            Category::UnintendedRtAnnealing,
            subcategory,
            Some(Outcome::NotApplicable),
            relevant,
        ));
    }

    let flipped_sides = facts.sides_with_flipped();
    if !flipped_sides.is_empty() {
        let subcategory = side_subcategory(&flipped_sides)?;
        let mut relevant = facts.target_edge_alignments();
        for side in crate::pecat::annotation::Side::BOTH {
            relevant.extend(facts.flipped_alignments(side).into_iter().cloned());
        }
        return Ok(Classification::new(
            Category::FlippedPegRnaIncorporation,
            subcategory,
            Some(Outcome::NotApplicable),
            relevant,
        ));
    }

    if facts.non_primer_nts() <= NONSPECIFIC_MAX_NON_PRIMER_NTS {
        return Ok(Classification::new(
            Category::NonspecificAmplification,
            "unknown",
            None,
            facts.uncategorized_relevant_alignments(),
        ));
    }

    let nonspecific = facts.nonspecific_amplification();
    if let Some(best) = nonspecific.first() {
        let organism = annotation
            .organism_of(&best.ref_name)
            .ok_or_else(|| format!("No registered organism for reference '{}'", best.ref_name))?
            .to_string();
        let mut relevant = facts.target_edge_alignments();
        relevant.extend(nonspecific.into_iter().cloned());
        return Ok(Classification::new(
            Category::NonspecificAmplification,
            organism,
            None,
            relevant,
        ));
    }

    Ok(Classification::uncategorized(
        facts.uncategorized_relevant_alignments(),
    ))
}

/// The read is fully explained by one target alignment; resolve on its
/// indels and point variants.
fn categorize_covering(facts: &ReadFacts, target_al: &Alignment) -> Result<Classification> {
    let annotation = facts.annotation();
    let (interesting, uninteresting) = facts.interesting_and_uninteresting_indels(&[target_al]);

    match interesting.as_slice() {
        [] => {
            if !facts.starts_at_expected_location() {
                return Ok(Classification::uncategorized(vec![target_al.clone()]));
            }
            // Intended replacements with minimal sequence change still look
            // like clean covering alignments, so check for them first.
            if let Some(replaced) = is_intended_replacement(facts) {
                let mut relevant = facts.target_edge_alignments();
                relevant.extend(facts.extension_alignments_list());
                return Ok(Classification::new(
                    Category::IntendedEdit,
                    replaced.subcategory(),
                    Some(Outcome::NotApplicable),
                    relevant,
                ));
            }

            let snvs = facts.non_pegrna_snvs(target_al);
            let call = if snvs.is_empty() && uninteresting.is_empty() {
                Classification::new(
                    Category::WildType,
                    "clean",
                    Some(Outcome::NotApplicable),
                    vec![target_al.clone()],
                )
            } else if uninteresting.len() == 1 {
                let outcome = Outcome::from_indel(uninteresting[0].clone());
                Classification::new(
                    Category::WildType,
                    "short indel far from cut",
                    Some(outcome),
                    vec![target_al.clone()],
                )
            } else if uninteresting.len() > 1 {
                Classification::uncategorized(vec![target_al.clone()])
            } else {
                Classification::new(
                    Category::WildType,
                    "mismatches",
                    Some(Outcome::Mismatches(snvs)),
                    vec![target_al.clone()],
                )
            };
            Ok(call)
        }

        [indel] => {
            let subcategory = if facts.non_pegrna_snvs(target_al).is_empty() {
                "clean"
            } else {
                "mismatches"
            };
            match indel.kind {
                IndelKind::Deletion => {
                    if facts.non_primer_nts() <= DELETION_PRIMER_DIMER_MAX_NON_PRIMER_NTS {
                        return Ok(Classification::new(
                            Category::NonspecificAmplification,
                            "primer dimer",
                            None,
                            facts.uncategorized_relevant_alignments(),
                        ));
                    }
                    let outcome = Some(Outcome::Deletion(indel.clone()));
                    if annotation.intended_deletion() == Some(indel) {
                        let mut relevant = vec![target_al.clone()];
                        relevant.extend(facts.extension_alignments_list());
                        Ok(Classification::new(
                            Category::IntendedEdit,
                            "deletion",
                            outcome,
                            relevant,
                        ))
                    } else {
                        Ok(Classification::new(
                            Category::Deletion,
                            subcategory,
                            outcome,
                            vec![target_al.clone()],
                        ))
                    }
                }
                IndelKind::Insertion => Ok(Classification::new(
                    Category::Insertion,
                    subcategory,
                    Some(Outcome::Insertion(indel.clone())),
                    vec![target_al.clone()],
                )),
            }
        }

        _ => {
            if facts.non_primer_nts() <= NONSPECIFIC_MAX_NON_PRIMER_NTS {
                Ok(Classification::new(
                    Category::NonspecificAmplification,
                    "unknown",
                    None,
                    facts.uncategorized_relevant_alignments(),
                ))
            } else {
                Ok(Classification::uncategorized(
                    facts.uncategorized_relevant_alignments(),
                ))
            }
        }
    }
}

fn side_subcategory(sides: &[crate::pecat::annotation::Side]) -> Result<String> {
    match sides {
        [side] => Ok(format!("{} pegRNA", side.label())),
        [_, _] => Ok("both pegRNAs".to_string()),
        _ => Err(format!("Unexpected pegRNA side count: {}", sides.len())),
    }
}
