//! The fixed outcome taxonomy.
//!
//! `(category, subcategory)` pairs form a closed, ordered two-level
//! vocabulary that downstream reporting treats as a schema; the classifier
//! must never emit a pair outside it. Organism-keyed subcategories are
//! validated against the annotation's registered organisms.

use crate::utils::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    WildType,
    IntendedEdit,
    UnintendedRtAnnealing,
    FlippedPegRnaIncorporation,
    Deletion,
    Duplication,
    Insertion,
    ExtensionFromIntendedAnnealing,
    GenomicInsertion,
    Uncategorized,
    NonspecificAmplification,
}

/// Report order of the taxonomy.
pub const CATEGORY_ORDER: [Category; 11] = [
    Category::WildType,
    Category::IntendedEdit,
    Category::UnintendedRtAnnealing,
    Category::FlippedPegRnaIncorporation,
    Category::Deletion,
    Category::Duplication,
    Category::Insertion,
    Category::ExtensionFromIntendedAnnealing,
    Category::GenomicInsertion,
    Category::Uncategorized,
    Category::NonspecificAmplification,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::WildType => "wild type",
            Category::IntendedEdit => "intended edit",
            Category::UnintendedRtAnnealing => "unintended annealing of RT'ed sequence",
            Category::FlippedPegRnaIncorporation => "flipped pegRNA incorporation",
            Category::Deletion => "deletion",
            Category::Duplication => "duplication",
            Category::Insertion => "insertion",
            Category::ExtensionFromIntendedAnnealing => "extension from intended annealing",
            Category::GenomicInsertion => "genomic insertion",
            Category::Uncategorized => "uncategorized",
            Category::NonspecificAmplification => "nonspecific amplification",
        }
    }

    /// Fixed (non-organism) subcategories declared for the category.
    pub fn fixed_subcategories(&self) -> &'static [&'static str] {
        match self {
            Category::WildType => &["clean", "mismatches", "short indel far from cut"],
            Category::IntendedEdit => &["replacement", "partial replacement", "deletion"],
            Category::UnintendedRtAnnealing | Category::FlippedPegRnaIncorporation => {
                &["left pegRNA", "right pegRNA", "both pegRNAs"]
            }
            Category::Deletion => &["clean", "mismatches", "multiple"],
            Category::Duplication => &["simple", "iterated", "complex"],
            Category::Insertion => &["clean", "mismatches"],
            Category::ExtensionFromIntendedAnnealing => &["n/a"],
            Category::GenomicInsertion => &[],
            Category::Uncategorized => &["uncategorized"],
            Category::NonspecificAmplification => &["primer dimer", "unknown"],
        }
    }

    /// Whether the category additionally admits registered organism names as
    /// subcategories.
    pub fn takes_organism(&self) -> bool {
        matches!(
            self,
            Category::GenomicInsertion | Category::NonspecificAmplification
        )
    }

    /// Position in the report order.
    pub fn order_index(&self) -> usize {
        CATEGORY_ORDER.iter().position(|c| c == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verifies that `(category, subcategory)` is a declared taxonomy member.
pub fn check_pair(category: Category, subcategory: &str, organisms: &[String]) -> Result<()> {
    if category.fixed_subcategories().contains(&subcategory) {
        return Ok(());
    }
    if category.takes_organism() && organisms.iter().any(|o| o == subcategory) {
        return Ok(());
    }
    Err(format!(
        "Undeclared taxonomy pair: ({}, {})",
        category, subcategory
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fixed_pair_is_declared() {
        for category in CATEGORY_ORDER {
            for sub in category.fixed_subcategories() {
                check_pair(category, sub, &[]).unwrap();
            }
        }
    }

    #[test]
    fn organism_pairs_require_registration() {
        let organisms = vec!["hg19".to_string()];
        check_pair(Category::NonspecificAmplification, "hg19", &organisms).unwrap();
        assert!(check_pair(Category::NonspecificAmplification, "bosTau7", &organisms).is_err());
        assert!(check_pair(Category::WildType, "hg19", &organisms).is_err());
    }

    #[test]
    fn order_is_total() {
        for (i, category) in CATEGORY_ORDER.iter().enumerate() {
            assert_eq!(category.order_index(), i);
        }
    }
}
