//! Tuning constants of the outcome classifier.
//!
//! These values are empirical and carried over unchanged from the original
//! classifier; they are named here rather than inlined so that every branch
//! threshold has exactly one home.

/// A read no longer than the combined primer length plus this slack is
/// treated as a candidate primer dimer / nonspecific product.
pub const PRIMER_DIMER_LENGTH_SLACK: usize = 10;

/// Maximum number of non-primer bases for a short read to be called a
/// primer dimer rather than an unknown nonspecific product.
pub const PRIMER_DIMER_MAX_NON_PRIMER_NTS: usize = 2;

/// A read whose single interesting deletion leaves at most this many
/// non-primer bases is reclassified as a primer dimer.
pub const DELETION_PRIMER_DIMER_MAX_NON_PRIMER_NTS: usize = 10;

/// Maximum number of non-primer bases for an otherwise unexplained read to
/// be called nonspecific amplification instead of uncategorized.
pub const NONSPECIFIC_MAX_NON_PRIMER_NTS: usize = 50;

/// Indels no longer than this are candidates for the "uninteresting"
/// (background noise) partition.
pub const UNINTERESTING_INDEL_MAX_LEN: usize = 1;

/// An indel must be at least this far from the cut window to be
/// uninteresting.
pub const FAR_FROM_CUT_MIN_DISTANCE: i64 = 6;

/// Minimum pegRNA overlap-feature length required to emit draw-time anchors.
pub const ANCHOR_MIN_OVERLAP_LEN: i64 = 5;

/// Maximum uncovered read gap between consecutive alignments in a
/// duplication chain.
pub const MAX_JUNCTION_GAP: usize = 5;

/// Alignments below this mapping quality are ignored by the fact extractor.
pub const MIN_MAPQ: u8 = 10;
