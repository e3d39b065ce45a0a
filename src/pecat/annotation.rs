//! Reference annotation for one editing experiment.
//!
//! The classifier sees the annotation only through this narrow read-only
//! interface: feature lookup, SNV tables, anchor, declared intended edit,
//! primer geometry and the registered organisms. Loaded once per batch and
//! shared across workers.

use crate::pecat::alignment::{Indel, Strand};
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read side a pegRNA anneals to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn label(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named half-open interval on a reference sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub ref_name: String,
    pub name: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
}

impl Feature {
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    pub fn interval(&self) -> (i64, i64) {
        (self.start, self.end)
    }

    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Strand-aware offset of a reference position into the feature, or
    /// `None` if the position lies outside it.
    pub fn offset_of(&self, pos: i64) -> Option<i64> {
        if !self.contains(pos) {
            return None;
        }
        match self.strand {
            Strand::Forward => Some(pos - self.start),
            Strand::Reverse => Some(self.end - 1 - pos),
        }
    }

    /// Reference position for a strand-aware feature offset.
    pub fn position_at(&self, offset: i64) -> Option<i64> {
        if offset < 0 || offset >= self.len() {
            return None;
        }
        match self.strand {
            Strand::Forward => Some(self.start + offset),
            Strand::Reverse => Some(self.end - 1 - offset),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidePair {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntendedDeletion {
    pub start: i64,
    pub length: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CutWindow {
    pub start: i64,
    pub end: i64,
}

/// On-disk annotation shape (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAnnotation {
    /// Name of the target amplicon reference.
    pub target: String,
    /// Anchor position on the target used to normalize reported coordinates.
    pub anchor: i64,
    /// Reference sequences by name (target, pegRNAs, nonspecific candidates).
    pub sequences: HashMap<String, String>,
    /// pegRNA reference names by the read side they anneal to.
    pub pegrnas: SidePair,
    /// Named feature intervals (primers, protospacers, PAMs, extension,
    /// overlap, ...).
    pub features: Vec<Feature>,
    /// Registered SNV positions per reference sequence.
    #[serde(default)]
    pub snvs: HashMap<String, Vec<i64>>,
    /// Declared intended deletion, if the programmed edit is a deletion.
    #[serde(default)]
    pub intended_deletion: Option<IntendedDeletion>,
    /// Names of the two primer features on the target, read-start side first.
    pub primers: [String; 2],
    /// Expected edit window on the target (around the nick/cut sites).
    pub cut_window: CutWindow,
    /// Organisms whose genomes are registered as nonspecific-amplification
    /// candidates; reference names are `<organism>_<contig>`.
    #[serde(default)]
    pub organisms: Vec<String>,
}

/// Validated, indexed annotation.
pub struct TargetAnnotation {
    target: String,
    anchor: i64,
    sequences: HashMap<String, Vec<u8>>,
    pegrnas: SidePair,
    features: HashMap<(String, String), Feature>,
    snvs: HashMap<String, BTreeSet<i64>>,
    intended_deletion: Option<Indel>,
    primers: [String; 2],
    cut_window: (i64, i64),
    organisms: Vec<String>,
}

impl TargetAnnotation {
    pub fn from_json_file(path: &Path) -> Result<TargetAnnotation> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open annotation {}: {}", path.display(), e))?;
        let raw: RawAnnotation = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| format!("Failed to parse annotation {}: {}", path.display(), e))?;
        TargetAnnotation::new(raw)
    }

    pub fn new(raw: RawAnnotation) -> Result<TargetAnnotation> {
        let sequences: HashMap<String, Vec<u8>> = raw
            .sequences
            .into_iter()
            .map(|(name, seq)| (name, seq.to_ascii_uppercase().into_bytes()))
            .collect();

        let seq_len = |name: &str| sequences.get(name).map(|s| s.len() as i64);

        let target_len = seq_len(&raw.target)
            .ok_or_else(|| format!("No sequence registered for target '{}'", raw.target))?;
        for side in Side::BOTH {
            let name = match side {
                Side::Left => &raw.pegrnas.left,
                Side::Right => &raw.pegrnas.right,
            };
            if seq_len(name).is_none() {
                return Err(format!("No sequence registered for {} pegRNA '{}'", side, name));
            }
        }

        let mut features = HashMap::new();
        for feature in raw.features {
            let len = seq_len(&feature.ref_name).ok_or_else(|| {
                format!(
                    "Feature '{}' refers to unknown reference '{}'",
                    feature.name, feature.ref_name
                )
            })?;
            if feature.start < 0 || feature.end > len || feature.is_empty() {
                return Err(format!(
                    "Feature '{}' on '{}' has invalid interval {}..{} (sequence length {})",
                    feature.name, feature.ref_name, feature.start, feature.end, len
                ));
            }
            let key = (feature.ref_name.clone(), feature.name.clone());
            if features.insert(key, feature.clone()).is_some() {
                return Err(format!(
                    "Duplicate feature '{}' on '{}'",
                    feature.name, feature.ref_name
                ));
            }
        }

        for name in &raw.primers {
            if !features.contains_key(&(raw.target.clone(), name.clone())) {
                return Err(format!("Primer feature '{}' not found on target", name));
            }
        }

        let mut snvs = HashMap::new();
        for (ref_name, positions) in raw.snvs {
            let len = seq_len(&ref_name)
                .ok_or_else(|| format!("SNV table refers to unknown reference '{}'", ref_name))?;
            for &p in &positions {
                if p < 0 || p >= len {
                    return Err(format!(
                        "SNV position {} out of range for '{}' (length {})",
                        p, ref_name, len
                    ));
                }
            }
            snvs.insert(ref_name, positions.into_iter().collect());
        }

        if raw.cut_window.start >= raw.cut_window.end
            || raw.cut_window.start < 0
            || raw.cut_window.end > target_len
        {
            return Err(format!(
                "Invalid cut window {}..{} on target of length {}",
                raw.cut_window.start, raw.cut_window.end, target_len
            ));
        }

        let intended_deletion = match raw.intended_deletion {
            Some(d) => {
                if d.start < 0 || d.start + d.length as i64 > target_len {
                    return Err(format!(
                        "Intended deletion {}+{} out of range for target of length {}",
                        d.start, d.length, target_len
                    ));
                }
                Some(Indel::deletion(d.start, d.length))
            }
            None => None,
        };

        if raw.anchor < 0 || raw.anchor >= target_len {
            return Err(format!(
                "Anchor {} out of range for target of length {}",
                raw.anchor, target_len
            ));
        }

        Ok(TargetAnnotation {
            target: raw.target,
            anchor: raw.anchor,
            sequences,
            pegrnas: raw.pegrnas,
            features,
            snvs,
            intended_deletion,
            primers: raw.primers,
            cut_window: (raw.cut_window.start, raw.cut_window.end),
            organisms: raw.organisms,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn anchor(&self) -> i64 {
        self.anchor
    }

    pub fn cut_window(&self) -> (i64, i64) {
        self.cut_window
    }

    pub fn intended_deletion(&self) -> Option<&Indel> {
        self.intended_deletion.as_ref()
    }

    pub fn sequence(&self, ref_name: &str) -> Option<&[u8]> {
        self.sequences.get(ref_name).map(|s| s.as_slice())
    }

    pub fn feature(&self, ref_name: &str, name: &str) -> Option<&Feature> {
        self.features.get(&(ref_name.to_string(), name.to_string()))
    }

    pub fn snv_positions(&self, ref_name: &str) -> Option<&BTreeSet<i64>> {
        self.snvs.get(ref_name)
    }

    pub fn pegrna_name(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.pegrnas.left,
            Side::Right => &self.pegrnas.right,
        }
    }

    pub fn side_of_pegrna(&self, ref_name: &str) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|&side| self.pegrna_name(side) == ref_name)
    }

    pub fn is_target(&self, ref_name: &str) -> bool {
        self.target == ref_name
    }

    pub fn is_pegrna(&self, ref_name: &str) -> bool {
        self.side_of_pegrna(ref_name).is_some()
    }

    /// Strand in which a pegRNA alignment is expected if the edit was
    /// incorporated: the left-side pegRNA reads back toward the read start.
    pub fn expected_strand(&self, side: Side) -> Strand {
        match side {
            Side::Left => Strand::Reverse,
            Side::Right => Strand::Forward,
        }
    }

    pub fn primer_features(&self) -> [&Feature; 2] {
        // Presence checked at construction.
        [
            &self.features[&(self.target.clone(), self.primers[0].clone())],
            &self.features[&(self.target.clone(), self.primers[1].clone())],
        ]
    }

    /// Primer feature at the read-start side of the amplicon.
    pub fn read_side_primer(&self) -> &Feature {
        self.primer_features()[0]
    }

    pub fn combined_primer_length(&self) -> usize {
        self.primer_features().iter().map(|f| f.len() as usize).sum()
    }

    pub fn organisms(&self) -> &[String] {
        &self.organisms
    }

    /// Organism a reference name belongs to, if it was registered as a
    /// nonspecific-amplification candidate (`<organism>_<contig>`).
    pub fn organism_of(&self, ref_name: &str) -> Option<&str> {
        self.organisms
            .iter()
            .find(|org| {
                ref_name == org.as_str()
                    || (ref_name.starts_with(org.as_str())
                        && ref_name.as_bytes().get(org.len()) == Some(&b'_'))
            })
            .map(|org| org.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pecat::test_fixtures;

    #[test]
    fn feature_offsets_are_strand_aware() {
        let fwd = Feature {
            ref_name: "r".into(),
            name: "f".into(),
            start: 10,
            end: 20,
            strand: Strand::Forward,
        };
        assert_eq!(fwd.offset_of(10), Some(0));
        assert_eq!(fwd.offset_of(19), Some(9));
        assert_eq!(fwd.offset_of(20), None);
        assert_eq!(fwd.position_at(3), Some(13));

        let rev = Feature { strand: Strand::Reverse, ..fwd };
        assert_eq!(rev.offset_of(19), Some(0));
        assert_eq!(rev.offset_of(10), Some(9));
        assert_eq!(rev.position_at(0), Some(19));
    }

    #[test]
    fn organism_lookup_requires_separator() {
        let annotation = test_fixtures::annotation(None);
        assert_eq!(annotation.organism_of("hg19_chr1"), Some("hg19"));
        assert_eq!(annotation.organism_of("hg19x_chr1"), None);
        assert_eq!(annotation.organism_of("amplicon"), None);
    }

    #[test]
    fn rejects_out_of_bounds_feature() {
        let mut raw = test_fixtures::raw_annotation(None);
        raw.features.push(Feature {
            ref_name: "amplicon".into(),
            name: "bogus".into(),
            start: 150,
            end: 5000,
            strand: Strand::Forward,
        });
        assert!(TargetAnnotation::new(raw).is_err());
    }

    #[test]
    fn rejects_unknown_primer() {
        let mut raw = test_fixtures::raw_annotation(None);
        raw.primers[0] = "missing".into();
        assert!(TargetAnnotation::new(raw).is_err());
    }
}
