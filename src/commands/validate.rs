use crate::cli::ValidateArgs;
use crate::pecat::annotation::TargetAnnotation;
use crate::pecat::annotation::Side;
use crate::utils::Result;

/// Loads the annotation, failing on any structural problem, and reports
/// what it declares.
pub fn validate(args: ValidateArgs) -> Result<()> {
    let annotation = TargetAnnotation::from_json_file(&args.annotation_path)?;

    let target_len = annotation
        .sequence(annotation.target())
        .map(|s| s.len())
        .unwrap_or(0);
    log::info!("Target '{}' ({} bp)", annotation.target(), target_len);
    for side in Side::BOTH {
        let pegrna = annotation.pegrna_name(side);
        let has_overlap = annotation.feature(pegrna, "overlap").is_some();
        let has_extension = annotation.feature(pegrna, "extension").is_some();
        log::info!(
            "{} pegRNA '{}' (extension: {}, overlap: {})",
            side,
            pegrna,
            has_extension,
            has_overlap
        );
    }
    let (cut_start, cut_end) = annotation.cut_window();
    log::info!("Cut window {}..{}, anchor {}", cut_start, cut_end, annotation.anchor());
    match annotation.intended_deletion() {
        Some(del) => log::info!("Intended deletion at {} ({} bp)", del.ref_start, del.len),
        None => log::info!("No intended deletion declared"),
    }
    if annotation.organisms().is_empty() {
        log::info!("No nonspecific-amplification organisms registered");
    } else {
        log::info!("Registered organisms: {}", annotation.organisms().join(", "));
    }

    log::info!("Annotation is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pecat::test_fixtures::raw_annotation;
    use std::fs::File;

    #[test]
    fn accepts_a_well_formed_annotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotation.json");
        serde_json::to_writer(File::create(&path).unwrap(), &raw_annotation(None)).unwrap();
        validate(ValidateArgs { annotation_path: path }).unwrap();
    }

    #[test]
    fn rejects_a_broken_annotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotation.json");
        let mut raw = raw_annotation(None);
        raw.primers[0] = "missing".to_string();
        serde_json::to_writer(File::create(&path).unwrap(), &raw).unwrap();
        assert!(validate(ValidateArgs { annotation_path: path }).is_err());
    }
}
