use crate::cli::ClassifyArgs;
use crate::pecat::annotation::TargetAnnotation;
use crate::pecat::classifier::{Classification, ReadClassifier};
use crate::pecat::writers::TableWriter;
use crate::utils::{GroupedAlignmentReader, ReadGroup, Result};
use crossbeam_channel::bounded;
use rayon::{
    iter::{ParallelBridge, ParallelIterator},
    ThreadPoolBuilder,
};
use std::{collections::BTreeMap, sync::Arc, thread};

/// Per-(category, subcategory) tallies accumulated by the writer stage,
/// keyed by taxonomy report order.
struct Summary {
    counts: BTreeMap<(usize, String, String), usize>,
    n_written: usize,
    n_failed: usize,
}

pub fn classify(args: ClassifyArgs) -> Result<()> {
    let annotation = Arc::new(TargetAnnotation::from_json_file(&args.annotation_path)?);
    log::info!(
        "Loaded annotation for target '{}' ({} bp)",
        annotation.target(),
        annotation
            .sequence(annotation.target())
            .map(|s| s.len())
            .unwrap_or(0)
    );

    let mut reader = GroupedAlignmentReader::from_path(&args.alignments_path)?;
    let table_writer = TableWriter::new(&args.output_path)?;

    // Stage 1 -> 2: read groups in input order
    let (group_sender, group_receiver) = bounded(args.group_channel_buffer_size);
    // Stage 2 -> 3: calls for the writer
    let (result_sender, result_receiver) =
        bounded::<(usize, String, Result<Classification>)>(args.result_channel_buffer_size);

    // Stage 1: stream read groups off the input (IO: read SAM/BAM)
    let reader_thread = thread::spawn(move || -> Result<usize> {
        let mut n_groups = 0usize;
        while let Some(group) = reader.next_group()? {
            if group_sender.send((n_groups, group)).is_err() {
                break;
            }
            n_groups += 1;
        }
        Ok(n_groups)
    });

    // Stage 3: writer thread restores input order and tallies the summary
    // (IO: write TSV)
    let writer_thread = thread::spawn(move || -> Result<Summary> {
        let mut table_writer = table_writer;
        let mut buffered: BTreeMap<usize, (String, Result<Classification>)> = BTreeMap::new();
        let mut next_seq_no = 0usize;
        let mut summary = Summary {
            counts: BTreeMap::new(),
            n_written: 0,
            n_failed: 0,
        };
        for (seq_no, name, call) in &result_receiver {
            buffered.insert(seq_no, (name, call));
            while let Some((name, call)) = buffered.remove(&next_seq_no) {
                next_seq_no += 1;
                match call {
                    Ok(call) => {
                        table_writer.write(&name, &call)?;
                        summary.n_written += 1;
                        let key = (
                            call.category.order_index(),
                            call.category.to_string(),
                            call.subcategory,
                        );
                        *summary.counts.entry(key).or_insert(0) += 1;
                    }
                    Err(e) => {
                        log::error!("Read '{}': {}", name, e);
                        summary.n_failed += 1;
                    }
                }
            }
        }
        table_writer.finish()?;
        Ok(summary)
    });

    // Stage 2: worker pool for classifying reads
    let pool = ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))?;
    let worker_annotation = annotation.clone();
    pool.install(|| {
        group_receiver
            .into_iter()
            .par_bridge()
            .for_each_with(result_sender, |sender, (seq_no, group)| {
                let name = group.read.name.clone();
                let call = classify_group(group, &worker_annotation);
                let _ = sender.send((seq_no, name, call));
            });
    });

    log::debug!("Classification complete. Shutting down pipeline threads...");

    let summary = match writer_thread.join() {
        Ok(result) => result?,
        Err(_) => return Err("Writer thread panicked".to_string()),
    };
    let n_groups = match reader_thread.join() {
        Ok(result) => result?,
        Err(_) => return Err("Reader thread panicked".to_string()),
    };

    log::info!("Processed {} reads", n_groups);
    if summary.n_failed > 0 {
        log::warn!("Failed to classify {} reads", summary.n_failed);
    }
    for ((_, category, subcategory), n) in &summary.counts {
        log::info!("{:>8}  {} / {}", n, category, subcategory);
    }
    log::debug!("Wrote {} rows to {}", summary.n_written, args.output_path.display());

    Ok(())
}

fn classify_group(group: ReadGroup, annotation: &TargetAnnotation) -> Result<Classification> {
    let ReadGroup { read, alignments } = group;
    let mut classifier = ReadClassifier::new(&read, annotation, alignments);
    classifier.classify()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pecat::test_fixtures::raw_annotation;
    use std::fs::File;
    use std::io::{Read, Write};

    #[test]
    fn classifies_sam_input_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let annotation_path = dir.path().join("annotation.json");
        let raw = raw_annotation(None);
        serde_json::to_writer(File::create(&annotation_path).unwrap(), &raw).unwrap();

        let target = raw.sequences["amplicon"].clone();
        let alignments_path = dir.path().join("reads.sam");
        let mut sam = File::create(&alignments_path).unwrap();
        writeln!(sam, "@HD\tVN:1.6").unwrap();
        for (name, len) in [("amplicon", 200), ("peg-L", 60), ("peg-R", 60), ("hg19_chr1", 120)] {
            writeln!(sam, "@SQ\tSN:{}\tLN:{}", name, len).unwrap();
        }
        writeln!(sam, "r1\t0\tamplicon\t1\t60\t200M\t*\t0\t0\t{}\t*", target).unwrap();
        writeln!(sam, "r2\t0\tamplicon\t1\t60\t21M\t*\t0\t0\t{}\t*", &target[..21]).unwrap();
        drop(sam);

        let output_path = dir.path().join("calls.tsv");
        let args = ClassifyArgs {
            alignments_path,
            annotation_path,
            output_path: output_path.clone(),
            num_threads: 2,
            group_channel_buffer_size: 8,
            result_channel_buffer_size: 8,
        };
        classify(args).unwrap();

        let mut contents = String::new();
        File::open(&output_path).unwrap().read_to_string(&mut contents).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "read\tcategory\tsubcategory\tdetails\tn_alignments");
        assert!(lines[1].starts_with("r1\twild type\tclean\tn/a"));
        assert!(lines[2].starts_with("r2\tnonspecific amplification\tprimer dimer\tn/a"));
    }
}
