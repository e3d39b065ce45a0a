//! Writes per-read calls to a tab-separated table.

use crate::pecat::classifier::Classification;
use crate::utils::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Structure for writing one classification row per read.
pub struct TableWriter {
    writer: BufWriter<File>,
}

impl TableWriter {
    pub fn new(output_path: &Path) -> Result<TableWriter> {
        let file = File::create(output_path)
            .map_err(|e| format!("Failed to create {}: {}", output_path.display(), e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "read\tcategory\tsubcategory\tdetails\tn_alignments")
            .map_err(|e| e.to_string())?;
        Ok(TableWriter { writer })
    }

    pub fn write(&mut self, read_name: &str, call: &Classification) -> Result<()> {
        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}\t{}",
            read_name,
            call.category,
            call.subcategory,
            call.details,
            call.relevant_alignments.len()
        )
        .map_err(|e| format!("Failed to write row for {}: {}", read_name, e))
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pecat::outcome::Outcome;
    use crate::pecat::taxonomy::Category;
    use std::io::Read;

    #[test]
    fn rows_are_tab_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.tsv");
        let mut writer = TableWriter::new(&path).unwrap();
        let call = Classification {
            category: Category::WildType,
            subcategory: "clean".to_string(),
            details: "n/a".to_string(),
            outcome: Some(Outcome::NotApplicable),
            relevant_alignments: Vec::new(),
        };
        writer.write("read1", &call).unwrap();
        writer.finish().unwrap();

        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(
            contents,
            "read\tcategory\tsubcategory\tdetails\tn_alignments\nread1\twild type\tclean\tn/a\t0\n"
        );
    }
}
