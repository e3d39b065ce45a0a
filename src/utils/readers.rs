//! Opens SAM/BAM input and yields name-grouped alignment sets.
//!
//! The input is expected to be grouped by read name (aligner output order);
//! every record of a read must be adjacent. A name that reappears after its
//! group was closed is an input error.

use crate::pecat::alignment::Alignment;
use crate::pecat::cigar::revcomp;
use crate::pecat::read::SeqRead;
use crate::utils::Result;
use noodles::bam;
use noodles::sam;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::Header;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One read together with all of its reported alignments.
pub struct ReadGroup {
    pub read: SeqRead,
    pub alignments: Vec<Alignment>,
}

enum InnerReader {
    Sam(sam::io::Reader<BufReader<File>>),
    Bam(bam::io::Reader<noodles::bgzf::Reader<File>>),
}

impl InnerReader {
    fn read_record_buf(&mut self, header: &Header, record: &mut RecordBuf) -> Result<usize> {
        match self {
            InnerReader::Sam(reader) => reader.read_record_buf(header, record),
            InnerReader::Bam(reader) => reader.read_record_buf(header, record),
        }
        .map_err(|e| format!("Failed to read alignment record: {}", e))
    }
}

pub struct GroupedAlignmentReader {
    inner: InnerReader,
    header: Header,
    pending: Option<RecordBuf>,
    finished_names: HashSet<String>,
    done: bool,
}

impl GroupedAlignmentReader {
    pub fn from_path(path: &Path) -> Result<GroupedAlignmentReader> {
        let is_bam = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bam"));
        let file = File::open(path)
            .map_err(|e| format!("Failed to open alignments {}: {}", path.display(), e))?;

        let (inner, header) = if is_bam {
            let mut reader = bam::io::Reader::new(file);
            let header = reader
                .read_header()
                .map_err(|e| format!("Failed to read BAM header of {}: {}", path.display(), e))?;
            (InnerReader::Bam(reader), header)
        } else {
            let mut reader = sam::io::Reader::new(BufReader::new(file));
            let header = reader
                .read_header()
                .map_err(|e| format!("Failed to read SAM header of {}: {}", path.display(), e))?;
            (InnerReader::Sam(reader), header)
        };

        Ok(GroupedAlignmentReader {
            inner,
            header,
            pending: None,
            finished_names: HashSet::new(),
            done: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    fn read_next(&mut self) -> Result<Option<RecordBuf>> {
        let mut record = RecordBuf::default();
        match self.inner.read_record_buf(&self.header, &mut record)? {
            0 => Ok(None),
            _ => Ok(Some(record)),
        }
    }

    /// Next read with all of its records, or `None` at end of input.
    pub fn next_group(&mut self) -> Result<Option<ReadGroup>> {
        if self.done && self.pending.is_none() {
            return Ok(None);
        }

        let first = match self.pending.take() {
            Some(record) => record,
            None => match self.read_next()? {
                Some(record) => record,
                None => {
                    self.done = true;
                    return Ok(None);
                }
            },
        };

        let name = record_name(&first)?;
        if !self.finished_names.insert(name.clone()) {
            return Err(format!(
                "Input is not grouped by read name: '{}' reappeared",
                name
            ));
        }

        let mut records = vec![first];
        loop {
            match self.read_next()? {
                Some(record) => {
                    if record_name(&record)? == name {
                        records.push(record);
                    } else {
                        self.pending = Some(record);
                        break;
                    }
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        let read = build_read(&name, &records)?;
        let mut alignments = Vec::new();
        for record in &records {
            if let Some(al) = Alignment::from_record_buf(&self.header, record)? {
                alignments.push(al);
            }
        }

        Ok(Some(ReadGroup { read, alignments }))
    }
}

fn record_name(record: &RecordBuf) -> Result<String> {
    record
        .name()
        .map(|n| String::from_utf8_lossy(n.as_ref()).into_owned())
        .ok_or_else(|| "Alignment record without a read name".to_string())
}

/// Recovers the original read from the group's primary record, undoing the
/// aligner's reverse-complementing where needed.
fn build_read(name: &str, records: &[RecordBuf]) -> Result<SeqRead> {
    let primary = records
        .iter()
        .find(|r| {
            let flags = r.flags();
            !flags.is_secondary() && !flags.is_supplementary() && !r.sequence().is_empty()
        })
        .ok_or_else(|| format!("No primary record with a sequence for read '{}'", name))?;

    let mut bases = primary.sequence().as_ref().to_vec();
    let mut quals = primary.quality_scores().as_ref().to_vec();
    if quals.is_empty() {
        quals = vec![0; bases.len()];
    }
    if primary.flags().is_reverse_complemented() {
        bases = revcomp(&bases);
        quals.reverse();
    }
    Ok(SeqRead::new(name, bases, quals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sam(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".sam").tempfile().unwrap();
        writeln!(file, "@HD\tVN:1.6").unwrap();
        writeln!(file, "@SQ\tSN:amplicon\tLN:200").unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn groups_adjacent_records_by_name() {
        let seq = "ACGTACGTACGTACGTACGTA";
        let file = write_sam(&[
            &format!("r1\t0\tamplicon\t1\t60\t21M\t*\t0\t0\t{}\t*", seq),
            &format!("r1\t256\tamplicon\t51\t20\t21M\t*\t0\t0\t{}\t*", seq),
            &format!("r2\t0\tamplicon\t1\t60\t21M\t*\t0\t0\t{}\t*", seq),
        ]);

        let mut reader = GroupedAlignmentReader::from_path(file.path()).unwrap();
        let group = reader.next_group().unwrap().unwrap();
        assert_eq!(group.read.name, "r1");
        assert_eq!(group.read.len(), 21);
        assert_eq!(group.alignments.len(), 2);
        assert_eq!(group.alignments[0].ref_start, 0);
        assert_eq!(group.alignments[1].ref_start, 50);

        let group = reader.next_group().unwrap().unwrap();
        assert_eq!(group.read.name, "r2");
        assert!(reader.next_group().unwrap().is_none());
    }

    #[test]
    fn unmapped_read_yields_empty_alignment_set() {
        let seq = "ACGTACGTACGTACGTACGTA";
        let file = write_sam(&[&format!("r1\t4\t*\t0\t0\t*\t*\t0\t0\t{}\t*", seq)]);
        let mut reader = GroupedAlignmentReader::from_path(file.path()).unwrap();
        let group = reader.next_group().unwrap().unwrap();
        assert_eq!(group.read.name, "r1");
        assert!(group.alignments.is_empty());
    }

    #[test]
    fn reverse_complemented_primary_is_restored() {
        let file = write_sam(&["r1\t16\tamplicon\t1\t60\t4M\t*\t0\t0\tAACG\t*"]);
        let mut reader = GroupedAlignmentReader::from_path(file.path()).unwrap();
        let group = reader.next_group().unwrap().unwrap();
        assert_eq!(group.read.bases, b"CGTT".to_vec());
    }

    #[test]
    fn bam_input_is_read() {
        use noodles::core::Position;
        use noodles::sam::alignment::io::Write as _;
        use noodles::sam::alignment::record::cigar::op::{Kind, Op};
        use noodles::sam::alignment::record::Flags;
        use noodles::sam::alignment::record_buf::{Cigar, QualityScores, Sequence};
        use noodles::sam::header::record::value::map::ReferenceSequence;
        use noodles::sam::header::record::value::Map;
        use std::num::NonZeroUsize;

        let header = sam::Header::builder()
            .add_reference_sequence(
                "amplicon",
                Map::<ReferenceSequence>::new(NonZeroUsize::new(200).unwrap()),
            )
            .build();
        let record = RecordBuf::builder()
            .set_name("r1")
            .set_flags(Flags::empty())
            .set_reference_sequence_id(0)
            .set_alignment_start(Position::try_from(1).unwrap())
            .set_cigar(Cigar::from(vec![Op::new(Kind::Match, 4)]))
            .set_sequence(Sequence::from(b"AACG".to_vec()))
            .set_quality_scores(QualityScores::from(vec![30u8; 4]))
            .build();

        let file = tempfile::Builder::new().suffix(".bam").tempfile().unwrap();
        let mut writer = bam::io::Writer::new(file.reopen().unwrap());
        writer.write_header(&header).unwrap();
        writer.write_alignment_record(&header, &record).unwrap();
        writer.try_finish().unwrap();

        let mut reader = GroupedAlignmentReader::from_path(file.path()).unwrap();
        let group = reader.next_group().unwrap().unwrap();
        assert_eq!(group.read.name, "r1");
        assert_eq!(group.read.bases, b"AACG".to_vec());
        assert_eq!(group.alignments.len(), 1);
        assert_eq!(group.alignments[0].ref_start, 0);
        assert!(reader.next_group().unwrap().is_none());
    }

    #[test]
    fn reappearing_name_is_rejected() {
        let seq = "ACGTACGTACGTACGTACGTA";
        let file = write_sam(&[
            &format!("r1\t0\tamplicon\t1\t60\t21M\t*\t0\t0\t{}\t*", seq),
            &format!("r2\t0\tamplicon\t1\t60\t21M\t*\t0\t0\t{}\t*", seq),
            &format!("r1\t256\tamplicon\t51\t20\t21M\t*\t0\t0\t{}\t*", seq),
        ]);
        let mut reader = GroupedAlignmentReader::from_path(file.path()).unwrap();
        reader.next_group().unwrap();
        reader.next_group().unwrap();
        assert!(reader.next_group().is_err());
    }
}
