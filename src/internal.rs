use crate::bam::RecordExt;
use crate::{AlignmentRecord, BamReader, BamWriter, Header, Index};

use std::path::{Path, PathBuf};

use noodles::bam;
use noodles::sam;
use noodles::sam::alignment::io::Write as _;

//-----------------------------------------------------------------------------

// Headers and records.

// SAM header text for a coordinate-sorted file.
pub(crate) fn header_text(references: &[(&str, usize)]) -> String {
    let mut text = String::from("@HD\tVN:1.6\tSO:coordinate\n");
    for (name, len) in references.iter() {
        text.push_str(&format!("@SQ\tSN:{}\tLN:{}\n", name, len));
    }
    text
}

pub(crate) fn test_header(references: &[(&str, usize)]) -> Header {
    let text = header_text(references);
    let header = text.parse::<Header>();
    assert!(header.is_ok(), "Failed to parse header {}: {}", text, header.unwrap_err());
    header.unwrap()
}

// Two references named as in the breakpoint database.
pub(crate) fn numbered_header() -> Header {
    test_header(&[("1", 1_000_000), ("2", 1_000_000)])
}

// Parses the SAM line and encodes it as a BAM record.
pub(crate) fn parse_record(line: &str, header: &Header) -> AlignmentRecord {
    let sam_record = sam::Record::try_from(line.as_bytes());
    assert!(sam_record.is_ok(), "Failed to parse SAM line {}: {}", line, sam_record.unwrap_err());
    let sam_record = sam_record.unwrap();

    let mut writer = bam::io::Writer::from(Vec::new());
    let result = writer.write_alignment_record(header, &sam_record);
    assert!(result.is_ok(), "Failed to encode SAM line {}: {}", line, result.unwrap_err());
    let bytes = writer.into_inner();

    let mut reader = bam::io::Reader::from(&bytes[..]);
    let mut record = AlignmentRecord::default();
    let result = reader.read_record(&mut record);
    assert!(result.is_ok(), "Failed to decode SAM line {}: {}", line, result.unwrap_err());
    record
}

// A paired read with a mate. Positions are 1-based as in SAM.
pub(crate) fn paired_line(name: &str, reference: &str, pos: usize, len: usize, mate_reference: &str, mate_pos: usize) -> String {
    format!("{}\t1\t{}\t{}\t60\t{}M\t{}\t{}\t0\t*\t*", name, reference, pos, len, mate_reference, mate_pos)
}

pub(crate) fn paired_record(header: &Header, name: &str, reference: &str, pos: usize, mate_reference: &str, mate_pos: usize) -> AlignmentRecord {
    parse_record(&paired_line(name, reference, pos, 100, mate_reference, mate_pos), header)
}

// Sorts the records by coordinate. Records without a reference go last.
pub(crate) fn sort_records(records: &mut [AlignmentRecord]) {
    records.sort_by_key(|record| {
        let reference_id = record.reference_id().ok().flatten().unwrap_or(usize::MAX);
        let position = record.position().ok().flatten().unwrap_or(0);
        (reference_id, position)
    });
}

pub(crate) fn record_names(records: &[AlignmentRecord]) -> Vec<String> {
    records.iter().map(|record| {
        record.name().map(|name| String::from_utf8_lossy(name).into_owned()).unwrap_or_default()
    }).collect()
}

pub(crate) fn record_positions(records: &[AlignmentRecord]) -> Vec<usize> {
    records.iter().map(|record| {
        let position = record.position();
        assert!(position.is_ok(), "Invalid position: {}", position.unwrap_err());
        position.unwrap().unwrap_or(usize::MAX)
    }).collect()
}

//-----------------------------------------------------------------------------

// BAM files.

pub(crate) fn write_bam(filename: &Path, header: &Header, records: &[AlignmentRecord]) {
    let writer = BamWriter::create(filename, header);
    assert!(writer.is_ok(), "Failed to create {}: {}", filename.display(), writer.err().unwrap());
    let mut writer = writer.unwrap();
    for record in records.iter() {
        let result = writer.write_record(record);
        assert!(result.is_ok(), "Failed to write a record: {}", result.unwrap_err());
    }
    let result = writer.close();
    assert!(result.is_ok(), "Failed to close {}: {}", filename.display(), result.unwrap_err());
}

pub(crate) fn index_file(filename: &Path) -> PathBuf {
    let mut index_file = filename.to_path_buf().into_os_string();
    index_file.push(".bai");
    PathBuf::from(index_file)
}

// Temporary file used while saving an index.
pub(crate) fn temp_file(filename: &Path) -> PathBuf {
    let mut temp_file = filename.to_path_buf().into_os_string();
    temp_file.push(".tmp");
    PathBuf::from(temp_file)
}

pub(crate) fn index_bam(filename: &Path) -> Index {
    let index = crate::index::build_index(filename);
    assert!(index.is_ok(), "Failed to index {}: {}", filename.display(), index.unwrap_err());
    index.unwrap()
}

// Writes the records to `dir/name` and saves the index as `dir/name.bai`.
pub(crate) fn write_indexed_bam(dir: &Path, name: &str, header: &Header, records: &[AlignmentRecord]) -> PathBuf {
    let filename = dir.join(name);
    write_bam(&filename, header, records);
    let index = index_bam(&filename);
    let result = index.save(index_file(&filename));
    assert!(result.is_ok(), "Failed to save the index: {}", result.unwrap_err());
    filename
}

pub(crate) fn read_bam(filename: &Path) -> (Header, Vec<AlignmentRecord>) {
    let reader = BamReader::open(filename);
    assert!(reader.is_ok(), "Failed to open {}: {}", filename.display(), reader.err().unwrap());
    let mut reader = reader.unwrap();
    let records: Result<Vec<AlignmentRecord>, _> = reader.records().collect();
    assert!(records.is_ok(), "Failed to read {}: {}", filename.display(), records.unwrap_err());
    (reader.header().clone(), records.unwrap())
}

//-----------------------------------------------------------------------------
