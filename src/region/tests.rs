use super::*;

use crate::internal;
use crate::bam::RecordExt;

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

//-----------------------------------------------------------------------------

fn open_session(archive: &Path) -> ArchiveSession {
    let session = ArchiveSession::open(archive);
    assert!(session.is_ok(), "Failed to open {}: {}", archive.display(), session.err().unwrap());
    session.unwrap()
}

fn query_names(session: &mut ArchiveSession, reference_id: usize, start: usize, end: usize) -> Vec<String> {
    let iter = session.query(reference_id, start, end);
    assert!(iter.is_ok(), "Failed to query {}:{}-{}: {}", reference_id, start, end, iter.err().unwrap());
    let records: Result<Vec<AlignmentRecord>, Error> = iter.unwrap().collect();
    assert!(records.is_ok(), "Failed to read records in {}:{}-{}: {}", reference_id, start, end, records.unwrap_err());
    internal::record_names(&records.unwrap())
}

// Reads of length 100 at the given 1-based positions on reference `1`, and a few on `2`.
fn fixture_records(header: &Header) -> Vec<AlignmentRecord> {
    let mut records = Vec::new();
    for (i, pos) in [100, 500, 901, 950, 1001, 1500, 20_000].iter().enumerate() {
        records.push(internal::paired_record(header, &format!("one{}", i), "1", *pos, "2", 5000));
    }
    // A long alignment spanning many windows.
    records.push(internal::parse_record(&internal::paired_line("long", "1", 5000, 40_000, "=", 60_000), header));
    for (i, pos) in [10, 1000].iter().enumerate() {
        records.push(internal::paired_record(header, &format!("two{}", i), "2", *pos, "1", 100));
    }
    records.push(internal::parse_record("unplaced\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t*", header));
    internal::sort_records(&mut records);
    records
}

//-----------------------------------------------------------------------------

#[test]
fn overlapping_records() {
    let dir = tempfile::tempdir().unwrap();
    let header = internal::numbered_header();
    let archive = internal::write_indexed_bam(dir.path(), "fixture.bam", &header, &fixture_records(&header));
    let mut session = open_session(&archive);
    assert_eq!(session.header(), &header, "Wrong header");
    assert_eq!(session.path(), archive.as_path(), "Wrong path");
    assert_eq!(session.index().references(), 2, "Wrong number of references in the index");

    // Reads are [pos - 1, pos + 99) in 0-based coordinates.
    assert_eq!(query_names(&mut session, 0, 999, 1001), vec!["one2", "one3", "one4"], "Wrong records around 1000");
    assert_eq!(query_names(&mut session, 0, 0, 100), vec!["one0"], "Wrong records at the start");
    assert_eq!(query_names(&mut session, 0, 199, 499), Vec::<String>::new(), "Found records in a gap");
    assert_eq!(query_names(&mut session, 0, 30_000, 30_001), vec!["long"], "Long alignment should overlap the interval");
    assert_eq!(query_names(&mut session, 0, 19_000, 20_000), vec!["long", "one6"], "Wrong records around 20000");
    assert_eq!(query_names(&mut session, 1, 0, 1_000_000), vec!["two0", "two1"], "Wrong records on the second reference");
    assert_eq!(query_names(&mut session, 1, 500, 500), Vec::<String>::new(), "Found records in an empty interval");

    // The session can be reused.
    assert_eq!(query_names(&mut session, 0, 999, 1001), vec!["one2", "one3", "one4"], "Wrong records in a repeated query");
}

#[test]
fn unknown_reference() {
    let dir = tempfile::tempdir().unwrap();
    let header = internal::numbered_header();
    let archive = internal::write_indexed_bam(dir.path(), "fixture.bam", &header, &fixture_records(&header));
    let mut session = open_session(&archive);
    let result = session.query(2, 0, 1000);
    assert!(matches!(result, Err(Error::UnknownReference(2))), "Query on an unknown reference should fail");
}

#[test]
fn missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let header = internal::numbered_header();

    // Without an index, the session fails before the archive is opened.
    let missing = dir.path().join("missing.bam");
    match ArchiveSession::open(&missing) {
        Err(Error::Configuration(message)) => assert!(message.contains("index not found"), "Wrong error message: {}", message),
        other => panic!("Expected a missing index error, got {:?}", other.map(|_| ())),
    }

    let archive = dir.path().join("unindexed.bam");
    internal::write_bam(&archive, &header, &fixture_records(&header));
    let result = ArchiveSession::open(&archive);
    assert!(matches!(result, Err(Error::Configuration(_))), "Unindexed archive should be a configuration error");
    let result = view_region(&archive, 0, 0, 1000, &mut Vec::new());
    assert!(matches!(result, Err(Error::Configuration(_))), "Viewing an unindexed archive should be a configuration error");
}

#[test]
fn random_queries() {
    let dir = tempfile::tempdir().unwrap();
    let header = internal::numbered_header();
    let mut rng = StdRng::seed_from_u64(0x5E55);
    let mut records: Vec<AlignmentRecord> = (0..3000).map(|i| {
        let reference = if rng.gen_bool(0.5) { "1" } else { "2" };
        let pos = rng.gen_range(1..200_000);
        let len = if rng.gen_bool(0.9) { rng.gen_range(1..300) } else { rng.gen_range(1000..50_000) };
        internal::parse_record(&internal::paired_line(&format!("r{}", i), reference, pos, len, "=", pos), &header)
    }).collect();
    internal::sort_records(&mut records);
    let archive = internal::write_indexed_bam(dir.path(), "random.bam", &header, &records);
    let mut session = open_session(&archive);

    for _ in 0..200 {
        let reference_id = rng.gen_range(0..2);
        let start = rng.gen_range(0..250_000);
        let end = start + rng.gen_range(1..3000);
        let truth: Vec<String> = internal::record_names(&records.iter().filter(|record| {
            record.reference_id().unwrap() == Some(reference_id) &&
                record.position().unwrap().unwrap() < end && record.reference_end().unwrap().unwrap() > start
        }).cloned().collect::<Vec<_>>());
        let found = query_names(&mut session, reference_id, start, end);
        let unique: BTreeSet<&String> = found.iter().collect();
        assert_eq!(unique.len(), found.len(), "Duplicate records in {}:{}-{}", reference_id, start, end);
        assert_eq!(found, truth, "Wrong records in {}:{}-{}", reference_id, start, end);
    }
}

//-----------------------------------------------------------------------------

#[test]
fn text_view() {
    let dir = tempfile::tempdir().unwrap();
    let header = internal::numbered_header();
    let records = fixture_records(&header);
    let archive = internal::write_indexed_bam(dir.path(), "fixture.bam", &header, &records);

    let mut output = Vec::new();
    let result = view_region(&archive, 0, 999, 1001, &mut output);
    assert!(result.is_ok(), "Failed to view the region: {}", result.unwrap_err());
    assert_eq!(result.unwrap(), 3, "Wrong number of records");

    let wanted = ["one2", "one3", "one4"];
    let mut expected = SamSink::new(Vec::new(), &header);
    for record in records.iter() {
        let name = record.name().map(|name| name.to_vec()).unwrap_or_default();
        if wanted.iter().any(|x| x.as_bytes() == name.as_slice()) {
            expected.write_record(record).unwrap();
        }
    }
    let expected = String::from_utf8(expected.into_inner().unwrap()).unwrap();
    let output = String::from_utf8(output).unwrap();
    assert_eq!(output.lines().count(), 3, "Wrong number of SAM lines");
    assert!(output.starts_with("one2\t1\t1\t901\t60\t100M\t2\t5000\t"), "Wrong first SAM line: {}", output);
    assert_eq!(output, expected, "Wrong SAM output");
}

#[test]
fn region_strings() {
    let header = internal::test_header(&[("chr1", 1000), ("chr2", 2000), ("HLA:1", 500)]);
    let cases = [
        ("chr1", (0, 0, 1000)),
        ("chr2:101-200", (1, 100, 200)),
        ("chr2:1,001-1,500", (1, 1000, 1500)),
        ("chr2:1500", (1, 1499, 2000)),
        ("1", (1, 0, 2000)),
        ("0:1-10", (0, 0, 10)),
        ("HLA:1", (2, 0, 500)),
        ("HLA:1:11-20", (2, 10, 20)),
    ];
    for (region, truth) in cases {
        let result = parse_region(region, &header);
        assert!(result.is_ok(), "Failed to parse region {}: {}", region, result.unwrap_err());
        assert_eq!(result.unwrap(), truth, "Wrong interval for region {}", region);
    }

    for region in ["chr3", "chr1:0-10", "chr1:20-10", "chr1:a-b", "chr1:"] {
        assert!(parse_region(region, &header).is_err(), "Accepted invalid region {}", region);
    }
    assert!(matches!(parse_region("5", &header), Err(Error::UnknownReference(5))), "Accepted an invalid reference id");
}

//-----------------------------------------------------------------------------
