use super::*;

use std::io::Write;
use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;

//-----------------------------------------------------------------------------

const TSV: &str = "# sample\tchrom1\tbp1\tgene1\tchrom2\tbp2\tgene2
S1\t2\t42522000\tEML4\t2\t29446000\tALK
S2\t9\t133729000\tABL1\t22\t23632000\tBCR

S1\t10\t43609000\tRET\t10\t51582000\tNCOA4
S3\tX\t100\tGENE1\tMT\t200\tGENE2
";

fn create_database(dir: &Path, rows: &[SvMutation]) -> PathBuf {
    let db_file = dir.join("breakpoints.db");
    let result = SvDatabase::create(rows, &db_file);
    assert!(result.is_ok(), "Failed to create database: {}", result.unwrap_err());
    db_file
}

fn open_database(filename: &Path) -> SvDatabase {
    let database = SvDatabase::open(filename);
    assert!(database.is_ok(), "Failed to open database: {}", database.unwrap_err());
    database.unwrap()
}

fn pairs_for_sample(database: &SvDatabase, sample: &str) -> Vec<BreakpointPair> {
    let pairs = database.breakpoints_for_sample(sample);
    assert!(pairs.is_ok(), "Failed to get breakpoints for sample {}: {}", sample, pairs.unwrap_err());
    pairs.unwrap()
}

fn parse_rows() -> Vec<SvMutation> {
    let rows = read_tsv(TSV.as_bytes());
    assert!(rows.is_ok(), "Failed to parse breakpoints: {}", rows.unwrap_err());
    rows.unwrap()
}

//-----------------------------------------------------------------------------

#[test]
fn tsv_parsing() {
    let rows = parse_rows();
    assert_eq!(rows.len(), 4, "Wrong number of rows");
    assert_eq!(rows[0].sample, "S1");
    assert_eq!(rows[0].pair, BreakpointPair::new("2", 42522000, "EML4", "2", 29446000, "ALK"));
    assert_eq!(rows[3].pair, BreakpointPair::new("X", 100, "GENE1", "MT", 200, "GENE2"));

    let invalid = [
        "S1\t2\t42522000\tEML4\t2\t29446000",
        "S1\t2\t-5\tEML4\t2\t29446000\tALK",
        "S1\t2\t42522000\tEML4\t2\tabc\tALK",
        "S1\t\t42522000\tEML4\t2\t29446000\tALK",
    ];
    for line in invalid {
        let result = read_tsv(line.as_bytes());
        assert!(matches!(result, Err(Error::Decode(_))), "Accepted invalid line {}", line);
    }
}

#[test]
fn create_and_query() {
    let dir = tempfile::tempdir().unwrap();
    let rows = parse_rows();
    let db_file = create_database(dir.path(), &rows);
    let database = open_database(&db_file);
    assert_eq!(database.version(), SvDatabase::VERSION, "Wrong version");
    assert_eq!(database.samples(), 3, "Wrong number of samples");
    assert_eq!(database.breakpoints(), 4, "Wrong number of breakpoints");
    assert!(database.filename().is_some(), "Missing filename");
    assert!(database.file_size().is_some(), "Missing file size");

    // Rows for one sample only, in insertion order.
    let truth: Vec<BreakpointPair> = rows.iter().filter(|row| row.sample == "S1").map(|row| row.pair.clone()).collect();
    assert_eq!(pairs_for_sample(&database, "S1"), truth, "Wrong breakpoints for S1");
    assert_eq!(pairs_for_sample(&database, "S2"), vec![rows[1].pair.clone()], "Wrong breakpoints for S2");
    assert!(pairs_for_sample(&database, "S4").is_empty(), "Found breakpoints for a missing sample");

    assert_eq!(database.contains_sample("S3").unwrap(), true, "Sample S3 should be in the database");
    assert_eq!(database.contains_sample("S4").unwrap(), false, "Sample S4 should not be in the database");
}

#[test]
fn create_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let rows = parse_rows();

    let tsv_file = dir.path().join("breakpoints.tsv");
    std::fs::write(&tsv_file, TSV).unwrap();
    let db_file = dir.path().join("plain.db");
    let result = SvDatabase::create_from_tsv(&tsv_file, &db_file);
    assert!(result.is_ok(), "Failed to create database from a plain file: {}", result.unwrap_err());
    assert_eq!(pairs_for_sample(&open_database(&db_file), "S1").len(), 2, "Wrong breakpoints from a plain file");

    let gz_file = dir.path().join("breakpoints.tsv.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&gz_file).unwrap(), Compression::default());
    encoder.write_all(TSV.as_bytes()).unwrap();
    encoder.finish().unwrap();
    let db_file = dir.path().join("compressed.db");
    let result = SvDatabase::create_from_tsv(&gz_file, &db_file);
    assert!(result.is_ok(), "Failed to create database from a compressed file: {}", result.unwrap_err());
    let database = open_database(&db_file);
    assert_eq!(database.breakpoints(), rows.len(), "Wrong breakpoints from a compressed file");

    let invalid_file = dir.path().join("invalid.tsv");
    std::fs::write(&invalid_file, "S1\t1\t2\n").unwrap();
    let result = SvDatabase::create_from_tsv(&invalid_file, dir.path().join("invalid.db"));
    assert!(matches!(result, Err(Error::Decode(_))), "Created a database from an invalid file");
}

#[test]
fn existing_and_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let rows = parse_rows();
    let db_file = create_database(dir.path(), &rows);
    let result = SvDatabase::create(&rows, &db_file);
    assert!(matches!(result, Err(Error::Configuration(_))), "Overwrote an existing database");

    let result = SvDatabase::open(dir.path().join("missing.db"));
    assert!(matches!(result, Err(Error::Configuration(_))), "Opened a missing database");
}

#[test]
fn unsupported_version() {
    let dir = tempfile::tempdir().unwrap();
    let db_file = create_database(dir.path(), &parse_rows());
    {
        let connection = Connection::open(&db_file).unwrap();
        connection.execute("UPDATE Tags SET value = ?1 WHERE key = ?2", ("SV-evidence breakpoints v0", "version")).unwrap();
    }
    let result = SvDatabase::open(&db_file);
    assert!(matches!(result, Err(Error::Configuration(_))), "Opened a database with an unsupported version");
}

//-----------------------------------------------------------------------------
