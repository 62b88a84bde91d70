//! Breakpoint database: structural variants by sample in a SQLite database.
//!
//! Each row in table `sv_mutation` is a breakpoint pair found in a sample.
//! Table `Tags` stores the database version and some statistics.
//! The database is created from a tab-separated file with [`SvDatabase::create_from_tsv`] and queried by sample accession with [`SvDatabase::breakpoints_for_sample`].

use crate::evidence::BreakpointPair;
use crate::{utils, Error};

use std::io::BufRead;
use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Statement};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A breakpoint pair found in a sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SvMutation {
    /// Sample accession.
    pub sample: String,
    /// The breakpoints.
    pub pair: BreakpointPair,
}

impl SvMutation {
    /// Number of columns in the tab-separated format.
    pub const COLUMNS: usize = 7;

    /// Parses a tab-separated line `sample chrom1 bp1 gene1 chrom2 bp2 gene2`.
    pub fn from_tsv(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != Self::COLUMNS {
            return Err(format!("Expected {} fields, found {}", Self::COLUMNS, fields.len()));
        }
        if fields.iter().any(|field| field.is_empty()) {
            return Err(String::from("Empty field"));
        }
        let position = |field: &str| field.parse::<usize>().map_err(|_| format!("Invalid breakpoint position: {}", field));
        Ok(SvMutation {
            sample: fields[0].to_string(),
            pair: BreakpointPair::new(fields[1], position(fields[2])?, fields[3], fields[4], position(fields[5])?, fields[6]),
        })
    }
}

/// Reads breakpoint pairs from a tab-separated file.
///
/// Empty lines and lines starting with `#` are skipped.
pub fn read_tsv<R: BufRead>(reader: R) -> Result<Vec<SvMutation>, Error> {
    let mut result = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|x| Error::io(x, "<breakpoints>"))?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mutation = SvMutation::from_tsv(line).map_err(|x| {
            Error::Decode(format!("line {}: {}", line_num + 1, x))
        })?;
        result.push(mutation);
    }
    Ok(result)
}

//-----------------------------------------------------------------------------

/// A database connection to a breakpoint database.
///
/// # Examples
///
/// ```
/// use sv_evidence::{BreakpointPair, SvDatabase};
/// use sv_evidence::db::SvMutation;
///
/// let dir = tempfile::tempdir().unwrap();
/// let db_file = dir.path().join("breakpoints.db");
/// let rows = vec![
///     SvMutation { sample: String::from("S1"), pair: BreakpointPair::new("2", 42522000, "EML4", "2", 29446000, "ALK") },
/// ];
/// SvDatabase::create(&rows, &db_file).unwrap();
///
/// let database = SvDatabase::open(&db_file).unwrap();
/// assert_eq!(database.samples(), 1);
/// let pairs = database.breakpoints_for_sample("S1").unwrap();
/// assert_eq!(pairs, vec![rows[0].pair.clone()]);
/// ```
#[derive(Debug)]
pub struct SvDatabase {
    connection: Connection,
    version: String,
    samples: usize,
    breakpoints: usize,
}

/// Using the database.
impl SvDatabase {
    // Key for database version.
    const KEY_VERSION: &'static str = "version";

    /// Current database version.
    pub const VERSION: &'static str = "SV-evidence breakpoints v1";

    // Key for sample count.
    const KEY_SAMPLES: &'static str = "samples";

    // Key for breakpoint pair count.
    const KEY_BREAKPOINTS: &'static str = "breakpoints";

    /// Opens a read-only connection to the database in the given file.
    ///
    /// Returns [`Error::Configuration`] if the file does not exist or if the version is not supported.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self, Error> {
        if !utils::file_exists(&filename) {
            return Err(Error::Configuration(format!("Database {} does not exist", filename.as_ref().display())));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(&filename, flags)?;

        let mut get_tag = connection.prepare(
            "SELECT value FROM Tags WHERE key = ?1"
        )?;
        let version = get_string_value(&mut get_tag, Self::KEY_VERSION)?;
        if version != Self::VERSION {
            return Err(Error::Configuration(format!("Unsupported database version: {} (expected {})", version, Self::VERSION)));
        }
        let samples = get_numeric_value(&mut get_tag, Self::KEY_SAMPLES)?;
        let breakpoints = get_numeric_value(&mut get_tag, Self::KEY_BREAKPOINTS)?;
        drop(get_tag);

        Ok(SvDatabase { connection, version, samples, breakpoints })
    }

    /// Returns the filename of the database.
    pub fn filename(&self) -> Option<&str> {
        self.connection.path()
    }

    /// Returns the size of the database file in a human-readable format.
    pub fn file_size(&self) -> Option<String> {
        let filename = self.filename()?;
        utils::file_size(filename)
    }

    /// Returns the version of the database.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the number of distinct samples.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Returns the number of breakpoint pairs.
    pub fn breakpoints(&self) -> usize {
        self.breakpoints
    }

    /// Returns the breakpoint pairs for the sample in insertion order.
    ///
    /// Returns an empty list if the sample is not in the database.
    pub fn breakpoints_for_sample(&self, sample: &str) -> Result<Vec<BreakpointPair>, Error> {
        let mut get_pairs = self.connection.prepare(
            "SELECT chrom1, bp1, gene1, chrom2, bp2, gene2 FROM sv_mutation WHERE sample_id = ?1 ORDER BY id"
        )?;
        let mut rows = get_pairs.query((sample,))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let chr1: String = row.get(0)?;
            let bp1: i64 = row.get(1)?;
            let gene1: String = row.get(2)?;
            let chr2: String = row.get(3)?;
            let bp2: i64 = row.get(4)?;
            let gene2: String = row.get(5)?;
            let position = |value: i64| usize::try_from(value).map_err(|_| {
                Error::Decode(format!("Invalid breakpoint position for sample {}: {}", sample, value))
            });
            result.push(BreakpointPair::new(&chr1, position(bp1)?, &gene1, &chr2, position(bp2)?, &gene2));
        }
        log::debug!("Found {} breakpoint pairs for sample {}", result.len(), sample);
        Ok(result)
    }

    /// Returns `true` if the sample is in the database.
    pub fn contains_sample(&self, sample: &str) -> Result<bool, Error> {
        let mut get_row = self.connection.prepare(
            "SELECT id FROM sv_mutation WHERE sample_id = ?1 LIMIT 1"
        )?;
        let row: Option<i64> = get_row.query_row((sample,), |row| row.get(0)).optional()?;
        Ok(row.is_some())
    }
}

//-----------------------------------------------------------------------------

/// Creating the database.
impl SvDatabase {
    /// Creates a new database from a tab-separated file, which may be gzip-compressed.
    ///
    /// See [`read_tsv`] for the format.
    pub fn create_from_tsv<P: AsRef<Path>, Q: AsRef<Path>>(tsv_file: P, db_file: Q) -> Result<(), Error> {
        log::info!("Reading breakpoints from {}", tsv_file.as_ref().display());
        let reader = utils::open_file(&tsv_file)?;
        let rows = read_tsv(reader).map_err(|x| match x {
            Error::Decode(message) => Error::Decode(format!("{}: {}", tsv_file.as_ref().display(), message)),
            x => x,
        })?;
        Self::create(&rows, db_file)
    }

    /// Creates a new database with the given rows.
    ///
    /// Returns [`Error::Configuration`] if the database already exists.
    pub fn create<P: AsRef<Path>>(rows: &[SvMutation], filename: P) -> Result<(), Error> {
        log::info!("Creating database {}", filename.as_ref().display());
        if utils::file_exists(&filename) {
            return Err(Error::Configuration(format!("Database {} already exists", filename.as_ref().display())));
        }

        let mut connection = Connection::open(&filename)?;
        Self::insert_tags(rows, &mut connection)?;
        Self::insert_mutations(rows, &mut connection)?;
        Ok(())
    }

    fn insert_tags(rows: &[SvMutation], connection: &mut Connection) -> rusqlite::Result<()> {
        connection.execute(
            "CREATE TABLE Tags (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            ) STRICT",
            (),
        )?;

        let mut samples: Vec<&str> = rows.iter().map(|row| row.sample.as_str()).collect();
        samples.sort_unstable();
        samples.dedup();

        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO Tags(key, value) VALUES (?1, ?2)"
            )?;
            insert.execute((Self::KEY_VERSION, Self::VERSION))?;
            insert.execute((Self::KEY_SAMPLES, samples.len().to_string()))?;
            insert.execute((Self::KEY_BREAKPOINTS, rows.len().to_string()))?;
        }
        transaction.commit()
    }

    fn insert_mutations(rows: &[SvMutation], connection: &mut Connection) -> rusqlite::Result<()> {
        log::info!("Inserting {} breakpoint pairs", rows.len());
        connection.execute(
            "CREATE TABLE sv_mutation (
                id INTEGER PRIMARY KEY,
                sample_id TEXT NOT NULL,
                chrom1 TEXT NOT NULL,
                bp1 INTEGER NOT NULL,
                gene1 TEXT NOT NULL,
                chrom2 TEXT NOT NULL,
                bp2 INTEGER NOT NULL,
                gene2 TEXT NOT NULL
            ) STRICT",
            (),
        )?;

        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO sv_mutation(sample_id, chrom1, bp1, gene1, chrom2, bp2, gene2)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            )?;
            for row in rows.iter() {
                let pair = &row.pair;
                insert.execute((
                    &row.sample,
                    &pair.chr1, pair.pos1 as i64, &pair.gene1,
                    &pair.chr2, pair.pos2 as i64, &pair.gene2,
                ))?;
            }
        }
        transaction.commit()?;

        connection.execute(
            "CREATE INDEX sample_index ON sv_mutation(sample_id)",
            (),
        )?;
        Ok(())
    }
}

//-----------------------------------------------------------------------------

// Executes the statement, which is expected to return a single string value.
fn get_string_value(statement: &mut Statement, key: &str) -> Result<String, Error> {
    let result: Option<String> = statement.query_row((key,), |row| row.get(0)).optional()?;
    result.ok_or(Error::Configuration(format!("Key not found: {}", key)))
}

// Executes the statement, which is expected to return a single string value.
// Then returns the value as an integer.
fn get_numeric_value(statement: &mut Statement, key: &str) -> Result<usize, Error> {
    let value = get_string_value(statement, key)?;
    value.parse::<usize>().map_err(|x| Error::Decode(format!("Invalid numeric value for key {}: {}", key, x)))
}

//-----------------------------------------------------------------------------
