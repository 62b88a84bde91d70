//! Breakpoint evidence extraction.
//!
//! A structural variant joins two genomic positions, the breakpoints.
//! Read pairs supporting the variant have one read near each breakpoint.
//! Given a [`BreakpointPair`], [`extract`] finds such reads in an indexed BAM file and writes them to a new BAM file.
//!
//! For each breakpoint, the extractor queries a window of `half_window` bp on both sides of the position.
//! A record in the window is kept if its mate maps to the other breakpoint's reference within `half_window` bp of the other breakpoint (exclusive).
//! The breakpoints are processed in canonical order (by reference id and then by position), so the order of the pair does not affect the output.
//! The kept records are written sorted by reference id and position, so the output can be indexed even when the windows overlap.
//!
//! Chromosome names are resolved to reference ids with a [`ContigNamespace`].
//! Breakpoint positions are used directly as 0-based reference positions.

use crate::bam::{AlignmentRecord, BamWriter, RecordExt, RecordSink};
use crate::contig::ContigNamespace;
use crate::index;
use crate::region::ArchiveSession;
use crate::Error;

use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};


//-----------------------------------------------------------------------------

/// A pair of breakpoints with the genes they disrupt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakpointPair {
    /// Chromosome of the first breakpoint.
    pub chr1: String,
    /// Position of the first breakpoint.
    pub pos1: usize,
    /// Gene at the first breakpoint.
    pub gene1: String,
    /// Chromosome of the second breakpoint.
    pub chr2: String,
    /// Position of the second breakpoint.
    pub pos2: usize,
    /// Gene at the second breakpoint.
    pub gene2: String,
}

impl BreakpointPair {
    /// Creates a new breakpoint pair.
    pub fn new(chr1: &str, pos1: usize, gene1: &str, chr2: &str, pos2: usize, gene2: &str) -> Self {
        BreakpointPair {
            chr1: chr1.to_string(), pos1, gene1: gene1.to_string(),
            chr2: chr2.to_string(), pos2, gene2: gene2.to_string(),
        }
    }

    /// Returns the same pair with the breakpoints swapped.
    pub fn swapped(&self) -> Self {
        BreakpointPair {
            chr1: self.chr2.clone(), pos1: self.pos2, gene1: self.gene2.clone(),
            chr2: self.chr1.clone(), pos2: self.pos1, gene2: self.gene1.clone(),
        }
    }
}

impl Display for BreakpointPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}:{} ({}-{})", self.chr1, self.pos1, self.chr2, self.pos2, self.gene1, self.gene2)
    }
}

/// One breakpoint to query, with the other breakpoint as the partner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuerySide {
    pub reference_id: usize,
    pub position: usize,
    pub partner_reference_id: usize,
    pub partner_position: usize,
}

/// Resolves the chromosomes and returns the query sides in canonical order.
///
/// Returns [`Error::UnresolvedContig`] if a chromosome name cannot be resolved.
pub fn canonical_sides(pair: &BreakpointPair, namespace: &ContigNamespace) -> Result<[QuerySide; 2], Error> {
    let resolve = |name: &str| namespace.resolve(name).ok_or_else(|| Error::UnresolvedContig(name.to_string()));
    let mut first = (resolve(&pair.chr1)?, pair.pos1);
    let mut second = (resolve(&pair.chr2)?, pair.pos2);
    if first > second {
        std::mem::swap(&mut first, &mut second);
    }
    Ok([
        QuerySide { reference_id: first.0, position: first.1, partner_reference_id: second.0, partner_position: second.1 },
        QuerySide { reference_id: second.0, position: second.1, partner_reference_id: first.0, partner_position: first.1 },
    ])
}

//-----------------------------------------------------------------------------

/// Parameters for evidence extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionParams {
    /// Query window and mate tolerance on each side of a breakpoint.
    pub half_window: usize,
    /// For breakpoints on the same reference, also require this absolute template length.
    pub min_template_length: Option<usize>,
    /// Build an index for the output file.
    pub build_index: bool,
}

impl ExtractionParams {
    /// Default window half-width in bp.
    pub const HALF_WINDOW: usize = 500;

    /// Returns the query window around the position.
    pub fn window(&self, position: usize) -> (usize, usize) {
        (position.saturating_sub(self.half_window), position + self.half_window)
    }
}

impl Default for ExtractionParams {
    fn default() -> Self {
        ExtractionParams {
            half_window: Self::HALF_WINDOW,
            min_template_length: None,
            build_index: true,
        }
    }
}

/// Result of a successful extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Output BAM file.
    pub output: PathBuf,
    /// Number of records written.
    pub records: usize,
    /// An index was built for the output.
    pub indexed: bool,
}

/// Returns `true` if the mate of the record is near the partner breakpoint.
///
/// Records with missing or malformed mate fields are not concordant.
pub fn is_concordant(record: &AlignmentRecord, side: &QuerySide, params: &ExtractionParams) -> bool {
    if record.mate_reference_id().ok().flatten() != Some(side.partner_reference_id) {
        return false;
    }
    let mate = match record.mate_position().ok().flatten() {
        Some(pos) => pos as i64,
        None => return false,
    };
    let partner = side.partner_position as i64;
    let tolerance = params.half_window as i64;
    if mate <= partner - tolerance || mate >= partner + tolerance {
        return false;
    }
    if let Some(threshold) = params.min_template_length {
        if side.reference_id == side.partner_reference_id && (record.template_length().unsigned_abs() as usize) < threshold {
            return false;
        }
    }
    true
}

/// Returns the output file for the breakpoint pair.
///
/// The output is in the same directory as the archive, named `<sample>_<gene1>-<gene2>.bam`.
/// The sample is the prefix of the archive file name up to the first `_`.
pub fn output_path<P: AsRef<Path>>(archive: P, pair: &BreakpointPair) -> Result<PathBuf, Error> {
    let archive = archive.as_ref();
    let name = archive.file_name().ok_or_else(|| {
        Error::Configuration(format!("invalid archive name: {}", archive.display()))
    })?;
    let name = name.to_string_lossy();
    let sample = name.split('_').next().unwrap_or(&name);
    let filename = format!("{}_{}-{}.bam", sample, pair.gene1, pair.gene2);
    Ok(archive.with_file_name(filename))
}

//-----------------------------------------------------------------------------

/// Writes the records supporting the breakpoint pair to the sink.
///
/// The records from both windows are collected first and then written sorted by reference id and position.
/// Records with the same coordinates stay in the order they were found, first for the canonical first breakpoint and then for the second.
/// A record found in both windows is written once.
/// Returns the number of records written.
pub fn collect_evidence<S: RecordSink>(
    session: &mut ArchiveSession,
    pair: &BreakpointPair,
    namespace: &ContigNamespace,
    params: &ExtractionParams,
    sink: &mut S
) -> Result<usize, Error> {
    let sides = canonical_sides(pair, namespace)?;
    let references = session.header().reference_sequences().len();
    for name in [&pair.chr1, &pair.chr2] {
        if let Some(id) = namespace.resolve(name) {
            if id >= references {
                return Err(Error::UnknownReference(id));
            }
            namespace.check_header(session.header(), name, id);
        }
    }

    let path = session.path().to_path_buf();
    let mut seen: HashSet<_> = HashSet::new();
    let mut evidence: Vec<((usize, usize), AlignmentRecord)> = Vec::new();
    for side in sides.iter() {
        let (start, end) = params.window(side.position);
        let mut found = 0;
        let mut kept = 0;
        for record in session.query(side.reference_id, start, end)? {
            let record = record?;
            found += 1;
            if !is_concordant(&record, side, params) || !seen.insert(record.key()) {
                continue;
            }
            let position = record.position().map_err(|x| Error::io(x, &path))?.unwrap_or(start);
            evidence.push(((side.reference_id, position), record));
            kept += 1;
        }
        log::info!(
            "Reference {} window {}..{}: kept {} of {} records",
            side.reference_id, start, end, kept, found
        );
    }

    // Stable, so ties keep the order in which they were found.
    evidence.sort_by_key(|(key, _)| *key);
    for (_, record) in evidence.iter() {
        sink.write_record(record)?;
    }
    Ok(evidence.len())
}

fn failed(archive: &Path, pair: &BreakpointPair, stage: &'static str, source: Error) -> Error {
    Error::Extraction {
        archive: archive.to_path_buf(),
        breakpoints: pair.to_string(),
        stage,
        source: Box::new(source),
    }
}

/// Extracts the records supporting the breakpoint pair into a new BAM file.
///
/// See [`output_path`] for the name of the output file.
/// The output has the same header as the archive.
/// If there are no supporting records, the output is a valid BAM file without records.
/// If `params.build_index` is set, also writes `<output>.bai`; failing to build it only causes a warning.
///
/// # Errors
///
/// Returns [`Error::Extraction`] with the stage that failed.
/// No output file is left behind on failure.
pub fn extract<P: AsRef<Path>>(archive: P, pair: &BreakpointPair, params: &ExtractionParams) -> Result<ExtractionReport, Error> {
    let archive = archive.as_ref();
    log::info!("Extracting evidence for {} from {}", pair, archive.display());
    let namespace = ContigNamespace::default();
    let output = output_path(archive, pair).map_err(|x| failed(archive, pair, "output", x))?;
    canonical_sides(pair, &namespace).map_err(|x| failed(archive, pair, "resolve", x))?;
    let mut session = ArchiveSession::open(archive).map_err(|x| failed(archive, pair, "open", x))?;

    let mut writer = BamWriter::create(&output, session.header()).map_err(|x| failed(archive, pair, "create", x))?;
    let result = collect_evidence(&mut session, pair, &namespace, params, &mut writer).and_then(|records| {
        writer.close()?;
        Ok(records)
    });
    drop(writer);
    let records = match result {
        Ok(records) => records,
        Err(err) => {
            if let Err(x) = fs::remove_file(&output) {
                log::warn!("Cannot remove {}: {}", output.display(), x);
            }
            return Err(failed(archive, pair, "extract", err));
        },
    };
    log::info!("Wrote {} records to {}", records, output.display());

    let mut indexed = false;
    if params.build_index {
        let mut index_file = output.clone().into_os_string();
        index_file.push(".bai");
        match index::build_index(&output).and_then(|index| index.save(&index_file)) {
            Ok(()) => indexed = true,
            Err(err) => log::warn!("Cannot index {}: {}", output.display(), err),
        }
    }

    Ok(ExtractionReport { output, records, indexed })
}

//-----------------------------------------------------------------------------
