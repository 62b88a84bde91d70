//! BAI index for random access to coordinate-sorted BAM files.
//!
//! The index divides each reference sequence into a hierarchy of bins (the UCSC binning scheme).
//! Each alignment record is assigned to the smallest bin that contains it, and each bin stores a list of [`Chunk`]s: ranges of virtual positions in the BAM file containing the records in the bin.
//! The linear index stores the smallest virtual position of a record overlapping each 16 kbp window.
//! The file format and the binning scheme come from [`noodles`]; this module adapts them to the 0-based half-open coordinates used elsewhere in the crate.
//!
//! Given an interval, [`Index::chunks_for`] returns the chunks that may contain records overlapping the interval.
//! The result may contain records that do not overlap the interval, but it never misses an overlapping record.
//!
//! An index can be loaded from a `.bai` file with [`Index::load_from`] or built for a sorted BAM file with [`build_index`].
//! The index file for a BAM file is found with [`locate_index`].

use crate::bam::{BamReader, RecordExt, VirtualPosition};
use crate::{utils, Error};

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use noodles::bam::bai;
use noodles::core::Position;
use noodles::core::region::Interval;
use noodles::csi::binning_index::index::reference_sequence::index::LinearIndex;
use noodles::csi::binning_index::{Indexer, ReferenceSequence as _};
use noodles::csi::BinningIndex;

pub use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;


//-----------------------------------------------------------------------------

/// The binning scheme covers 0-based positions below this.
pub const MAX_POSITION: usize = 1 << 29;

/// Reference metadata stored in the index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReferenceStats {
    /// Virtual position of the first record on the reference.
    pub begin: VirtualPosition,
    /// Virtual position after the last record on the reference.
    pub end: VirtualPosition,
    /// Number of mapped records.
    pub mapped: u64,
    /// Number of unmapped records placed on the reference.
    pub unmapped: u64,
}

//-----------------------------------------------------------------------------

/// A BAI index.
///
/// # Examples
///
/// ```no_run
/// use sv_evidence::{BamReader, Index};
/// use sv_evidence::index;
///
/// let index_file = index::locate_index("sample.bam").unwrap();
/// let index = Index::load_from(&index_file).unwrap();
///
/// // Chunks for records overlapping chromosome 1 (reference id 0) at 999..2001.
/// let chunks = index.chunks_for(0, 999, 2001).unwrap();
/// let mut reader = BamReader::open("sample.bam").unwrap();
/// for chunk in chunks {
///     reader.seek(chunk.start()).unwrap();
///     // Read records until the virtual position reaches `chunk.end()`.
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Index {
    inner: bai::Index,
}

impl Index {
    /// Decodes an index from the contents of a `.bai` file.
    pub fn load(bytes: &[u8]) -> Result<Self, Error> {
        Self::load_with_path(bytes, Path::new("<index>"))
    }

    /// Loads the index from a `.bai` file.
    pub fn load_from<P: AsRef<Path>>(filename: P) -> Result<Self, Error> {
        let bytes = fs::read(&filename).map_err(|x| Error::cannot_open(x, &filename))?;
        Self::load_with_path(&bytes, filename.as_ref())
    }

    fn load_with_path(bytes: &[u8], path: &Path) -> Result<Self, Error> {
        let mut reader = bai::io::Reader::new(bytes);
        let inner = reader.read_index().map_err(|x| Error::io(x, path))?;
        let index = Index { inner };
        log::debug!("Loaded index {} with {} references", path.display(), index.references());
        Ok(index)
    }

    /// Writes the index in the BAI format.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let mut writer = bai::io::Writer::new(writer);
        writer.write_index(&self.inner).map_err(|x| Error::io(x, "<index>"))
    }

    /// Writes the index to a `.bai` file.
    ///
    /// The index is first written to `<filename>.tmp` and then renamed.
    /// On failure, the temporary file is removed and an existing file at `filename` is left as it was.
    pub fn save<P: AsRef<Path>>(&self, filename: P) -> Result<(), Error> {
        let filename = filename.as_ref();
        let mut temp_file = filename.as_os_str().to_os_string();
        temp_file.push(".tmp");
        let temp_file = PathBuf::from(temp_file);

        let result = self.save_as(&temp_file).and_then(|_| {
            fs::rename(&temp_file, filename).map_err(|x| Error::io(x, filename))
        });
        if result.is_err() {
            let _ = fs::remove_file(&temp_file);
        }
        result
    }

    fn save_as(&self, filename: &Path) -> Result<(), Error> {
        let file = File::create(filename).map_err(|x| Error::cannot_open(x, filename))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush().map_err(|x| Error::io(x, filename))
    }

    /// Returns the number of references in the index.
    pub fn references(&self) -> usize {
        self.inner.reference_sequences().len()
    }

    /// Returns the metadata for the reference, if present.
    pub fn reference_stats(&self, reference_id: usize) -> Option<ReferenceStats> {
        let metadata = self.inner.reference_sequences().get(reference_id)?.metadata()?;
        Some(ReferenceStats {
            begin: metadata.start_position(),
            end: metadata.end_position(),
            mapped: metadata.mapped_record_count(),
            unmapped: metadata.unmapped_record_count(),
        })
    }

    /// Returns the number of unmapped records without a position, if present.
    pub fn unplaced_unmapped(&self) -> Option<u64> {
        self.inner.unplaced_unmapped_record_count()
    }

    /// Returns the chunks that may contain records overlapping the 0-based half-open interval `[start, end)` on the reference.
    ///
    /// The chunks are sorted and disjoint.
    /// Returns an empty list for an empty interval and an error if the reference does not exist in the index.
    /// Positions at or beyond [`MAX_POSITION`] cannot be indexed and are ignored.
    pub fn chunks_for(&self, reference_id: usize, start: usize, end: usize) -> Result<Vec<Chunk>, Error> {
        if reference_id >= self.references() {
            return Err(Error::UnknownReference(reference_id));
        }
        let end = end.min(MAX_POSITION);
        if start >= end {
            return Ok(Vec::new());
        }

        // 1-based closed interval.
        let first = Position::new(start + 1).ok_or_else(|| Error::Decode(format!("invalid start {}", start)))?;
        let last = Position::new(end).ok_or_else(|| Error::Decode(format!("invalid end {}", end)))?;
        let chunks = self.inner.query(reference_id, Interval::from(first..=last)).map_err(|x| {
            Error::Decode(format!("reference {} interval {}..{}: {}", reference_id, start, end, x))
        })?;
        log::debug!("Reference {} interval {}..{}: {} chunks", reference_id, start, end, chunks.len());
        Ok(chunks)
    }
}

impl From<bai::Index> for Index {
    fn from(inner: bai::Index) -> Self {
        Index { inner }
    }
}

//-----------------------------------------------------------------------------

/// Building the index.
impl Index {
    /// Builds an index for the remaining records in the reader.
    ///
    /// The reader should be positioned at the first record.
    /// Returns an error if the records are not sorted by coordinate.
    pub fn build<R: Read>(reader: &mut BamReader<R>) -> Result<Self, Error> {
        let references = reader.header().reference_sequences().len();
        let mut indexer = Indexer::<LinearIndex>::default();
        let mut unplaced = 0;
        loop {
            let begin = reader.virtual_position();
            let record = match reader.read_record()? {
                Some(record) => record,
                None => break,
            };
            let end = reader.virtual_position();

            let context = Self::alignment_context(&record).map_err(|x| Error::io(x, reader.path()))?;
            if let Some((reference_id, _, _, _)) = context {
                if unplaced > 0 {
                    return Err(Error::Decode(format!("{}: records with a reference after unplaced records", reader.path().display())));
                }
                if reference_id >= references {
                    return Err(Error::Decode(format!("{}: unknown reference id {}", reader.path().display(), reference_id)));
                }
            } else {
                unplaced += 1;
            }
            indexer.add_record(context, Chunk::new(begin, end)).map_err(|x| {
                Error::Decode(format!("{}: {}", reader.path().display(), x))
            })?;
        }
        Ok(Index { inner: indexer.build(references) })
    }

    // Reference id, 1-based closed interval, and mapping status for a placed record.
    fn alignment_context(record: &crate::AlignmentRecord) -> std::io::Result<Option<(usize, Position, Position, bool)>> {
        let reference_id = record.reference_id()?;
        let start = record.alignment_start().transpose()?;
        let end = record.reference_end()?.and_then(Position::new);
        match (reference_id, start, end) {
            (Some(id), Some(start), Some(end)) => Ok(Some((id, start, end, !record.flags().is_unmapped()))),
            _ => Ok(None),
        }
    }
}

//-----------------------------------------------------------------------------

/// Returns the index file for the BAM file.
///
/// Tries `<archive>.bai` first and then the archive path with its extension replaced by `bai`.
/// Returns [`Error::Configuration`] if neither exists.
pub fn locate_index<P: AsRef<Path>>(archive: P) -> Result<PathBuf, Error> {
    let archive = archive.as_ref();
    let mut appended = archive.as_os_str().to_os_string();
    appended.push(".bai");
    let appended = PathBuf::from(appended);
    if utils::file_exists(&appended) {
        return Ok(appended);
    }
    if archive.extension().is_some() {
        let replaced = archive.with_extension("bai");
        if utils::file_exists(&replaced) {
            return Ok(replaced);
        }
    }
    Err(Error::Configuration(format!("index not found for {}", archive.display())))
}

/// Builds an index for a coordinate-sorted BAM file.
pub fn build_index<P: AsRef<Path>>(archive: P) -> Result<Index, Error> {
    log::info!("Building index for {}", archive.as_ref().display());
    let mut reader = BamReader::open(&archive)?;
    Index::build(&mut reader)
}

//-----------------------------------------------------------------------------
