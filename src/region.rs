//! Region queries over indexed BAM files.
//!
//! An [`ArchiveSession`] owns a BAM reader and the corresponding index.
//! [`ArchiveSession::query`] returns a [`RegionIter`] over the records overlapping an interval on a reference sequence.
//! [`view_region`] prints the records in a region as SAM lines.
//!
//! All coordinates are 0-based and intervals are half-open, except in the region strings accepted by [`parse_region`].

use crate::bam::{self, AlignmentRecord, BamReader, Header, RecordExt, RecordSink};
use crate::formats::SamSink;
use crate::index::{self, Chunk, Index};
use crate::Error;

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A BAM file opened for region queries.
///
/// The session owns the reader and the index, and only one [`RegionIter`] can use the reader at a time.
///
/// # Examples
///
/// ```no_run
/// use sv_evidence::ArchiveSession;
///
/// let mut session = ArchiveSession::open("sample.bam").unwrap();
/// for record in session.query(0, 999, 2001).unwrap() {
///     let record = record.unwrap();
///     println!("{:?} at {:?}", record.name(), record.alignment_start());
/// }
/// ```
pub struct ArchiveSession {
    reader: BamReader<BufReader<File>>,
    index: Index,
    path: PathBuf,
}

impl ArchiveSession {
    /// Opens the BAM file and loads its index.
    ///
    /// The index is located before the BAM file is opened.
    /// Returns [`Error::Configuration`] if the index or the BAM file is missing.
    pub fn open<P: AsRef<Path>>(archive: P) -> Result<Self, Error> {
        let archive = archive.as_ref();
        let index_file = index::locate_index(archive)?;
        let reader = BamReader::open(archive)?;
        let index = Index::load_from(&index_file)?;
        let references = reader.header().reference_sequences().len();
        if index.references() != references {
            log::warn!(
                "Index {} has {} references but {} has {}",
                index_file.display(), index.references(), archive.display(), references
            );
        }
        log::info!("Opened {} with index {}", archive.display(), index_file.display());
        Ok(ArchiveSession { reader, index, path: archive.to_path_buf() })
    }

    /// Returns the header of the BAM file.
    pub fn header(&self) -> &Header {
        self.reader.header()
    }

    /// Returns the index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Returns the path of the BAM file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns an iterator over the records overlapping `[start, end)` on the reference.
    ///
    /// Returns [`Error::UnknownReference`] if the reference is not in the header or in the index.
    pub fn query(&mut self, reference_id: usize, start: usize, end: usize) -> Result<RegionIter<'_>, Error> {
        if reference_id >= self.header().reference_sequences().len() {
            return Err(Error::UnknownReference(reference_id));
        }
        let chunks = self.index.chunks_for(reference_id, start, end)?;
        Ok(RegionIter {
            reader: &mut self.reader,
            chunks,
            reference_id, start, end,
            chunk: 0,
            active: false,
            finished: false,
        })
    }
}

//-----------------------------------------------------------------------------

/// An iterator over the records overlapping an interval.
///
/// The iterator reads the chunks returned by the index in order.
/// Records on other references and records ending before the interval are skipped.
/// Because the file is sorted, the iteration stops at the first record starting after the interval.
/// Each overlapping record is returned once.
/// The iterator stops after the first error.
pub struct RegionIter<'a> {
    reader: &'a mut BamReader<BufReader<File>>,
    chunks: Vec<Chunk>,
    reference_id: usize,
    start: usize,
    end: usize,
    // Current chunk.
    chunk: usize,
    // The reader is positioned within the current chunk.
    active: bool,
    finished: bool,
}

impl<'a> RegionIter<'a> {
    /// Returns the chunks the iterator reads.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn next_chunk(&mut self) {
        self.chunk += 1;
        self.active = false;
    }

    fn next_record(&mut self) -> Result<Option<AlignmentRecord>, Error> {
        while self.chunk < self.chunks.len() {
            let chunk = self.chunks[self.chunk];
            if !self.active {
                self.reader.seek(chunk.start())?;
                self.active = true;
            }
            if self.reader.virtual_position() >= chunk.end() {
                self.next_chunk();
                continue;
            }
            let record = match self.reader.read_record()? {
                Some(record) => record,
                None => {
                    self.next_chunk();
                    continue;
                },
            };

            let path = self.reader.path();
            match record.reference_id().map_err(|x| Error::io(x, path))? {
                Some(id) if id == self.reference_id => {},
                Some(id) if id < self.reference_id => continue,
                _ => return Ok(None),
            }
            let start = record.position().map_err(|x| Error::io(x, path))?;
            let end = record.reference_end().map_err(|x| Error::io(x, path))?;
            let (start, end) = match (start, end) {
                (Some(start), Some(end)) => (start, end),
                _ => continue,
            };
            if start >= self.end {
                return Ok(None);
            }
            if end <= self.start {
                continue;
            }
            return Ok(Some(record));
        }
        Ok(None)
    }
}

impl<'a> Iterator for RegionIter<'a> {
    type Item = Result<AlignmentRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            },
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            },
        }
    }
}

//-----------------------------------------------------------------------------

/// Writes the records overlapping `[start, end)` on the reference as SAM lines.
///
/// Returns the number of records written.
pub fn view_region<P: AsRef<Path>, W: Write>(archive: P, reference_id: usize, start: usize, end: usize, out: &mut W) -> Result<usize, Error> {
    let mut session = ArchiveSession::open(archive)?;
    let mut sink = SamSink::new(out, session.header());
    for record in session.query(reference_id, start, end)? {
        sink.write_record(&record?)?;
    }
    let records = sink.records();
    sink.into_inner()?;
    Ok(records)
}

/// Parses a region string into a reference id and a 0-based half-open interval.
///
/// Accepted formats are `NAME`, `NAME:START`, and `NAME:START-END` with 1-based inclusive coordinates.
/// A name that is not in the header but is a valid reference id is interpreted as an id.
/// Thousands separators (`,`) are ignored.
pub fn parse_region(region: &str, header: &Header) -> Result<(usize, usize, usize), Error> {
    let invalid = || Error::Configuration(format!("invalid region: {}", region));
    let (name, interval) = match bam::reference_id(header, region) {
        Some(_) => (region, None),
        None => match region.rsplit_once(':') {
            Some((name, interval)) => (name, Some(interval.replace(',', ""))),
            None => (region, None),
        },
    };

    let reference_id = match bam::reference_id(header, name) {
        Some(id) => id,
        None => {
            let id: usize = name.parse().map_err(|_| {
                Error::Configuration(format!("reference {} not in the header", name))
            })?;
            if id >= header.reference_sequences().len() {
                return Err(Error::UnknownReference(id));
            }
            id
        },
    };
    let length = bam::reference_length(header, reference_id).ok_or(Error::UnknownReference(reference_id))?;

    let (start, end) = match interval {
        None => (0, length),
        Some(interval) => {
            let (start, end) = match interval.split_once('-') {
                Some((start, end)) => {
                    let start: usize = start.parse().map_err(|_| invalid())?;
                    let end: usize = end.parse().map_err(|_| invalid())?;
                    (start, end)
                },
                None => (interval.parse::<usize>().map_err(|_| invalid())?, length),
            };
            if start == 0 || end < start {
                return Err(invalid());
            }
            (start - 1, end)
        },
    };
    Ok((reference_id, start, end))
}

//-----------------------------------------------------------------------------
