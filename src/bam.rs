//! BAM files: alignment records, reader, and writer.
//!
//! The binary format and the BGZF compression layer are handled by [`noodles`].
//! This module adds the pieces the extraction needs on top of it: 0-based coordinates through [`RecordExt`], record identity through [`RecordKey`], virtual positions for index-driven seeking, and a writer that can be closed explicitly.
//! See [the SAM/BAM specification](https://samtools.github.io/hts-specs/SAMv1.pdf) for the format itself.

use crate::Error;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use noodles::bam;
use noodles::bgzf;
use noodles::sam::alignment::Record as _;

pub use noodles::bam::Record as AlignmentRecord;
pub use noodles::bgzf::VirtualPosition;
pub use noodles::sam::Header;


//-----------------------------------------------------------------------------

/// A key identifying an alignment record: reference id, position, read name, and flags.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    reference_id: Option<usize>,
    position: Option<usize>,
    name: Vec<u8>,
    flags: u16,
}

/// Alignment coordinates in the 0-based half-open convention used by the index.
///
/// Missing values are reported as [`None`] and malformed values as errors.
pub trait RecordExt {
    /// Returns the reference id.
    fn reference_id(&self) -> io::Result<Option<usize>>;

    /// Returns the 0-based leftmost position.
    fn position(&self) -> io::Result<Option<usize>>;

    /// Returns the 0-based exclusive end position of the alignment.
    ///
    /// Records without reference bases in the CIGAR cover one base.
    fn reference_end(&self) -> io::Result<Option<usize>>;

    /// Returns the reference id of the mate.
    fn mate_reference_id(&self) -> io::Result<Option<usize>>;

    /// Returns the 0-based position of the mate.
    fn mate_position(&self) -> io::Result<Option<usize>>;

    /// Returns a key that identifies the record.
    fn key(&self) -> RecordKey;
}

impl RecordExt for AlignmentRecord {
    fn reference_id(&self) -> io::Result<Option<usize>> {
        self.reference_sequence_id().transpose()
    }

    fn position(&self) -> io::Result<Option<usize>> {
        let start = self.alignment_start().transpose()?;
        Ok(start.map(|pos| usize::from(pos) - 1))
    }

    fn reference_end(&self) -> io::Result<Option<usize>> {
        let end = self.alignment_end().transpose()?;
        Ok(end.map(usize::from))
    }

    fn mate_reference_id(&self) -> io::Result<Option<usize>> {
        self.mate_reference_sequence_id().transpose()
    }

    fn mate_position(&self) -> io::Result<Option<usize>> {
        let start = self.mate_alignment_start().transpose()?;
        Ok(start.map(|pos| usize::from(pos) - 1))
    }

    fn key(&self) -> RecordKey {
        RecordKey {
            reference_id: self.reference_id().ok().flatten(),
            position: self.position().ok().flatten(),
            name: self.name().map(|name| name.to_vec()).unwrap_or_default(),
            flags: self.flags().bits(),
        }
    }
}

/// Returns the id of the reference with the given name in the header.
pub fn reference_id(header: &Header, name: &str) -> Option<usize> {
    header.reference_sequences().get_index_of(name.as_bytes())
}

/// Returns the name of the reference with the given id in the header.
pub fn reference_name(header: &Header, id: usize) -> Option<String> {
    let (name, _) = header.reference_sequences().get_index(id)?;
    Some(String::from_utf8_lossy(name).into_owned())
}

/// Returns the length of the reference with the given id in the header.
pub fn reference_length(header: &Header, id: usize) -> Option<usize> {
    let (_, reference) = header.reference_sequences().get_index(id)?;
    Some(reference.length().get())
}

//-----------------------------------------------------------------------------

/// A sequential BAM reader.
///
/// The header is read when the reader is created.
/// If the inner reader supports seeking, the reader can seek to virtual positions obtained from an index.
///
/// # Examples
///
/// ```no_run
/// use sv_evidence::BamReader;
///
/// let mut reader = BamReader::open("sample.bam").unwrap();
/// println!("{} references", reader.header().reference_sequences().len());
/// for record in reader.records() {
///     let record = record.unwrap();
///     println!("{:?}", record.name());
/// }
/// ```
pub struct BamReader<R> {
    inner: bam::io::Reader<bgzf::io::Reader<R>>,
    header: Header,
    path: PathBuf,
}

impl BamReader<BufReader<File>> {
    /// Opens the BAM file and reads the header.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self, Error> {
        let file = File::open(&filename).map_err(|x| Error::cannot_open(x, &filename))?;
        Self::with_path(BufReader::new(file), filename.as_ref())
    }
}

impl<R: Read> BamReader<R> {
    /// Creates a reader for a BAM stream and reads the header.
    pub fn new(inner: R) -> Result<Self, Error> {
        Self::with_path(inner, Path::new("<stream>"))
    }

    fn with_path(inner: R, path: &Path) -> Result<Self, Error> {
        let mut inner = bam::io::Reader::new(inner);
        let header = inner.read_header().map_err(|x| Error::io(x, path))?;
        Ok(BamReader { inner, header, path: path.to_path_buf() })
    }

    /// Returns the header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the path of the file, or `<stream>`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the virtual position of the next record.
    pub fn virtual_position(&self) -> VirtualPosition {
        self.inner.get_ref().virtual_position()
    }

    /// Reads the next record, or returns [`None`] at the end of the file.
    pub fn read_record(&mut self) -> Result<Option<AlignmentRecord>, Error> {
        let mut record = AlignmentRecord::default();
        match self.inner.read_record(&mut record) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(record)),
            Err(err) => Err(Error::io(err, &self.path)),
        }
    }

    /// Returns an iterator over the remaining records.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self, finished: false }
    }
}

impl<R: Read + Seek> BamReader<R> {
    /// Seeks to the given virtual position.
    pub fn seek(&mut self, pos: VirtualPosition) -> Result<(), Error> {
        self.inner.get_mut().seek(pos).map_err(|x| Error::io(x, &self.path))?;
        Ok(())
    }
}

/// An iterator over the records in a [`BamReader`].
///
/// The iterator stops after the first error.
pub struct Records<'a, R> {
    reader: &'a mut BamReader<R>,
    finished: bool,
}

impl<'a, R: Read> Iterator for Records<'a, R> {
    type Item = Result<AlignmentRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.reader.read_record().transpose();
        if !matches!(result, Some(Ok(_))) {
            self.finished = true;
        }
        result
    }
}

//-----------------------------------------------------------------------------

/// A destination for alignment records.
pub trait RecordSink {
    /// Writes the record to the sink.
    fn write_record(&mut self, record: &AlignmentRecord) -> Result<(), Error>;
}

impl RecordSink for Vec<AlignmentRecord> {
    fn write_record(&mut self, record: &AlignmentRecord) -> Result<(), Error> {
        self.push(record.clone());
        Ok(())
    }
}

/// A BAM writer.
///
/// The writer stores its own copy of the header.
/// Records are written in the given order; sorting them is the responsibility of the caller.
/// [`BamWriter::close`] must be called to finish the file.
/// After that, writing records fails with [`Error::WriterClosed`].
pub struct BamWriter<W: Write> {
    inner: Option<bam::io::Writer<bgzf::io::Writer<W>>>,
    header: Header,
    path: PathBuf,
    records: usize,
}

impl BamWriter<BufWriter<File>> {
    /// Creates a new BAM file and writes the header.
    ///
    /// If the header cannot be written, the file is removed.
    pub fn create<P: AsRef<Path>>(filename: P, header: &Header) -> Result<Self, Error> {
        let file = File::create(&filename).map_err(|x| Error::cannot_open(x, &filename))?;
        let result = Self::with_path(BufWriter::new(file), header, filename.as_ref());
        if result.is_err() {
            let _ = fs::remove_file(&filename);
        }
        result
    }
}

impl<W: Write> BamWriter<W> {
    /// Creates a new BAM writer and writes the header.
    pub fn new(inner: W, header: &Header) -> Result<Self, Error> {
        Self::with_path(inner, header, Path::new("<stream>"))
    }

    fn with_path(inner: W, header: &Header, path: &Path) -> Result<Self, Error> {
        let mut inner = bam::io::Writer::new(inner);
        inner.write_header(header).map_err(|x| Error::io(x, path))?;
        Ok(BamWriter {
            inner: Some(inner),
            header: header.clone(),
            path: path.to_path_buf(),
            records: 0,
        })
    }

    /// Returns the header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the number of records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Returns `true` if the writer has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Appends the record to the file.
    pub fn write_record(&mut self, record: &AlignmentRecord) -> Result<(), Error> {
        let inner = self.inner.as_mut().ok_or(Error::WriterClosed)?;
        inner.write_record(&self.header, record).map_err(|x| Error::io(x, &self.path))?;
        self.records += 1;
        Ok(())
    }

    /// Writes the remaining data and the end-of-file marker, and flushes the inner writer.
    ///
    /// Closing a closed writer does nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        if let Some(writer) = self.inner.take() {
            let mut inner = writer.into_inner().finish().map_err(|x| Error::io(x, &self.path))?;
            inner.flush().map_err(|x| Error::io(x, &self.path))?;
        }
        Ok(())
    }
}

impl<W: Write> RecordSink for BamWriter<W> {
    fn write_record(&mut self, record: &AlignmentRecord) -> Result<(), Error> {
        BamWriter::write_record(self, record)
    }
}

//-----------------------------------------------------------------------------
