//! SAM text output for alignment records.
//!
//! [`SamSink`] is a [`RecordSink`] that writes SAM lines with the SAM writer from [`noodles`].
//! Reference ids are resolved to names using the header, so records with ids outside the reference table are rejected with [`Error::UnknownReference`].

use crate::bam::{AlignmentRecord, Header, RecordExt, RecordSink};
use crate::Error;

use std::io::Write;

use noodles::sam;
use noodles::sam::alignment::io::Write as _;


//-----------------------------------------------------------------------------

/// A [`RecordSink`] that writes the records as SAM lines.
///
/// The sink stores its own copy of the header for resolving reference names.
pub struct SamSink<W: Write> {
    inner: sam::io::Writer<W>,
    header: Header,
    records: usize,
}

impl<W: Write> SamSink<W> {
    /// Creates a new sink.
    pub fn new(inner: W, header: &Header) -> Self {
        SamSink { inner: sam::io::Writer::new(inner), header: header.clone(), records: 0 }
    }

    /// Writes the SAM header.
    pub fn write_header(&mut self) -> Result<(), Error> {
        self.inner.write_header(&self.header).map_err(|x| Error::io(x, "<output>"))
    }

    /// Returns the number of records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Flushes the output and returns the inner writer.
    pub fn into_inner(self) -> Result<W, Error> {
        let mut inner = self.inner.into_inner();
        inner.flush().map_err(|x| Error::io(x, "<output>"))?;
        Ok(inner)
    }

    // Both the reference and the mate reference must be in the header.
    fn check_references(&self, record: &AlignmentRecord) -> Result<(), Error> {
        let count = self.header.reference_sequences().len();
        for id in [record.reference_id(), record.mate_reference_id()] {
            match id.map_err(|x| Error::io(x, "<record>"))? {
                Some(id) if id >= count => return Err(Error::UnknownReference(id)),
                _ => {},
            }
        }
        Ok(())
    }
}

impl<W: Write> RecordSink for SamSink<W> {
    fn write_record(&mut self, record: &AlignmentRecord) -> Result<(), Error> {
        self.check_references(record)?;
        self.inner.write_alignment_record(&self.header, record).map_err(|x| Error::io(x, "<output>"))?;
        self.records += 1;
        Ok(())
    }
}

//-----------------------------------------------------------------------------
