//! # SV-evidence: extracting structural variant evidence from indexed BAM files.
//!
//! A structural variant joins two distant genomic positions, the breakpoints.
//! A read pair supports the variant if one read aligns near each breakpoint.
//! This crate finds such read pairs in a coordinate-sorted BAM file with a BAI index and writes them to a small BAM file for inspection.
//!
//! See [`extract`] for the extraction and [`SvDatabase`] for a SQLite database of breakpoint pairs by sample.
//!
//! ### Basic concepts
//!
//! A BAM file is a BGZF-compressed sequence of alignment records sorted by reference and position.
//! The codecs come from [`noodles`]; see [`bam`] for the records, [`BamReader`], and [`BamWriter`].
//! Records can be printed as SAM text with a [`SamSink`].
//!
//! The BAI index maps genomic intervals to chunks of virtual positions in the BAM file.
//! See [`index`] for loading and building indexes and [`Index::chunks_for`] for the lookup.
//! An [`ArchiveSession`] combines a BAM file with its index and iterates over the records overlapping an interval.
//!
//! Breakpoints use chromosome names `1`, ..., `22`, `X`, `Y`, and `MT`.
//! They are converted to reference ids with a [`ContigNamespace`], which assumes that the BAM file uses the same reference order.
//!
//! ### Tools
//!
//! * `svextract`: Extract evidence for all breakpoint pairs of a sample.
//! * `bamview`: Print the records in a region as SAM lines.
//! * `bamindex`: Build a BAI index for a sorted BAM file.
//! * `sv2db`: Build a breakpoint database from a tab-separated file.

pub mod bam;
pub mod contig;
pub mod db;
pub mod error;
pub mod evidence;
pub mod formats;
pub mod index;
pub mod region;
pub mod utils;

#[cfg(test)]
mod internal;

pub use bam::{AlignmentRecord, BamReader, BamWriter, Header, RecordExt, RecordSink};
pub use contig::ContigNamespace;
pub use db::SvDatabase;
pub use error::Error;
pub use evidence::{extract, BreakpointPair, ExtractionParams, ExtractionReport};
pub use formats::SamSink;
pub use index::{Chunk, Index};
pub use region::{ArchiveSession, RegionIter};
