//! Error type shared by all modules.

use std::io;
use std::path::{Path, PathBuf};

//-----------------------------------------------------------------------------

/// Errors that can occur while querying BAM files and extracting breakpoint evidence.
///
/// A failed extraction request is reported as [`Error::Extraction`], which wraps the underlying error with the archive, the breakpoints, and the stage that failed.
/// Use [`Error::root`] to get the underlying error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required file is missing or cannot be opened.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Other I/O errors.
    #[error("I/O error: {source} ({path})")]
    Io {
        source: io::Error,
        path: PathBuf,
    },

    /// Malformed or truncated input.
    #[error("decode error: {0}")]
    Decode(String),

    /// A chromosome name outside the supported naming convention.
    #[error("unresolved contig name: {0}")]
    UnresolvedContig(String),

    /// A reference id that is not in the reference table or in the index.
    #[error("unknown reference id: {0}")]
    UnknownReference(usize),

    /// Attempted to write to a closed writer.
    #[error("writer closed")]
    WriterClosed,

    /// Errors from the breakpoint database.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A failed extraction request.
    #[error("extraction failed for {breakpoints} in {} ({stage}): {source}", archive.display())]
    Extraction {
        archive: PathBuf,
        breakpoints: String,
        stage: &'static str,
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps an I/O error with a path.
    ///
    /// Unexpected end of file and invalid data become [`Error::Decode`].
    pub fn io<P: AsRef<Path>>(source: io::Error, path: P) -> Self {
        match source.kind() {
            io::ErrorKind::UnexpectedEof => {
                Error::Decode(format!("{}: unexpected end of file", path.as_ref().display()))
            },
            io::ErrorKind::InvalidData => {
                Error::Decode(format!("{}: {}", path.as_ref().display(), source))
            },
            _ => Error::Io { source, path: path.as_ref().to_path_buf() },
        }
    }

    /// Error for a file that cannot be opened.
    pub fn cannot_open<P: AsRef<Path>>(source: io::Error, path: P) -> Self {
        Error::Configuration(format!("cannot open {}: {}", path.as_ref().display(), source))
    }

    /// Returns the innermost error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Extraction { source, .. } => source.root(),
            _ => self,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err, "<unknown>")
    }
}

//-----------------------------------------------------------------------------
