//! Chromosome names to BAM reference ids.
//!
//! Breakpoint databases name chromosomes as `1`, ..., `22`, `X`, `Y`, and `MT`.
//! [`ContigNamespace`] converts these names to reference ids by their ordinal position in the conventional reference order `1..22, X, Y, MT` (e.g. GRCh37 / b37).
//! The header of the BAM file is not consulted; the caller must ensure that the reference table of the BAM file follows the same order.
//! [`ContigNamespace::check_header`] can be used for logging a warning when it does not.

use crate::bam::{self, Header};

//-----------------------------------------------------------------------------

/// Ordinal mapping from chromosome names to reference ids.
///
/// # Examples
///
/// ```
/// use sv_evidence::ContigNamespace;
///
/// let namespace = ContigNamespace::default();
/// assert_eq!(namespace.resolve("1"), Some(0));
/// assert_eq!(namespace.resolve("22"), Some(21));
/// assert_eq!(namespace.resolve("X"), Some(22));
/// assert_eq!(namespace.resolve("Y"), Some(23));
/// assert_eq!(namespace.resolve("MT"), Some(24));
/// assert_eq!(namespace.resolve("chr1"), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContigNamespace {
    autosomes: usize,
}

impl ContigNamespace {
    /// Number of autosomes in the human genome.
    pub const HUMAN_AUTOSOMES: usize = 22;

    /// Creates a namespace with the given number of numbered autosomes.
    pub fn new(autosomes: usize) -> Self {
        ContigNamespace { autosomes }
    }

    /// Returns the number of numbered autosomes.
    pub fn autosomes(&self) -> usize {
        self.autosomes
    }

    /// Returns the reference id for the chromosome name, or [`None`] if the name cannot be represented.
    ///
    /// `X`, `Y`, and `MT` follow the numbered autosomes.
    /// A name starting with a digit must be a positive integer in its entirety; `n` becomes reference id `n - 1`.
    /// Other names, including `chr`-prefixed ones, are not representable.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        match name {
            "X" => Some(self.autosomes),
            "Y" => Some(self.autosomes + 1),
            "MT" => Some(self.autosomes + 2),
            _ => {
                if !name.starts_with(|c: char| c.is_ascii_digit()) {
                    return None;
                }
                let value = name.parse::<usize>().ok()?;
                value.checked_sub(1)
            }
        }
    }

    /// Logs a warning if the reference with the given id in the header does not look like chromosome `name`.
    ///
    /// A `chr` prefix in the header is ignored, as is `M` for `MT`.
    /// Returns `true` if the names match.
    pub fn check_header(&self, header: &Header, name: &str, id: usize) -> bool {
        let reference = match bam::reference_name(header, id) {
            Some(reference) => reference,
            None => {
                log::warn!("Chromosome {} resolves to reference id {}, but the header has only {} references", name, id, header.reference_sequences().len());
                return false;
            }
        };
        let found = reference.strip_prefix("chr").unwrap_or(&reference);
        let matches = found == name || (name == "MT" && found == "M");
        if !matches {
            log::warn!("Chromosome {} resolves to reference id {}, which is named {} in the header", name, id, reference);
        }
        matches
    }
}

impl Default for ContigNamespace {
    fn default() -> Self {
        Self::new(Self::HUMAN_AUTOSOMES)
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
