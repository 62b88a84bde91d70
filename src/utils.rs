//! Utility functions and structures.

use crate::Error;

use std::fs::{self, File};
use std::path::Path;
use std::io::{BufRead, BufReader, Read};

use flate2::read::MultiGzDecoder;
use log::LevelFilter;

//-----------------------------------------------------------------------------

// Utilities for working with files.

const SIZE_UNITS: [(f64, &str); 6] = [
    (1.0, "B"),
    (1024.0, "KiB"),
    (1024.0 * 1024.0, "MiB"),
    (1024.0 * 1024.0 * 1024.0, "GiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0, "TiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0, "PiB"),
];

/// Returns a human-readable representation of the given number of bytes.
pub fn human_readable_size(bytes: usize) -> String {
    let mut unit = 0;
    let value = bytes as f64;
    while unit + 1 < SIZE_UNITS.len() && value >= SIZE_UNITS[unit + 1].0 {
        unit += 1;
    }
    format!("{:.3} {}", value / SIZE_UNITS[unit].0, SIZE_UNITS[unit].1)
}

/// Returns a human-readable size of the file.
pub fn file_size<P: AsRef<Path>>(filename: P) -> Option<String> {
    let metadata = fs::metadata(filename).ok()?;
    Some(human_readable_size(metadata.len() as usize))
}

/// Returns `true` if the file exists.
pub fn file_exists<P: AsRef<Path>>(filename: P) -> bool {
    fs::metadata(filename).is_ok()
}

/// Returns `true` if the file appears to be gzip-compressed.
///
/// BGZF files are also gzip-compressed.
pub fn is_gzipped<P: AsRef<Path>>(filename: P) -> bool {
    let file = match File::open(filename) {
        Ok(file) => file,
        Err(_) => return false,
    };
    let mut reader = BufReader::new(file);
    let mut magic = [0; 2];
    let len = reader.read(&mut magic).ok();
    len == Some(2) && magic == [0x1F, 0x8B]
}

/// Returns a buffered reader for the file, which may be gzip-compressed.
pub fn open_file<P: AsRef<Path>>(filename: P) -> Result<Box<dyn BufRead>, Error> {
    let file = File::open(&filename).map_err(|x| Error::cannot_open(x, &filename))?;
    let inner = BufReader::new(file);
    if is_gzipped(&filename) {
        let inner = MultiGzDecoder::new(inner);
        Ok(Box::new(BufReader::new(inner)))
    } else {
        Ok(Box::new(inner))
    }
}

/// Removes the file if it exists and `overwrite` is set.
///
/// Returns an error if the file exists and `overwrite` is not set.
pub fn prepare_output<P: AsRef<Path>>(filename: P, overwrite: bool) -> Result<(), Error> {
    let filename = filename.as_ref();
    if file_exists(filename) {
        if overwrite {
            log::info!("Overwriting {}", filename.display());
            fs::remove_file(filename).map_err(|x| Error::io(x, filename))?;
        } else {
            return Err(Error::Configuration(format!("File {} already exists", filename.display())));
        }
    }
    Ok(())
}

//-----------------------------------------------------------------------------

// Utilities for the binaries.

/// Initializes logging to standard error.
///
/// The level is `warn` with `quiet`, `info` by default, `debug` with one `-v`, and `trace` with more.
pub fn init_logging(verbose: usize, quiet: bool) {
    let level = if quiet {
        LevelFilter::Warn
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let _ = env_logger::Builder::new().filter_level(level).format_target(false).try_init();
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
