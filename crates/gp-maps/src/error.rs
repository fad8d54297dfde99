//! Error types for map loading and evaluation.

use std::path::PathBuf;
use thiserror::Error;

pub type MapResult<T> = Result<T, MapError>;

/// Map load failures are fatal for the run: a missing file, a malformed
/// header or a grid that does not match its declared counts.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("Map file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Map file {path} has no '99' header line")]
    MissingHeader { path: PathBuf },

    #[error("Map file {path} has no '{keyword}' grid")]
    MissingKeyword { path: PathBuf, keyword: &'static str },

    #[error("Malformed map grid in {path} near line {line}: {what}")]
    MalformedGrid {
        path: PathBuf,
        line: usize,
        what: String,
    },

    #[error("Map scaling is degenerate: {what}")]
    DegenerateScaling { what: &'static str },

    #[error("Interpolation grid invalid: {what}")]
    BadGrid { what: &'static str },
}
