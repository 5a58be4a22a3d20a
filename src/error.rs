use std::io;
use std::path::PathBuf;

use crate::{MAX_SIZE, MIN_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("buffer size {size} is outside {min}..={max} bytes", min = MIN_SIZE, max = MAX_SIZE)]
    Size { size: u64 },

    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("not a file inside an existing directory: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionError {
    /// The section does not consist of exactly one list-valued entry.
    #[error("section [{section}] is not a list section")]
    NotAList { section: String },

    #[error("entry {key:?} in section [{section}] holds a list, not a single value")]
    NotScalar { section: String, key: String },

    /// Lines after a list header read back as list values, so no `key=value` can follow it.
    #[error("section [{section}] holds a list and cannot take new entries")]
    HoldsList { section: String },

    #[error("section and entry names cannot be empty")]
    EmptyName,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("no file path has been set")]
    NoPath,

    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
