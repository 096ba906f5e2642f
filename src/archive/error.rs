use std::io;
use std::path::{Path, PathBuf};

/// Why an extraction stopped.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported archive format: '{}' (expected .zip or .tar.gz)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("corrupt archive '{}': {reason}", archive.display())]
    CorruptArchive { archive: PathBuf, reason: String },

    #[error("illegal file path '{}': resolves outside '{}'", entry.display(), destination.display())]
    IllegalPath {
        entry: PathBuf,
        destination: PathBuf,
    },

    #[error("I/O failure on '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl ExtractError {
    pub(crate) fn corrupt(archive: &Path, reason: impl ToString) -> Self {
        Self::CorruptArchive {
            archive: archive.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Classify a failure to read from the archive's own stream.
    ///
    /// Decoder and framing failures surface as data errors or premature EOF
    /// and mean the container is damaged; anything else is the environment.
    pub(crate) fn from_stream(archive: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof => Self::corrupt(archive, source),
            _ => Self::io(archive, source),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
