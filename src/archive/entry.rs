use std::io::Read;
use std::path::PathBuf;

use super::error::Result;

/// One file or directory yielded by an archive, in archive order.
pub struct Entry<'a> {
    /// Path as stored in the archive, relative in well-formed archives.
    pub path: PathBuf,
    /// Uncompressed length in bytes, zero for directories.
    pub size: u64,
    /// Content stream, `None` for directories.
    pub contents: Option<&'a mut dyn Read>,
}

impl<'a> Entry<'a> {
    pub fn directory(path: PathBuf) -> Self {
        Self {
            path,
            size: 0,
            contents: None,
        }
    }

    pub fn file(path: PathBuf, size: u64, contents: &'a mut dyn Read) -> Self {
        Self {
            path,
            size,
            contents: Some(contents),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.contents.is_none()
    }
}

/// A forward-only producer of [`Entry`] values.
///
/// Each format drives its own reader and hands every entry to `visit`; the
/// first error returned by either side ends the walk.
pub trait EntrySource {
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(Entry<'_>) -> Result<()>,
    ) -> Result<()>;
}
