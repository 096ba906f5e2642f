//! Safe archive extraction.
//!
//! [`extract`] unpacks a `.zip` or `.tar.gz` file into a destination
//! directory. Both formats feed the same [`EntrySource`] walk, so every entry
//! goes through one path guard before anything is written for it: an entry
//! whose cleaned path leaves the destination (`../` escapes, absolute paths)
//! stops the extraction with [`ExtractError::IllegalPath`].
//!
//! Extraction is synchronous and stops at the first error. Entries written
//! before the failure stay on disk; callers that need all-or-nothing
//! semantics should extract into a staging directory and move it afterwards.
//! This module never logs and never touches the source archive.

mod entry;
mod error;
mod tar_gz;
mod zip_archive;

pub use entry::{Entry, EntrySource};
pub use error::{ExtractError, Result};
pub use tar_gz::TarGzArchive;
pub use zip_archive::ZipArchive;

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Component, Path, PathBuf};

/// Archive formats recognised by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from the file name suffix. No content sniffing.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else if name.ends_with(".tar.gz") {
            Ok(Self::TarGz)
        } else {
            Err(ExtractError::UnsupportedFormat(path.to_path_buf()))
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::TarGz => ".tar.gz",
        }
    }
}

/// Extract every entry of `archive` under `destination`.
///
/// Directories are created as needed (existing ones are fine), files are
/// created or truncated and made executable by their owner (`0755`).
pub fn extract(archive: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<()> {
    let archive = archive.as_ref();
    let format = ArchiveFormat::from_path(archive)?;
    let unpacker = Unpacker::new(archive, destination.as_ref());
    let mut write = |entry: Entry<'_>| unpacker.write(entry);

    match format {
        ArchiveFormat::Zip => ZipArchive::open(archive)?.for_each_entry(&mut write),
        ArchiveFormat::TarGz => TarGzArchive::open(archive)?.for_each_entry(&mut write),
    }
}

/// The format-independent half of an extraction: validate, then write.
struct Unpacker<'a> {
    archive: &'a Path,
    destination: &'a Path,
    /// Lexically cleaned destination, the containment reference
    root: PathBuf,
}

impl<'a> Unpacker<'a> {
    fn new(archive: &'a Path, destination: &'a Path) -> Self {
        Self {
            archive,
            destination,
            root: clean(destination),
        }
    }

    fn write(&self, entry: Entry<'_>) -> Result<()> {
        let target = clean(&self.destination.join(&entry.path));

        if target == self.root && entry.is_directory() {
            // `./` entries name the destination itself.
            return fs::create_dir_all(&target).map_err(|e| ExtractError::io(&target, e));
        }
        if !contains(&self.root, &target) {
            return Err(ExtractError::IllegalPath {
                entry: entry.path,
                destination: self.destination.to_path_buf(),
            });
        }

        match entry.contents {
            None => fs::create_dir_all(&target).map_err(|e| ExtractError::io(&target, e)),
            Some(contents) => self.write_file(&target, contents),
        }
    }

    fn write_file(&self, target: &Path, contents: &mut dyn Read) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }

        let mut file = File::create(target).map_err(|e| ExtractError::io(target, e))?;

        // Copy by hand so read failures (archive side) and write failures
        // (destination side) are reported against the right party.
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = match contents.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ExtractError::from_stream(self.archive, e)),
            };
            file.write_all(&buf[..n])
                .map_err(|e| ExtractError::io(target, e))?;
        }
        file.flush().map_err(|e| ExtractError::io(target, e))?;

        set_executable(&file).map_err(|e| ExtractError::io(target, e))
    }
}

#[cfg(unix)]
fn set_executable(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_file: &File) -> std::io::Result<()> {
    Ok(())
}

/// Whether cleaned `target` lies strictly below cleaned `root`.
fn contains(root: &Path, target: &Path) -> bool {
    if root == Path::new(".") {
        return target.is_relative()
            && target != root
            && !matches!(target.components().next(), Some(Component::ParentDir));
    }
    target != root && target.starts_with(root)
}

/// Lexical path cleaning: drops `.`, folds `name/..`, keeps leading `..` of
/// relative paths and discards `..` directly under a root.
fn clean(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
