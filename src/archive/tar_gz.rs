use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tar::EntryType;

use super::entry::{Entry, EntrySource};
use super::error::{ExtractError, Result};

/// Gzip-compressed tarball, read strictly front to back.
pub struct TarGzArchive<R: Read> {
    decoder: GzDecoder<R>,
    origin: PathBuf,
}

impl TarGzArchive<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: Read> TarGzArchive<R> {
    pub fn new(reader: R, origin: &Path) -> Self {
        Self {
            decoder: GzDecoder::new(reader),
            origin: origin.to_path_buf(),
        }
    }
}

impl<R: Read> EntrySource for TarGzArchive<R> {
    fn for_each_entry(&mut self, visit: &mut dyn FnMut(Entry<'_>) -> Result<()>) -> Result<()> {
        let origin = &self.origin;
        let mut archive = tar::Archive::new(&mut self.decoder);
        // Header-level failures from the tar reader mean the container itself
        // cannot be parsed, whatever io::ErrorKind they carry.
        let entries = archive
            .entries()
            .map_err(|e| ExtractError::corrupt(origin, e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| ExtractError::corrupt(origin, e))?;
            let path = entry
                .path()
                .map_err(|e| ExtractError::corrupt(origin, e))?
                .into_owned();

            match entry.header().entry_type() {
                EntryType::Directory => visit(Entry::directory(path))?,
                EntryType::Regular | EntryType::Continuous => {
                    let size = entry.size();
                    visit(Entry::file(path, size, &mut entry))?;
                }
                // Links, devices, fifos and pax/GNU metadata records carry no
                // file content and are not materialised.
                _ => {}
            }
        }
        drop(archive);

        // The tar reader stops at the end-of-archive block. The gzip CRC-32
        // and length trailer is only checked once the decoder hits its end.
        io::copy(&mut self.decoder, &mut io::sink())
            .map_err(|e| ExtractError::corrupt(origin, e))?;
        Ok(())
    }
}
