//! ZIP reading on top of the positional [`ReadAt`] reader.
//!
//! Entries come from the central directory, in stored order. Member data is
//! streamed straight from the file through a bounded [`Section`] reader and,
//! for DEFLATE members, a raw inflater; the CRC-32 recorded in the central
//! directory is checked once a member has been consumed.
//!
//! Supported: ZIP64 sizes and offsets, STORED and DEFLATE members. Not
//! supported: encryption, multi-disk archives, other compression methods.
//!
//! [`Section`]: crate::io::Section

mod parser;
mod structures;

use flate2::CrcReader;
use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::io::{LocalFileReader, ReadAt};

use super::entry::{Entry, EntrySource};
use super::error::{ExtractError, Result};
use parser::ZipParser;
use structures::CompressionMethod;

pub struct ZipArchive<R: ReadAt> {
    parser: ZipParser<R>,
    origin: PathBuf,
}

impl ZipArchive<LocalFileReader> {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = LocalFileReader::new(path).map_err(|e| ExtractError::io(path, e))?;
        Ok(Self::new(reader, path))
    }
}

impl<R: ReadAt> ZipArchive<R> {
    pub fn new(reader: R, origin: &Path) -> Self {
        Self {
            parser: ZipParser::new(reader, origin),
            origin: origin.to_path_buf(),
        }
    }
}

impl<R: ReadAt> EntrySource for ZipArchive<R> {
    fn for_each_entry(&mut self, visit: &mut dyn FnMut(Entry<'_>) -> Result<()>) -> Result<()> {
        for member in self.parser.central_directory()? {
            let path = PathBuf::from(&member.file_name);
            if member.is_directory {
                visit(Entry::directory(path))?;
                continue;
            }

            let offset = self.parser.data_offset(&member)?;
            let raw = self.parser.reader().section(offset, member.compressed_size);
            let decoded: Box<dyn Read + '_> = match member.compression_method {
                CompressionMethod::Stored => Box::new(raw),
                CompressionMethod::Deflate => Box::new(DeflateDecoder::new(raw)),
                CompressionMethod::Unknown(method) => {
                    return Err(ExtractError::corrupt(
                        &self.origin,
                        format!(
                            "'{}' uses unsupported compression method {}",
                            member.file_name, method
                        ),
                    ));
                }
            };

            let mut contents = CrcReader::new(decoded);
            visit(Entry::file(path, member.uncompressed_size, &mut contents))?;

            if contents.crc().sum() != member.crc32 {
                return Err(ExtractError::corrupt(
                    &self.origin,
                    format!("CRC-32 mismatch for '{}'", member.file_name),
                ));
            }
        }
        Ok(())
    }
}
