mod http;
mod local;

pub use http::HttpDownloader;
pub use local::LocalFileReader;

use anyhow::Result;
use async_trait::async_trait;
use std::io::{self, Read};
use std::path::Path;

/// Trait for random access reading from a data source
pub trait ReadAt {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill `buf` completely, failing with `UnexpectedEof` if the source ends first
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(offset, buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("source ends before offset {}", offset + buf.len() as u64),
                    ));
                }
                Ok(n) => {
                    offset += n as u64;
                    buf = &mut buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Sequential view over `len` bytes starting at `offset`
    fn section(&self, offset: u64, len: u64) -> Section<'_, Self>
    where
        Self: Sized,
    {
        Section {
            source: self,
            position: offset,
            remaining: len,
        }
    }
}

/// Bounded sequential reader over a [`ReadAt`] source.
///
/// Reading past the declared length yields EOF; a source that is shorter
/// than declared yields `UnexpectedEof`.
pub struct Section<'a, R: ReadAt> {
    source: &'a R,
    position: u64,
    remaining: u64,
}

impl<R: ReadAt> Read for Section<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.source.read_at(self.position, &mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} bytes missing at offset {}", self.remaining, self.position),
            ));
        }

        self.position += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Fetches a remote resource into a local file.
///
/// Implementations must leave `destination` fully written and closed when
/// they return `Ok`, with owner-executable permissions.
#[async_trait]
pub trait Download: Send + Sync {
    async fn download(&self, url: &str, destination: &Path) -> Result<()>;
}
