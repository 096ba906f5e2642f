use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    /// Parse the fixed part of the record; `None` if `data` is not an EOCD
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return None;
        }

        // Skip disk number, disk with CD and entries on this disk.
        let mut cursor = Cursor::new(&data[10..]);

        Some(Self {
            total_entries: cursor.read_u16::<LittleEndian>().ok()?,
            cd_size: cursor.read_u32::<LittleEndian>().ok()?,
            cd_offset: cursor.read_u32::<LittleEndian>().ok()?,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.total_entries == 0xFFFF || self.cd_size == 0xFFFFFFFF || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64Locator {
    pub eocd64_offset: u64,
}

impl Zip64Locator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return None;
        }

        let mut cursor = Cursor::new(&data[8..]);
        Some(Self {
            eocd64_offset: cursor.read_u64::<LittleEndian>().ok()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EndOfCentralDirectory {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return None;
        }

        // Entry counts, sizes and offsets live in the last 24 bytes.
        let mut cursor = Cursor::new(&data[32..]);
        Some(Self {
            total_entries: cursor.read_u64::<LittleEndian>().ok()?,
            cd_size: cursor.read_u64::<LittleEndian>().ok()?,
            cd_offset: cursor.read_u64::<LittleEndian>().ok()?,
        })
    }
}

/// Central Directory File Header (CDFH)
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Central directory view of one archive member
#[derive(Debug, Clone)]
pub struct ZipMember {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub is_directory: bool,
}

/// Host systems from the high byte of "version made by"
const HOST_MSDOS: u8 = 0;
const HOST_UNIX: u8 = 3;
const HOST_MACOS: u8 = 19;

const MSDOS_DIRECTORY: u32 = 0x10;
const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;

/// Whether a central directory record names a directory.
///
/// A trailing `/` is authoritative. Otherwise the external attributes are
/// read according to the host system that wrote the record.
pub fn is_directory_record(file_name: &str, version_made_by: u16, external_attrs: u32) -> bool {
    if file_name.ends_with('/') {
        return true;
    }
    match (version_made_by >> 8) as u8 {
        HOST_UNIX | HOST_MACOS => (external_attrs >> 16) & S_IFMT == S_IFDIR,
        HOST_MSDOS => external_attrs & MSDOS_DIRECTORY != 0,
        _ => false,
    }
}
