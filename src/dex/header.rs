//! The fixed 0x70 byte `header_item` at the start of every dex file.

use std::ops::Range;

use log::warn;
use rangemap::RangeSet;
use serde::Serialize;

use crate::dex::dex_file::DexOptions;
use crate::dex::error::DexError;
use crate::dex::{read_array, read_u4};

/* Constants */
pub const DEX_FILE_MAGIC_PREFIX: [u8; 4] = [ 0x64, 0x65, 0x78, 0x0a ];
pub const HEADER_SIZE: u32 = 0x70;
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x78563412;

/// Bytes at the start of the file that the checksum does not cover
/// (magic and the checksum itself).
pub const CHECKSUM_START: usize = 12;

pub const STRING_ID_ITEM_SIZE: usize = 4;
pub const TYPE_ID_ITEM_SIZE: usize = 4;
pub const PROTO_ID_ITEM_SIZE: usize = 12;
pub const FIELD_ID_ITEM_SIZE: usize = 8;
pub const METHOD_ID_ITEM_SIZE: usize = 8;
pub const CLASS_DEF_ITEM_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

/// Location of one id table: element count, byte offset and record stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section
{
    pub name: &'static str,
    pub size: u32,
    pub offset: u32,
    pub stride: usize,
}

impl Section
{
    /// Byte range covered by the table, or `None` if it overflows.
    pub fn byte_range(&self) -> Option<Range<usize>>
    {
        let start = self.offset as usize;
        let len = (self.size as usize).checked_mul(self.stride)?;
        Some(start..start.checked_add(len)?)
    }
}

impl Header
{
    /// Reads the raw header fields. Only checks that there are enough bytes
    /// for them; see [`Header::parse`] for validation.
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<Header, DexError>
    {
        if bytes.len() < HEADER_SIZE as usize {
            fail!(TruncatedFile, "Not enough bytes for header: {} < {}", bytes.len(), HEADER_SIZE);
        }

        Ok(Header {
            magic: read_array(bytes, ix)?,
            checksum: read_u4(bytes, ix)?,
            signature: read_array(bytes, ix)?,
            file_size: read_u4(bytes, ix)?,
            header_size: read_u4(bytes, ix)?,
            endian_tag: read_u4(bytes, ix)?,
            link_size: read_u4(bytes, ix)?,
            link_off: read_u4(bytes, ix)?,
            map_off: read_u4(bytes, ix)?,
            string_ids_size: read_u4(bytes, ix)?,
            string_ids_off: read_u4(bytes, ix)?,
            type_ids_size: read_u4(bytes, ix)?,
            type_ids_off: read_u4(bytes, ix)?,
            proto_ids_size: read_u4(bytes, ix)?,
            proto_ids_off: read_u4(bytes, ix)?,
            field_ids_size: read_u4(bytes, ix)?,
            field_ids_off: read_u4(bytes, ix)?,
            method_ids_size: read_u4(bytes, ix)?,
            method_ids_off: read_u4(bytes, ix)?,
            class_defs_size: read_u4(bytes, ix)?,
            class_defs_off: read_u4(bytes, ix)?,
            data_size: read_u4(bytes, ix)?,
            data_off: read_u4(bytes, ix)?,
        })
    }

    /// Reads and validates the header of `bytes`.
    ///
    /// Checks run in this order: enough bytes for a header, magic and
    /// version, declared file size against the buffer, Adler-32 checksum,
    /// then the layout of every id table. The checksum is verified before
    /// the layout so a corrupted table descriptor reports as a checksum
    /// failure.
    pub fn parse(bytes: &[u8], options: &DexOptions) -> Result<Header, DexError>
    {
        let mut ix = 0;
        let header = Header::read(bytes, &mut ix)?;

        let version = header.version()
            .ok_or_else(|| err!(MalformedHeader, "Invalid magic value {:02x?}", header.magic))?;
        if version < options.min_version || version > options.max_version {
            fail!(MalformedHeader, "Unsupported dex version {:03}", version);
        }

        if header.file_size as usize > bytes.len() {
            fail!(TruncatedFile, "file_size {} exceeds buffer length {}", header.file_size, bytes.len());
        }
        if header.file_size < HEADER_SIZE {
            fail!(MalformedHeader, "file_size {} is smaller than the header", header.file_size);
        }

        if options.verify_checksum {
            let actual = compute_checksum(&bytes[..header.file_size as usize]);
            if actual != header.checksum {
                warn!("dex checksum mismatch: stored 0x{:08x}, computed 0x{:08x}", header.checksum, actual);
                fail!(ChecksumMismatch, "stored 0x{:08x} but computed 0x{:08x}", header.checksum, actual);
            }
        }

        if header.header_size != HEADER_SIZE {
            fail!(MalformedHeader, "header_size is {} instead of {}", header.header_size, HEADER_SIZE);
        }
        if header.endian_tag == REVERSE_ENDIAN_CONSTANT {
            fail!(MalformedHeader, "big endian dex files are not supported");
        }
        if header.endian_tag != ENDIAN_CONSTANT {
            fail!(MalformedHeader, "Invalid endian tag 0x{:08x}", header.endian_tag);
        }

        header.check_layout()?;
        Ok(header)
    }

    /// Numeric version from the magic, e.g. 35 for `dex\n035\0`.
    pub fn version(&self) -> Option<u32>
    {
        if self.magic[..4] != DEX_FILE_MAGIC_PREFIX || self.magic[7] != 0 {
            return None;
        }
        self.magic[4..7].iter().try_fold(0u32, |acc, &d| {
            d.is_ascii_digit().then(|| acc * 10 + (d - b'0') as u32)
        })
    }

    /// The six id tables in file order.
    pub fn sections(&self) -> [Section; 6]
    {
        [
            Section { name: "string_ids", size: self.string_ids_size, offset: self.string_ids_off, stride: STRING_ID_ITEM_SIZE },
            Section { name: "type_ids", size: self.type_ids_size, offset: self.type_ids_off, stride: TYPE_ID_ITEM_SIZE },
            Section { name: "proto_ids", size: self.proto_ids_size, offset: self.proto_ids_off, stride: PROTO_ID_ITEM_SIZE },
            Section { name: "field_ids", size: self.field_ids_size, offset: self.field_ids_off, stride: FIELD_ID_ITEM_SIZE },
            Section { name: "method_ids", size: self.method_ids_size, offset: self.method_ids_off, stride: METHOD_ID_ITEM_SIZE },
            Section { name: "class_defs", size: self.class_defs_size, offset: self.class_defs_off, stride: CLASS_DEF_ITEM_SIZE },
        ]
    }

    fn check_layout(&self) -> Result<(), DexError>
    {
        let file_size = self.file_size as usize;
        let mut used: RangeSet<usize> = RangeSet::new();
        used.insert(0..HEADER_SIZE as usize);

        for section in self.sections() {
            if section.size == 0 {
                continue;
            }
            let range = section.byte_range()
                .filter(|r| r.end <= file_size)
                .ok_or_else(|| err!(MalformedHeader, "{} ({} items at 0x{:x}) extends past file_size {}",
                    section.name, section.size, section.offset, file_size))?;
            if section.offset % 4 != 0 {
                fail!(MalformedHeader, "{} offset 0x{:x} is not 4-byte aligned", section.name, section.offset);
            }
            if used.overlaps(&range) {
                fail!(MalformedHeader, "{} at 0x{:x}..0x{:x} overlaps another table", section.name, range.start, range.end);
            }
            used.insert(range);
        }

        let data_end = self.data_off as u64 + self.data_size as u64;
        if data_end > file_size as u64 {
            fail!(MalformedHeader, "data section 0x{:x}+{} extends past file_size {}", self.data_off, self.data_size, file_size);
        }
        if self.map_off != 0 && self.map_off as usize >= file_size {
            fail!(MalformedHeader, "map_off 0x{:x} is outside the file", self.map_off);
        }
        Ok(())
    }
}

/// Adler-32 over everything after the magic and checksum fields.
pub fn compute_checksum(file: &[u8]) -> u32
{
    adler::adler32_slice(file.get(CHECKSUM_START..).unwrap_or(&[]))
}
