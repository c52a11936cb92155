//! Variable-length payloads in the data section: `string_data_item` and
//! `type_list`.
//!
//! Strings are stored as Modified UTF-8 (CESU-8 with a two byte NUL) behind
//! a uleb128 count of UTF-16 code units, and end with a zero byte. Nothing is
//! copied out of the file: both views borrow the backing buffer.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use crate::dex::error::{DexError, DexErrorKind};
use crate::dex::{read_u2, read_u4, read_uleb128, read_x, TypeIdx};

/// A string payload borrowed from the file.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DexStr<'a>
{
    utf16_len: u32,
    data: &'a [u8],
}

impl<'a> DexStr<'a>
{
    /// Decodes the `string_data_item` at `off`.
    pub(crate) fn read(bytes: &'a [u8], off: u32) -> Result<DexStr<'a>, DexError>
    {
        let mut ix = off as usize;
        let utf16_len = read_uleb128(bytes, &mut ix)
            .map_err(|e| e.reclassify(DexErrorKind::MalformedString, format!("string length at 0x{:x}", off)))?;

        let rest = bytes.get(ix..).unwrap_or(&[]);
        let Some(end) = rest.iter().position(|&b| b == 0) else {
            fail!(MalformedString, "string data at 0x{:x} has no terminator", off);
        };
        // A utf16 unit needs at least one byte and at most three.
        if (utf16_len as usize) > end || end > (utf16_len as usize).saturating_mul(3) {
            fail!(MalformedString, "string data at 0x{:x} holds {} bytes for {} utf16 units", off, end, utf16_len);
        }
        Ok(DexStr { utf16_len, data: &rest[..end] })
    }

    /// Raw Modified UTF-8 bytes, without the terminator.
    pub fn as_bytes(&self) -> &'a [u8]
    {
        self.data
    }

    /// Length in UTF-16 code units, as declared by the file.
    pub fn utf16_len(&self) -> u32
    {
        self.utf16_len
    }

    pub fn is_empty(&self) -> bool
    {
        self.data.is_empty()
    }

    /// Decodes to Rust UTF-8, borrowing when the payload is already valid UTF-8.
    pub fn to_str(&self) -> Result<Cow<'a, str>, DexError>
    {
        cesu8::from_java_cesu8(self.data)
            .map_err(|_| err!(MalformedString, "invalid modified utf-8 {:02x?}", self.data))
    }

    /// Orders by UTF-16 code unit values, the order of the string table.
    pub fn cmp_utf16(&self, other: &DexStr<'_>) -> Ordering
    {
        compare_mutf8_as_utf16(self.data, other.data)
    }
}

impl PartialEq<str> for DexStr<'_>
{
    fn eq(&self, other: &str) -> bool
    {
        match self.to_str() {
            Ok(s) => s == other,
            Err(_) => false,
        }
    }
}

impl PartialEq<&str> for DexStr<'_>
{
    fn eq(&self, other: &&str) -> bool
    {
        *self == **other
    }
}

impl fmt::Display for DexStr<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.to_str() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str(&String::from_utf8_lossy(self.data)),
        }
    }
}

impl fmt::Debug for DexStr<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "DexStr({:?})", self.to_string())
    }
}

/// Yields the UTF-16 code units of a Modified UTF-8 byte run.
///
/// Malformed sequences never panic: missing continuation bytes read as zero
/// bits, which keeps comparisons total over untrusted data.
struct Utf16Units<'a>
{
    bytes: &'a [u8],
    pos: usize,
    pending: Option<u16>,
}

impl<'a> Utf16Units<'a>
{
    fn new(bytes: &'a [u8]) -> Self
    {
        Utf16Units { bytes, pos: 0, pending: None }
    }

    fn continuation(&mut self) -> u32
    {
        let b = self.bytes.get(self.pos).copied().unwrap_or(0x80);
        self.pos += 1;
        (b & 0x3f) as u32
    }
}

impl Iterator for Utf16Units<'_>
{
    type Item = u16;

    fn next(&mut self) -> Option<u16>
    {
        if let Some(low) = self.pending.take() {
            return Some(low);
        }
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        let unit = match b {
            0x00..=0x7f => b as u32,
            0xc0..=0xdf => ((b & 0x1f) as u32) << 6 | self.continuation(),
            0xe0..=0xef => {
                let hi = ((b & 0x0f) as u32) << 12 | self.continuation() << 6;
                hi | self.continuation()
            }
            0xf0..=0xf7 => {
                // Four byte UTF-8 becomes a surrogate pair.
                let mut cp = ((b & 0x07) as u32) << 18 | self.continuation() << 12;
                cp |= self.continuation() << 6;
                cp |= self.continuation();
                let cp = cp.saturating_sub(0x10000) & 0xfffff;
                self.pending = Some((0xdc00 | (cp & 0x3ff)) as u16);
                0xd800 | (cp >> 10)
            }
            _ => b as u32,
        };
        Some(unit as u16)
    }
}

/// Compares two Modified UTF-8 strings by their UTF-16 code unit values.
pub fn compare_mutf8_as_utf16(a: &[u8], b: &[u8]) -> Ordering
{
    Utf16Units::new(a).cmp(Utf16Units::new(b))
}

/// A `type_list`: a u4 count followed by u2 type indices.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeList<'a>
{
    entries: &'a [u8],
}

impl<'a> TypeList<'a>
{
    pub fn empty() -> TypeList<'static>
    {
        TypeList { entries: &[] }
    }

    /// Decodes the list at `off`. Every entry must be below `type_count`.
    pub(crate) fn read(bytes: &'a [u8], off: u32, type_count: u32) -> Result<TypeList<'a>, DexError>
    {
        let context = || format!("type_list at 0x{:x}", off);
        if off % 4 != 0 {
            fail!(MalformedTypeList, "type_list offset 0x{:x} is not 4-byte aligned", off);
        }
        let mut ix = off as usize;
        let size = read_u4(bytes, &mut ix)
            .map_err(|e| e.reclassify(DexErrorKind::MalformedTypeList, context()))?;
        let len = (size as usize).checked_mul(2)
            .ok_or_else(|| err!(MalformedTypeList, "type_list at 0x{:x} has {} entries", off, size))?;
        let entries = read_x(bytes, &mut ix, len)
            .map_err(|e| e.reclassify(DexErrorKind::MalformedTypeList, context()))?;

        let list = TypeList { entries };
        if let Some(bad) = list.iter().find(|&t| t >= type_count) {
            fail!(MalformedTypeList, "type_list at 0x{:x} references type {} of {}", off, bad, type_count);
        }
        Ok(list)
    }

    pub fn len(&self) -> usize
    {
        self.entries.len() / 2
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<TypeIdx>
    {
        let mut ix = i.checked_mul(2)?;
        read_u2(self.entries, &mut ix).ok().map(|t| t as TypeIdx)
    }

    pub fn iter(&self) -> impl Iterator<Item = TypeIdx> + 'a
    {
        let entries: &'a [u8] = self.entries;
        entries.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]) as TypeIdx)
    }
}

impl fmt::Debug for TypeList<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_list().entries(self.iter()).finish()
    }
}
