#[macro_use]
pub mod error;

pub mod access_flags;
pub mod class_data;
pub mod code_item;
pub mod dex_file;
pub mod header;
pub mod ids;
pub mod leb;
pub mod lookup;
pub mod signature;
pub mod strings;

pub use access_flags::AccessFlags;
pub use class_data::{ClassDataHeader, ClassDataIterator, ClassDataState, ClassMember, EncodedField, EncodedMethod};
pub use code_item::{CatchHandler, CodeItem, DebugInfoHeader, TryItem};
pub use dex_file::{DexFile, DexOptions};
pub use error::{DexError, DexErrorKind};
pub use header::Header;
pub use ids::{ClassDefItem, FieldIdItem, IdItem, IdTable, MethodIdItem, ProtoIdItem, StringIdItem, TypeIdItem};
pub use strings::{DexStr, TypeList};

use crate::dex::leb::{decode_sleb128, decode_uleb128, decode_uleb128p1};

pub type StringIdx = u32;
pub type TypeIdx = u32;
pub type ProtoIdx = u32;
pub type FieldIdx = u32;
pub type MethodIdx = u32;

/// Sentinel used by the format for "no string" / "no type" references.
pub const NO_INDEX: u32 = 0xffffffff;

// Basic type reading. Every read is bounds checked and reports the offset it
// failed at; callers reclassify the error for the entity being decoded.
pub(crate) fn read_u2(bytes: &[u8], ix: &mut usize) -> Result<u16, DexError>
{
    let b = read_array::<2>(bytes, ix).map_err(|_| err!(TruncatedFile, "Unexpected end of stream reading u2 at index {}", *ix))?;
    Ok(u16::from_le_bytes(b))
}

pub(crate) fn read_u4(bytes: &[u8], ix: &mut usize) -> Result<u32, DexError>
{
    let b = read_array::<4>(bytes, ix).map_err(|_| err!(TruncatedFile, "Unexpected end of stream reading u4 at index {}", *ix))?;
    Ok(u32::from_le_bytes(b))
}

pub(crate) fn read_array<const N: usize>(bytes: &[u8], ix: &mut usize) -> Result<[u8; N], DexError>
{
    let slice = read_x(bytes, ix, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

pub(crate) fn read_uleb128(bytes: &[u8], ix: &mut usize) -> Result<u32, DexError>
{
    let (val, size) = bytes
        .get(*ix..)
        .and_then(decode_uleb128)
        .ok_or_else(|| err!(TruncatedFile, "Unexpected end of stream reading uleb128 at index {}", *ix))?;
    *ix += size;
    Ok(val)
}

pub(crate) fn read_sleb128(bytes: &[u8], ix: &mut usize) -> Result<i32, DexError>
{
    let (val, size) = bytes
        .get(*ix..)
        .and_then(decode_sleb128)
        .ok_or_else(|| err!(TruncatedFile, "Unexpected end of stream reading sleb128 at index {}", *ix))?;
    *ix += size;
    Ok(val)
}

pub(crate) fn read_uleb128p1(bytes: &[u8], ix: &mut usize) -> Result<i32, DexError>
{
    let (val, size) = bytes
        .get(*ix..)
        .and_then(decode_uleb128p1)
        .ok_or_else(|| err!(TruncatedFile, "Unexpected end of stream reading uleb128p1 at index {}", *ix))?;
    *ix += size;
    Ok(val)
}

/// Borrows `length` bytes at `*ix` without copying them.
pub(crate) fn read_x<'a>(bytes: &'a [u8], ix: &mut usize, length: usize) -> Result<&'a [u8], DexError>
{
    let end = ix.checked_add(length).filter(|&end| end <= bytes.len());
    match end
    {
        Some(end) => {
            let v = &bytes[*ix..end];
            *ix = end;
            Ok(v)
        }
        None => fail!(TruncatedFile, "buffer too short for {} byte read at index {}", length, *ix),
    }
}
