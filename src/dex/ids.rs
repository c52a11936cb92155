/* Fixed-size id records and the tables that hold them */

use std::fmt;
use std::marker::PhantomData;

use crate::dex::access_flags::AccessFlags;
use crate::dex::error::DexError;
use crate::dex::header::{
    Section, CLASS_DEF_ITEM_SIZE, FIELD_ID_ITEM_SIZE, METHOD_ID_ITEM_SIZE, PROTO_ID_ITEM_SIZE,
    STRING_ID_ITEM_SIZE, TYPE_ID_ITEM_SIZE,
};
use crate::dex::{read_u2, read_u4, ProtoIdx, StringIdx, TypeIdx, NO_INDEX};

/// A record with a fixed on-disk stride inside one of the id tables.
pub trait IdItem: Sized + Copy
{
    const SIZE: usize;
    const NAME: &'static str;

    fn read(bytes: &[u8], ix: &mut usize) -> Result<Self, DexError>;
}

fn offset_or_none(off: u32) -> Option<u32>
{
    (off != 0).then_some(off)
}

fn index_or_none(idx: u32) -> Option<u32>
{
    (idx != NO_INDEX).then_some(idx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringIdItem {
    pub string_data_off: u32,
}

impl IdItem for StringIdItem
{
    const SIZE: usize = STRING_ID_ITEM_SIZE;
    const NAME: &'static str = "string_ids";

    fn read(bytes: &[u8], ix: &mut usize) -> Result<StringIdItem, DexError>
    {
        Ok(StringIdItem { string_data_off: read_u4(bytes, ix)? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeIdItem {
    pub descriptor_idx: StringIdx,
}

impl IdItem for TypeIdItem
{
    const SIZE: usize = TYPE_ID_ITEM_SIZE;
    const NAME: &'static str = "type_ids";

    fn read(bytes: &[u8], ix: &mut usize) -> Result<TypeIdItem, DexError>
    {
        Ok(TypeIdItem { descriptor_idx: read_u4(bytes, ix)? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoIdItem {
    // The proto_id_item struct
    pub shorty_idx: StringIdx,
    pub return_type_idx: TypeIdx,
    /// Offset of the parameter `type_list`, `None` for a method without parameters.
    pub parameters_off: Option<u32>,
}

impl IdItem for ProtoIdItem
{
    const SIZE: usize = PROTO_ID_ITEM_SIZE;
    const NAME: &'static str = "proto_ids";

    fn read(bytes: &[u8], ix: &mut usize) -> Result<ProtoIdItem, DexError>
    {
        Ok(ProtoIdItem {
            shorty_idx: read_u4(bytes, ix)?,
            return_type_idx: read_u4(bytes, ix)?,
            parameters_off: offset_or_none(read_u4(bytes, ix)?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIdItem {
    // The field_id_item struct
    pub class_idx: TypeIdx,
    pub type_idx: TypeIdx,
    pub name_idx: StringIdx,
}

impl IdItem for FieldIdItem
{
    const SIZE: usize = FIELD_ID_ITEM_SIZE;
    const NAME: &'static str = "field_ids";

    fn read(bytes: &[u8], ix: &mut usize) -> Result<FieldIdItem, DexError>
    {
        Ok(FieldIdItem {
            class_idx: read_u2(bytes, ix)? as TypeIdx,
            type_idx: read_u2(bytes, ix)? as TypeIdx,
            name_idx: read_u4(bytes, ix)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodIdItem {
    // The method_id_item struct
    pub class_idx: TypeIdx,
    pub proto_idx: ProtoIdx,
    pub name_idx: StringIdx,
}

impl IdItem for MethodIdItem
{
    const SIZE: usize = METHOD_ID_ITEM_SIZE;
    const NAME: &'static str = "method_ids";

    fn read(bytes: &[u8], ix: &mut usize) -> Result<MethodIdItem, DexError>
    {
        Ok(MethodIdItem {
            class_idx: read_u2(bytes, ix)? as TypeIdx,
            proto_idx: read_u2(bytes, ix)? as ProtoIdx,
            name_idx: read_u4(bytes, ix)?,
        })
    }
}

/// A class_def_item. Referenced sections are kept as offsets and resolved
/// through [`crate::dex::DexFile`] on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDefItem {
    pub class_idx: TypeIdx,
    pub access_flags: AccessFlags,
    pub superclass_idx: Option<TypeIdx>,
    pub interfaces_off: Option<u32>,
    pub source_file_idx: Option<StringIdx>,
    pub annotations_off: Option<u32>,
    pub class_data_off: Option<u32>,
    pub static_values_off: Option<u32>,
}

impl IdItem for ClassDefItem
{
    const SIZE: usize = CLASS_DEF_ITEM_SIZE;
    const NAME: &'static str = "class_defs";

    fn read(bytes: &[u8], ix: &mut usize) -> Result<ClassDefItem, DexError>
    {
        Ok(ClassDefItem {
            class_idx: read_u4(bytes, ix)?,
            access_flags: AccessFlags::from_raw(read_u4(bytes, ix)?),
            superclass_idx: index_or_none(read_u4(bytes, ix)?),
            interfaces_off: offset_or_none(read_u4(bytes, ix)?),
            source_file_idx: index_or_none(read_u4(bytes, ix)?),
            annotations_off: offset_or_none(read_u4(bytes, ix)?),
            class_data_off: offset_or_none(read_u4(bytes, ix)?),
            static_values_off: offset_or_none(read_u4(bytes, ix)?),
        })
    }
}

/// One id table: a borrowed run of `len` fixed-stride records.
pub struct IdTable<'a, T>
{
    bytes: &'a [u8],
    len: u32,
    _marker: PhantomData<T>,
}

// Manual impls: a derive would require `T: Clone`.
impl<T> Clone for IdTable<'_, T>
{
    fn clone(&self) -> Self
    {
        *self
    }
}

impl<T> Copy for IdTable<'_, T> {}

impl<T: IdItem> fmt::Debug for IdTable<'_, T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("IdTable").field("name", &T::NAME).field("len", &self.len).finish()
    }
}

impl<'a, T: IdItem + 'a> IdTable<'a, T>
{
    /// Slices the table out of `file`. The header must already have checked
    /// that the section lies inside the file.
    pub(crate) fn new(file: &'a [u8], section: &Section) -> Result<Self, DexError>
    {
        if section.size == 0 {
            return Ok(IdTable { bytes: &[], len: 0, _marker: PhantomData });
        }
        let bytes = section.byte_range()
            .and_then(|r| file.get(r))
            .ok_or_else(|| err!(MalformedHeader, "{} table lies outside the file", T::NAME))?;
        Ok(IdTable { bytes, len: section.size, _marker: PhantomData })
    }

    pub fn len(&self) -> u32
    {
        self.len
    }

    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    pub fn get(&self, idx: u32) -> Result<T, DexError>
    {
        if idx >= self.len {
            fail!(IndexOutOfRange, "{}[{}] out of range (size {})", T::NAME, idx, self.len);
        }
        let mut ix = idx as usize * T::SIZE;
        T::read(self.bytes, &mut ix)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a
    {
        let table = *self;
        (0..table.len).filter_map(move |i| table.get(i).ok())
    }
}
