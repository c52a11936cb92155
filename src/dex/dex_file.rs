/* The open dex file: header, id tables and the on-demand resolvers */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dex::class_data::ClassDataIterator;
use crate::dex::code_item::CodeItem;
use crate::dex::error::DexError;
use crate::dex::header::Header;
use crate::dex::ids::{ClassDefItem, FieldIdItem, IdTable, MethodIdItem, ProtoIdItem, StringIdItem, TypeIdItem};
use crate::dex::strings::{DexStr, TypeList};
use crate::dex::{FieldIdx, MethodIdx, ProtoIdx, StringIdx, TypeIdx};

/// Knobs for [`DexFile::open_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DexOptions
{
    /// Recompute the Adler-32 checksum and reject the file on mismatch.
    pub verify_checksum: bool,
    /// Lowest accepted `dex\n0NN\0` version.
    pub min_version: u32,
    /// Highest accepted version.
    pub max_version: u32,
}

impl Default for DexOptions
{
    fn default() -> Self
    {
        DexOptions { verify_checksum: true, min_version: 35, max_version: 41 }
    }
}

/// A validated, borrowed view of a dex file.
///
/// Nothing is copied out of the buffer at open time beyond the header; every
/// record is decoded from `bytes` when asked for. The view is `Copy` and can be
/// shared between threads freely.
#[derive(Debug, Clone, Copy)]
pub struct DexFile<'a>
{
    bytes: &'a [u8],
    header: Header,
    string_ids: IdTable<'a, StringIdItem>,
    type_ids: IdTable<'a, TypeIdItem>,
    proto_ids: IdTable<'a, ProtoIdItem>,
    field_ids: IdTable<'a, FieldIdItem>,
    method_ids: IdTable<'a, MethodIdItem>,
    class_defs: IdTable<'a, ClassDefItem>,
}

impl<'a> DexFile<'a>
{
    pub fn open(bytes: &'a [u8]) -> Result<DexFile<'a>, DexError>
    {
        DexFile::open_with(bytes, &DexOptions::default())
    }

    pub fn open_with(bytes: &'a [u8], options: &DexOptions) -> Result<DexFile<'a>, DexError>
    {
        let header = Header::parse(bytes, options)?;
        // Trailing bytes past file_size are not part of the file.
        let bytes = &bytes[..header.file_size as usize];
        let [strings, types, protos, fields, methods, classes] = header.sections();

        let dex = DexFile {
            bytes,
            header,
            string_ids: IdTable::new(bytes, &strings)?,
            type_ids: IdTable::new(bytes, &types)?,
            proto_ids: IdTable::new(bytes, &protos)?,
            field_ids: IdTable::new(bytes, &fields)?,
            method_ids: IdTable::new(bytes, &methods)?,
            class_defs: IdTable::new(bytes, &classes)?,
        };
        debug!(
            "opened dex v{:03} ({} bytes): {} strings, {} types, {} protos, {} fields, {} methods, {} classes",
            header.version().unwrap_or(0),
            header.file_size,
            dex.string_ids.len(),
            dex.type_ids.len(),
            dex.proto_ids.len(),
            dex.field_ids.len(),
            dex.method_ids.len(),
            dex.class_defs.len()
        );
        Ok(dex)
    }

    pub fn header(&self) -> &Header
    {
        &self.header
    }

    pub fn version(&self) -> u32
    {
        self.header.version().unwrap_or(0)
    }

    /// The file bytes, `file_size` long.
    pub fn bytes(&self) -> &'a [u8]
    {
        self.bytes
    }

    pub fn string_ids(&self) -> IdTable<'a, StringIdItem> { self.string_ids }
    pub fn type_ids(&self) -> IdTable<'a, TypeIdItem> { self.type_ids }
    pub fn proto_ids(&self) -> IdTable<'a, ProtoIdItem> { self.proto_ids }
    pub fn field_ids(&self) -> IdTable<'a, FieldIdItem> { self.field_ids }
    pub fn method_ids(&self) -> IdTable<'a, MethodIdItem> { self.method_ids }
    pub fn class_defs(&self) -> IdTable<'a, ClassDefItem> { self.class_defs }

    pub fn string_id(&self, idx: StringIdx) -> Result<StringIdItem, DexError> { self.string_ids.get(idx) }
    pub fn type_id(&self, idx: TypeIdx) -> Result<TypeIdItem, DexError> { self.type_ids.get(idx) }
    pub fn proto_id(&self, idx: ProtoIdx) -> Result<ProtoIdItem, DexError> { self.proto_ids.get(idx) }
    pub fn field_id(&self, idx: FieldIdx) -> Result<FieldIdItem, DexError> { self.field_ids.get(idx) }
    pub fn method_id(&self, idx: MethodIdx) -> Result<MethodIdItem, DexError> { self.method_ids.get(idx) }
    pub fn class_def(&self, idx: u32) -> Result<ClassDefItem, DexError> { self.class_defs.get(idx) }

    pub fn num_class_defs(&self) -> u32
    {
        self.class_defs.len()
    }

    /// Decodes the string_data_item a string id points at.
    pub fn string_data(&self, item: &StringIdItem) -> Result<DexStr<'a>, DexError>
    {
        DexStr::read(self.bytes, item.string_data_off)
    }

    pub fn string_at(&self, idx: StringIdx) -> Result<DexStr<'a>, DexError>
    {
        let item = self.string_ids.get(idx)?;
        self.string_data(&item)
            .map_err(|e| DexError::with_context(e, format!("string_ids[{}]", idx)))
    }

    /// Descriptor of a type id, e.g. `Ljava/lang/Object;` or `[I`.
    pub fn type_descriptor(&self, idx: TypeIdx) -> Result<DexStr<'a>, DexError>
    {
        let item = self.type_ids.get(idx)?;
        self.string_at(item.descriptor_idx)
    }

    /// The type_list at `off`; no offset is the empty list.
    pub fn type_list_at(&self, off: Option<u32>) -> Result<TypeList<'a>, DexError>
    {
        match off {
            None | Some(0) => Ok(TypeList::empty()),
            Some(off) => TypeList::read(self.bytes, off, self.type_ids.len()),
        }
    }

    pub fn proto_parameters(&self, proto: &ProtoIdItem) -> Result<TypeList<'a>, DexError>
    {
        self.type_list_at(proto.parameters_off)
    }

    pub fn class_descriptor(&self, class_def: &ClassDefItem) -> Result<DexStr<'a>, DexError>
    {
        self.type_descriptor(class_def.class_idx)
    }

    /// `None` for `java.lang.Object` and other roots.
    pub fn superclass_descriptor(&self, class_def: &ClassDefItem) -> Result<Option<DexStr<'a>>, DexError>
    {
        class_def.superclass_idx.map(|idx| self.type_descriptor(idx)).transpose()
    }

    pub fn interfaces(&self, class_def: &ClassDefItem) -> Result<TypeList<'a>, DexError>
    {
        self.type_list_at(class_def.interfaces_off)
    }

    pub fn source_file(&self, class_def: &ClassDefItem) -> Result<Option<DexStr<'a>>, DexError>
    {
        class_def.source_file_idx.map(|idx| self.string_at(idx)).transpose()
    }

    /// A fresh member cursor over the class's class_data_item.
    pub fn class_data(&self, class_def: &ClassDefItem) -> Result<ClassDataIterator<'a>, DexError>
    {
        ClassDataIterator::new(self.bytes, class_def.class_data_off, self.field_ids.len(), self.method_ids.len())
    }

    pub fn code_item(&self, code_off: u32) -> Result<CodeItem<'a>, DexError>
    {
        CodeItem::read(self.bytes, code_off)
    }
}
