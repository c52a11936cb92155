//! Streaming decoder for a `class_data_item`.
//!
//! The item holds four uleb128 counts followed by the members of each group:
//! static fields, instance fields, direct methods, virtual methods. Member
//! indices are delta encoded and the running index restarts at zero for every
//! group. [`ClassDataIterator`] walks the members one at a time without
//! buffering the class body.

use log::trace;

use crate::dex::access_flags::AccessFlags;
use crate::dex::error::{DexError, DexErrorKind};
use crate::dex::{read_uleb128, FieldIdx, MethodIdx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassDataHeader
{
    pub static_fields_size: u32,
    pub instance_fields_size: u32,
    pub direct_methods_size: u32,
    pub virtual_methods_size: u32,
}

impl ClassDataHeader
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<ClassDataHeader, DexError>
    {
        Ok(ClassDataHeader {
            static_fields_size: read_uleb128(bytes, ix)?,
            instance_fields_size: read_uleb128(bytes, ix)?,
            direct_methods_size: read_uleb128(bytes, ix)?,
            virtual_methods_size: read_uleb128(bytes, ix)?,
        })
    }

    fn group_size(&self, state: ClassDataState) -> u32
    {
        match state
        {
            ClassDataState::StaticFields => self.static_fields_size,
            ClassDataState::InstanceFields => self.instance_fields_size,
            ClassDataState::DirectMethods => self.direct_methods_size,
            ClassDataState::VirtualMethods => self.virtual_methods_size,
            ClassDataState::Exhausted => 0,
        }
    }
}

/// Which group the next member comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassDataState
{
    StaticFields,
    InstanceFields,
    DirectMethods,
    VirtualMethods,
    Exhausted,
}

impl ClassDataState
{
    fn successor(self) -> ClassDataState
    {
        match self
        {
            ClassDataState::StaticFields => ClassDataState::InstanceFields,
            ClassDataState::InstanceFields => ClassDataState::DirectMethods,
            ClassDataState::DirectMethods => ClassDataState::VirtualMethods,
            ClassDataState::VirtualMethods | ClassDataState::Exhausted => ClassDataState::Exhausted,
        }
    }

    fn is_field_group(self) -> bool
    {
        matches!(self, ClassDataState::StaticFields | ClassDataState::InstanceFields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedField
{
    pub field_idx: FieldIdx,
    pub access_flags: AccessFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedMethod
{
    pub method_idx: MethodIdx,
    pub access_flags: AccessFlags,
    /// Offset of the method's code_item; `None` for abstract and native methods.
    pub code_off: Option<u32>,
}

/// One decoded member, tagged with the group it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassMember
{
    StaticField(EncodedField),
    InstanceField(EncodedField),
    DirectMethod(EncodedMethod),
    VirtualMethod(EncodedMethod),
}

impl ClassMember
{
    /// Index into field_ids for fields, method_ids for methods.
    pub fn index(&self) -> u32
    {
        match self
        {
            ClassMember::StaticField(f) | ClassMember::InstanceField(f) => f.field_idx,
            ClassMember::DirectMethod(m) | ClassMember::VirtualMethod(m) => m.method_idx,
        }
    }

    pub fn access_flags(&self) -> AccessFlags
    {
        match self
        {
            ClassMember::StaticField(f) | ClassMember::InstanceField(f) => f.access_flags,
            ClassMember::DirectMethod(m) | ClassMember::VirtualMethod(m) => m.access_flags,
        }
    }

    pub fn code_off(&self) -> Option<u32>
    {
        match self
        {
            ClassMember::DirectMethod(m) | ClassMember::VirtualMethod(m) => m.code_off,
            _ => None,
        }
    }

    pub fn is_field(&self) -> bool
    {
        matches!(self, ClassMember::StaticField(_) | ClassMember::InstanceField(_))
    }

    pub fn is_method(&self) -> bool
    {
        !self.is_field()
    }
}

/// Forward-only cursor over one class's members.
///
/// Each instance owns its position; create a new one to start over. Use
/// [`ClassDataIterator::advance`] for explicit stepping, or the `Iterator`
/// impl which stops cleanly at the end and after the first error.
#[derive(Debug, Clone)]
pub struct ClassDataIterator<'a>
{
    bytes: &'a [u8],
    pos: usize,
    header: ClassDataHeader,
    state: ClassDataState,
    remaining: u32,
    last_idx: Option<u32>,
    current: Option<ClassMember>,
    field_limit: u32,
    method_limit: u32,
}

impl<'a> ClassDataIterator<'a>
{
    /// Reads the counts of the class_data_item at `class_data_off`. A class
    /// without class data yields an iterator that is already exhausted.
    ///
    /// Decoded field indices must be below `field_limit` and method indices
    /// below `method_limit` (the sizes of field_ids and method_ids).
    pub fn new(bytes: &'a [u8], class_data_off: Option<u32>, field_limit: u32, method_limit: u32) -> Result<Self, DexError>
    {
        let mut it = ClassDataIterator {
            bytes,
            pos: 0,
            header: ClassDataHeader::default(),
            state: ClassDataState::Exhausted,
            remaining: 0,
            last_idx: None,
            current: None,
            field_limit,
            method_limit,
        };
        let Some(off) = class_data_off else {
            return Ok(it);
        };

        it.pos = off as usize;
        it.header = ClassDataHeader::read(bytes, &mut it.pos)
            .map_err(|e| e.reclassify(DexErrorKind::MalformedClassData, format!("class_data_item header at 0x{:x}", off)))?;
        it.state = ClassDataState::StaticFields;
        it.remaining = it.header.static_fields_size;
        it.settle();
        Ok(it)
    }

    /// Moves past empty groups so `state` always names a group with members left.
    fn settle(&mut self)
    {
        while self.remaining == 0 && self.state != ClassDataState::Exhausted {
            self.state = self.state.successor();
            self.remaining = self.header.group_size(self.state);
            self.last_idx = None;
            trace!("class data at 0x{:x} entering {:?} ({} members)", self.pos, self.state, self.remaining);
        }
    }

    pub fn header(&self) -> &ClassDataHeader
    {
        &self.header
    }

    pub fn num_static_fields(&self) -> u32
    {
        self.header.static_fields_size
    }

    pub fn num_instance_fields(&self) -> u32
    {
        self.header.instance_fields_size
    }

    pub fn num_direct_methods(&self) -> u32
    {
        self.header.direct_methods_size
    }

    pub fn num_virtual_methods(&self) -> u32
    {
        self.header.virtual_methods_size
    }

    pub fn state(&self) -> ClassDataState
    {
        self.state
    }

    pub fn has_next(&self) -> bool
    {
        self.state != ClassDataState::Exhausted
    }

    /// The member last returned by `advance`.
    pub fn current(&self) -> Option<&ClassMember>
    {
        self.current.as_ref()
    }

    pub fn current_member_index(&self) -> Option<u32>
    {
        self.current.map(|m| m.index())
    }

    pub fn current_access_flags(&self) -> Option<AccessFlags>
    {
        self.current.map(|m| m.access_flags())
    }

    pub fn current_code_offset(&self) -> Option<u32>
    {
        self.current.and_then(|m| m.code_off())
    }

    /// Decodes the next member.
    ///
    /// Fails with `IteratorExhausted` once every group has been consumed, and
    /// with `MalformedClassData` if the member overruns the buffer or its index
    /// is out of range or not increasing. After an error the iterator is
    /// exhausted.
    pub fn advance(&mut self) -> Result<ClassMember, DexError>
    {
        if self.state == ClassDataState::Exhausted {
            fail!(IteratorExhausted, "advance() called on an exhausted class data iterator");
        }

        match self.decode_member() {
            Ok(member) => {
                self.current = Some(member);
                self.remaining -= 1;
                self.settle();
                Ok(member)
            }
            Err(e) => {
                self.state = ClassDataState::Exhausted;
                self.remaining = 0;
                Err(e)
            }
        }
    }

    fn decode_member(&mut self) -> Result<ClassMember, DexError>
    {
        let start = self.pos;
        let context = || format!("{:?} member at 0x{:x}", self.state, start);

        let delta = read_uleb128(self.bytes, &mut self.pos)
            .map_err(|e| e.reclassify(DexErrorKind::MalformedClassData, context()))?;
        let idx = match self.last_idx {
            None => delta,
            Some(_) if delta == 0 => {
                fail!(MalformedClassData, "member index does not increase at 0x{:x}", start);
            }
            Some(prev) => prev.checked_add(delta)
                .ok_or_else(|| err!(MalformedClassData, "member index overflows at 0x{:x}", start))?,
        };
        let access_flags = AccessFlags::from_raw(read_uleb128(self.bytes, &mut self.pos)
            .map_err(|e| e.reclassify(DexErrorKind::MalformedClassData, context()))?);

        let limit = if self.state.is_field_group() { self.field_limit } else { self.method_limit };
        if idx >= limit {
            fail!(MalformedClassData, "{:?} member index {} at 0x{:x} is out of range ({})", self.state, idx, start, limit);
        }
        self.last_idx = Some(idx);

        let member = match self.state {
            ClassDataState::StaticFields => ClassMember::StaticField(EncodedField { field_idx: idx, access_flags }),
            ClassDataState::InstanceFields => ClassMember::InstanceField(EncodedField { field_idx: idx, access_flags }),
            ClassDataState::DirectMethods | ClassDataState::VirtualMethods => {
                let code_off = read_uleb128(self.bytes, &mut self.pos)
                    .map_err(|e| e.reclassify(DexErrorKind::MalformedClassData, context()))?;
                let method = EncodedMethod { method_idx: idx, access_flags, code_off: (code_off != 0).then_some(code_off) };
                if self.state == ClassDataState::DirectMethods {
                    ClassMember::DirectMethod(method)
                } else {
                    ClassMember::VirtualMethod(method)
                }
            }
            ClassDataState::Exhausted => fail!(IteratorExhausted, "no member group left"),
        };
        Ok(member)
    }
}

impl Iterator for ClassDataIterator<'_>
{
    type Item = Result<ClassMember, DexError>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if !self.has_next() {
            return None;
        }
        Some(self.advance())
    }
}
