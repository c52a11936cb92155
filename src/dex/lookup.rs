//! Binary search over the sorted id tables.
//!
//! string_ids, type_ids, proto_ids, field_ids and method_ids are all stored in
//! a canonical order, so every `find_*` is one bounded binary search with a
//! per-table comparator. A probe that cannot be decoded ends the search as
//! "not found"; a table that is not actually sorted can give a wrong answer
//! but never an out of range one.

use std::cmp::Ordering;

use log::warn;

use crate::dex::dex_file::DexFile;
use crate::dex::error::DexError;
use crate::dex::ids::{FieldIdItem, MethodIdItem, TypeIdItem};
use crate::dex::signature::split_method_signature;
use crate::dex::strings::compare_mutf8_as_utf16;
use crate::dex::{FieldIdx, MethodIdx, ProtoIdx, StringIdx, TypeIdx};

/// Searches `[0, len)` for the entry `probe` reports as `Equal`. `probe(i)`
/// compares entry `i` against the key; `None` aborts the search.
pub fn binary_search_by<F>(len: u32, mut probe: F) -> Option<u32>
where
    F: FnMut(u32) -> Option<Ordering>,
{
    let mut lo = 0u32;
    let mut hi = len;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match probe(mid)? {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return Some(mid),
        }
    }
    None
}

pub fn compare_type_id(entry: &TypeIdItem, descriptor_idx: StringIdx) -> Ordering
{
    entry.descriptor_idx.cmp(&descriptor_idx)
}

/// Parameter lists compare element by element; a prefix sorts first.
pub fn compare_proto_parameters<A, B>(a: A, b: B) -> Ordering
where
    A: IntoIterator<Item = TypeIdx>,
    B: IntoIterator<Item = TypeIdx>,
{
    a.into_iter().cmp(b)
}

pub fn compare_proto<A>(return_type_idx: TypeIdx, parameters: A, key_return: TypeIdx, key_parameters: &[TypeIdx]) -> Ordering
where
    A: IntoIterator<Item = TypeIdx>,
{
    return_type_idx
        .cmp(&key_return)
        .then_with(|| compare_proto_parameters(parameters, key_parameters.iter().copied()))
}

pub fn compare_field_id(entry: &FieldIdItem, class_idx: TypeIdx, name_idx: StringIdx, type_idx: TypeIdx) -> Ordering
{
    (entry.class_idx, entry.name_idx, entry.type_idx).cmp(&(class_idx, name_idx, type_idx))
}

pub fn compare_method_id(entry: &MethodIdItem, class_idx: TypeIdx, name_idx: StringIdx, proto_idx: ProtoIdx) -> Ordering
{
    (entry.class_idx, entry.name_idx, entry.proto_idx).cmp(&(class_idx, name_idx, proto_idx))
}

/// Turns a failed probe into the end of the search.
fn probed<T>(table: &str, idx: u32, r: Result<T, DexError>) -> Option<T>
{
    match r {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("lookup in {} stopped at malformed entry {}: {}", table, idx, e);
            None
        }
    }
}

impl<'a> DexFile<'a>
{
    pub fn find_string_id(&self, s: &str) -> Option<StringIdx>
    {
        self.find_string_id_mutf8(&cesu8::to_java_cesu8(s))
    }

    /// Looks up a string by its Modified UTF-8 bytes (no terminator). This
    /// also reaches entries that are not valid Rust UTF-8, such as a lone
    /// surrogate.
    pub fn find_string_id_mutf8(&self, key: &[u8]) -> Option<StringIdx>
    {
        binary_search_by(self.string_ids().len(), |i| {
            let entry = probed("string_ids", i, self.string_at(i))?;
            Some(compare_mutf8_as_utf16(entry.as_bytes(), key))
        })
    }

    pub fn find_type_id(&self, descriptor_idx: StringIdx) -> Option<TypeIdx>
    {
        let types = self.type_ids();
        binary_search_by(types.len(), |i| {
            let entry = probed("type_ids", i, types.get(i))?;
            Some(compare_type_id(&entry, descriptor_idx))
        })
    }

    pub fn find_proto_id(&self, return_type_idx: TypeIdx, parameters: &[TypeIdx]) -> Option<ProtoIdx>
    {
        let protos = self.proto_ids();
        binary_search_by(protos.len(), |i| {
            let entry = probed("proto_ids", i, protos.get(i))?;
            let params = probed("proto_ids", i, self.proto_parameters(&entry))?;
            Some(compare_proto(entry.return_type_idx, params.iter(), return_type_idx, parameters))
        })
    }

    pub fn find_method_id(&self, class_idx: TypeIdx, name_idx: StringIdx, proto_idx: ProtoIdx) -> Option<MethodIdx>
    {
        let methods = self.method_ids();
        binary_search_by(methods.len(), |i| {
            let entry = probed("method_ids", i, methods.get(i))?;
            Some(compare_method_id(&entry, class_idx, name_idx, proto_idx))
        })
    }

    pub fn find_field_id(&self, class_idx: TypeIdx, name_idx: StringIdx, type_idx: TypeIdx) -> Option<FieldIdx>
    {
        let fields = self.field_ids();
        binary_search_by(fields.len(), |i| {
            let entry = probed("field_ids", i, fields.get(i))?;
            Some(compare_field_id(&entry, class_idx, name_idx, type_idx))
        })
    }

    /// Type index of a descriptor such as `Ljava/lang/String;`.
    pub fn find_type_by_descriptor(&self, descriptor: &str) -> Option<TypeIdx>
    {
        self.find_type_id(self.find_string_id(descriptor)?)
    }

    /// Index of the class_def defining `descriptor`. class_defs are not
    /// sorted, so this is a linear scan once the type is resolved.
    pub fn find_class_def(&self, descriptor: &str) -> Option<u32>
    {
        let type_idx = self.find_type_by_descriptor(descriptor)?;
        let classes = self.class_defs();
        (0..classes.len()).find(|&i| classes.get(i).map(|c| c.class_idx == type_idx).unwrap_or(false))
    }

    /// Proto index for a method descriptor like `(IJ)V`.
    pub fn find_proto_by_signature(&self, signature: &str) -> Option<ProtoIdx>
    {
        let (params, ret) = split_method_signature(signature)?;
        let return_type_idx = self.find_type_by_descriptor(ret)?;
        let parameters = params
            .into_iter()
            .map(|p| self.find_type_by_descriptor(p))
            .collect::<Option<Vec<_>>>()?;
        self.find_proto_id(return_type_idx, &parameters)
    }
}
