//! Method signatures and member descriptors built from the id tables.
//!
//! Descriptors are copied verbatim from the string table; the only thing
//! added is the `(`, `)`, `->` and `:` punctuation.

use crate::dex::dex_file::DexFile;
use crate::dex::error::DexError;
use crate::dex::ids::ProtoIdItem;
use crate::dex::strings::DexStr;
use crate::dex::{FieldIdx, MethodIdx, ProtoIdx};

/// Length in bytes of the single type descriptor at the start of `s`.
fn descriptor_len(s: &str) -> Option<usize>
{
    let b = s.as_bytes();
    let mut i = 0;
    while b.get(i) == Some(&b'[') {
        i += 1;
    }
    match b.get(i)? {
        b'Z' | b'B' | b'S' | b'C' | b'I' | b'J' | b'F' | b'D' => Some(i + 1),
        b'V' if i == 0 => Some(1),
        b'L' => {
            let end = s[i..].find(';')?;
            (end > 1).then_some(i + end + 1)
        }
        _ => None,
    }
}

/// Splits `(IDJLjava/lang/Object;)Ljava/lang/Float;` into its parameter
/// descriptors and return descriptor. Returns `None` for anything that is
/// not a well formed method descriptor.
pub fn split_method_signature(signature: &str) -> Option<(Vec<&str>, &str)>
{
    let inner = signature.strip_prefix('(')?;
    let close = inner.find(')')?;
    let (mut rest, ret) = (&inner[..close], &inner[close + 1..]);

    let mut params = vec![];
    while !rest.is_empty() {
        let len = descriptor_len(rest)?;
        let (param, tail) = rest.split_at(len);
        if param == "V" {
            return None;
        }
        params.push(param);
        rest = tail;
    }

    (descriptor_len(ret)? == ret.len()).then_some((params, ret))
}

impl<'a> DexFile<'a>
{
    /// Builds `(params)return` for a prototype, e.g. `(ZSC)LFoo;`.
    pub fn proto_signature(&self, proto: &ProtoIdItem) -> Result<String, DexError>
    {
        let params = self.proto_parameters(proto)?;
        let mut s = String::from("(");
        for t in params.iter() {
            s.push_str(&self.type_descriptor(t)?.to_str()?);
        }
        s.push(')');
        s.push_str(&self.type_descriptor(proto.return_type_idx)?.to_str()?);
        Ok(s)
    }

    pub fn method_signature(&self, proto_idx: ProtoIdx) -> Result<String, DexError>
    {
        let proto = self.proto_id(proto_idx)?;
        self.proto_signature(&proto)
    }

    pub fn proto_shorty(&self, proto_idx: ProtoIdx) -> Result<DexStr<'a>, DexError>
    {
        let proto = self.proto_id(proto_idx)?;
        self.string_at(proto.shorty_idx)
    }

    pub fn method_name(&self, method_idx: MethodIdx) -> Result<DexStr<'a>, DexError>
    {
        let method = self.method_id(method_idx)?;
        self.string_at(method.name_idx)
    }

    pub fn field_name(&self, field_idx: FieldIdx) -> Result<DexStr<'a>, DexError>
    {
        let field = self.field_id(field_idx)?;
        self.string_at(field.name_idx)
    }

    /// Smali style method reference: `LFoo;->bar(I)V`.
    pub fn method_descriptor(&self, method_idx: MethodIdx) -> Result<String, DexError>
    {
        let method = self.method_id(method_idx)?;
        Ok(format!(
            "{}->{}{}",
            self.type_descriptor(method.class_idx)?.to_str()?,
            self.string_at(method.name_idx)?.to_str()?,
            self.method_signature(method.proto_idx)?
        ))
    }

    /// Smali style field reference: `LFoo;->count:I`.
    pub fn field_descriptor(&self, field_idx: FieldIdx) -> Result<String, DexError>
    {
        let field = self.field_id(field_idx)?;
        Ok(format!(
            "{}->{}:{}",
            self.type_descriptor(field.class_idx)?.to_str()?,
            self.string_at(field.name_idx)?.to_str()?,
            self.type_descriptor(field.type_idx)?.to_str()?
        ))
    }
}
