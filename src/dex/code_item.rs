/* code_item and the structures hanging off it */

use crate::dex::error::{DexError, DexErrorKind};
use crate::dex::{read_sleb128, read_u2, read_u4, read_uleb128, read_uleb128p1, read_x, StringIdx, TypeIdx};

const CODE_ITEM_HEADER_SIZE: usize = 16;
const TRY_ITEM_SIZE: usize = 8;

fn malformed(e: DexError, off: usize) -> DexError
{
    e.reclassify(DexErrorKind::MalformedCodeItem, format!("code_item at 0x{:x}", off))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryItem {
    pub start_addr: u32,
    pub insn_count: u16,
    pub handler_off: u16, // offset (in bytes) into the encoded_catch_handler_list
}

impl TryItem {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<TryItem, DexError> {
        Ok(TryItem {
            start_addr: read_u4(bytes, ix)?,
            insn_count: read_u2(bytes, ix)?,
            handler_off: read_u2(bytes, ix)?,
        })
    }

    /// Whether the code unit address `addr` lies inside this try block.
    pub fn covers(&self, addr: u32) -> bool {
        addr >= self.start_addr && (addr - self.start_addr) < self.insn_count as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAddrPair {
    pub type_idx: TypeIdx,
    pub addr: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchHandler {
    pub handlers: Vec<TypeAddrPair>,
    pub catch_all_addr: Option<u32>,
}

impl CatchHandler {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<CatchHandler, DexError> {
        let size = read_sleb128(bytes, ix)?;
        let count = size.unsigned_abs() as usize;
        // Every pair takes at least two bytes.
        if count > bytes.len().saturating_sub(*ix) / 2 {
            fail!(MalformedCodeItem, "encoded_catch_handler at 0x{:x} claims {} handlers", *ix, count);
        }
        let mut handlers = Vec::with_capacity(count);
        for _ in 0..count {
            let type_idx = read_uleb128(bytes, ix)?;
            let addr = read_uleb128(bytes, ix)?;
            handlers.push(TypeAddrPair { type_idx, addr });
        }
        let catch_all_addr = if size <= 0 { Some(read_uleb128(bytes, ix)?) } else { None };
        Ok(CatchHandler { handlers, catch_all_addr })
    }
}

/// The leading fields of a debug_info_item; the state machine bytecode that
/// follows is not decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugInfoHeader
{
    pub line_start: u32,
    pub parameter_names: Vec<Option<StringIdx>>,
}

impl DebugInfoHeader
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<DebugInfoHeader, DexError>
    {
        let line_start = read_uleb128(bytes, ix)?;
        let parameters_size = read_uleb128(bytes, ix)? as usize;
        if parameters_size > bytes.len().saturating_sub(*ix) {
            fail!(MalformedCodeItem, "debug_info_item at 0x{:x} claims {} parameters", *ix, parameters_size);
        }
        let mut parameter_names = Vec::with_capacity(parameters_size);
        for _ in 0..parameters_size {
            let idx = read_uleb128p1(bytes, ix)?;   // -1 => NO_INDEX
            parameter_names.push((idx >= 0).then_some(idx as StringIdx));
        }
        Ok(DebugInfoHeader { line_start, parameter_names })
    }
}

/// A borrowed view of a method's code_item.
#[derive(Debug, Clone, Copy)]
pub struct CodeItem<'a>
{
    file: &'a [u8],
    offset: u32,
    pub registers_size: u16,
    pub ins_size: u16,
    pub outs_size: u16,
    pub tries_size: u16,
    pub debug_info_off: Option<u32>,
    insns: &'a [u8],
    tries: &'a [u8],
    handlers_base: usize,
}

impl<'a> CodeItem<'a>
{
    /// Reads the code_item at `off`, checking that instructions, try items
    /// and the handler list size all lie inside the file.
    pub(crate) fn read(file: &'a [u8], off: u32) -> Result<CodeItem<'a>, DexError>
    {
        let start = off as usize;
        if start % 4 != 0 {
            fail!(MalformedCodeItem, "code_item offset 0x{:x} is not 4-byte aligned", off);
        }
        if start.saturating_add(CODE_ITEM_HEADER_SIZE) > file.len() {
            fail!(MalformedCodeItem, "code_item at 0x{:x} extends past the end of the file", off);
        }

        let mut ix = start;
        let registers_size = read_u2(file, &mut ix).map_err(|e| malformed(e, start))?;
        let ins_size = read_u2(file, &mut ix).map_err(|e| malformed(e, start))?;
        let outs_size = read_u2(file, &mut ix).map_err(|e| malformed(e, start))?;
        let tries_size = read_u2(file, &mut ix).map_err(|e| malformed(e, start))?;
        let debug_info_off = read_u4(file, &mut ix).map_err(|e| malformed(e, start))?;
        let insns_size = read_u4(file, &mut ix).map_err(|e| malformed(e, start))?;

        if ins_size > registers_size {
            fail!(MalformedCodeItem, "code_item at 0x{:x} has {} ins but {} registers", off, ins_size, registers_size);
        }

        let insns = read_x(file, &mut ix, insns_size as usize * 2).map_err(|e| malformed(e, start))?;

        let mut tries: &[u8] = &[];
        let mut handlers_base = ix;
        if tries_size > 0 {
            // Optional 2-byte padding if insns_size is odd
            if insns_size & 1 != 0 {
                read_u2(file, &mut ix).map_err(|e| malformed(e, start))?;
            }
            tries = read_x(file, &mut ix, tries_size as usize * TRY_ITEM_SIZE).map_err(|e| malformed(e, start))?;
            handlers_base = ix;
            read_uleb128(file, &mut ix).map_err(|e| malformed(e, start))?;
        }

        Ok(CodeItem {
            file,
            offset: off,
            registers_size,
            ins_size,
            outs_size,
            tries_size,
            debug_info_off: (debug_info_off != 0).then_some(debug_info_off),
            insns,
            tries,
            handlers_base,
        })
    }

    pub fn offset(&self) -> u32
    {
        self.offset
    }

    /// Instruction count in 16-bit code units.
    pub fn insns_size(&self) -> u32
    {
        (self.insns.len() / 2) as u32
    }

    pub fn insn_bytes(&self) -> &'a [u8]
    {
        self.insns
    }

    pub fn insns(&self) -> impl Iterator<Item = u16> + 'a
    {
        let insns: &'a [u8] = self.insns;
        insns.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]))
    }

    pub fn tries(&self) -> impl Iterator<Item = TryItem> + 'a
    {
        let tries: &'a [u8] = self.tries;
        tries.chunks_exact(TRY_ITEM_SIZE).filter_map(|chunk| {
            let mut ix = 0;
            TryItem::read(chunk, &mut ix).ok()
        })
    }

    /// Decodes the handler list entry a try item points at.
    pub fn catch_handler(&self, try_item: &TryItem) -> Result<CatchHandler, DexError>
    {
        if self.tries.is_empty() {
            fail!(MalformedCodeItem, "code_item at 0x{:x} has no try items", self.offset);
        }
        let mut ix = self.handlers_base + try_item.handler_off as usize;
        CatchHandler::read(self.file, &mut ix)
            .map_err(|e| e.reclassify(DexErrorKind::MalformedCodeItem, format!("catch handler of code_item at 0x{:x}", self.offset)))
    }

    pub fn debug_info(&self) -> Result<Option<DebugInfoHeader>, DexError>
    {
        let Some(off) = self.debug_info_off else {
            return Ok(None);
        };
        let mut ix = off as usize;
        DebugInfoHeader::read(self.file, &mut ix)
            .map(Some)
            .map_err(|e| e.reclassify(DexErrorKind::MalformedCodeItem, format!("debug_info_item at 0x{:x}", off)))
    }
}
