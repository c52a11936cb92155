use crate::dex::{DexErrorKind, DexFile, DexOptions, NO_INDEX};
use crate::tests::fixture::{fix_checksum, nested_dex, put_u4};

// Nested.dex layout
const STRING_IDS_OFF: usize = 112;
const TYPE_IDS_OFF: usize = 172;
const PROTO_IDS_OFF: usize = 200;
const CLASS_DEFS_OFF: usize = 256;
const PROTO1_PARAMS: usize = PROTO_IDS_OFF + 12 + 8;
const TYPE_LIST_OFF: usize = 0x1a8;
const OUTER_CLASS_DATA: usize = 696;

fn patched(edit: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut bytes = nested_dex();
    edit(&mut bytes);
    fix_checksum(&mut bytes);
    bytes
}

#[test]
fn corrupt_file_is_rejected_on_open() {
    let mut bytes = nested_dex();
    bytes[0x200] ^= 0x10;
    assert_eq!(DexFile::open(&bytes).unwrap_err().kind(), DexErrorKind::ChecksumMismatch);

    let options = DexOptions { verify_checksum: false, ..DexOptions::default() };
    assert!(DexFile::open_with(&bytes, &options).is_ok());

    let bytes = nested_dex();
    let options = DexOptions { min_version: 37, ..DexOptions::default() };
    assert_eq!(DexFile::open_with(&bytes, &options).unwrap_err().kind(), DexErrorKind::MalformedHeader);
}

#[test]
fn string_offset_past_end() {
    let bytes = patched(|b| put_u4(b, STRING_IDS_OFF, 0xffff_fff0));
    let dex = DexFile::open(&bytes).unwrap();

    let e = dex.string_at(0).unwrap_err();
    assert_eq!(e.kind(), DexErrorKind::MalformedString);
    assert!(e.to_string().contains("string_ids[0]"), "{}", e);

    // The search reaches the broken entry and gives up; other keys still resolve.
    assert_eq!(dex.find_string_id("<init>"), None);
    assert_eq!(dex.find_string_id("value"), Some(14));
}

#[test]
fn string_without_terminator() {
    // Point the last string at the final byte of the file, which is not 0.
    let bytes = nested_dex();
    let last = (0..bytes.len()).rev().find(|&i| bytes[i] != 0 && bytes[i] < 0x80).unwrap();
    let bytes = patched(|b| put_u4(b, STRING_IDS_OFF + 14 * 4, last as u32));
    let dex = DexFile::open(&bytes).unwrap();
    assert_eq!(dex.string_at(14).unwrap_err().kind(), DexErrorKind::MalformedString);
}

#[test]
fn type_list_past_end() {
    let bytes = patched(|b| put_u4(b, PROTO1_PARAMS, 0x1000));
    let dex = DexFile::open(&bytes).unwrap();

    let e = dex.method_signature(1).unwrap_err();
    assert_eq!(e.kind(), DexErrorKind::MalformedTypeList);
    assert_eq!(dex.method_signature(0).unwrap(), "()V");
    assert_eq!(dex.find_proto_by_signature("(LNested;)V"), None);
}

#[test]
fn unaligned_type_list() {
    let bytes = patched(|b| put_u4(b, PROTO1_PARAMS, TYPE_LIST_OFF as u32 + 1));
    let dex = DexFile::open(&bytes).unwrap();
    let proto = dex.proto_id(1).unwrap();
    assert_eq!(dex.proto_parameters(&proto).unwrap_err().kind(), DexErrorKind::MalformedTypeList);
}

#[test]
fn type_list_entry_out_of_range() {
    let bytes = patched(|b| b[TYPE_LIST_OFF + 4..TYPE_LIST_OFF + 6].copy_from_slice(&0x99u16.to_le_bytes()));
    let dex = DexFile::open(&bytes).unwrap();
    assert_eq!(dex.method_signature(1).unwrap_err().kind(), DexErrorKind::MalformedTypeList);
}

#[test]
fn dangling_indices() {
    let bytes = patched(|b| put_u4(b, TYPE_IDS_OFF, 99));
    let dex = DexFile::open(&bytes).unwrap();

    assert_eq!(dex.type_descriptor(0).unwrap_err().kind(), DexErrorKind::IndexOutOfRange);
    assert_eq!(dex.type_descriptor(NO_INDEX).unwrap_err().kind(), DexErrorKind::IndexOutOfRange);
    // Method 0 is declared by type 0.
    assert_eq!(dex.method_descriptor(0).unwrap_err().kind(), DexErrorKind::IndexOutOfRange);
    if let Some(i) = dex.find_type_id(3) {
        assert!(i < dex.type_ids().len());
    }
}

#[test]
fn unsorted_strings_stay_in_bounds() {
    let bytes = patched(|b| {
        let first = STRING_IDS_OFF;
        let last = STRING_IDS_OFF + 14 * 4;
        let a: [u8; 4] = b[first..first + 4].try_into().unwrap();
        let z: [u8; 4] = b[last..last + 4].try_into().unwrap();
        b[first..first + 4].copy_from_slice(&z);
        b[last..last + 4].copy_from_slice(&a);
    });
    let dex = DexFile::open(&bytes).unwrap();

    for i in 0..dex.string_ids().len() {
        let s = dex.string_at(i).unwrap().to_string();
        if let Some(found) = dex.find_string_id(&s) {
            assert!(found < dex.string_ids().len());
            assert_eq!(dex.string_at(found).unwrap(), s.as_str());
        }
    }
}

#[test]
fn class_data_past_end() {
    let bytes = patched(|b| put_u4(b, CLASS_DEFS_OFF + 24, 0x2000));
    let dex = DexFile::open(&bytes).unwrap();
    let class_def = dex.class_def(0).unwrap();
    assert_eq!(dex.class_data(&class_def).unwrap_err().kind(), DexErrorKind::MalformedClassData);
}

#[test]
fn class_data_index_out_of_range() {
    // The outer class's only direct method, delta 1 -> 5 (3 method ids).
    let bytes = patched(|b| b[OUTER_CLASS_DATA + 4] = 5);
    let dex = DexFile::open(&bytes).unwrap();
    let class_def = dex.class_def(1).unwrap();

    let mut it = dex.class_data(&class_def).unwrap();
    assert_eq!(it.num_direct_methods(), 1);
    let e = it.next().unwrap().unwrap_err();
    assert_eq!(e.kind(), DexErrorKind::MalformedClassData);
    assert!(it.next().is_none());
    assert_eq!(it.advance().unwrap_err().kind(), DexErrorKind::IteratorExhausted);
}

#[test]
fn bad_code_item_offsets() {
    let bytes = nested_dex();
    let dex = DexFile::open(&bytes).unwrap();
    assert_eq!(dex.code_item(341).unwrap_err().kind(), DexErrorKind::MalformedCodeItem);
    assert_eq!(dex.code_item(900).unwrap_err().kind(), DexErrorKind::MalformedCodeItem);
    assert!(dex.code_item(368).is_ok());
}
