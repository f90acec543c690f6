//! End-to-end tests of the parse / bind / apply pipeline.

use std::path::PathBuf;
use thumbpatch::mask::MaskError;
use thumbpatch::patch::{PatchError, PatchSet};

const CODEBASE: u32 = 0x08004000;

/// A small synthetic firmware image with two unique signatures.
fn firmware() -> Vec<u8> {
    let mut binary = vec![0u8; 0x40];
    binary[0x10..0x18].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04]);
    binary[0x20..0x24].copy_from_slice(&[0xca, 0xfe, 0xba, 0xbe]);
    binary
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

#[test]
fn test_bind_then_apply_cross_block_references() {
    let source = "de ad be ef ?4 {\n\
                  \tglobal foo\n\
                  \tBL bar\n\
                  \tDCD bar\n\
                  }\n\
                  ca fe ba be {\n\
                  \tglobal bar\n\
                  \tNOP\n\
                  }\n";
    let mut set = PatchSet::new();
    set.load_str(source, "demo.pbp").unwrap();
    let patched = set.apply(firmware(), CODEBASE, false).unwrap();

    // BL from 0x08004010 to 0x08004020, then the address of bar as a constant.
    assert_eq!(&patched[0x10..0x14], &hex::decode("00f006f8").unwrap()[..]);
    assert_eq!(&patched[0x14..0x18], &hex::decode("20400008").unwrap()[..]);
    // Second block: a NOP over the start of the signature, the rest untouched.
    assert_eq!(&patched[0x20..0x24], &[0x00, 0xbf, 0xba, 0xbe]);
    assert_eq!(patched.len(), 0x40);
}

#[test]
fn test_include_places_blocks_in_library_scope() {
    let mut set = PatchSet::new();
    set.load(&fixture("demo.pbp")).unwrap();
    let patched = set.apply(firmware(), CODEBASE, false).unwrap();

    // The demo block calls the helper defined by the included library file.
    assert_eq!(&patched[0x10..0x14], &hex::decode("00f006f8").unwrap()[..]);
    assert_eq!(&patched[0x14..0x18], &hex::decode("20400008").unwrap()[..]);
    // The library block itself: proc marker is size 0, then NOP and BX LR.
    assert_eq!(&patched[0x20..0x24], &hex::decode("00bf7047").unwrap()[..]);
    assert_eq!(set.library().context().get("helper"), Some(&0x08004020));
}

#[test]
fn test_floating_block_uses_free_ranges() {
    let source = "{\n\
                  \tglobal table\n\
                  \tDCD 0x11223344\n\
                  \tDCW 0x5566\n\
                  }\n\
                  de ad be ef {\n\
                  \tDCD table\n\
                  }\n";
    let mut set = PatchSet::new();
    set.load_str(source, "float.pbp").unwrap();
    set.add_free_range(0x30, 0x40);
    let patched = set.apply(firmware(), CODEBASE, false).unwrap();

    assert_eq!(&patched[0x30..0x36], &hex::decode("443322116655").unwrap()[..]);
    // The anchored block stores the floating block's address.
    assert_eq!(&patched[0x10..0x14], &hex::decode("30400008").unwrap()[..]);
    assert_eq!(patched.len(), 0x40);
}

#[test]
fn test_append_space_grows_binary_and_restores_tail() {
    let source = "{\n\
                  \tDCD 0xaabbccdd\n\
                  }\n";
    let binary = firmware();
    let tail = binary[0x38..].to_vec();
    let mut set = PatchSet::new();
    set.load_str(source, "float.pbp").unwrap();
    set.append_space(&binary, 0x100, 8);
    let patched = set.apply(binary, CODEBASE, false).unwrap();

    // Block written at the old end of file, retained tail reattached after it.
    assert_eq!(patched.len(), 0x44 + 8);
    assert_eq!(&patched[0x40..0x44], &hex::decode("ddccbbaa").unwrap()[..]);
    assert_eq!(&patched[0x44..], &tail[..]);
}

#[test]
fn test_val_reads_original_binary() {
    let source = "de ad be ef {\n\
                  \tval orig\n\
                  \tDCD orig+1\n\
                  }\n";
    let mut set = PatchSet::new();
    set.load_str(source, "val.pbp").unwrap();
    let patched = set.apply(firmware(), CODEBASE, false).unwrap();

    // orig = little-endian word at the match position, plus one.
    assert_eq!(&patched[0x10..0x14], &hex::decode("dfadbeef").unwrap()[..]);
}

#[test]
fn test_mask_not_found() {
    let mut set = PatchSet::new();
    set.load_str("11 22 33 44 55 66 {\n\tNOP\n}\n", "nf.pbp").unwrap();
    match set.apply(firmware(), CODEBASE, false) {
        Err(PatchError::Mask(MaskError::NotFound(_))) => {}
        other => panic!("expected MaskNotFound, got {other:?}"),
    }
}

#[test]
fn test_ambiguous_mask() {
    let mut binary = firmware();
    // Duplicate the signature so the mask matches twice.
    binary[0x30..0x34].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    let mut set = PatchSet::new();
    set.load_str("de ad be ef {\n\tNOP\n}\n", "amb.pbp").unwrap();
    match set.apply(binary, CODEBASE, false) {
        Err(PatchError::Mask(MaskError::Ambiguous { count: 2, .. })) => {}
        other => panic!("expected AmbiguousMask, got {other:?}"),
    }
}

#[test]
fn test_block_overflow_and_ignore_length() {
    let source = "ca fe ba be {\n\
                  \tDCD 0x11111111\n\
                  \tDCW 0x2222\n\
                  }\n";
    let mut set = PatchSet::new();
    set.load_str(source, "ovf.pbp").unwrap();
    match set.apply(firmware(), CODEBASE, false) {
        Err(PatchError::BlockOverflow { code: 6, mask: 4, .. }) => {}
        other => panic!("expected BlockOverflow, got {other:?}"),
    }

    let mut set = PatchSet::new();
    set.load_str(source, "ovf.pbp").unwrap();
    let patched = set.apply(firmware(), CODEBASE, true).unwrap();
    assert_eq!(&patched[0x20..0x26], &hex::decode("111111112222").unwrap()[..]);
}

#[test]
fn test_duplicate_global_symbol() {
    let source = "de ad be ef {\n\
                  \tglobal twice\n\
                  }\n\
                  ca fe ba be {\n\
                  \tglobal twice\n\
                  }\n";
    let mut set = PatchSet::new();
    set.load_str(source, "dup.pbp").unwrap();
    match set.apply(firmware(), CODEBASE, false) {
        Err(PatchError::DuplicateSymbol { scope: "patch", .. }) => {}
        other => panic!("expected DuplicateSymbol, got {other:?}"),
    }
}

#[test]
fn test_unresolved_label_is_an_encode_error() {
    let mut set = PatchSet::new();
    set.load_str("de ad be ef {\n\tBL nowhere\n}\n", "lbl.pbp").unwrap();
    match set.apply(firmware(), CODEBASE, false) {
        Err(PatchError::Encode { .. }) => {}
        other => panic!("expected an encode error, got {other:?}"),
    }
}

#[test]
fn test_conditional_compilation_switches_blocks() {
    let source = "#ifdef WIDE\n\
                  de ad be ef {\n\
                  \tDCW 0x1111\n\
                  }\n\
                  #else\n\
                  de ad be ef {\n\
                  \tDCW 0x2222\n\
                  }\n\
                  #endif\n";
    let mut plain = PatchSet::new();
    plain.load_str(source, "cond.pbp").unwrap();
    let patched = plain.apply(firmware(), CODEBASE, false).unwrap();
    assert_eq!(&patched[0x10..0x12], &hex::decode("2222").unwrap()[..]);

    let mut wide = PatchSet::new();
    wide.define("WIDE", None);
    wide.load_str(source, "cond.pbp").unwrap();
    let patched = wide.apply(firmware(), CODEBASE, false).unwrap();
    assert_eq!(&patched[0x10..0x12], &hex::decode("1111").unwrap()[..]);
}

#[test]
fn test_two_passes_produce_identical_output() {
    let run = || {
        let mut set = PatchSet::new();
        set.load(&fixture("demo.pbp")).unwrap();
        set.apply(firmware(), CODEBASE, false).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_local_labels_shadow_per_block() {
    // Each block has its own "loop", branching to its own copy.
    let source = "de ad be ef {\n\
                  loop:\n\
                  \tB loop\n\
                  }\n\
                  ca fe ba be {\n\
                  loop:\n\
                  \tNOP\n\
                  \tB loop\n\
                  }\n";
    let mut set = PatchSet::new();
    set.load_str(source, "loc.pbp").unwrap();
    let patched = set.apply(firmware(), CODEBASE, false).unwrap();
    assert_eq!(&patched[0x10..0x12], &hex::decode("fee7").unwrap()[..]);
    // Second block: NOP then a branch back over it.
    assert_eq!(&patched[0x20..0x24], &hex::decode("00bffde7").unwrap()[..]);
}
