//! Implements the BL and B.W long jumps (T1 and T4 encodings).

use super::{pair, Code, EncodeError, Ins, Offset, Registry, Scope};
use crate::args::label;

pub fn register(registry: &mut Registry) {
    registry.def(&["BL"], vec![label().into()], 4, bl);
    registry.def(&["B.W"], vec![label().into()], 4, bw);
}

/// Common encoder for BL and B.W.
///
/// The offset spans bits 24..1; `J1` and `J2` carry bits 23 and 22 xored against the sign so
/// that small offsets read as all ones, which is why both branches reach ±16 MB out of 25 bits.
fn long_jump(ins: &Ins, scope: &Scope, link: bool) -> Result<Code, EncodeError> {
    let dest = ins.label(0);
    ins.offset(dest, scope, Offset::bits(24).shift(1))?;
    let s = ins.offset_slice(dest, scope, 1, 24)?;
    let i1 = ins.offset_slice(dest, scope, 1, 23)?;
    let i2 = ins.offset_slice(dest, scope, 1, 22)?;
    let imm10 = ins.offset_slice(dest, scope, 10, 12)?;
    let imm11 = ins.offset_slice(dest, scope, 11, 1)?;
    let j1 = !(i1 ^ s) & 1;
    let j2 = !(i2 ^ s) & 1;
    let op = if link { 0b11 } else { 0b10 };
    Ok(pair(
        0b11110 << 11 | s << 10 | imm10,
        op << 14 | j1 << 13 | 1 << 12 | j2 << 11 | imm11,
    ))
}

fn bl(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    long_jump(ins, scope, true)
}

fn bw(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    long_jump(ins, scope, false)
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble_with;

    const ADDR: u32 = 0x08010000;

    #[test]
    fn test_bl_self() {
        assert_eq!(
            assemble_with("BL here", ADDR, &[("here", ADDR)]),
            hex::decode("fff7feff").unwrap()
        );
    }

    #[test]
    fn test_bw_self() {
        assert_eq!(
            assemble_with("B.W here", ADDR, &[("here", ADDR)]),
            hex::decode("fff7febf").unwrap()
        );
    }

    #[test]
    fn test_bw_next() {
        assert_eq!(
            assemble_with("B.W next", ADDR, &[("next", ADDR + 4)]),
            hex::decode("00f000b8").unwrap()
        );
    }

    #[test]
    fn test_bl_forward() {
        // 0x1000 ahead: offset 0xffc from PC.
        assert_eq!(
            assemble_with("BL fwd", ADDR, &[("fwd", ADDR + 0x1000)]),
            hex::decode("00f0feff").unwrap()
        );
    }
}
