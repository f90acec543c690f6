//! Implements the B and B{cond} branches (T1, T2 and the wide T3 encoding).

use super::{half, pair, Code, EncodeError, Ins, Offset, Registry, Scope};
use crate::args::label;
use crate::condition::Condition;

pub fn register(registry: &mut Registry) {
    registry.def(&["B"], vec![label().into()], 2, b_t2);
    for cond in Condition::ALL {
        let narrow = format!("B{}", cond.suffix());
        let wide = format!("{}.W", narrow);
        registry.def(&[narrow.as_str()], vec![label().into()], 2, bcond_t1);
        registry.def(&[wide.as_str()], vec![label().into()], 4, bcond_t3);
    }
}

/// Recovers the condition from the instance mnemonic; one encoder serves all 14 codes.
fn condition(ins: &Ins) -> u32 {
    let suffix = ins.opcode().trim_end_matches(".W").trim_start_matches('B');
    Condition::ALL
        .iter()
        .find(|c| c.suffix() == suffix)
        .map(|c| c.bits())
        .expect("mnemonic registered with a known condition suffix")
}

fn b_t2(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    let imm11 = ins.offset(ins.label(0), scope, Offset::bits(11).shift(1))?;
    Ok(half(0b11100 << 11 | imm11))
}

fn bcond_t1(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    let imm8 = ins.offset(ins.label(0), scope, Offset::bits(8).shift(1))?;
    Ok(half(0b1101 << 12 | condition(ins) << 8 | imm8))
}

/// T3 splits the offset over both halfwords; unlike the long jumps, `S`, `J2` and `J1` are
/// plain offset bits 20, 19 and 18 with no inversion.
fn bcond_t3(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    let dest = ins.label(0);
    ins.offset(dest, scope, Offset::bits(18).shift(1))?;
    let s = ins.offset_slice(dest, scope, 1, 20)?;
    let j2 = ins.offset_slice(dest, scope, 1, 19)?;
    let j1 = ins.offset_slice(dest, scope, 1, 18)?;
    let imm6 = ins.offset_slice(dest, scope, 6, 12)?;
    let imm11 = ins.offset_slice(dest, scope, 11, 1)?;
    Ok(pair(
        0b11110 << 11 | s << 10 | condition(ins) << 6 | imm6,
        0b10 << 14 | j1 << 13 | j2 << 11 | imm11,
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble_with;

    const ADDR: u32 = 0x08010000;

    #[test]
    fn test_b() {
        // Skip one 16-bit instruction: offset 2 from here, -2 from PC.
        assert_eq!(
            assemble_with("B skip", ADDR, &[("skip", ADDR + 4)]),
            hex::decode("00e0").unwrap()
        );
        assert_eq!(
            assemble_with("B here", ADDR, &[("here", ADDR)]),
            hex::decode("fee7").unwrap()
        );
    }

    #[test]
    fn test_bcond() {
        assert_eq!(
            assemble_with("BEQ here", ADDR, &[("here", ADDR)]),
            hex::decode("fed0").unwrap()
        );
        assert_eq!(
            assemble_with("BNE skip", ADDR, &[("skip", ADDR + 8)]),
            hex::decode("02d1").unwrap()
        );
    }

    #[test]
    fn test_bcond_wide_self() {
        assert_eq!(
            assemble_with("BNE.W here", ADDR, &[("here", ADDR)]),
            hex::decode("7ff4feaf").unwrap()
        );
    }

    #[test]
    fn test_bcond_wide_forward() {
        assert_eq!(
            assemble_with("BEQ.W next", ADDR, &[("next", ADDR + 4)]),
            hex::decode("00f00080").unwrap()
        );
    }
}
