//! Implements MOV, MOVS and MOVW: narrow register and immediate forms, the wide expanded
//! immediate (T2) and the 16-bit immediate (T3) encodings.

use super::{half, pair, t2_imm, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{any_reg, expandable, lo, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(&["MOVS"], vec![lo().into(), lo().into()], 2, movs_reg);
    registry.def(&["MOV", "MOVS"], vec![any_reg().into(), any_reg().into()], 2, mov_reg);
    registry.def(
        &["MOV", "MOVS"],
        vec![lo().into(), ImmPattern::bits(8).positive().into()],
        2,
        mov_imm8,
    );
    registry.def(
        &["MOV", "MOV.W", "MOVS", "MOVS.W"],
        vec![any_reg().into(), expandable().into()],
        4,
        mov_t2,
    );
    registry.def(
        &["MOV", "MOV.W", "MOVW"],
        vec![any_reg().into(), ImmPattern::bits(16).positive().into()],
        4,
        movw,
    );
}

/// `MOVS Rd, Rm` is `LSLS Rd, Rm, #0`.
fn movs_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(ins.reg(1) << 3 | ins.reg(0)))
}

fn mov_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let rd = ins.reg(0);
    Ok(half(
        0b01000110 << 8 | (rd >> 3) << 7 | ins.reg(1) << 3 | (rd & 7),
    ))
}

fn mov_imm8(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b00100 << 11 | ins.reg(0) << 8 | ins.uimm(1)))
}

fn mov_t2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    // MOV immediate has no first operand: opcode 0010, Rn = 15.
    Ok(t2_imm(0b0010, ins.sets_flags(), 15, ins.reg(0), &ins.expanded(1)?))
}

/// MOVW places a plain 16-bit value, split over i:imm4:imm3:imm8.
fn movw(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let value = ins.uimm(1);
    Ok(pair(
        0b11110 << 11 | (value >> 11 & 1) << 10 | 0b100100 << 4 | value >> 12,
        (value >> 8 & 7) << 12 | ins.reg(0) << 8 | (value & 0xff),
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_mov_narrow() {
        assert_eq!(assemble("MOV R0, 0x2c"), hex::decode("2c20").unwrap());
        assert_eq!(assemble("MOVS R1, R2"), hex::decode("1100").unwrap());
        assert_eq!(assemble("MOV R10, R3"), hex::decode("9a46").unwrap());
    }

    #[test]
    fn test_mov_wide_expanded() {
        assert_eq!(assemble("MOV.W R1, 0xFF000"), hex::decode("4ff47f21").unwrap());
        assert_eq!(assemble("MOVS.W R0, 0xff"), hex::decode("5ff0ff00").unwrap());
    }

    #[test]
    fn test_movw() {
        assert_eq!(assemble("MOV R2, 50000"), hex::decode("4cf25032").unwrap());
        assert_eq!(assemble("MOVW R2, 50000"), hex::decode("4cf25032").unwrap());
        assert_eq!(assemble("MOVW R0, 0"), hex::decode("40f20000").unwrap());
    }
}
