//! Implements CMP: immediate, narrow and any-register forms, plus the wide immediate (T2).

use super::{half, t2_imm, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{any_reg, expandable, lo, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["CMP"],
        vec![lo().into(), ImmPattern::bits(8).positive().into()],
        2,
        cmp_imm8,
    );
    registry.def(&["CMP"], vec![lo().into(), lo().into()], 2, cmp_reg);
    registry.def(&["CMP"], vec![any_reg().into(), any_reg().into()], 2, cmp_reg_any);
    registry.def(
        &["CMP", "CMP.W"],
        vec![any_reg().into(), expandable().into()],
        4,
        cmp_t2,
    );
}

fn cmp_imm8(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b00101 << 11 | ins.reg(0) << 8 | ins.uimm(1)))
}

fn cmp_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b0100001010 << 6 | ins.reg(1) << 3 | ins.reg(0)))
}

/// T2 register form; Rn is split over the N bit and the low field.
fn cmp_reg_any(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let rn = ins.reg(0);
    Ok(half(
        0b01000101 << 8 | (rn >> 3) << 7 | ins.reg(1) << 3 | (rn & 7),
    ))
}

fn cmp_t2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    // CMP is SUB with the result discarded: opcode 1101, S set, Rd = 15.
    Ok(t2_imm(0b1101, true, ins.reg(0), 15, &ins.expanded(1)?))
}
