//! Implements ADD and ADDS: register forms, the immediate form, and the SP-relative forms.

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{lo, sp, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["ADDS", "ADD"],
        vec![lo().into(), lo().into(), lo().into()],
        2,
        add_reg3,
    );
    registry.def(&["ADDS", "ADD"], vec![lo().into(), lo().into()], 2, add_reg2);
    registry.def(
        &["ADD"],
        vec![lo().into(), sp().into(), ImmPattern::bits(10).positive().lsl(2).into()],
        2,
        add_sp_imm,
    );
    registry.def(
        &["ADD"],
        vec![sp().into(), sp().into(), ImmPattern::bits(9).positive().lsl(2).into()],
        2,
        add_sp_sp,
    );
    registry.def(
        &["ADD", "ADDS"],
        vec![lo().into(), ImmPattern::bits(8).positive().into()],
        2,
        add_imm8,
    );
}

fn add_sub_reg(rd: u32, rn: u32, rm: u32, is_sub: u32) -> Code {
    half(0b000110 << 10 | is_sub << 9 | rm << 6 | rn << 3 | rd)
}

fn add_reg3(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(add_sub_reg(ins.reg(0), ins.reg(1), ins.reg(2), 0))
}

fn add_reg2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(add_sub_reg(ins.reg(0), ins.reg(0), ins.reg(1), 0))
}

/// SUB shares the three-register layout with a single polarity bit.
pub(super) fn sub_reg3(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(add_sub_reg(ins.reg(0), ins.reg(1), ins.reg(2), 1))
}

pub(super) fn sub_reg2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(add_sub_reg(ins.reg(0), ins.reg(0), ins.reg(1), 1))
}

fn add_sp_imm(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b10101 << 11 | ins.reg(0) << 8 | ins.uimm(2) >> 2))
}

fn add_sp_sp(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b101100000 << 7 | ins.uimm(2) >> 2))
}

fn add_imm8(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b00110 << 11 | ins.reg(0) << 8 | ins.uimm(1)))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_add_imm8() {
        assert_eq!(assemble("ADD R1, 1"), hex::decode("0131").unwrap());
        assert_eq!(assemble("ADDS R0, 0xff"), hex::decode("ff30").unwrap());
    }

    #[test]
    fn test_add_reg() {
        assert_eq!(assemble("ADD R3, R0, R2"), hex::decode("8318").unwrap());
        assert_eq!(assemble("ADDS R3, R0, R2"), hex::decode("8318").unwrap());
        assert_eq!(assemble("ADD R1, R7"), hex::decode("c919").unwrap());
    }

    #[test]
    fn test_add_sp() {
        assert_eq!(assemble("ADD R1, SP, 0x14"), hex::decode("05a9").unwrap());
        assert_eq!(assemble("ADD SP, SP, 8"), hex::decode("02b0").unwrap());
    }
}
