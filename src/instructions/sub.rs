//! Implements SUB and SUBS: register forms, the immediate form, the SP adjustment and the wide
//! T4 immediate encoding.

use super::{add, pair, half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{any_reg, lo, sp, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["SUBS", "SUB"],
        vec![lo().into(), lo().into(), lo().into()],
        2,
        add::sub_reg3,
    );
    registry.def(&["SUBS", "SUB"], vec![lo().into(), lo().into()], 2, add::sub_reg2);
    registry.def(
        &["SUBS", "SUB"],
        vec![lo().into(), ImmPattern::bits(8).positive().into()],
        2,
        sub_imm8,
    );
    registry.def(
        &["SUB"],
        vec![sp().into(), sp().into(), ImmPattern::bits(9).positive().lsl(2).into()],
        2,
        sub_sp,
    );
    registry.def(
        &["SUB.W", "SUB"],
        vec![any_reg().into(), any_reg().into(), ImmPattern::bits(12).positive().into()],
        4,
        sub_w,
    );
}

fn sub_imm8(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b00111 << 11 | ins.reg(0) << 8 | ins.uimm(1)))
}

fn sub_sp(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b101100001 << 7 | ins.uimm(2) >> 2))
}

/// T4 (SUBW): a plain 12-bit immediate split over i:imm3:imm8.
fn sub_w(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.uimm(2);
    Ok(pair(
        0b11110 << 11 | (imm >> 11 & 1) << 10 | 0b101010 << 4 | ins.reg(1),
        (imm >> 8 & 7) << 12 | ins.reg(0) << 8 | (imm & 0xff),
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_sub_imm8() {
        assert_eq!(assemble("SUBS R0, 1"), hex::decode("0138").unwrap());
    }

    #[test]
    fn test_sub_reg() {
        assert_eq!(assemble("SUBS R3, R0, R2"), hex::decode("833a").unwrap());
        assert_eq!(assemble("SUB R1, R7"), hex::decode("c91b").unwrap());
    }

    #[test]
    fn test_sub_sp() {
        assert_eq!(assemble("SUB SP, SP, 8"), hex::decode("82b0").unwrap());
    }

    #[test]
    fn test_sub_wide() {
        assert_eq!(assemble("SUB R2, R0, 8"), hex::decode("a0f20802").unwrap());
        assert_eq!(assemble("SUB.W R1, SP, 0x104"), hex::decode("adf20411").unwrap());
    }
}
