//! Implements LSR and LSRS (immediate and register forms).

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{lo, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["LSRS", "LSR"],
        vec![lo().into(), lo().into(), ImmPattern::bits(5).positive().into()],
        2,
        lsr_imm,
    );
    registry.def(&["LSRS", "LSR"], vec![lo().into(), lo().into()], 2, lsr_reg);
}

fn lsr_imm(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(
        0b00001 << 11 | ins.uimm(2) << 6 | ins.reg(1) << 3 | ins.reg(0),
    ))
}

fn lsr_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b0100000011 << 6 | ins.reg(1) << 3 | ins.reg(0)))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_lsr_imm() {
        assert_eq!(assemble("LSRS R0, R1, 4"), hex::decode("0809").unwrap());
        assert_eq!(assemble("LSR R7, R6, 0x1f"), hex::decode("f70f").unwrap());
    }

    #[test]
    fn test_lsr_reg() {
        assert_eq!(assemble("LSRS R2, R3"), hex::decode("da40").unwrap());
    }
}
