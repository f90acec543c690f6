//! Implements LSL and LSLS (immediate and register forms).

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{lo, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["LSLS", "LSL"],
        vec![lo().into(), lo().into(), ImmPattern::bits(5).positive().into()],
        2,
        lsl_imm,
    );
    registry.def(&["LSLS", "LSL"], vec![lo().into(), lo().into()], 2, lsl_reg);
}

fn lsl_imm(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(ins.uimm(2) << 6 | ins.reg(1) << 3 | ins.reg(0)))
}

fn lsl_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b0100000010 << 6 | ins.reg(1) << 3 | ins.reg(0)))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_lsl_imm() {
        assert_eq!(assemble("LSLS R0, R1, 4"), hex::decode("0801").unwrap());
        assert_eq!(assemble("LSL R5, R5, 1"), hex::decode("6d00").unwrap());
    }

    #[test]
    fn test_lsl_reg() {
        assert_eq!(assemble("LSLS R2, R3"), hex::decode("9a40").unwrap());
    }
}
