//! Implements TST: narrow register form and the wide immediate (T2) encoding.

use super::{half, t2_imm, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{any_reg, expandable, lo};

pub fn register(registry: &mut Registry) {
    registry.def(&["TST"], vec![lo().into(), lo().into()], 2, tst_reg);
    registry.def(
        &["TST", "TST.W"],
        vec![any_reg().into(), expandable().into()],
        4,
        tst_t2,
    );
}

fn tst_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b0100001000 << 6 | ins.reg(1) << 3 | ins.reg(0)))
}

fn tst_t2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    // TST is AND with the result discarded: opcode 0000, S set, Rd = 15.
    Ok(t2_imm(0b0000, true, ins.reg(0), 15, &ins.expanded(1)?))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_tst_reg() {
        assert_eq!(assemble("TST R0, R1"), hex::decode("0842").unwrap());
    }

    #[test]
    fn test_tst_wide() {
        assert_eq!(assemble("TST R1, 0x100000"), hex::decode("11f4801f").unwrap());
        assert_eq!(assemble("TST R0, 4"), hex::decode("10f0040f").unwrap());
    }
}
