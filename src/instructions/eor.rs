//! Implements EOR and EORS in the wide immediate (T2) encoding.

use super::{t2_imm, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{any_reg, expandable};

/// Opcode field of EOR in the data-processing immediate space.
const OP: u32 = 0b0100;

pub fn register(registry: &mut Registry) {
    let names = &["EOR", "EORS", "EOR.W", "EORS.W"];
    registry.def(
        names,
        vec![any_reg().into(), any_reg().into(), expandable().into()],
        4,
        eor_imm3,
    );
    registry.def(names, vec![any_reg().into(), expandable().into()], 4, eor_imm2);
}

fn eor_imm3(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(t2_imm(
        OP,
        ins.sets_flags(),
        ins.reg(1),
        ins.reg(0),
        &ins.expanded(2)?,
    ))
}

fn eor_imm2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(t2_imm(
        OP,
        ins.sets_flags(),
        ins.reg(0),
        ins.reg(0),
        &ins.expanded(1)?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_eor_imm() {
        assert_eq!(assemble("EOR R0, R0, 1"), hex::decode("80f00100").unwrap());
        assert_eq!(assemble("EORS R3, 0x80"), hex::decode("93f08003").unwrap());
    }
}
