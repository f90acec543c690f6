//! Implements AND and ANDS in the wide immediate (T2) encoding.

use super::{t2_imm, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{any_reg, expandable};

/// Opcode field of AND in the data-processing immediate space.
const OP: u32 = 0b0000;

pub fn register(registry: &mut Registry) {
    let names = &["AND", "ANDS", "AND.W", "ANDS.W"];
    registry.def(
        names,
        vec![any_reg().into(), any_reg().into(), expandable().into()],
        4,
        and_imm3,
    );
    registry.def(names, vec![any_reg().into(), expandable().into()], 4, and_imm2);
}

fn and_imm3(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(t2_imm(
        OP,
        ins.sets_flags(),
        ins.reg(1),
        ins.reg(0),
        &ins.expanded(2)?,
    ))
}

fn and_imm2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
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
    fn test_and_imm() {
        assert_eq!(assemble("AND R0, R0, 1"), hex::decode("00f00100").unwrap());
        assert_eq!(assemble("AND R2, 0x7f"), hex::decode("02f07f02").unwrap());
    }

    #[test]
    fn test_ands_imm() {
        assert_eq!(assemble("ANDS R1, 0xff00"), hex::decode("11f47f41").unwrap());
    }
}
