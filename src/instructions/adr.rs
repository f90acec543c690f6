//! Implements ADR (form PC-relative address).

use super::{half, Code, EncodeError, Ins, Offset, Registry, Scope};
use crate::args::{label, lo};

pub fn register(registry: &mut Registry) {
    registry.def(&["ADR"], vec![lo().into(), label().into()], 2, adr);
}

fn adr(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    let imm8 = ins.offset(
        ins.label(1),
        scope,
        Offset::bits(8).shift(2).positive().aligned(),
    )?;
    Ok(half(0b10100 << 11 | ins.reg(0) << 8 | imm8))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble_with;

    const ADDR: u32 = 0x08010000;

    #[test]
    fn test_adr() {
        assert_eq!(
            assemble_with("ADR R0, table", ADDR, &[("table", ADDR + 0x14)]),
            hex::decode("04a0").unwrap()
        );
        assert_eq!(
            assemble_with("ADR R5, table", ADDR + 2, &[("table", ADDR + 0x14)]),
            hex::decode("04a5").unwrap()
        );
    }
}
