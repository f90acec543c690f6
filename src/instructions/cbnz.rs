//! Implements CBZ and CBNZ (Compare and Branch on Zero).

use super::{half, Code, EncodeError, Ins, Offset, Registry, Scope};
use crate::args::{label, lo};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["CBZ", "CBNZ"],
        vec![lo().into(), label().into()],
        2,
        cbz,
    );
}

fn cbz(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    let dest = ins.label(1);
    // These branches only reach forward, 126 bytes at most.
    ins.offset_in_range(dest, scope, 0, 126)?;
    let offset = ins.offset(dest, scope, Offset::bits(6).shift(1).positive())?;
    let op = (ins.opcode() == "CBNZ") as u32;
    Ok(half(
        0b1011 << 12
            | op << 11
            | (offset >> 5) << 9
            | 1 << 8
            | (offset & 0x1f) << 3
            | ins.reg(0),
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble_with;

    const ADDR: u32 = 0x08010000;

    #[test]
    fn test_cbz_next() {
        assert_eq!(
            assemble_with("CBZ R3, next", ADDR, &[("next", ADDR + 4)]),
            hex::decode("03b1").unwrap()
        );
    }

    #[test]
    fn test_cbnz() {
        assert_eq!(
            assemble_with("CBNZ R0, skip", ADDR, &[("skip", ADDR + 0x12)]),
            hex::decode("38b9").unwrap()
        );
    }
}
