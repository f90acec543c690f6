//! Implements LDRB: immediate offset, register offset and wide (T2) forms.

use super::{half, pair, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{alt, any_reg, list, lo, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["LDRB"],
        vec![
            lo().into(),
            alt([
                list([lo().into(), ImmPattern::bits(5).positive().into()]),
                list([lo().into()]),
            ]),
        ],
        2,
        ldrb_imm5,
    );
    registry.def(
        &["LDRB"],
        vec![lo().into(), list([lo().into(), lo().into()]).into()],
        2,
        ldrb_reg,
    );
    registry.def(
        &["LDRB.W", "LDRB"],
        vec![
            any_reg().into(),
            alt([
                list([any_reg().into(), ImmPattern::bits(12).positive().into()]),
                list([any_reg().into()]),
            ]),
        ],
        4,
        ldrb_w,
    );
}

fn ldrb_imm5(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.list_imm_or_zero(1, 1) as u32;
    Ok(half(
        0b01111 << 11 | imm << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}

fn ldrb_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(
        0b0101110 << 9 | ins.list_reg(1, 1) << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}

fn ldrb_w(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(pair(
        0b111110001001 << 4 | ins.list_reg(1, 0),
        ins.reg(0) << 12 | ins.list_imm_or_zero(1, 1) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_ldrb_imm5() {
        assert_eq!(assemble("LDRB R0, [R1]"), hex::decode("0878").unwrap());
        assert_eq!(assemble("LDRB R2, [R3, 5]"), hex::decode("5a79").unwrap());
    }

    #[test]
    fn test_ldrb_reg() {
        assert_eq!(assemble("LDRB R1, [R2, R3]"), hex::decode("d15c").unwrap());
    }

    #[test]
    fn test_ldrb_wide() {
        assert_eq!(assemble("LDRB R8, [R1, 0x40]"), hex::decode("91f84080").unwrap());
    }
}
