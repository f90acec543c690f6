//! Implements STRB: immediate offset and wide (T2) forms.

use super::{half, pair, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{alt, any_reg, list, lo, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["STRB"],
        vec![
            lo().into(),
            alt([
                list([lo().into(), ImmPattern::bits(5).positive().into()]),
                list([lo().into()]),
            ]),
        ],
        2,
        strb_imm5,
    );
    registry.def(
        &["STRB.W", "STRB"],
        vec![
            any_reg().into(),
            alt([
                list([any_reg().into(), ImmPattern::bits(12).positive().into()]),
                list([any_reg().into()]),
            ]),
        ],
        4,
        strb_w,
    );
}

fn strb_imm5(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.list_imm_or_zero(1, 1) as u32;
    Ok(half(
        0b01110 << 11 | imm << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}

fn strb_w(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(pair(
        0b111110001000 << 4 | ins.list_reg(1, 0),
        ins.reg(0) << 12 | ins.list_imm_or_zero(1, 1) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_strb_imm5() {
        assert_eq!(assemble("STRB R0, [R1]"), hex::decode("0870").unwrap());
        assert_eq!(assemble("STRB R2, [R3, 0x1f]"), hex::decode("da77").unwrap());
    }

    #[test]
    fn test_strb_wide() {
        assert_eq!(assemble("STRB R1, [R8, 0x20]"), hex::decode("88f82010").unwrap());
    }
}
