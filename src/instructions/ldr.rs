//! Implements LDR: immediate offset, register offset, literal and wide (T3) forms.

use super::{half, pair, Code, EncodeError, Ins, Offset, Registry, Scope};
use crate::args::{alt, any_reg, label, list, lo, sp, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["LDR"],
        vec![
            lo().into(),
            alt([
                list([lo().into(), ImmPattern::bits(7).positive().lsl(2).into()]),
                list([lo().into()]),
            ]),
        ],
        2,
        ldr_imm5,
    );
    registry.def(
        &["LDR"],
        vec![lo().into(), list([lo().into(), lo().into()]).into()],
        2,
        ldr_reg,
    );
    registry.def(&["LDR"], vec![lo().into(), label().into()], 2, ldr_literal);
    registry.def(
        &["LDR"],
        vec![
            lo().into(),
            alt([
                list([sp().into(), ImmPattern::bits(10).positive().lsl(2).into()]),
                list([sp().into()]),
            ]),
        ],
        2,
        ldr_sp,
    );
    registry.def(
        &["LDR.W", "LDR"],
        vec![
            any_reg().into(),
            alt([
                list([any_reg().into(), ImmPattern::bits(12).positive().into()]),
                list([any_reg().into()]),
            ]),
        ],
        4,
        ldr_w,
    );
}

fn ldr_imm5(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.list_imm_or_zero(1, 1) as u32;
    Ok(half(
        0b01101 << 11 | (imm >> 2) << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}

fn ldr_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(
        0b0101100 << 9 | ins.list_reg(1, 1) << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}

/// PC-relative load; the offset is measured from the word-aligned PC.
fn ldr_literal(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    let imm8 = ins.offset(
        ins.label(1),
        scope,
        Offset::bits(8).shift(2).positive().aligned(),
    )?;
    Ok(half(0b01001 << 11 | ins.reg(0) << 8 | imm8))
}

fn ldr_sp(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.list_imm_or_zero(1, 1) as u32;
    Ok(half(0b10011 << 11 | ins.reg(0) << 8 | imm >> 2))
}

fn ldr_w(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(pair(
        0b111110001101 << 4 | ins.list_reg(1, 0),
        ins.reg(0) << 12 | ins.list_imm_or_zero(1, 1) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::{assemble, assemble_with};

    #[test]
    fn test_ldr_imm5() {
        assert_eq!(assemble("LDR R0, [R1]"), hex::decode("0868").unwrap());
        assert_eq!(assemble("LDR R3, [R2, 0x10]"), hex::decode("1369").unwrap());
    }

    #[test]
    fn test_ldr_reg() {
        assert_eq!(assemble("LDR R0, [R1, R2]"), hex::decode("8858").unwrap());
    }

    #[test]
    fn test_ldr_literal() {
        let addr = 0x08010000;
        assert_eq!(
            assemble_with("LDR R1, pool", addr, &[("pool", addr + 0x44)]),
            hex::decode("1049").unwrap()
        );
    }

    #[test]
    fn test_ldr_sp() {
        assert_eq!(assemble("LDR R2, [SP, 0x10]"), hex::decode("049a").unwrap());
    }

    #[test]
    fn test_ldr_wide() {
        assert_eq!(assemble("LDR R12, [SP, 0x24]"), hex::decode("ddf824c0").unwrap());
        assert_eq!(assemble("LDR.W R1, [R0, 0x123]"), hex::decode("d0f82312").unwrap());
    }
}
