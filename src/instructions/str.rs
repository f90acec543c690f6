//! Implements STR: SP-relative, immediate offset and wide (T3) forms.

use super::{half, pair, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{alt, any_reg, list, lo, sp, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["STR"],
        vec![
            lo().into(),
            alt([
                list([sp().into(), ImmPattern::bits(10).positive().lsl(2).into()]),
                list([sp().into()]),
            ]),
        ],
        2,
        str_sp,
    );
    registry.def(
        &["STR"],
        vec![
            lo().into(),
            alt([
                list([lo().into(), ImmPattern::bits(7).positive().lsl(2).into()]),
                list([lo().into()]),
            ]),
        ],
        2,
        str_imm5,
    );
    registry.def(
        &["STR.W", "STR"],
        vec![
            any_reg().into(),
            alt([
                list([any_reg().into(), ImmPattern::bits(12).positive().into()]),
                list([any_reg().into()]),
            ]),
        ],
        4,
        str_w,
    );
}

fn str_sp(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.list_imm_or_zero(1, 1) as u32;
    Ok(half(0b10010 << 11 | ins.reg(0) << 8 | imm >> 2))
}

fn str_imm5(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.list_imm_or_zero(1, 1) as u32;
    Ok(half(
        0b01100 << 11 | (imm >> 2) << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}

fn str_w(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(pair(
        0b111110001100 << 4 | ins.list_reg(1, 0),
        ins.reg(0) << 12 | ins.list_imm_or_zero(1, 1) as u32,
    ))
}
