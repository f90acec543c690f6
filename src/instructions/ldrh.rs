//! Implements LDRH: immediate offset and register offset forms.

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{alt, list, lo, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["LDRH"],
        vec![
            lo().into(),
            alt([
                list([lo().into(), ImmPattern::bits(6).positive().lsl(1).into()]),
                list([lo().into()]),
            ]),
        ],
        2,
        ldrh_imm5,
    );
    registry.def(
        &["LDRH"],
        vec![lo().into(), list([lo().into(), lo().into()]).into()],
        2,
        ldrh_reg,
    );
}

fn ldrh_imm5(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.list_imm_or_zero(1, 1) as u32;
    Ok(half(
        0b10001 << 11 | (imm >> 1) << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}

fn ldrh_reg(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(
        0b0101101 << 9 | ins.list_reg(1, 1) << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}
