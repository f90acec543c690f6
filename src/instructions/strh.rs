//! Implements STRH (immediate offset form).

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{alt, list, lo, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["STRH"],
        vec![
            lo().into(),
            alt([
                list([lo().into(), ImmPattern::bits(6).positive().lsl(1).into()]),
                list([lo().into()]),
            ]),
        ],
        2,
        strh_imm5,
    );
}

fn strh_imm5(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let imm = ins.list_imm_or_zero(1, 1) as u32;
    Ok(half(
        0b10000 << 11 | (imm >> 1) << 6 | ins.list_reg(1, 0) << 3 | ins.reg(0),
    ))
}
