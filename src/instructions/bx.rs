//! Implements BX and BLX (register) branches.

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::any_reg;

pub fn register(registry: &mut Registry) {
    registry.def(&["BX"], vec![any_reg().into()], 2, bx);
    registry.def(&["BLX"], vec![any_reg().into()], 2, blx);
}

fn bx(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b010001110 << 7 | ins.reg(0) << 3))
}

fn blx(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b010001111 << 7 | ins.reg(0) << 3))
}
