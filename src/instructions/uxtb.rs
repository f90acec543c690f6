//! Implements UXTB (Unsigned Extend Byte).

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::lo;

pub fn register(registry: &mut Registry) {
    registry.def(&["UXTB"], vec![lo().into(), lo().into()], 2, uxtb);
}

fn uxtb(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b1011001011 << 6 | ins.reg(1) << 3 | ins.reg(0)))
}
