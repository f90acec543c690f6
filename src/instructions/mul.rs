//! Implements MUL and MULS.

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::lo;

pub fn register(registry: &mut Registry) {
    registry.def(&["MULS", "MUL"], vec![lo().into(), lo().into()], 2, mul);
}

fn mul(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b0100001101 << 6 | ins.reg(1) << 3 | ins.reg(0)))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_mul() {
        assert_eq!(assemble("MULS R0, R1"), hex::decode("4843").unwrap());
        assert_eq!(assemble("MUL R7, R7"), hex::decode("7f43").unwrap());
    }
}
