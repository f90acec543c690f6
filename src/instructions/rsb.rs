//! Implements RSB and RSBS with a zero immediate (negate).

use super::{half, Code, EncodeError, Ins, Registry, Scope};
use crate::args::{exactly, lo};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["RSBS", "RSB"],
        vec![lo().into(), lo().into(), exactly(0).into()],
        2,
        rsb,
    );
}

fn rsb(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0b0100001001 << 6 | ins.reg(1) << 3 | ins.reg(0)))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_rsb() {
        assert_eq!(assemble("RSBS R0, R0, 0"), hex::decode("4042").unwrap());
        assert_eq!(assemble("RSB R2, R1, 0"), hex::decode("4a42").unwrap());
    }
}
