//! Implements PUSH (narrow T1 and wide T2 encodings).

use super::{half, pair, Code, EncodeError, Ins, Registry, Scope};
use crate::registers::{Presence, RegisterListPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["PUSH"],
        vec![RegisterListPattern::low().lr(Presence::DontCare).into()],
        2,
        push_t1,
    );
    registry.def(
        &["PUSH.W", "PUSH"],
        vec![RegisterListPattern::wide().lr(Presence::DontCare).into()],
        4,
        push_t2,
    );
}

fn push_t1(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let list = ins.reglist(0);
    Ok(half(
        0b1011010 << 9 | (list.has_lr() as u32) << 8 | list.bits_below(8) as u32,
    ))
}

/// T2 stores R0-R12 in the low mask and LR in the M bit.
fn push_t2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let list = ins.reglist(0);
    Ok(pair(
        0b1110100100101101,
        (list.has_lr() as u32) << 14 | list.bits_below(13) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_push_t1() {
        assert_eq!(assemble("PUSH {R4, R5}"), hex::decode("30b4").unwrap());
        assert_eq!(assemble("PUSH {R4-R7, LR}"), hex::decode("f0b5").unwrap());
    }

    #[test]
    fn test_push_t2() {
        assert_eq!(assemble("PUSH {R4-R8, LR}"), hex::decode("2de9f041").unwrap());
        assert_eq!(assemble("PUSH.W {R0-R12}"), hex::decode("2de9ff1f").unwrap());
    }
}
