//! Implements POP (narrow T1 and wide T2 encodings).

use super::{half, pair, Code, EncodeError, Ins, Registry, Scope};
use crate::registers::{Presence, RegisterListPattern};

pub fn register(registry: &mut Registry) {
    registry.def(
        &["POP"],
        vec![RegisterListPattern::low().pc(Presence::DontCare).into()],
        2,
        pop_t1,
    );
    registry.def(
        &["POP.W", "POP"],
        vec![
            RegisterListPattern::wide()
                .lr(Presence::DontCare)
                .pc(Presence::DontCare)
                .into(),
        ],
        4,
        pop_t2,
    );
}

fn pop_t1(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let list = ins.reglist(0);
    Ok(half(
        0b1011110 << 9 | (list.has_pc() as u32) << 8 | list.bits_below(8) as u32,
    ))
}

/// T2 stores R0-R12 in the low mask, LR in the M bit and PC in the P bit.
fn pop_t2(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let list = ins.reglist(0);
    Ok(pair(
        0b1110100010111101,
        (list.has_pc() as u32) << 15
            | (list.has_lr() as u32) << 14
            | list.bits_below(13) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use crate::instructions::testing::assemble;

    #[test]
    fn test_pop_t1() {
        assert_eq!(assemble("POP {R4, R5}"), hex::decode("30bc").unwrap());
        assert_eq!(assemble("POP {R4-R7, PC}"), hex::decode("f0bd").unwrap());
    }

    #[test]
    fn test_pop_t2() {
        assert_eq!(assemble("POP {R4-R8, PC}"), hex::decode("bde8f081").unwrap());
        assert_eq!(assemble("POP.W {R0-R12, LR}"), hex::decode("bde8ff5f").unwrap());
    }
}
