//! Zero-size symbol pseudo-instructions: `global`/`proc` and `val`.
//!
//! Neither emits code. `global NAME` registers the current address under NAME in the enclosing
//! patch scope; `val NAME` registers the 4 original binary bytes found at the current position.
//! Both effects happen when the enclosing block binds, see [crate::block::Block].

use super::{Code, DefKind, EncodeError, Ins, ParamsSpec, Registry, Scope, SizeRule};
use crate::args::label;

pub fn register(registry: &mut Registry) {
    registry.def_special(
        &["global", "proc"],
        ParamsSpec::Exact(vec![label().into()]),
        SizeRule::Fixed(0),
        DefKind::GlobalLabel,
        no_code,
    );
    registry.def_special(
        &["val"],
        ParamsSpec::Exact(vec![label().into()]),
        SizeRule::Fixed(0),
        DefKind::Val,
        no_code,
    );
}

fn no_code(_ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(Code::Bytes(Vec::new()))
}
