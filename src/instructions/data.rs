//! Data and padding pseudo-instructions: `DCB`/`db`, `DCW`, `DCD`, `NOP` and `ALIGN`.

use super::{half, Code, DefKind, EncodeError, Ins, ParamsSpec, Registry, Scope, SizeRule};
use crate::args::{alt, exactly, label, ArgPattern, Argument, ImmPattern};

pub fn register(registry: &mut Registry) {
    registry.def_special(
        &["DCB", "db"],
        ParamsSpec::VarArgs(alt([ArgPattern::Imm(ImmPattern::bits(8)), ArgPattern::Str])),
        SizeRule::DataBytes,
        DefKind::Code,
        dcb,
    );
    registry.def(&["DCW"], vec![ImmPattern::bits(16).into()], 2, dcw);
    registry.def(&["DCD"], vec![ImmPattern::bits(32).into()], 4, dcd_imm);
    registry.def(&["DCD"], vec![label().into()], 4, dcd_label);
    registry.def(&["NOP"], vec![], 2, nop);
    registry.def_special(
        &["ALIGN"],
        ParamsSpec::Exact(vec![exactly(4).into()]),
        SizeRule::AlignTo4,
        DefKind::Code,
        align,
    );
}

/// Emits every byte and string argument verbatim.
fn dcb(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    let mut bytes = Vec::new();
    for arg in ins.args() {
        match arg {
            Argument::Str(s) => bytes.extend_from_slice(s.as_bytes()),
            Argument::Imm(imm) => bytes.push(imm.value as u8),
            other => return Err(EncodeError::BadArgument(other.to_string())),
        }
    }
    Ok(Code::Bytes(bytes))
}

fn dcw(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(Code::Bytes((ins.imm(0) as u16).to_le_bytes().to_vec()))
}

fn dcd_imm(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(Code::Bytes(ins.uimm(0).to_le_bytes().to_vec()))
}

/// `DCD name` or `DCD name+shift`: the little-endian address of the label.
fn dcd_label(ins: &Ins, scope: &Scope) -> Result<Code, EncodeError> {
    let addr = ins.label_address(ins.label(0), scope)?;
    Ok(Code::Bytes(addr.to_le_bytes().to_vec()))
}

fn nop(_ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    Ok(half(0xbf00))
}

/// Pads to the next word boundary with a NOP. Thumb addresses are halfword aligned, so a single
/// NOP always suffices.
fn align(ins: &Ins, _scope: &Scope) -> Result<Code, EncodeError> {
    if ins.addr()? % 4 == 0 {
        Ok(Code::Bytes(Vec::new()))
    } else {
        Ok(half(0xbf00))
    }
}
