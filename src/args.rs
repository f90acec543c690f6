//! Instruction arguments and the patterns used to match them.
//!
//! Every argument appearing in a patch file is parsed into an [Argument] value. Instruction
//! definitions describe the shapes they accept with [Slot]s of [ArgPattern]s; a definition is
//! selected by matching its slots against the concrete arguments of a source line. Matching is
//! a pure function, no argument is ever modified by it.

use crate::arith::thumb_expand_imm;
use crate::registers::{RegisterIndex, RegisterList, RegisterListPattern, RegisterPattern};
use std::fmt::{self, Display};

/// Immediate value, together with its original spelling for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Imm {
    pub value: i64,
    /// How the value was written in the source, if it came from a source file.
    pub text: Option<String>,
}

impl Imm {
    pub fn new(value: i64) -> Self {
        Self { value, text: None }
    }

    pub fn with_text(value: i64, text: &str) -> Self {
        Self {
            value,
            text: Some(text.into()),
        }
    }

    /// The value as the 32-bit word it encodes to, negatives in two's complement.
    pub fn as_u32(&self) -> u32 {
        self.value as u32
    }
}

/// Reference to a label, resolved to an address when the instruction is encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    /// Offset added to the resolved address, for constructions like `DCD handler+1`.
    pub shift: i64,
}

impl Label {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            shift: 0,
        }
    }
}

/// A concrete instruction argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Imm(Imm),
    Reg(RegisterIndex),
    Label(Label),
    Str(String),
    /// Bracketed argument group, e.g. the `[Rn, imm]` of a load.
    List(Vec<Argument>),
    /// Braced register list, e.g. `{R4-R7, LR}`.
    RegList(RegisterList),
}

impl Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Imm(imm) => match &imm.text {
                Some(text) => write!(f, "{}", text),
                None => write!(f, "{}", imm.value),
            },
            Argument::Reg(reg) => write!(f, "{}", reg),
            Argument::Label(label) => {
                if label.shift != 0 {
                    write!(f, "{}+{}", label.name, label.shift)
                } else {
                    write!(f, "{}", label.name)
                }
            }
            Argument::Str(s) => write!(f, "{:?}", s),
            Argument::List(items) => {
                write!(f, "[")?;
                for (n, item) in items.iter().enumerate() {
                    if n > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Argument::RegList(list) => write!(f, "{{{}}}", list),
        }
    }
}

/// Joins arguments with commas, for diagnostics.
pub fn args_string(args: &[Argument]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Constraints on an immediate argument.
#[derive(Debug, Copy, Clone)]
pub struct ImmPattern {
    /// Maximum bit width of the absolute value, or None for any 32-bit value.
    bits: Option<u8>,
    /// Rejects negative values.
    positive: bool,
    /// Number of low bits which must be zero.
    lsl: u8,
}

impl ImmPattern {
    /// Accepts any value.
    pub fn any() -> Self {
        Self {
            bits: None,
            positive: false,
            lsl: 0,
        }
    }

    /// Accepts values with `|v| < 2^bits`.
    pub fn bits(bits: u8) -> Self {
        Self {
            bits: Some(bits),
            ..Self::any()
        }
    }

    pub fn positive(self) -> Self {
        Self {
            positive: true,
            ..self
        }
    }

    pub fn lsl(self, lsl: u8) -> Self {
        Self { lsl, ..self }
    }

    pub fn matches(&self, value: i64) -> bool {
        if let Some(bits) = self.bits {
            if value.unsigned_abs() >= 1 << bits {
                return false;
            }
        }
        if self.positive && value < 0 {
            return false;
        }
        if self.lsl > 0 && value & ((1 << self.lsl) - 1) != 0 {
            return false;
        }
        true
    }
}

/// Pattern for one argument shape.
#[derive(Debug, Clone)]
pub enum ArgPattern {
    Imm(ImmPattern),
    /// One specific immediate value, e.g. the mandatory 0 of `RSB Rd, Rn, 0`.
    ImmExact(i64),
    /// Any value encodable with the ARMv7-M ThumbExpandImm scheme.
    ThumbExpandable,
    Reg(RegisterPattern),
    Label,
    Str,
    List(Vec<Slot>),
    RegList(RegisterListPattern),
}

impl ArgPattern {
    pub fn matches(&self, arg: &Argument) -> bool {
        match (self, arg) {
            (ArgPattern::Imm(pattern), Argument::Imm(imm)) => pattern.matches(imm.value),
            (ArgPattern::ImmExact(value), Argument::Imm(imm)) => imm.value == *value,
            (ArgPattern::ThumbExpandable, Argument::Imm(imm)) => {
                expandable_value(imm.value).is_some()
            }
            (ArgPattern::Reg(pattern), Argument::Reg(reg)) => pattern.matches(*reg),
            (ArgPattern::Label, Argument::Label(_)) => true,
            (ArgPattern::Str, Argument::Str(_)) => true,
            (ArgPattern::List(slots), Argument::List(items)) => match_args(slots, items),
            (ArgPattern::RegList(pattern), Argument::RegList(list)) => pattern.matches(list),
            _ => false,
        }
    }
}

/// One parameter position of an instruction definition: a set of alternative shapes, any of
/// which matches the slot.
#[derive(Debug, Clone)]
pub struct Slot(Vec<ArgPattern>);

impl Slot {
    pub fn matches(&self, arg: &Argument) -> bool {
        self.0.iter().any(|pattern| pattern.matches(arg))
    }
}

impl From<ArgPattern> for Slot {
    fn from(pattern: ArgPattern) -> Self {
        Slot(vec![pattern])
    }
}

impl From<ImmPattern> for Slot {
    fn from(pattern: ImmPattern) -> Self {
        ArgPattern::Imm(pattern).into()
    }
}

impl From<RegisterPattern> for Slot {
    fn from(pattern: RegisterPattern) -> Self {
        ArgPattern::Reg(pattern).into()
    }
}

impl From<RegisterListPattern> for Slot {
    fn from(pattern: RegisterListPattern) -> Self {
        ArgPattern::RegList(pattern).into()
    }
}

/// Returns true if every argument matches its slot and the counts agree.
pub fn match_args(slots: &[Slot], args: &[Argument]) -> bool {
    slots.len() == args.len() && slots.iter().zip(args).all(|(slot, arg)| slot.matches(arg))
}

/// Maps a source value onto the 32-bit word the ThumbExpandImm scheme works with.
///
/// Negative values are taken modulo 2^32, like the processor would wrap them.
pub fn expandable_value(value: i64) -> Option<u32> {
    if value.unsigned_abs() > u32::MAX as u64 {
        return None;
    }
    let word = if value < 0 {
        (value + (1 << 32)) as u32
    } else {
        value as u32
    };
    thumb_expand_imm(word).map(|_| word)
}

/// Slot accepting any of the given alternative patterns.
pub fn alt<const N: usize>(patterns: [ArgPattern; N]) -> Slot {
    Slot(patterns.to_vec())
}

/// Bracketed-list pattern with the given element slots.
pub fn list<const N: usize>(slots: [Slot; N]) -> ArgPattern {
    ArgPattern::List(slots.to_vec())
}

/// Any register.
pub fn any_reg() -> RegisterPattern {
    RegisterPattern::Any
}

/// R0-R7.
pub fn lo() -> RegisterPattern {
    RegisterPattern::Low
}

/// The SP register.
pub fn sp() -> RegisterPattern {
    RegisterPattern::Exact(RegisterIndex::Sp)
}

/// Any label reference.
pub fn label() -> ArgPattern {
    ArgPattern::Label
}

/// A ThumbExpandImm-encodable immediate.
pub fn expandable() -> ArgPattern {
    ArgPattern::ThumbExpandable
}

/// Exactly the given immediate value.
pub fn exactly(value: i64) -> ArgPattern {
    ArgPattern::ImmExact(value)
}

#[cfg(test)]
mod tests {
    use super::{
        alt, expandable, expandable_value, list, lo, match_args, ArgPattern, Argument, Imm,
        ImmPattern, Label, Slot,
    };
    use crate::registers::RegisterIndex;

    fn imm(value: i64) -> Argument {
        Argument::Imm(Imm::new(value))
    }

    #[test]
    fn test_imm_pattern() {
        assert!(ImmPattern::any().matches(0x12345678));
        assert!(ImmPattern::any().matches(-40));
        assert!(ImmPattern::bits(8).matches(255));
        assert!(ImmPattern::bits(8).matches(-255));
        assert!(!ImmPattern::bits(8).matches(256));
        assert!(!ImmPattern::bits(8).positive().matches(-1));
        assert!(ImmPattern::bits(10).positive().lsl(2).matches(0x24));
        assert!(!ImmPattern::bits(10).positive().lsl(2).matches(0x25));
    }

    #[test]
    fn test_expandable_value() {
        assert_eq!(expandable_value(0xff), Some(0xff));
        assert_eq!(expandable_value(-1), Some(0xffffffff));
        assert_eq!(expandable_value(0x12345), None);
        assert_eq!(expandable_value(0x1_0000_0000), None);
    }

    #[test]
    fn test_slot_alternatives() {
        // The two accepted shapes of a short load: [Rn] and [Rn, imm].
        let slot: Slot = alt([
            list([lo().into(), ImmPattern::bits(7).positive().lsl(2).into()]),
            list([lo().into()]),
        ]);
        let rn = Argument::Reg(RegisterIndex::R3);
        assert!(slot.matches(&Argument::List(vec![rn.clone()])));
        assert!(slot.matches(&Argument::List(vec![rn.clone(), imm(0x10)])));
        assert!(!slot.matches(&Argument::List(vec![rn.clone(), imm(0x11)])));
        assert!(!slot.matches(&rn));
    }

    #[test]
    fn test_match_args() {
        let slots: Vec<Slot> = vec![lo().into(), ImmPattern::bits(8).positive().into()];
        assert!(match_args(
            &slots,
            &[Argument::Reg(RegisterIndex::R1), imm(1)]
        ));
        assert!(!match_args(&slots, &[Argument::Reg(RegisterIndex::R1)]));
        assert!(!match_args(
            &slots,
            &[Argument::Reg(RegisterIndex::R8), imm(1)]
        ));
        assert!(!match_args(
            &slots,
            &[Argument::Label(Label::new("x")), imm(1)]
        ));
    }

    #[test]
    fn test_expandable_pattern_rejects_labels() {
        assert!(expandable().matches(&imm(0xff)));
        assert!(!expandable().matches(&Argument::Label(Label::new("x"))));
        assert!(!ArgPattern::ImmExact(0).matches(&imm(1)));
    }
}
