//! Branch condition codes.

use std::fmt::{self, Display};

/// Possible conditions for conditional branches.
///
/// The `AL` (always) code is not represented; unconditional branches have their own mnemonics
/// and encodings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Condition {
    Equal,
    NotEqual,
    CarrySet,
    CarryClear,
    Minus,
    Plus,
    Overflow,
    NoOverflow,
    Higher,
    LowerOrSame,
    GreaterThanOrEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
}

impl Condition {
    /// All condition codes, for instruction registration.
    pub const ALL: [Condition; 14] = [
        Condition::Equal,
        Condition::NotEqual,
        Condition::CarrySet,
        Condition::CarryClear,
        Condition::Minus,
        Condition::Plus,
        Condition::Overflow,
        Condition::NoOverflow,
        Condition::Higher,
        Condition::LowerOrSame,
        Condition::GreaterThanOrEqual,
        Condition::LessThan,
        Condition::GreaterThan,
        Condition::LessThanOrEqual,
    ];

    /// Value of the condition field in branch encodings.
    pub fn bits(&self) -> u32 {
        match self {
            Condition::Equal => 0x0,
            Condition::NotEqual => 0x1,
            Condition::CarrySet => 0x2,
            Condition::CarryClear => 0x3,
            Condition::Minus => 0x4,
            Condition::Plus => 0x5,
            Condition::Overflow => 0x6,
            Condition::NoOverflow => 0x7,
            Condition::Higher => 0x8,
            Condition::LowerOrSame => 0x9,
            Condition::GreaterThanOrEqual => 0xa,
            Condition::LessThan => 0xb,
            Condition::GreaterThan => 0xc,
            Condition::LessThanOrEqual => 0xd,
        }
    }

    /// Mnemonic suffix, as written in patch files ("EQ", "NE", ...).
    pub fn suffix(&self) -> &'static str {
        match self {
            Condition::Equal => "EQ",
            Condition::NotEqual => "NE",
            Condition::CarrySet => "CS",
            Condition::CarryClear => "CC",
            Condition::Minus => "MI",
            Condition::Plus => "PL",
            Condition::Overflow => "VS",
            Condition::NoOverflow => "VC",
            Condition::Higher => "HI",
            Condition::LowerOrSame => "LS",
            Condition::GreaterThanOrEqual => "GE",
            Condition::LessThan => "LT",
            Condition::GreaterThan => "GT",
            Condition::LessThanOrEqual => "LE",
        }
    }
}

impl TryFrom<u32> for Condition {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.bits() == value)
            .ok_or(())
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}
