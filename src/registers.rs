//! Registers of the ARM core, as the assembler sees them.

use crate::helpers::BitAccess;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::{self, Display};

/// Enumeration to identify a CPU core register.
///
/// Provides conversion from encoding values and from all the names a patch file may use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RegisterIndex {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    Sp,
    Lr,
    Pc,
}

impl RegisterIndex {
    /// Looks up a register by any of its assembler names, case-insensitive.
    ///
    /// Besides `R0`-`R15`, `SP`, `LR` and `PC`, the traditional ATPCS aliases are accepted:
    /// `A1`-`A4`, `V1`-`V8`, `WR`, `SB`, `SL`, `FP` and `IP`.
    pub fn lookup(name: &str) -> Option<Self> {
        let index = match name.to_ascii_uppercase().as_str() {
            "R0" | "A1" => 0,
            "R1" | "A2" => 1,
            "R2" | "A3" => 2,
            "R3" | "A4" => 3,
            "R4" | "V1" => 4,
            "R5" | "V2" => 5,
            "R6" | "V3" => 6,
            "R7" | "V4" | "WR" => 7,
            "R8" | "V5" => 8,
            "R9" | "V6" | "SB" => 9,
            "R10" | "V7" | "SL" => 10,
            "R11" | "V8" | "FP" => 11,
            "R12" | "IP" => 12,
            "R13" | "SP" => 13,
            "R14" | "LR" => 14,
            "R15" | "PC" => 15,
            _ => return None,
        };
        Some(Self::try_from(index as u8).unwrap())
    }

    /// Returns true if the string names a register.
    pub fn is_name(name: &str) -> bool {
        Self::lookup(name).is_some()
    }

    /// Value of the register in instruction encodings.
    pub fn number(&self) -> u32 {
        u8::from(*self) as u32
    }

    /// Returns true for R0-R7.
    pub fn is_low(&self) -> bool {
        self.number() < 8
    }

    /// Returns true if index is 13.
    pub fn is_sp(&self) -> bool {
        *self == Self::Sp
    }

    /// Returns true if index is 15.
    pub fn is_pc(&self) -> bool {
        *self == Self::Pc
    }
}

impl Display for RegisterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::R0 => "r0",
            Self::R1 => "r1",
            Self::R2 => "r2",
            Self::R3 => "r3",
            Self::R4 => "r4",
            Self::R5 => "r5",
            Self::R6 => "r6",
            Self::R7 => "r7",
            Self::R8 => "r8",
            Self::R9 => "r9",
            Self::R10 => "r10",
            Self::R11 => "r11",
            Self::R12 => "r12",
            Self::Sp => "sp",
            Self::Lr => "lr",
            Self::Pc => "pc",
        };
        write!(f, "{}", s)
    }
}

/// Register constraint in an instruction definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegisterPattern {
    /// Any of R0-R15.
    Any,
    /// R0-R7 only.
    Low,
    /// R8-R15 only.
    High,
    /// One specific register, e.g. SP in `ADD Rd, SP, imm`.
    Exact(RegisterIndex),
}

impl RegisterPattern {
    /// Returns true if `reg` satisfies the constraint.
    pub fn matches(&self, reg: RegisterIndex) -> bool {
        match self {
            Self::Any => true,
            Self::Low => reg.is_low(),
            Self::High => !reg.is_low(),
            Self::Exact(r) => reg == *r,
        }
    }
}

/// List of R0-R15 registers as written between braces in PUSH, POP and friends.
///
/// Each bit of the data maps to a register.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RegisterList(u16);

impl RegisterList {
    pub fn new(bits: u16) -> RegisterList {
        RegisterList(bits)
    }

    /// Returns the raw register bitmask.
    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Returns the bitmask restricted to registers below `limit`.
    pub fn bits_below(&self, limit: u8) -> u16 {
        self.0 & ((1 << limit) - 1)
    }

    /// Returns `true` if the list contains no registers.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Adds a register to the list.
    pub fn insert(&mut self, reg: RegisterIndex) {
        self.0.set_bit(reg.number() as usize, true);
    }

    /// Returns `true` if given register is in the list.
    pub fn contains(&self, reg: RegisterIndex) -> bool {
        self.0.bit(reg.number() as usize)
    }

    /// Returns whether the list contains the SP register (13).
    pub fn has_sp(&self) -> bool {
        self.contains(RegisterIndex::Sp)
    }

    /// Returns whether the list contains the LR register (14).
    pub fn has_lr(&self) -> bool {
        self.contains(RegisterIndex::Lr)
    }

    /// Returns whether the list contains the PC register (15).
    pub fn has_pc(&self) -> bool {
        self.contains(RegisterIndex::Pc)
    }

    /// Iterates over the registers present in the list.
    pub fn iter(&self) -> RegisterListIterator {
        RegisterListIterator {
            list: self.0,
            next: 0,
        }
    }
}

impl Display for RegisterList {
    /// Formats list of registers, to produce a string such as "r0, r1, sp".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for reg in self.iter() {
            if first {
                first = false;
            } else {
                f.write_str(", ")?;
            }
            f.write_str(&reg.to_string())?;
        }
        Ok(())
    }
}

pub struct RegisterListIterator {
    /// Marks the registers present in the list. Bit 0 for R0, bit 1 for R1, etc.
    list: u16,
    /// Index of next register to be tested and returned if present.
    next: u8,
}

impl Iterator for RegisterListIterator {
    type Item = RegisterIndex;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < 16 {
            let pos = self.next;
            self.next += 1;
            if self.list & (1 << pos) != 0 {
                return Some(RegisterIndex::try_from(pos).unwrap());
            }
        }
        None
    }
}

/// Whether a particular register must, may or must not appear in a register list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Presence {
    Required,
    Forbidden,
    DontCare,
}

/// Register list constraint in an instruction definition.
///
/// SP, LR and PC have their own presence flags; the remaining registers are checked against the
/// `lo` flag, with `low_limit` deciding where "low" ends (8 for the 16-bit encodings, 13 for the
/// wide ones, which accept anything up to R12).
#[derive(Debug, Copy, Clone)]
pub struct RegisterListPattern {
    lo: Presence,
    low_limit: u8,
    lr: Presence,
    sp: Presence,
    pc: Presence,
}

impl RegisterListPattern {
    /// Pattern for the narrow encodings: low registers only.
    pub fn low() -> Self {
        Self {
            lo: Presence::Required,
            low_limit: 8,
            lr: Presence::Forbidden,
            sp: Presence::Forbidden,
            pc: Presence::Forbidden,
        }
    }

    /// Pattern for the wide encodings: R0-R12 in the mask.
    pub fn wide() -> Self {
        Self {
            low_limit: 13,
            ..Self::low()
        }
    }

    pub fn lr(self, lr: Presence) -> Self {
        Self { lr, ..self }
    }

    pub fn sp(self, sp: Presence) -> Self {
        Self { sp, ..self }
    }

    pub fn pc(self, pc: Presence) -> Self {
        Self { pc, ..self }
    }

    /// Returns true if `list` satisfies all the flags.
    pub fn matches(&self, list: &RegisterList) -> bool {
        let flag = |presence: Presence, present: bool| match presence {
            Presence::Required => present,
            Presence::Forbidden => !present,
            Presence::DontCare => true,
        };
        if !flag(self.lr, list.has_lr()) || !flag(self.sp, list.has_sp()) || !flag(self.pc, list.has_pc()) {
            return false;
        }
        let plain = list.bits() & 0x1fff;
        match self.lo {
            Presence::Required => plain >> self.low_limit == 0,
            Presence::Forbidden => plain & 0xff == 0,
            Presence::DontCare => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Presence, RegisterIndex, RegisterList, RegisterListPattern, RegisterPattern};

    #[test]
    fn test_lookup() {
        assert_eq!(RegisterIndex::lookup("r3"), Some(RegisterIndex::R3));
        assert_eq!(RegisterIndex::lookup("SP"), Some(RegisterIndex::Sp));
        assert_eq!(RegisterIndex::lookup("r13"), Some(RegisterIndex::Sp));
        assert_eq!(RegisterIndex::lookup("ip"), Some(RegisterIndex::R12));
        assert_eq!(RegisterIndex::lookup("V8"), Some(RegisterIndex::R11));
        assert_eq!(RegisterIndex::lookup("a1"), Some(RegisterIndex::R0));
        assert_eq!(RegisterIndex::lookup("wr"), Some(RegisterIndex::R7));
        assert_eq!(RegisterIndex::lookup("R16"), None);
        assert_eq!(RegisterIndex::lookup("foo"), None);
    }

    #[test]
    fn test_register_pattern() {
        assert!(RegisterPattern::Low.matches(RegisterIndex::R7));
        assert!(!RegisterPattern::Low.matches(RegisterIndex::R8));
        assert!(RegisterPattern::High.matches(RegisterIndex::Pc));
        assert!(RegisterPattern::Any.matches(RegisterIndex::Sp));
        assert!(RegisterPattern::Exact(RegisterIndex::Sp).matches(RegisterIndex::Sp));
        assert!(!RegisterPattern::Exact(RegisterIndex::Sp).matches(RegisterIndex::R0));
    }

    #[test]
    fn test_register_list() {
        let mut list = RegisterList::default();
        for r in [RegisterIndex::R4, RegisterIndex::R5, RegisterIndex::Lr] {
            list.insert(r);
        }
        assert_eq!(list.bits(), 0x4030);
        assert_eq!(list.bits_below(13), 0x0030);
        assert!(list.has_lr());
        assert!(!list.has_pc());
        assert_eq!(list.to_string(), "r4, r5, lr");
        assert_eq!(
            list.iter().collect::<Vec<_>>(),
            vec![RegisterIndex::R4, RegisterIndex::R5, RegisterIndex::Lr]
        );
    }

    #[test]
    fn test_register_list_pattern() {
        let mut low = RegisterList::default();
        low.insert(RegisterIndex::R0);
        low.insert(RegisterIndex::R7);
        let mut with_lr = low;
        with_lr.insert(RegisterIndex::Lr);
        let mut wide = low;
        wide.insert(RegisterIndex::R8);
        wide.insert(RegisterIndex::R12);

        assert!(RegisterListPattern::low().matches(&low));
        assert!(!RegisterListPattern::low().matches(&with_lr));
        assert!(!RegisterListPattern::low().matches(&wide));
        assert!(RegisterListPattern::low().lr(Presence::Required).matches(&with_lr));
        assert!(!RegisterListPattern::low().lr(Presence::Required).matches(&low));
        assert!(RegisterListPattern::wide().lr(Presence::DontCare).matches(&wide));
        assert!(RegisterListPattern::wide().lr(Presence::DontCare).matches(&with_lr));
    }
}
