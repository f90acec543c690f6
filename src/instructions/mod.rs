//! Thumb instruction definitions and the assembler built on them.
//!
//! Each supported mnemonic has its own submodule holding the encoders for every form of the
//! instruction. A form is described by an [InsDef]: the mnemonics it answers to, one [Slot] per
//! parameter, a size rule and an encoder function. All definitions are collected into a
//! [Registry]; looking up a source line in the registry yields an [Ins] instance which can be
//! bound to an address and finally encoded against a symbol [Scope].
//!
//! Form selection is purely positional: the first registered definition whose mnemonic and
//! argument shapes match wins, and the 16-bit forms are registered before their wide variants.
//! This is what makes `PUSH {R4, LR}` come out narrow while `PUSH {R4-R8, LR}` silently picks
//! the 32-bit T2 encoding.

use crate::args::{args_string, expandable_value, match_args, Argument, Label, Slot};
use crate::arith::{thumb_expand_imm, ExpandedImm};
use crate::helpers::Align;
use crate::parser::FilePos;
use crate::registers::RegisterList;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod add;
pub mod adr;
pub mod and;
pub mod b;
pub mod bl;
pub mod bx;
pub mod cbnz;
pub mod cmp;
pub mod data;
pub mod eor;
pub mod ldr;
pub mod ldrb;
pub mod ldrh;
pub mod lsl;
pub mod lsr;
pub mod mov;
pub mod mul;
pub mod pop;
pub mod pseudo;
pub mod push;
pub mod rsb;
pub mod str;
pub mod strb;
pub mod strh;
pub mod sub;
pub mod tst;
pub mod uxtb;

/// Symbol map of one scope: label name to absolute address (or value, for `val`).
pub type SymbolTable = BTreeMap<String, u32>;

/// The three symbol scopes visible to an instruction, in lookup order.
#[derive(Copy, Clone)]
pub struct Scope<'a> {
    /// Labels local to the enclosing block.
    pub local: &'a SymbolTable,
    /// `global` / `proc` / `val` names of the enclosing patch.
    pub patch: &'a SymbolTable,
    /// Names aggregated from every `#include`d file.
    pub library: &'a SymbolTable,
}

impl Scope<'_> {
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.local
            .get(name)
            .or_else(|| self.patch.get(name))
            .or_else(|| self.library.get(name))
            .copied()
    }
}

/// Error produced while encoding a bound instruction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("label not found: {0}")]
    LabelNotFound(String),
    #[error("offset {offset:#x} does not fit in {bits} bits")]
    OffsetOutOfRange { offset: i64, bits: u8 },
    #[error("negative offset {0:#x} not allowed here")]
    NegativeOffset(i64),
    #[error("offset {offset:#x} must have its {shift} low bits clear")]
    MisalignedOffset { offset: i64, shift: u8 },
    #[error("offset {offset:#x} outside range {min:#x}..{max:#x}")]
    OffsetOutsideRange { offset: i64, min: i64, max: i64 },
    #[error("value {0:#x} has no Thumb immediate encoding")]
    NotExpandable(i64),
    #[error("bad argument: {0}")]
    BadArgument(String),
    #[error("instruction has no address assigned")]
    AddressUnassigned,
}

/// Encoded form of one instruction.
///
/// Thumb instructions are one or two little-endian halfwords; the data pseudo-instructions
/// produce raw bytes of any length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    /// A 16-bit instruction.
    Half(u16),
    /// A 32-bit instruction, first halfword first.
    Pair(u16, u16),
    /// Raw bytes, e.g. from `DCB`.
    Bytes(Vec<u8>),
}

impl Code {
    /// Returns the bytes as they go into the binary.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Code::Half(h) => h.to_le_bytes().to_vec(),
            Code::Pair(hi, lo) => {
                let mut bytes = hi.to_le_bytes().to_vec();
                bytes.extend_from_slice(&lo.to_le_bytes());
                bytes
            }
            Code::Bytes(bytes) => bytes,
        }
    }
}

/// Shorthand for a 16-bit encoding built with u32 arithmetic.
pub(crate) fn half(value: u32) -> Code {
    Code::Half(value as u16)
}

/// Shorthand for a 32-bit encoding built with u32 arithmetic.
pub(crate) fn pair(hi: u32, lo: u32) -> Code {
    Code::Pair(hi as u16, lo as u16)
}

/// Builds a T2 data-processing (modified immediate) encoding: `op` is the 4-bit opcode field,
/// `rn`/`rd` the register fields (15 where an encoding fixes them) and `e` the expanded
/// immediate spread over both halfwords.
pub(crate) fn t2_imm(op: u32, set_flags: bool, rn: u32, rd: u32, e: &ExpandedImm) -> Code {
    pair(
        0b11110 << 11 | e.i() << 10 | op << 5 | (set_flags as u32) << 4 | rn,
        e.imm3() << 12 | rd << 8 | e.imm8(),
    )
}

/// How the size of an instruction is determined.
#[derive(Debug, Copy, Clone)]
pub enum SizeRule {
    /// Fixed number of bytes, known from the definition alone.
    Fixed(u32),
    /// Sum of the byte and string arguments, for `DCB`.
    DataBytes,
    /// 0 or 2 bytes depending on the bound address, for `ALIGN`.
    AlignTo4,
}

/// What a definition produces besides code.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DefKind {
    /// A regular encoded instruction.
    Code,
    /// `global NAME` / `proc NAME`: registers a patch-level label.
    GlobalLabel,
    /// `val NAME`: reads 4 original bytes at the bound position into the patch scope.
    Val,
}

/// Bind-time side effect of an instruction, carried out by the enclosing block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsKind {
    Encoded,
    Label { name: String, global: bool },
    Val { name: String },
}

pub type EncodeFn = fn(&Ins, &Scope) -> Result<Code, EncodeError>;

/// Parameter specification of a definition.
#[derive(Debug, Clone)]
pub enum ParamsSpec {
    /// Fixed arity, one slot per argument.
    Exact(Vec<Slot>),
    /// Any number of arguments, each matching the same slot (`DCB`).
    VarArgs(Slot),
}

impl ParamsSpec {
    fn matches(&self, args: &[Argument]) -> bool {
        match self {
            ParamsSpec::Exact(slots) => match_args(slots, args),
            ParamsSpec::VarArgs(slot) => args.iter().all(|arg| slot.matches(arg)),
        }
    }
}

/// One instruction definition: a set of mnemonics, the accepted argument shapes, the size of the
/// encoding and the encoder producing it.
pub struct InsDef {
    mnemonics: Vec<String>,
    params: ParamsSpec,
    size: SizeRule,
    kind: DefKind,
    encode: EncodeFn,
}

impl InsDef {
    fn matches(&self, opcode: &str, args: &[Argument]) -> bool {
        self.mnemonics.iter().any(|m| m == opcode) && self.params.matches(args)
    }

    fn instantiate(&self, opcode: &str, args: Vec<Argument>, pos: FilePos) -> Ins {
        let kind = match self.kind {
            DefKind::Code => InsKind::Encoded,
            DefKind::GlobalLabel | DefKind::Val => {
                // The single parameter is a label by construction of these definitions.
                let name = match &args[0] {
                    Argument::Label(label) => label.name.clone(),
                    _ => unreachable!(),
                };
                if self.kind == DefKind::Val {
                    InsKind::Val { name }
                } else {
                    InsKind::Label { name, global: true }
                }
            }
        };
        Ins {
            opcode: opcode.into(),
            args,
            kind,
            size: self.size,
            addr: None,
            pos,
            encode: self.encode,
        }
    }
}

/// Raised when no definition matches a source line.
#[derive(Debug, Error)]
#[error("unsupported instruction: {mnemonic} {args}")]
pub struct UnsupportedInstruction {
    pub mnemonic: String,
    pub args: String,
}

/// The instruction set: every definition, in registration order.
///
/// Built once per session and shared by all parses; there is no global instance.
pub struct Registry {
    defs: Vec<InsDef>,
}

impl Registry {
    pub fn new() -> Self {
        let mut registry = Self { defs: Vec::new() };
        data::register(&mut registry);
        pseudo::register(&mut registry);
        bl::register(&mut registry);
        b::register(&mut registry);
        cbnz::register(&mut registry);
        bx::register(&mut registry);
        add::register(&mut registry);
        adr::register(&mut registry);
        and::register(&mut registry);
        cmp::register(&mut registry);
        eor::register(&mut registry);
        ldr::register(&mut registry);
        ldrb::register(&mut registry);
        ldrh::register(&mut registry);
        lsl::register(&mut registry);
        lsr::register(&mut registry);
        mov::register(&mut registry);
        mul::register(&mut registry);
        pop::register(&mut registry);
        push::register(&mut registry);
        rsb::register(&mut registry);
        self::str::register(&mut registry);
        strb::register(&mut registry);
        strh::register(&mut registry);
        sub::register(&mut registry);
        tst::register(&mut registry);
        uxtb::register(&mut registry);
        registry
    }

    /// Registers a fixed-arity definition. Used by the instruction modules.
    pub fn def(
        &mut self,
        mnemonics: &[&str],
        params: Vec<Slot>,
        size: u32,
        encode: EncodeFn,
    ) {
        self.defs.push(InsDef {
            mnemonics: mnemonics.iter().map(|m| m.to_string()).collect(),
            params: ParamsSpec::Exact(params),
            size: SizeRule::Fixed(size),
            kind: DefKind::Code,
            encode,
        });
    }

    /// Registers a definition with a non-trivial size rule or bind-time effect.
    pub fn def_special(
        &mut self,
        mnemonics: &[&str],
        params: ParamsSpec,
        size: SizeRule,
        kind: DefKind,
        encode: EncodeFn,
    ) {
        self.defs.push(InsDef {
            mnemonics: mnemonics.iter().map(|m| m.to_string()).collect(),
            params,
            size,
            kind,
            encode,
        });
    }

    /// Finds the first definition matching the given source line and instantiates it.
    pub fn find(
        &self,
        opcode: &str,
        args: Vec<Argument>,
        pos: FilePos,
    ) -> Result<Ins, UnsupportedInstruction> {
        for def in &self.defs {
            if def.matches(opcode, &args) {
                return Ok(def.instantiate(opcode, args, pos));
            }
        }
        Err(UnsupportedInstruction {
            mnemonic: opcode.into(),
            args: args_string(&args),
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Offset request passed to [Ins::offset]. Mirrors the fields of the label offset contract:
/// maximum width, right shift, sign and PC alignment.
#[derive(Debug, Copy, Clone)]
pub struct Offset {
    bits: u8,
    shift: u8,
    positive: bool,
    align: bool,
}

impl Offset {
    /// Offset fitting `bits` bits (including the shifted-out ones).
    pub fn bits(bits: u8) -> Self {
        Self {
            bits,
            shift: 0,
            positive: false,
            align: false,
        }
    }

    /// Drops `shift` low bits from the result; they must be zero.
    pub fn shift(self, shift: u8) -> Self {
        Self { shift, ..self }
    }

    /// Rejects negative offsets.
    pub fn positive(self) -> Self {
        Self {
            positive: true,
            ..self
        }
    }

    /// Computes the offset from the word-aligned PC, as PC-relative loads do.
    pub fn aligned(self) -> Self {
        Self {
            align: true,
            ..self
        }
    }
}

/// One instruction instance: a matched definition with concrete arguments, bound to an address
/// during the bind phase and encoded during emit.
#[derive(Clone)]
pub struct Ins {
    opcode: String,
    args: Vec<Argument>,
    kind: InsKind,
    size: SizeRule,
    addr: Option<u32>,
    pos: FilePos,
    encode: EncodeFn,
}

impl Ins {
    /// Builds a bare local label instance, for `name:` lines. Zero size, no code.
    pub fn local_label(name: &str, pos: FilePos) -> Self {
        Self {
            opcode: format!("{}:", name),
            args: Vec::new(),
            kind: InsKind::Label {
                name: name.into(),
                global: false,
            },
            size: SizeRule::Fixed(0),
            addr: None,
            pos,
            encode: |_, _| Ok(Code::Bytes(Vec::new())),
        }
    }

    pub fn kind(&self) -> &InsKind {
        &self.kind
    }

    pub fn pos(&self) -> &FilePos {
        &self.pos
    }

    /// Assigns the absolute memory address. Called once, during bind.
    pub fn set_addr(&mut self, addr: u32) {
        self.addr = Some(addr);
    }

    /// Absolute address of the instruction, available after bind.
    pub fn addr(&self) -> Result<u32, EncodeError> {
        self.addr.ok_or(EncodeError::AddressUnassigned)
    }

    /// Size of the encoding in bytes.
    ///
    /// For `ALIGN` this depends on the bound address and is only available after bind.
    pub fn size(&self) -> Result<u32, EncodeError> {
        match self.size {
            SizeRule::Fixed(size) => Ok(size),
            SizeRule::DataBytes => {
                let mut total = 0;
                for arg in &self.args {
                    total += match arg {
                        Argument::Str(s) => s.len() as u32,
                        Argument::Imm(_) => 1,
                        other => {
                            return Err(EncodeError::BadArgument(other.to_string()));
                        }
                    };
                }
                Ok(total)
            }
            SizeRule::AlignTo4 => Ok(if self.addr()?.is_aligned(4) { 0 } else { 2 }),
        }
    }

    /// Runs the encoder and returns the produced bytes.
    pub fn encode(&self, scope: &Scope) -> Result<Vec<u8>, EncodeError> {
        (self.encode)(self, scope).map(Code::into_bytes)
    }

    /// True if the mnemonic requests setting the condition flags (`ADDS`, `MOVS.W`, ...).
    pub fn sets_flags(&self) -> bool {
        self.opcode.contains('S')
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    // Argument accessors for the encoders. An encoder only runs after its definition matched,
    // so the argument kinds are already established; a mismatch here is a definition bug.

    /// Argument `n` as a register number.
    pub fn reg(&self, n: usize) -> u32 {
        match &self.args[n] {
            Argument::Reg(reg) => reg.number(),
            other => panic!("argument {n} is not a register: {other}"),
        }
    }

    /// Argument `n` as an immediate.
    pub fn imm(&self, n: usize) -> i64 {
        match &self.args[n] {
            Argument::Imm(imm) => imm.value,
            other => panic!("argument {n} is not an immediate: {other}"),
        }
    }

    /// Argument `n` as an unsigned 32-bit word, negatives in two's complement.
    pub fn uimm(&self, n: usize) -> u32 {
        match &self.args[n] {
            Argument::Imm(imm) => imm.as_u32(),
            other => panic!("argument {n} is not an immediate: {other}"),
        }
    }

    /// Argument `n` as a label reference.
    pub fn label(&self, n: usize) -> &Label {
        match &self.args[n] {
            Argument::Label(label) => label,
            other => panic!("argument {n} is not a label: {other}"),
        }
    }

    /// Argument `n` as a bracketed group.
    pub fn list(&self, n: usize) -> &[Argument] {
        match &self.args[n] {
            Argument::List(items) => items,
            other => panic!("argument {n} is not a list: {other}"),
        }
    }

    /// Register number of element `i` of the bracketed group at argument `n`.
    pub fn list_reg(&self, n: usize, i: usize) -> u32 {
        match &self.list(n)[i] {
            Argument::Reg(reg) => reg.number(),
            other => panic!("list element {i} is not a register: {other}"),
        }
    }

    /// Immediate element `i` of the bracketed group at argument `n`, or `0` when the group is
    /// too short. Covers the `[Rn]` / `[Rn, imm]` pairs of the load and store forms.
    pub fn list_imm_or_zero(&self, n: usize, i: usize) -> i64 {
        match self.list(n).get(i) {
            Some(Argument::Imm(imm)) => imm.value,
            Some(other) => panic!("list element {i} is not an immediate: {other}"),
            None => 0,
        }
    }

    /// Argument `n` as a register list.
    pub fn reglist(&self, n: usize) -> RegisterList {
        match &self.args[n] {
            Argument::RegList(list) => *list,
            other => panic!("argument {n} is not a register list: {other}"),
        }
    }

    /// Argument `n` packed with the ThumbExpandImm scheme.
    pub(crate) fn expanded(&self, n: usize) -> Result<ExpandedImm, EncodeError> {
        let value = self.imm(n);
        expandable_value(value)
            .and_then(thumb_expand_imm)
            .ok_or(EncodeError::NotExpandable(value))
    }

    /// Address the label resolves to, with its shift applied.
    pub fn label_address(&self, label: &Label, scope: &Scope) -> Result<u32, EncodeError> {
        let addr = scope
            .lookup(&label.name)
            .ok_or_else(|| EncodeError::LabelNotFound(label.name.clone()))?;
        Ok(addr.wrapping_add(label.shift as u32))
    }

    /// The PC value the processor would use for this instruction, i.e. its address plus 4,
    /// word-aligned when the encoding requires it.
    fn pc(&self, align: bool) -> Result<u32, EncodeError> {
        let pc = self.addr()? + 4;
        Ok(if align { pc.align(4) } else { pc })
    }

    /// Offset from this instruction to `label`, checked and shifted as requested.
    ///
    /// Negative offsets come back sign-extended to the full `bits` width, ready to be split
    /// into encoding fields.
    pub fn offset(&self, label: &Label, scope: &Scope, req: Offset) -> Result<u32, EncodeError> {
        let target = self.label_address(label, scope)? as i64;
        let offset = target - self.pc(req.align)? as i64;
        let limit = 1i64 << (req.bits + req.shift);
        if offset.abs() >= limit {
            return Err(EncodeError::OffsetOutOfRange {
                offset,
                bits: req.bits + req.shift,
            });
        }
        if offset < 0 && req.positive {
            return Err(EncodeError::NegativeOffset(offset));
        }
        let wrapped = if offset < 0 { limit + offset } else { offset };
        if wrapped & ((1 << req.shift) - 1) != 0 {
            return Err(EncodeError::MisalignedOffset {
                offset,
                shift: req.shift,
            });
        }
        Ok((wrapped >> req.shift) as u32)
    }

    /// `bits` bits of the full 32-bit offset to `label`, starting at bit `shift`.
    ///
    /// Performs no range check; the 32-bit two's complement form keeps the high bits 1-padded
    /// for negative offsets. Callers combine this with a plain [Ins::offset] range check.
    pub fn offset_slice(
        &self,
        label: &Label,
        scope: &Scope,
        bits: u8,
        shift: u8,
    ) -> Result<u32, EncodeError> {
        let target = self.label_address(label, scope)? as i64;
        let offset = (target - self.pc(false)? as i64) as u32;
        Ok(offset >> shift & ((1u32 << bits) - 1))
    }

    /// Checks that the offset to `label` lies within `min..=max` bytes.
    pub fn offset_in_range(
        &self,
        label: &Label,
        scope: &Scope,
        min: i64,
        max: i64,
    ) -> Result<(), EncodeError> {
        let target = self.label_address(label, scope)? as i64;
        let offset = target - self.pc(false)? as i64;
        if offset < min || offset > max {
            return Err(EncodeError::OffsetOutsideRange { offset, min, max });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Ins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} {}>", self.opcode, args_string(&self.args))
    }
}
