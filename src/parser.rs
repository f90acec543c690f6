//! Parser for patch source files.
//!
//! A patch file is a sequence of blocks, each a byte mask followed by a braced body of
//! assembler lines, interleaved with `#` preprocessor directives. The parser produces a
//! [Patch] of unbound [Block]s; `#include`d files accumulate into the session's library patch
//! instead.

use crate::args::{Argument, Imm, Label};
use crate::block::Block;
use crate::instructions::{Ins, Registry};
use crate::mask::{Mask, MaskPart};
use crate::patch::Patch;
use crate::registers::{RegisterIndex, RegisterList};
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Position inside a source file, for diagnostics: file name, line number and line text.
#[derive(Debug, Clone)]
pub struct FilePos {
    pub filename: String,
    pub lnum: usize,
    pub line: String,
}

impl FilePos {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.into(),
            lnum: 0,
            line: String::new(),
        }
    }

    fn set_line(&mut self, lnum: usize, line: &str) {
        self.lnum = lnum;
        self.line = line.into();
    }
}

impl Display for FilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, line {}", self.filename, self.lnum + 1)
    }
}

/// A malformed patch file. Carries the position and the offending source line.
#[derive(Debug, Error)]
#[error("{pos}: {msg}\n{}", .pos.line)]
pub struct ParseError {
    pub msg: String,
    pub pos: FilePos,
}

impl ParseError {
    fn new(msg: impl Into<String>, pos: &FilePos) -> Self {
        Self {
            msg: msg.into(),
            pos: pos.clone(),
        }
    }
}

/// Value of a preprocessor constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Defined with no value (`#define NAME`, or a bare `-D NAME`).
    Flag,
    /// Defined with a textual value, substituted into `$NAME` references.
    Text(String),
}

/// The `#define` constants of a patching session, shared across all files.
#[derive(Debug, Default)]
pub struct Definitions(BTreeMap<String, Value>);

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines or redefines a constant.
    pub fn define(&mut self, name: &str, value: Option<&str>) {
        let value = match value {
            Some(text) => Value::Text(text.into()),
            None => Value::Flag,
        };
        self.0.insert(name.into(), value);
    }

    /// Defines a constant unless it already has a textual value. A plain flag is upgraded,
    /// which lets a command-line `-D NAME` select a `#default NAME value` from the file.
    pub fn define_default(&mut self, name: &str, value: Option<&str>) {
        match self.0.get(name) {
            Some(Value::Text(_)) => {}
            _ => self.define(name, value),
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// True if any constant currently has this textual value.
    pub fn has_value(&self, text: &str) -> bool {
        self.0.values().any(|v| matches!(v, Value::Text(t) if t == text))
    }

    /// Textual value of a constant, if any.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(Value::Text(t)) => Some(t),
            _ => None,
        }
    }
}

/// Parses a patch file from disk. `#include` paths resolve relative to the file; included
/// blocks and symbols land in `library`.
pub fn parse_file(
    path: &Path,
    registry: &Registry,
    defs: &mut Definitions,
    library: &mut Patch,
) -> Result<Patch, ParseError> {
    let name = path.display().to_string();
    let source = fs::read_to_string(path)
        .map_err(|e| ParseError::new(format!("cannot read {}: {}", name, e), &FilePos::new(&name)))?;
    let dir = path.parent().map(PathBuf::from);
    let mut patch = Patch::new(&name);
    FileParser {
        registry,
        defs,
        dir,
    }
    .parse(&source, &name, &mut patch, &mut Some(library))?;
    Ok(patch)
}

/// Parses patch source from memory.
pub fn parse_str(
    source: &str,
    name: &str,
    registry: &Registry,
    defs: &mut Definitions,
    library: &mut Patch,
) -> Result<Patch, ParseError> {
    let mut patch = Patch::new(name);
    FileParser {
        registry,
        defs,
        dir: None,
    }
    .parse(source, name, &mut patch, &mut Some(library))?;
    Ok(patch)
}

/// Parser state for one source file. Includes spawn a nested parser per file, so the stack of
/// open files is the call stack.
struct FileParser<'a> {
    registry: &'a Registry,
    defs: &'a mut Definitions,
    /// Directory of the current file, for resolving `#include`.
    dir: Option<PathBuf>,
}

/// Body of the block currently being read.
struct BlockBody {
    mask: Mask,
    instructions: Vec<Ins>,
}

impl FileParser<'_> {
    /// Parses `source` into `patch`. When `library` is None, this file *is* the library patch
    /// and its includes parse into `patch` itself.
    fn parse(
        &mut self,
        source: &str,
        filename: &str,
        patch: &mut Patch,
        library: &mut Option<&mut Patch>,
    ) -> Result<(), ParseError> {
        let mut pos = FilePos::new(filename);
        let mut if_stack = vec![true];
        let mut mask = MaskBuilder::default();
        let mut body: Option<BlockBody> = None;

        for (lnum, raw) in source.lines().enumerate() {
            pos.set_line(lnum, raw.trim());
            let line = uncomment(raw);
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                self.directive(&line, &mut if_stack, &pos, patch, library)?;
                continue;
            }
            if !*if_stack.last().unwrap() {
                continue;
            }
            let mut text = substitute(&line, self.defs);

            if body.is_none() {
                match mask.feed_line(&text, &pos)? {
                    Feed::Consumed => continue,
                    Feed::EnterBlock(remainder) => {
                        body = Some(BlockBody {
                            mask: mask.take(&pos)?,
                            instructions: Vec::new(),
                        });
                        text = remainder;
                        if text.trim().is_empty() {
                            continue;
                        }
                    }
                }
            }

            let text = text.trim();
            if let Some(spare) = text.strip_prefix('}') {
                if !spare.trim().is_empty() {
                    tracing::warn!(%pos, spare, "ignoring spare characters after '}}'");
                }
                let done = body.take().unwrap();
                patch.push_block(Block::new(done.mask, done.instructions));
                continue;
            }
            self.block_line(text, &pos, body.as_mut().unwrap())?;
        }

        if body.is_some() || !mask.is_empty() {
            return Err(ParseError::new("unexpected end of file", &pos));
        }
        Ok(())
    }

    /// One line of a block body: an optional `name:` label followed by an instruction.
    fn block_line(
        &self,
        line: &str,
        pos: &FilePos,
        body: &mut BlockBody,
    ) -> Result<(), ParseError> {
        let mut line = line;
        let first = line.split_whitespace().next().unwrap();
        if let Some(name) = first.strip_suffix(':') {
            body.instructions.push(Ins::local_label(name, pos.clone()));
            line = line[first.len()..].trim_start();
            if line.is_empty() {
                return Ok(());
            }
        }
        body.instructions
            .push(parse_instruction(line, pos, self.registry)?);
        Ok(())
    }

    fn directive(
        &mut self,
        line: &str,
        if_stack: &mut Vec<bool>,
        pos: &FilePos,
        patch: &mut Patch,
        library: &mut Option<&mut Patch>,
    ) -> Result<(), ParseError> {
        let mut tokens = line.split_whitespace();
        let cmd = tokens.next().unwrap();
        let args: Vec<&str> = tokens.collect();
        match cmd {
            // The conditional directives are honoured even in skipped regions, so nested
            // conditions balance out.
            "#ifdef" | "#ifndef" | "#ifval" | "#ifnval" => {
                if args.is_empty() {
                    return Err(ParseError::new(
                        format!("{} requires at least one argument", cmd),
                        pos,
                    ));
                }
                let (by_value, negate) = match cmd {
                    "#ifdef" => (false, false),
                    "#ifndef" => (false, true),
                    "#ifval" => (true, false),
                    _ => (true, true),
                };
                // "OR" logic; "AND" can be spelt with nested conditions.
                let hit = args.iter().any(|a| {
                    if by_value {
                        self.defs.has_value(a)
                    } else {
                        self.defs.is_defined(a)
                    }
                });
                if_stack.push(hit != negate);
                Ok(())
            }
            "#else" => {
                if if_stack.len() <= 1 {
                    return Err(ParseError::new("unexpected #else", pos));
                }
                let top = if_stack.last_mut().unwrap();
                *top = !*top;
                Ok(())
            }
            "#endif" => {
                if_stack.pop();
                if if_stack.is_empty() {
                    return Err(ParseError::new("unmatched #endif", pos));
                }
                Ok(())
            }
            _ if !*if_stack.last().unwrap() => Ok(()),
            "#define" | "#default" => {
                let name = *args
                    .first()
                    .ok_or_else(|| ParseError::new(format!("{} requires a name", cmd), pos))?;
                let value = rest_after_opt(rest_after(line, cmd), name);
                if cmd == "#define" {
                    self.defs.define(name, value);
                } else {
                    self.defs.define_default(name, value);
                }
                Ok(())
            }
            "#include" => {
                let arg = rest_after(line, cmd)
                    .ok_or_else(|| ParseError::new("#include requires an argument", pos))?;
                self.include(arg, pos, patch, library)
            }
            _ => Err(ParseError::new(format!("unknown command: {}", cmd), pos)),
        }
    }

    /// Parses an included file into the library patch (or into the current patch when this file
    /// is the library itself).
    fn include(
        &mut self,
        arg: &str,
        pos: &FilePos,
        patch: &mut Patch,
        library: &mut Option<&mut Patch>,
    ) -> Result<(), ParseError> {
        let mut path = PathBuf::from(arg);
        if !path.is_absolute() {
            if let Some(dir) = &self.dir {
                path = dir.join(path);
            }
        }
        let name = path.display().to_string();
        let source = fs::read_to_string(&path)
            .map_err(|e| ParseError::new(format!("cannot read include {}: {}", name, e), pos))?;
        tracing::debug!(path = %name, "including");
        let mut sub = FileParser {
            registry: self.registry,
            defs: &mut *self.defs,
            dir: path.parent().map(PathBuf::from),
        };
        match library {
            Some(lib) => sub.parse(&source, &name, &mut **lib, &mut None),
            None => sub.parse(&source, &name, patch, &mut None),
        }
    }
}

/// Returns the text after `token` (which starts `line`), or None if nothing follows. Keeps
/// internal whitespace of the remainder, so `#define GREETING Hello world` works.
fn rest_after<'a>(line: &'a str, token: &str) -> Option<&'a str> {
    let rest = line[token.len()..].trim();
    (!rest.is_empty()).then_some(rest)
}

fn rest_after_opt<'a>(line: Option<&'a str>, token: &str) -> Option<&'a str> {
    line.and_then(|l| rest_after(l, token))
}

/// Strips a `;` comment, unless the `;` sits inside a quoted string. The result is trimmed.
fn uncomment(line: &str) -> String {
    let mut out = String::new();
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == ';' {
                    break;
                }
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
            }
        }
        out.push(c);
    }
    out.trim().to_string()
}

/// Replaces `${NAME}` and `$NAME` outside quoted strings with the textual value of NAME.
/// Unknown or valueless names are left as written.
fn substitute(line: &str, defs: &Definitions) -> String {
    let mut out = String::new();
    let mut chars = line.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_string = !in_string;
                out.push(c);
            }
            '\\' if in_string => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '$' if !in_string => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    match (closed, defs.text(&name)) {
                        (true, Some(value)) => out.push_str(value),
                        (true, None) => {
                            out.push_str("${");
                            out.push_str(&name);
                            out.push('}');
                        }
                        (false, _) => {
                            out.push_str("${");
                            out.push_str(&name);
                        }
                    }
                } else {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if next.is_alphanumeric() || next == '_' {
                            name.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    match defs.text(&name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('$');
                            out.push_str(&name);
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Result of feeding one source line to the mask builder.
enum Feed {
    /// The whole line was mask tokens.
    Consumed,
    /// A `{` was reached; the rest of the line belongs to the block body.
    EnterBlock(String),
}

/// Accumulates mask tokens across lines until the block opens.
#[derive(Default)]
struct MaskBuilder {
    parts: Vec<MaskPart>,
    bytes: Vec<u8>,
    skip: usize,
    offset: Option<usize>,
    start: Option<FilePos>,
}

impl MaskBuilder {
    fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.bytes.is_empty() && self.skip == 0 && self.offset.is_none()
    }

    /// Bytes covered so far, for placing the `@` anchor.
    fn current_len(&self) -> usize {
        self.parts.iter().map(|p| match p {
            MaskPart::Bytes(b) => b.len(),
            MaskPart::Skip(n) => *n,
        }).sum::<usize>() + self.bytes.len() + self.skip
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        if self.skip > 0 {
            self.parts.push(MaskPart::Skip(self.skip));
            self.skip = 0;
        }
        self.bytes.extend_from_slice(bytes);
    }

    fn push_skip(&mut self, count: usize) {
        if !self.bytes.is_empty() {
            self.parts.push(MaskPart::Bytes(std::mem::take(&mut self.bytes)));
        }
        self.skip += count;
    }

    fn flush(&mut self) {
        if !self.bytes.is_empty() {
            self.parts.push(MaskPart::Bytes(std::mem::take(&mut self.bytes)));
        }
        if self.skip > 0 {
            self.parts.push(MaskPart::Skip(self.skip));
            self.skip = 0;
        }
    }

    /// Lexes one line of mask tokens: hex byte pairs, quoted byte strings, `?`/`?N` skips, a
    /// single `@` anchor, and `{` opening the block.
    fn feed_line(&mut self, line: &str, pos: &FilePos) -> Result<Feed, ParseError> {
        if self.start.is_none() {
            self.start = Some(pos.clone());
        }
        let chars: Vec<char> = line.chars().collect();
        let mut n = 0;
        while n < chars.len() {
            let c = chars[n];
            if c.is_whitespace() {
                n += 1;
                continue;
            }
            if c == '"' {
                // Quoted strings in mask position are raw bytes, no escapes.
                let start = n + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != '"' {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(ParseError::new("unterminated string", pos));
                }
                let text: String = chars[start..end].iter().collect();
                self.push_bytes(text.as_bytes());
                n = end + 1;
                continue;
            }
            // A plain token runs to the next whitespace or quote.
            let start = n;
            while n < chars.len() && !chars[n].is_whitespace() && chars[n] != '"' {
                n += 1;
            }
            let token: String = chars[start..n].iter().collect();
            match token.as_str() {
                "{" => {
                    self.flush();
                    return Ok(Feed::EnterBlock(chars[n..].iter().collect()));
                }
                "@" => {
                    if self.offset.is_some() {
                        return Err(ParseError::new("duplicate '@'", pos));
                    }
                    self.offset = Some(self.current_len());
                }
                t if t.starts_with('?') => {
                    let count = if t.len() == 1 {
                        1
                    } else {
                        t[1..].parse().map_err(|_| {
                            ParseError::new(format!("bad token: {}", t), pos)
                        })?
                    };
                    self.push_skip(count);
                }
                t if t.len() == 2 => {
                    let byte = u8::from_str_radix(t, 16)
                        .map_err(|_| ParseError::new(format!("bad token: {}", t), pos))?;
                    self.push_bytes(&[byte]);
                }
                t => return Err(ParseError::new(format!("bad token: {}", t), pos)),
            }
        }
        Ok(Feed::Consumed)
    }

    /// Finishes the mask. No tokens at all makes a floating mask; tokens without a single
    /// literal byte cannot be anchored and are rejected.
    fn take(&mut self, pos: &FilePos) -> Result<Mask, ParseError> {
        self.flush();
        let parts = std::mem::take(&mut self.parts);
        let offset = self.offset.take().unwrap_or(0);
        let start = self.start.take();
        if parts.is_empty() {
            return Ok(Mask::floating(start));
        }
        if !parts.iter().any(|p| matches!(p, MaskPart::Bytes(_))) {
            return Err(ParseError::new("mask has no literal bytes", pos));
        }
        Ok(Mask::new(parts, offset, start))
    }
}

/// Parses one assembler line (mnemonic and arguments) and looks it up in the registry.
pub fn parse_instruction(
    line: &str,
    pos: &FilePos,
    registry: &Registry,
) -> Result<Ins, ParseError> {
    let line = line.trim();
    let (opcode, rest) = match line.split_once(char::is_whitespace) {
        Some((opcode, rest)) => (opcode, rest),
        None => (line, ""),
    };
    let args = parse_args(rest, opcode, pos)?;
    registry
        .find(opcode, args, pos.clone())
        .map_err(|e| ParseError::new(e.to_string(), pos))
}

#[derive(PartialEq, Eq, Copy, Clone)]
enum State {
    Idle,
    Num,
    /// Number following `label+`, stored as the label's shift.
    NumShift,
    Ident,
    Str,
    StrEscape,
}

/// Scans the comma-separated argument list of an instruction line.
///
/// Classification happens on the first character: digits (or a minus) start a number,
/// letters an identifier which becomes a register or a label, quotes a string with
/// `\r` `\n` `\"` `\\` escapes, `[` a nested list and `{` a register list. Inside `db`/`DCB`
/// arguments bare hex digits are numbers too, parsed in base 16.
fn parse_args(text: &str, opcode: &str, pos: &FilePos) -> Result<Vec<Argument>, ParseError> {
    let hex_mode = opcode == "db" || opcode == "DCB";
    let mut args: Vec<Argument> = Vec::new();
    let mut outer: Option<Vec<Argument>> = None;
    let mut reglist: Option<RegisterList> = None;
    let mut state = State::Idle;
    let mut cur = String::new();

    for c in text.chars().chain(std::iter::once('\n')) {
        // First close the token being read, if this character cannot extend it.
        match state {
            State::Idle => {}
            State::Str => {
                match c {
                    '"' => {
                        args.push(Argument::Str(std::mem::take(&mut cur)));
                        state = State::Idle;
                    }
                    '\\' => state = State::StrEscape,
                    _ => cur.push(c),
                }
                continue;
            }
            State::StrEscape => {
                cur.push(match c {
                    'r' => '\r',
                    'n' => '\n',
                    other => other,
                });
                state = State::Str;
                continue;
            }
            State::Num | State::NumShift => {
                if c.is_ascii_digit() || "aAbBcCdDeEfFxXoO".contains(c) {
                    cur.push(c);
                    continue;
                }
                let value = parse_int(&cur, hex_mode)
                    .ok_or_else(|| ParseError::new(format!("invalid number: {}", cur), pos))?;
                if state == State::NumShift {
                    match args.last_mut() {
                        Some(Argument::Label(label)) => label.shift = value,
                        _ => unreachable!("shift state entered after a label"),
                    }
                } else {
                    args.push(Argument::Imm(Imm::with_text(value, &cur)));
                }
                cur.clear();
                state = State::Idle;
            }
            State::Ident => {
                if c.is_alphanumeric() || c == '_' || (reglist.is_some() && c == '-') {
                    cur.push(c);
                    continue;
                }
                if let Some(list) = &mut reglist {
                    reglist_token(list, &cur, pos)?;
                } else if let Some(reg) = RegisterIndex::lookup(&cur) {
                    args.push(Argument::Reg(reg));
                } else {
                    args.push(Argument::Label(Label::new(&cur)));
                }
                cur.clear();
                state = State::Idle;
            }
        }

        // Then classify it as the start of the next token.
        match c {
            d if d.is_ascii_digit() || d == '-' || (hex_mode && d.is_ascii_hexdigit()) => {
                cur.push(d);
                state = State::Num;
            }
            a if a.is_alphabetic() || a == '_' => {
                cur.push(a);
                state = State::Ident;
            }
            '+' => match args.last() {
                Some(Argument::Label(_)) => state = State::NumShift,
                _ => return Err(ParseError::new("unexpected +", pos)),
            },
            '"' => state = State::Str,
            '[' => {
                if outer.is_some() {
                    return Err(ParseError::new("nested [] are not supported", pos));
                }
                outer = Some(std::mem::take(&mut args));
            }
            ']' => match outer.take() {
                Some(mut enclosing) => {
                    enclosing.push(Argument::List(std::mem::take(&mut args)));
                    args = enclosing;
                }
                None => return Err(ParseError::new("unmatched ]", pos)),
            },
            '{' => {
                if reglist.is_some() {
                    return Err(ParseError::new("already in register list", pos));
                }
                reglist = Some(RegisterList::default());
            }
            '}' => match reglist.take() {
                Some(list) => args.push(Argument::RegList(list)),
                None => return Err(ParseError::new("unmatched }", pos)),
            },
            w if w.is_whitespace() => {}
            ',' => {}
            other => return Err(ParseError::new(format!("bad character: {}", other), pos)),
        }
    }

    if state != State::Idle {
        return Err(ParseError::new("unterminated string", pos));
    }
    if outer.is_some() {
        return Err(ParseError::new("unmatched '['", pos));
    }
    if reglist.is_some() {
        return Err(ParseError::new("unmatched '{'", pos));
    }
    Ok(args)
}

/// One entry of a `{...}` register list: a register name or an inclusive `Ra-Rb` range.
fn reglist_token(list: &mut RegisterList, token: &str, pos: &FilePos) -> Result<(), ParseError> {
    if let Some((low, high)) = token.split_once('-') {
        let a = RegisterIndex::lookup(low)
            .ok_or_else(|| ParseError::new(format!("invalid register range: {}", token), pos))?;
        let b = RegisterIndex::lookup(high)
            .ok_or_else(|| ParseError::new(format!("invalid register range: {}", token), pos))?;
        if a >= b {
            return Err(ParseError::new(
                format!("unordered register range: {}", token),
                pos,
            ));
        }
        for n in a.number()..=b.number() {
            list.insert(RegisterIndex::try_from(n as u8).unwrap());
        }
    } else {
        let reg = RegisterIndex::lookup(token)
            .ok_or_else(|| ParseError::new(format!("invalid register: {}", token), pos))?;
        list.insert(reg);
    }
    Ok(())
}

/// Parses an integer of any written base: `0x` hex, `0b` binary, `0o` or a leading zero octal,
/// decimal otherwise, all with an optional leading minus. In `hex_mode` bare digit runs are
/// hexadecimal.
fn parse_int(s: &str, hex_mode: bool) -> Option<i64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if digits.is_empty() {
        return None;
    }
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else if let Some(oct) = digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8)
    } else if hex_mode {
        i64::from_str_radix(digits, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse()
    };
    value.ok().map(|v| if negative { -v } else { v })
}
