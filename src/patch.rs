//! Patches and the bind / apply pipeline.

use crate::block::Block;
use crate::instructions::{EncodeError, Registry, SymbolTable};
use crate::mask::MaskError;
use crate::parser::{self, Definitions, ParseError};
use crate::ranges::{RangeError, Ranges};
use std::path::Path;
use thiserror::Error;

/// Error produced while binding or applying patches.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error(transparent)]
    Mask(#[from] MaskError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("duplicate symbol {name} in {scope} scope")]
    DuplicateSymbol { name: String, scope: &'static str },
    #[error("patch is already bound")]
    AlreadyBound,
    #[error("block has not been bound")]
    NotBound,
    #[error("val {name} not allowed in a floating block")]
    ValInFloatingBlock { name: String },
    #[error("val {name} reads past the end of the binary")]
    ValOutOfBinary { name: String },
    #[error("block {block}: {ins}: {source}")]
    Encode {
        block: String,
        ins: String,
        source: EncodeError,
    },
    #[error("code length {code} exceeds mask length {mask} for block {block}")]
    BlockOverflow {
        code: usize,
        mask: usize,
        block: String,
    },
}

/// One parsed patch file: its blocks and its patch-level symbol map.
///
/// A distinguished library patch aggregates the blocks of every `#include`d file; its symbol
/// map is the scope of last resort during label resolution.
#[derive(Debug)]
pub struct Patch {
    name: String,
    blocks: Vec<Block>,
    context: SymbolTable,
    bound: bool,
}

impl Patch {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
            context: SymbolTable::new(),
            bound: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a block during parsing.
    pub fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Patch-level symbol map (`global`, `proc` and `val` names).
    pub fn context(&self) -> &SymbolTable {
        &self.context
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Locates every block in the binary (or in the free-range pool) and assigns all
    /// instruction addresses. `codebase` is the absolute address of byte 0 of the binary.
    pub fn bind_all(
        &mut self,
        binary: &[u8],
        ranges: &mut Ranges,
        codebase: u32,
    ) -> Result<(), PatchError> {
        if self.bound {
            return Err(PatchError::AlreadyBound);
        }
        tracing::debug!(patch = %self.name, blocks = self.blocks.len(), "binding");
        let Self {
            blocks, context, ..
        } = self;
        for block in blocks.iter_mut() {
            let position = block.position(binary, ranges)?;
            block.bind(codebase + position as u32, binary, context)?;
        }
        self.bound = true;
        Ok(())
    }

    /// Encodes every block and splices the code into `binary` at the bound positions.
    ///
    /// Unless `ignore_length` is set, a block whose code exceeds the room its mask covers is an
    /// error. Splicing preserves the binary length except for blocks placed past its end.
    pub fn emit(
        &self,
        mut binary: Vec<u8>,
        library_context: &SymbolTable,
        ignore_length: bool,
    ) -> Result<Vec<u8>, PatchError> {
        for block in &self.blocks {
            let position = block.bound_position()?;
            let code = block.code(&self.context, library_context)?;
            if let Some(mask_size) = block.mask().size() {
                if code.len() > mask_size && !ignore_length {
                    return Err(PatchError::BlockOverflow {
                        code: code.len(),
                        mask: mask_size,
                        block: block.mask().to_string(),
                    });
                }
            }
            let length_before = binary.len();
            splice(&mut binary, position, &code);
            // Splices inside the image never change its length.
            assert!(binary.len() == length_before || position + code.len() > length_before);
        }
        Ok(binary)
    }

    /// Binds if necessary, then emits. Returns the patched binary.
    pub fn apply(
        &mut self,
        binary: Vec<u8>,
        ranges: &mut Ranges,
        library_context: &SymbolTable,
        codebase: u32,
        ignore_length: bool,
    ) -> Result<Vec<u8>, PatchError> {
        if !self.bound {
            self.bind_all(&binary, ranges, codebase)?;
        }
        self.emit(binary, library_context, ignore_length)
    }
}

/// Overwrites `binary` at `position` with `code`, growing the image when the block was placed
/// at or past its end. A gap left by an earlier short write is zero filled so every block still
/// lands at its bound position.
fn splice(binary: &mut Vec<u8>, position: usize, code: &[u8]) {
    if position > binary.len() {
        binary.resize(position, 0);
    }
    let overlap = (position + code.len()).min(binary.len()) - position;
    binary[position..position + overlap].copy_from_slice(&code[..overlap]);
    binary.extend_from_slice(&code[overlap..]);
}

/// A whole patching session: the shared definitions, the library patch collecting `#include`d
/// blocks, the user patches in load order and the free-range pool.
///
/// ```no_run
/// use thumbpatch::patch::PatchSet;
///
/// let binary = std::fs::read("firmware.bin").unwrap();
/// let mut set = PatchSet::new();
/// set.define("COLOR", None);
/// set.load("patches/demo.pbp".as_ref()).unwrap();
/// set.append_space(&binary, 0x70000, 0x48);
/// let patched = set.apply(binary, 0x08004000, false).unwrap();
/// ```
pub struct PatchSet {
    registry: Registry,
    definitions: Definitions,
    library: Patch,
    patches: Vec<Patch>,
    ranges: Ranges,
}

impl PatchSet {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            definitions: Definitions::new(),
            library: Patch::new("#library"),
            patches: Vec::new(),
            ranges: Ranges::new(),
        }
    }

    /// Predefines a constant, as the original `-D name[=value]` switch did.
    pub fn define(&mut self, name: &str, value: Option<&str>) {
        self.definitions.define(name, value);
    }

    /// Parses a patch file; its `#include`s accumulate into the library patch.
    pub fn load(&mut self, path: &Path) -> Result<(), ParseError> {
        tracing::info!(path = %path.display(), "loading patch");
        let patch = parser::parse_file(
            path,
            &self.registry,
            &mut self.definitions,
            &mut self.library,
        )?;
        self.patches.push(patch);
        Ok(())
    }

    /// Parses patch source from memory. `#include` paths resolve against the working
    /// directory.
    pub fn load_str(&mut self, source: &str, name: &str) -> Result<(), ParseError> {
        let patch = parser::parse_str(
            source,
            name,
            &self.registry,
            &mut self.definitions,
            &mut self.library,
        )?;
        self.patches.push(patch);
        Ok(())
    }

    /// Marks `[start, end)` of the binary as free for floating blocks.
    pub fn add_free_range(&mut self, start: usize, end: usize) {
        self.ranges.add(start, end);
    }

    /// Allows floating blocks to grow the binary up to `max_total` bytes, keeping the last
    /// `retain_tail` bytes of the original image at the very end.
    pub fn append_space(&mut self, binary: &[u8], max_total: usize, retain_tail: usize) {
        self.ranges.add_eof(binary, max_total, retain_tail);
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn library(&self) -> &Patch {
        &self.library
    }

    /// Binds the library patch and every loaded patch against the binary, in load order.
    pub fn bind_all(&mut self, binary: &[u8], codebase: u32) -> Result<(), PatchError> {
        self.library.bind_all(binary, &mut self.ranges, codebase)?;
        for patch in &mut self.patches {
            patch.bind_all(binary, &mut self.ranges, codebase)?;
        }
        Ok(())
    }

    /// Applies every patch (library first) and returns the new binary, with the retained file
    /// tail reattached if floating blocks grew the image.
    pub fn apply(
        &mut self,
        binary: Vec<u8>,
        codebase: u32,
        ignore_length: bool,
    ) -> Result<Vec<u8>, PatchError> {
        let Self {
            library,
            patches,
            ranges,
            ..
        } = self;
        if !library.is_bound() {
            library.bind_all(&binary, ranges, codebase)?;
        }
        tracing::info!(patch = %library.name(), "applying");
        let mut data = library.emit(binary, library.context(), ignore_length)?;
        for patch in patches.iter_mut() {
            tracing::info!(patch = %patch.name(), "applying");
            data = patch.apply(data, ranges, library.context(), codebase, ignore_length)?;
        }
        Ok(ranges.restore_tail(data))
    }
}

impl Default for PatchSet {
    fn default() -> Self {
        Self::new()
    }
}
