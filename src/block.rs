//! Blocks: a mask plus the instructions replacing the matched bytes.

use crate::instructions::{Ins, InsKind, Scope, SymbolTable};
use crate::mask::Mask;
use crate::patch::PatchError;
use crate::ranges::Ranges;

/// A contiguous piece of patch output, located by its mask or by the free-range allocator.
///
/// A block carries its own local symbol map, populated during bind by the label instructions it
/// contains. Local labels shadow patch and library symbols of the same name.
#[derive(Debug)]
pub struct Block {
    mask: Mask,
    instructions: Vec<Ins>,
    context: SymbolTable,
    /// File offset of the block inside the binary, cached by [Block::position].
    position: Option<usize>,
    addr: Option<u32>,
}

impl Block {
    pub fn new(mask: Mask, instructions: Vec<Ins>) -> Self {
        Self {
            mask,
            instructions,
            context: SymbolTable::new(),
            position: None,
            addr: None,
        }
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn instructions(&self) -> &[Ins] {
        &self.instructions
    }

    /// Block-local symbol map.
    pub fn context(&self) -> &SymbolTable {
        &self.context
    }

    /// Total size of the block's instructions in bytes.
    pub fn size(&self) -> Result<u32, PatchError> {
        let mut total = 0;
        for ins in &self.instructions {
            total += ins.size().map_err(|source| PatchError::Encode {
                block: self.mask.to_string(),
                ins: format!("{:?}", ins),
                source,
            })?;
        }
        Ok(total)
    }

    /// File offset of the block: the unique mask match, or a region reserved from the pool for
    /// floating blocks. The result is cached.
    pub fn position(&mut self, binary: &[u8], ranges: &mut Ranges) -> Result<usize, PatchError> {
        if let Some(position) = self.position {
            return Ok(position);
        }
        let position = if self.mask.is_floating() {
            let size = self.size()? as usize;
            let (start, _end) = ranges.find(size)?;
            self.mask.set_size(size);
            start
        } else {
            self.mask.find(binary)?
        };
        self.position = Some(position);
        Ok(position)
    }

    /// Position established by an earlier bind.
    pub fn bound_position(&self) -> Result<usize, PatchError> {
        self.position.ok_or(PatchError::NotBound)
    }

    /// Binds the block to the given absolute address.
    ///
    /// Walks the instructions in order, assigning each its address; label instructions register
    /// themselves in the block or patch scope, and `val` reads the original binary at the
    /// instruction's file position.
    pub fn bind(
        &mut self,
        addr: u32,
        binary: &[u8],
        patch_context: &mut SymbolTable,
    ) -> Result<(), PatchError> {
        self.addr = Some(addr);
        let floating = self.mask.is_floating();
        let mut cursor = addr;
        for ins in &mut self.instructions {
            ins.set_addr(cursor);
            match ins.kind().clone() {
                InsKind::Encoded => {}
                InsKind::Label { name, global } => {
                    let scope = if global {
                        &mut *patch_context
                    } else {
                        &mut self.context
                    };
                    if scope.insert(name.clone(), cursor).is_some() {
                        return Err(PatchError::DuplicateSymbol {
                            name,
                            scope: if global { "patch" } else { "block" },
                        });
                    }
                }
                InsKind::Val { name } => {
                    if floating {
                        return Err(PatchError::ValInFloatingBlock { name });
                    }
                    // The block position is set before bind; offset into the file tracks the
                    // offset into the block.
                    let offset = self.position.expect("bound after position")
                        + (cursor - addr) as usize;
                    let bytes = binary
                        .get(offset..offset + 4)
                        .ok_or_else(|| PatchError::ValOutOfBinary { name: name.clone() })?;
                    let value = u32::from_le_bytes(bytes.try_into().unwrap());
                    if patch_context.insert(name.clone(), value).is_some() {
                        return Err(PatchError::DuplicateSymbol {
                            name,
                            scope: "patch",
                        });
                    }
                }
            }
            cursor += ins.size().map_err(|source| PatchError::Encode {
                block: self.mask.to_string(),
                ins: format!("{:?}", ins),
                source,
            })?;
        }
        tracing::debug!(block = %self.mask, addr, "block bound");
        Ok(())
    }

    /// Encodes the whole block against the patch and library scopes.
    pub fn code(
        &self,
        patch_context: &SymbolTable,
        library_context: &SymbolTable,
    ) -> Result<Vec<u8>, PatchError> {
        let scope = Scope {
            local: &self.context,
            patch: patch_context,
            library: library_context,
        };
        let mut code = Vec::new();
        for ins in &self.instructions {
            let bytes = ins.encode(&scope).map_err(|source| PatchError::Encode {
                block: self.mask.to_string(),
                ins: format!("{:?}", ins),
                source,
            })?;
            let expected = ins.size().map_err(|source| PatchError::Encode {
                block: self.mask.to_string(),
                ins: format!("{:?}", ins),
                source,
            })?;
            assert_eq!(
                bytes.len(),
                expected as usize,
                "encoded length mismatch for {:?}",
                ins
            );
            code.extend_from_slice(&bytes);
        }
        Ok(code)
    }
}
