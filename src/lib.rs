//! Thumbpatch is a binary patcher for compiled ARM Cortex-M firmware images. A patch is written
//! as a text file which locates regions of the firmware by byte masks and replaces them with
//! small fragments of ARM Thumb assembly. The library parses such patch files, assembles the
//! Thumb-1 and Thumb-2 fragments, resolves labels across blocks and included files, and splices
//! the encoded bytes into a copy of the firmware.
//!
//! Check [patch::PatchSet] for the whole parse / bind / apply pipeline, or [parser] and
//! [instructions] to use the parser and the assembler on their own.

mod arith;
pub mod args;
pub mod block;
pub mod condition;
mod helpers;
pub mod instructions;
pub mod mask;
pub mod parser;
pub mod patch;
pub mod ranges;
pub mod registers;
