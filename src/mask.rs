//! Byte masks locating patch blocks inside the firmware image.

use crate::parser::FilePos;
use std::fmt::{self, Display};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaskError {
    #[error("mask not found: {0}")]
    NotFound(String),
    #[error("mask matches {count} locations: {mask}")]
    Ambiguous { mask: String, count: usize },
}

/// One element of a mask pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskPart {
    /// Bytes which must match the binary exactly.
    Bytes(Vec<u8>),
    /// A run of bytes with any content.
    Skip(usize),
}

impl MaskPart {
    fn len(&self) -> usize {
        match self {
            MaskPart::Bytes(bytes) => bytes.len(),
            MaskPart::Skip(count) => *count,
        }
    }
}

/// A byte pattern anchoring a block inside the binary, or a floating placeholder.
///
/// An anchored mask is a sequence of literal and skip parts plus an offset: the distance from
/// the first matched byte to the address the block reports (where the `@` marker sat in the
/// source). A floating mask has no parts; its block is placed by the free-range allocator and
/// the size is filled in at bind time.
#[derive(Debug, Clone)]
pub struct Mask {
    parts: Vec<MaskPart>,
    offset: isize,
    pos: Option<FilePos>,
    floating_size: Option<usize>,
}

impl Mask {
    /// Builds an anchored mask.
    ///
    /// Leading skip parts are folded into a negative offset so that matching can anchor on the
    /// first literal part. At least one part must be a literal.
    pub fn new(parts: Vec<MaskPart>, offset: usize, pos: Option<FilePos>) -> Self {
        assert!(
            parts.iter().any(|p| matches!(p, MaskPart::Bytes(_))),
            "anchored mask needs at least one literal part"
        );
        let mut offset = offset as isize;
        let mut parts = parts;
        while matches!(parts.first(), Some(MaskPart::Skip(_))) {
            if let MaskPart::Skip(count) = parts.remove(0) {
                offset -= count as isize;
            }
        }
        Self {
            parts,
            offset,
            pos,
            floating_size: None,
        }
    }

    /// Builds a floating mask; the block position comes from the free-range pool.
    pub fn floating(pos: Option<FilePos>) -> Self {
        Self {
            parts: Vec::new(),
            offset: 0,
            pos,
            floating_size: None,
        }
    }

    pub fn is_floating(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn pos(&self) -> Option<&FilePos> {
        self.pos.as_ref()
    }

    /// Number of binary bytes covered from the reported address to the end of the mask.
    ///
    /// This is how much room the enclosing block may overwrite. For floating masks the value is
    /// the one recorded by [Mask::set_size], once bound.
    pub fn size(&self) -> Option<usize> {
        if self.is_floating() {
            self.floating_size
        } else {
            let total: isize = self.parts.iter().map(|p| p.len() as isize).sum();
            Some((total - self.offset) as usize)
        }
    }

    /// Records the reserved size of a floating mask.
    pub fn set_size(&mut self, size: usize) {
        assert!(self.is_floating(), "size is computed for anchored masks");
        self.floating_size = Some(size);
    }

    /// Scans `data` for the unique occurrence of the mask and returns the matched position,
    /// adjusted by the anchor offset.
    pub fn find(&self, data: &[u8]) -> Result<usize, MaskError> {
        assert!(!self.is_floating(), "cannot match a floating mask");
        let first = match &self.parts[0] {
            MaskPart::Bytes(bytes) => bytes,
            MaskPart::Skip(_) => unreachable!(),
        };
        let mut found = None;
        let mut count = 0;
        let mut from = 0;
        while let Some(start) = find_bytes(data, first, from) {
            if self.matches_at(data, start + first.len()) {
                // A leading skip can push the reported position before the start of the
                // binary; such a match cannot be a real anchor.
                if start as isize + self.offset >= 0 {
                    count += 1;
                    found.get_or_insert(start);
                }
            }
            from = start + 1;
        }
        match (found, count) {
            (Some(start), 1) => {
                let position = (start as isize + self.offset) as usize;
                tracing::debug!(mask = %self, position, "mask matched");
                Ok(position)
            }
            (Some(_), count) => Err(MaskError::Ambiguous {
                mask: self.to_string(),
                count,
            }),
            (None, _) => Err(MaskError::NotFound(self.to_string())),
        }
    }

    /// Walks the parts after the first literal at the given cursor.
    fn matches_at(&self, data: &[u8], mut pos: usize) -> bool {
        for part in &self.parts[1..] {
            match part {
                MaskPart::Skip(count) => pos += count,
                MaskPart::Bytes(bytes) => {
                    if data.get(pos..pos + bytes.len()) != Some(bytes.as_slice()) {
                        return false;
                    }
                    pos += bytes.len();
                }
            }
        }
        true
    }
}

/// Returns the position of the first occurrence of `needle` in `data` at or after `from`.
fn find_bytes(data: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from + needle.len() > data.len() {
        return None;
    }
    data[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

impl Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_floating() {
            return write!(f, "floating mask");
        }
        let parts = self
            .parts
            .iter()
            .map(|part| match part {
                MaskPart::Skip(count) => format!("?{}", count),
                MaskPart::Bytes(bytes) => bytes
                    .iter()
                    .map(|b| format!("{:02X}", b))
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{} @{}", parts, self.offset)?;
        if let Some(pos) = &self.pos {
            write!(f, " ({})", pos)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Mask, MaskError, MaskPart};

    fn mask(parts: Vec<MaskPart>, offset: usize) -> Mask {
        Mask::new(parts, offset, None)
    }

    fn hello_world() -> Mask {
        mask(
            vec![
                MaskPart::Bytes(b"hello".to_vec()),
                MaskPart::Skip(3),
                MaskPart::Bytes(b"world".to_vec()),
            ],
            0,
        )
    }

    #[test]
    fn test_match() {
        assert_eq!(hello_world().find(b"hello!!!world"), Ok(0));
        assert_eq!(hello_world().find(b"xyzhello!!!worldxyz"), Ok(3));
    }

    #[test]
    fn test_not_found() {
        assert!(matches!(
            hello_world().find(b"hello_world"),
            Err(MaskError::NotFound(_))
        ));
    }

    #[test]
    fn test_ambiguous() {
        assert_eq!(
            hello_world().find(b"hello!!!world...hello???world"),
            Err(MaskError::Ambiguous {
                mask: hello_world().to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_offset() {
        // Anchor two bytes into the literal.
        let m = mask(vec![MaskPart::Bytes(b"abcdef".to_vec())], 2);
        assert_eq!(m.find(b"..abcdef.."), Ok(4));
        assert_eq!(m.size(), Some(4));
    }

    #[test]
    fn test_leading_skip() {
        // "?2 AB CD" reports two bytes before the first literal.
        let m = mask(
            vec![MaskPart::Skip(2), MaskPart::Bytes(vec![0xab, 0xcd])],
            0,
        );
        assert_eq!(m.find(&[0, 0, 0, 0xab, 0xcd]), Ok(1));
        assert_eq!(m.size(), Some(4));
        // A hit right at the start of the data cannot honour the skip.
        assert!(matches!(
            m.find(&[0xab, 0xcd, 0, 0]),
            Err(MaskError::NotFound(_))
        ));
    }

    #[test]
    fn test_skip_may_run_past_end() {
        let m = mask(vec![MaskPart::Bytes(vec![0x01]), MaskPart::Skip(8)], 0);
        assert_eq!(m.find(&[0x00, 0x01]), Ok(1));
    }

    #[test]
    fn test_size() {
        assert_eq!(hello_world().size(), Some(13));
        let mut floating = Mask::floating(None);
        assert_eq!(floating.size(), None);
        floating.set_size(12);
        assert_eq!(floating.size(), Some(12));
    }
}
