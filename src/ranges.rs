//! Pool of free firmware regions used to place floating blocks.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("no free range can hold {0} bytes")]
    Exhausted(usize),
}

/// Collection of half-open `[start, end)` regions of the binary which are safe to overwrite.
///
/// Regions are registered by the caller (unused firmware areas, or space past the end of the
/// file via [Ranges::add_eof]) and consumed from the low end by [Ranges::find]. The regions are
/// kept pairwise disjoint at all times.
#[derive(Debug, Default)]
pub struct Ranges {
    ranges: Vec<(usize, usize)>,
    /// Original file tail saved by [Ranges::add_eof], reattached by [Ranges::restore_tail].
    remainder: Option<Vec<u8>>,
    used: bool,
}

impl Ranges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `[start, end)` as free. Empty ranges are ignored; a range overlapping or
    /// duplicating an existing one is a caller bug. Ranges adjacent to an existing one are
    /// merged with it.
    pub fn add(&mut self, start: usize, end: usize) {
        assert!(start <= end, "illegal range {start}..{end}");
        if start == end {
            return;
        }
        self.ranges.retain(|r| r.0 != r.1);
        for &(from, to) in &self.ranges {
            assert!(
                !(from == start && to == end),
                "duplicate range {start}..{end}"
            );
            assert!(
                end <= from || start >= to,
                "range {start}..{end} clashes with {from}..{to}"
            );
        }
        for range in &mut self.ranges {
            if range.1 == start {
                range.1 = end;
                return;
            }
            if end == range.0 {
                range.0 = start;
                return;
            }
        }
        self.ranges.push((start, end));
    }

    /// Registers the space between the end of the binary and `max_total` as free, keeping the
    /// final `retain_tail` bytes aside so they can be reattached after the image grows.
    pub fn add_eof(&mut self, binary: &[u8], max_total: usize, retain_tail: usize) {
        if binary.len() + retain_tail >= max_total {
            tracing::warn!(
                len = binary.len(),
                max_total,
                retain_tail,
                "binary too large, not appending a free range"
            );
            return;
        }
        self.remainder = Some(binary[binary.len() - retain_tail..].to_vec());
        self.add(binary.len(), max_total - retain_tail);
    }

    /// Reattaches the file tail saved by [Ranges::add_eof], if any allocation happened.
    pub fn restore_tail(&self, mut binary: Vec<u8>) -> Vec<u8> {
        if let (Some(remainder), true) = (&self.remainder, self.used) {
            binary.extend_from_slice(remainder);
        }
        binary
    }

    /// Reserves `size` bytes from the smallest region able to hold them and returns that
    /// region's bounds before the cut.
    pub fn find(&mut self, size: usize) -> Result<(usize, usize), RangeError> {
        self.used = true;
        let best = self
            .ranges
            .iter()
            .enumerate()
            .filter(|(_, r)| r.1 - r.0 >= size)
            .min_by_key(|(_, r)| r.1 - r.0)
            .map(|(n, _)| n)
            .ok_or(RangeError::Exhausted(size))?;
        let range = self.ranges[best];
        self.ranges[best].0 += size;
        Ok(range)
    }

    /// Currently free regions, for inspection.
    pub fn remaining(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.ranges.iter().copied().filter(|r| r.0 != r.1)
    }
}
