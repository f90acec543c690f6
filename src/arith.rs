//! Immediate-encoding arithmetic for the Thumb-2 instruction set.

/// A 32-bit constant packed into the 12-bit modified immediate field of a Thumb-2 instruction,
/// split into the `i`, `imm3` and `imm8` sub-fields the encodings scatter over both halfwords.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpandedImm(u16);

impl ExpandedImm {
    /// Top bit of the immediate field, placed in the first halfword.
    pub fn i(&self) -> u32 {
        (self.0 >> 11) as u32 & 1
    }

    /// Bits 10:8 of the immediate field.
    pub fn imm3(&self) -> u32 {
        (self.0 >> 8) as u32 & 7
    }

    /// Low byte of the immediate field.
    pub fn imm8(&self) -> u32 {
        self.0 as u32 & 0xff
    }
}

/// Packs a 32-bit constant into the ARMv7-M `ThumbExpandImm` scheme, or returns [None] if the
/// value has no such encoding.
///
/// The scheme covers, in this order of preference:
/// - plain values up to 0xFF,
/// - the byte replications `ABABABAB`, `00AB00AB` and `AB00AB00`,
/// - any byte-sized group of bits rotated into place, with the top bit of the byte set (the
///   leading one is implicit in the encoding).
pub fn thumb_expand_imm(value: u32) -> Option<ExpandedImm> {
    if value <= 0xff {
        return Some(ExpandedImm(value as u16));
    }
    let b1 = value >> 24;
    let b2 = value >> 16 & 0xff;
    let b3 = value >> 8 & 0xff;
    let b4 = value & 0xff;
    if b1 == b2 && b2 == b3 && b3 == b4 {
        return Some(ExpandedImm((0b11 << 8 | b1) as u16));
    }
    if b1 == 0 && b3 == 0 && b2 == b4 {
        return Some(ExpandedImm((0b01 << 8 | b2) as u16));
    }
    if b2 == 0 && b4 == 0 && b1 == b3 {
        return Some(ExpandedImm((0b10 << 8 | b1) as u16));
    }
    // Rotations below 8 would collide with the plain and replicated forms above.
    for r in 8..32 {
        let w = value.rotate_left(r);
        if w & 0xffff_ff00 == 0 && w & 0x80 != 0 {
            return Some(ExpandedImm(((r << 7) & 0xfff | (w & 0x7f)) as u16));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::thumb_expand_imm;

    fn fields(value: u32) -> Option<(u32, u32, u32)> {
        thumb_expand_imm(value).map(|e| (e.i(), e.imm3(), e.imm8()))
    }

    /// Undoes the packing the way the processor does, for cross-checking.
    fn unpack(i: u32, imm3: u32, imm8: u32) -> u32 {
        let imm12 = i << 11 | imm3 << 8 | imm8;
        if imm12 >> 10 & 3 == 0 {
            match imm12 >> 8 & 3 {
                0 => imm8,
                1 => imm8 << 16 | imm8,
                2 => imm8 << 24 | imm8 << 8,
                _ => imm8 << 24 | imm8 << 16 | imm8 << 8 | imm8,
            }
        } else {
            (1 << 7 | (imm12 & 0x7f)).rotate_right(imm12 >> 7 & 0x1f)
        }
    }

    #[test]
    fn test_plain_byte() {
        assert_eq!(fields(0), Some((0, 0, 0)));
        assert_eq!(fields(0xff), Some((0, 0, 0xff)));
        assert_eq!(fields(0x42), Some((0, 0, 0x42)));
    }

    #[test]
    fn test_replications() {
        assert_eq!(fields(0x12121212), Some((0, 3, 0x12)));
        assert_eq!(fields(0x00ab00ab), Some((0, 1, 0xab)));
        assert_eq!(fields(0xab00ab00), Some((0, 2, 0xab)));
        // Mismatching second byte falls out of the 00AB00AB form.
        assert_eq!(fields(0x00ab00ac), None);
    }

    #[test]
    fn test_rotations() {
        // Golden values from MOV.W R1, 0xFF000 and TST R1, 0x100000.
        assert_eq!(fields(0xff000), Some((1, 2, 0x7f)));
        assert_eq!(fields(0x100000), Some((1, 1, 0x80)));
        assert_eq!(fields(0xff00ff00), Some((0, 2, 0xff)));
        assert_eq!(fields(0x12345678), None);
        assert_eq!(fields(0x101), None);
    }

    #[test]
    fn test_roundtrip() {
        for value in [0x17u32, 0xff, 0x3300, 0xa5a5a5a5, 0x00c800c8, 0x7f800000, 0x280, 0xff000] {
            let e = thumb_expand_imm(value).unwrap();
            assert_eq!(unpack(e.i(), e.imm3(), e.imm8()), value, "value {value:#x}");
        }
    }
}
