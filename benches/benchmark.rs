use criterion::{black_box, criterion_group, criterion_main, Criterion};
use thumbpatch::mask::{Mask, MaskPart};

pub fn benchmark(c: &mut Criterion) {
    // Pseudo-random 1 MiB image with the pattern planted once near the end.
    let mut image = vec![0u8; 1 << 20];
    let mut state = 0x12345678u32;
    for byte in image.iter_mut() {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        *byte = (state >> 24) as u8;
    }
    let needle = [0x2d, 0xe9, 0xf0, 0x41, 0x04, 0x46];
    let at = image.len() - 0x1000;
    image[at..at + needle.len()].copy_from_slice(&needle);

    let mask = Mask::new(
        vec![
            MaskPart::Bytes(needle[..4].to_vec()),
            MaskPart::Skip(1),
            MaskPart::Bytes(needle[5..].to_vec()),
        ],
        0,
        None,
    );

    let mut g = c.benchmark_group("group");
    g.sample_size(20);
    g.bench_function("mask_scan_1mib", |b| {
        b.iter(|| black_box(&mask).find(black_box(&image)).unwrap())
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
