use criterion::{criterion_group, criterion_main, Criterion};
use image::{ImageFormat, RgbImage};
use receipt_vault::services::image_transform::compress_receipt;
use std::hint::black_box;
use std::io::Cursor;

/// Phone-camera sized photo with some texture so JPEG has work to do.
fn encode_photo(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("Failed to encode fixture");
    out.into_inner()
}

fn benchmark_compress_receipt(c: &mut Criterion) {
    let phone_jpeg = encode_photo(3024, 4032, ImageFormat::Jpeg);
    let small_png = encode_photo(800, 600, ImageFormat::Png);

    let mut group = c.benchmark_group("compress_receipt");
    group.sample_size(10);

    // Needs a downscale to 1200x1600
    group.bench_function("phone_photo_12mp", |b| {
        b.iter(|| compress_receipt(black_box(&phone_jpeg)))
    });

    // Already within bounds; re-encode only
    group.bench_function("small_png", |b| {
        b.iter(|| compress_receipt(black_box(&small_png)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_compress_receipt);
criterion_main!(benches);
