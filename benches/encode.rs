#[macro_use]
extern crate bencher;

extern crate lerc1;
use lerc1::prelude::*;

use bencher::Bencher;


fn terrain() -> CntZImage {
    let (width, height) = (512, 512);
    let mut image = CntZImage::with_size(width, height);

    for row in 0 .. height {
        for column in 0 .. width {
            let (x, y) = (column as f32 * 0.02, row as f32 * 0.03);
            if (row / 50 + column / 70) % 5 != 0 {
                image.set(row, column, CntZ::valid(1200.0 + 80.0 * x.sin() * y.cos() + (x * 13.0).sin()));
            }
        }
    }

    image
}

fn encode_lossless(bench: &mut Bencher) {
    let mut image = terrain();

    bench.iter(||{
        let bytes = image.encode(EncodeOptions::lossless()).unwrap();
        bencher::black_box(bytes);
    })
}

fn encode_centimeters(bench: &mut Bencher) {
    let mut image = terrain();

    bench.iter(||{
        let bytes = image.encode(EncodeOptions::with_max_z_error(0.01)).unwrap();
        bencher::black_box(bytes);
    })
}

fn decode_centimeters(bench: &mut Bencher) {
    let bytes = terrain().encode(EncodeOptions::with_max_z_error(0.01)).unwrap();

    bench.iter(||{
        let image = CntZImage::decode(&bytes, DecodeOptions::with_max_z_error(0.01)).unwrap();
        bencher::black_box(image);
    })
}

benchmark_group!(encode,
    encode_lossless,
    encode_centimeters,
    decode_centimeters
);

benchmark_main!(encode);
