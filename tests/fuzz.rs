//! Fuzzy testing.
//! Tries to discover panics with damaged and random blobs.
//! The long running variant is marked with `#[ignore]`. To run it, use `cargo test -- --ignored`.

use std::panic::catch_unwind;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

extern crate lerc1;
use lerc1::prelude::*;
use lerc1::image::PartDescriptor;


fn sample_blobs() -> Vec<Vec<u8>> {
    let mut random = StdRng::seed_from_u64(42);
    let mut blobs = Vec::new();

    for &(width, height, max_z_error) in &[(1, 1, 0.0), (9, 5, 0.5), (40, 33, 0.01), (70, 70, 0.0), (100, 20, 2.0)] {
        let mut image = CntZImage::with_size(width, height);

        for (index, cell) in image.data_mut().iter_mut().enumerate() {
            if index % 7 != 3 {
                *cell = CntZ::valid((index as f32 * 0.1).sin() * 20.0 + random.random_range(0.0_f32 .. 0.5));
            }
        }

        blobs.push(image.encode(EncodeOptions::with_max_z_error(max_z_error)).unwrap());
    }

    blobs
}

/// Decode the bytes, returning false if the decoder panicked or returned an io error.
fn decodes_without_panic(bytes: Vec<u8>) -> bool {
    let result = catch_unwind(move || {
        CntZImage::decode(&bytes, DecodeOptions::any_error())
    });

    match result {
        Ok(Ok(_)) => true,
        Ok(Err(Error::Invalid(_))) => true,
        Ok(Err(Error::NotSupported(_))) => true,
        Ok(Err(Error::Io(error))) => {
            println!("✗ Unexpected IO Error: {:?}", error);
            false
        },
        Err(_) => false,
    }
}


#[test]
pub fn truncated(){
    for blob in sample_blobs() {
        for length in 0 .. blob.len() {
            let truncated = blob[.. length].to_vec();
            assert!(
                matches!(CntZImage::decode(&truncated, DecodeOptions::any_error()), Err(Error::Invalid(_))),
                "blob truncated to {} of {} bytes", length, blob.len()
            );
        }
    }
}

#[test]
pub fn damaged(){
    let mut random = StdRng::seed_from_u64(7);
    let mut passed = true;

    for blob in sample_blobs() {
        for index in 0 .. 4096 {
            let mut damaged = blob.clone();

            // header damage is covered by the header tests,
            // and a damaged size could make the decoder allocate gigabytes
            let position = random.random_range(Header::BYTE_SIZE .. damaged.len());
            damaged[position] = random.random();

            if index % 2 == 0 {
                let position = random.random_range(Header::BYTE_SIZE .. damaged.len());
                damaged[position] ^= 1_u8 << random.random_range(0 .. 8_u32);
            }

            if !decodes_without_panic(damaged) {
                println!("✗ Panic: byte {} of blob with {} bytes", position, blob.len());
                passed = false;
            }
        }
    }

    assert!(passed, "A damaged blob was not handled correctly");
}

#[test]
pub fn damaged_descriptors(){
    for blob in sample_blobs() {
        let count_part = PartDescriptor::read(&mut &blob[Header::BYTE_SIZE ..]).unwrap();
        let z_descriptor = Header::BYTE_SIZE + PartDescriptor::BYTE_SIZE + count_part.byte_count;

        for &start in &[Header::BYTE_SIZE, z_descriptor] {
            for field in 0 .. 3 {
                for &value in &[-1_i32, 0, 1, 2, 3, 1000, i32::MAX, i32::MIN] {
                    let mut damaged = blob.clone();
                    let offset = start + field * 4;
                    damaged[offset .. offset + 4].copy_from_slice(&value.to_le_bytes());
                    assert!(decodes_without_panic(damaged), "descriptor field {} at {} set to {}", field, start, value);
                }
            }
        }
    }
}

#[test]
#[ignore]
pub fn fuzz(){
    println!("started fuzzing");
    let blobs = sample_blobs();

    let seed = [92,1,0,30,2,8,21,70,74,4,9,9,0,23,0,3,20,5,6,5,9,30,0,34,8,0,40,7,5,2,7,0,];
    let mut random: StdRng = SeedableRng::from_seed(seed);

    for fuzz_index in 0 .. 1024_u64 * 1024 * 4 {
        let blob = &blobs[random.random_range(0 .. blobs.len())];
        let mut damaged = blob.clone();

        for _ in 0 .. random.random_range(1 .. 8) {
            let position = random.random_range(Header::BYTE_SIZE .. damaged.len());
            damaged[position] = random.random();
        }

        if random.random_bool(0.1) {
            let length = random.random_range(0 .. damaged.len());
            damaged.truncate(length);
        }

        if !decodes_without_panic(damaged) {
            println!("!!! [{}]: panic", fuzz_index);
        }
    }
}

#[test]
pub fn random_bytes(){
    let mut random = StdRng::seed_from_u64(3);

    for _ in 0 .. 4096 {
        let length = random.random_range(0 .. 200);
        let bytes: Vec<u8> = (0 .. length).map(|_| random.random()).collect();
        assert!(decodes_without_panic(bytes));
    }
}
