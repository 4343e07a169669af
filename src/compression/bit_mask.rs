
//! One validity bit per grid cell, with a byte oriented run length encoding.
//!
//! The run length encoding works on the packed mask bytes.
//! Each run starts with a little-endian `i16` count.
//! A positive count is followed by that many literal bytes,
//! a negative count is followed by a single byte that is repeated `-count` times.
//! The stream ends with the count `-32768`.

use bit_field::BitField;
use super::{Bytes, ByteVec};
use crate::error::{Error, UnitResult};
use crate::io::{Data, take_1, take_n};
use crate::math::Vec2;


const MAX_RUN_LENGTH: usize = 32767;

/// Shorter repetitions are stored inside a literal run.
const MIN_RUN_LENGTH: usize = 5;

const END_OF_TRANSMISSION: i16 = i16::MIN;


/// A packed mask with one bit per cell, the first cell in the most significant bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMask {
    bits: ByteVec,
    size: Vec2<usize>,
}

impl BitMask {

    /// A mask where every cell is invalid.
    pub fn new(size: Vec2<usize>) -> Self {
        BitMask { bits: vec![0; byte_count(size.area())], size }
    }

    /// Width and height of the masked grid.
    pub fn size(&self) -> Vec2<usize> { self.size }

    /// Number of cells in the mask.
    pub fn cell_count(&self) -> usize { self.size.area() }

    /// The packed bits, `ceil(cell_count / 8)` bytes.
    pub fn bytes(&self) -> Bytes<'_> { &self.bits }

    /// Panics if the index is outside of the mask.
    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        self.bits[index >> 3].get_bit(bit_index(index))
    }

    /// Panics if the index is outside of the mask.
    #[inline]
    pub fn set(&mut self, index: usize, valid: bool) {
        self.bits[index >> 3].set_bit(bit_index(index), valid);
    }

    /// Exact number of bytes `rle_compress` will produce.
    pub fn rle_size(&self) -> usize {
        compressed_size(&self.bits)
    }

    /// Run length encode the packed bits.
    pub fn rle_compress(&self) -> ByteVec {
        compress_bytes(&self.bits)
    }

    /// Replace the mask contents with the decoded runs,
    /// advancing the slice past the end marker.
    pub fn rle_decompress(&mut self, remaining: &mut Bytes<'_>) -> UnitResult {
        decompress_bytes(remaining, &mut self.bits)
    }
}

#[inline]
fn byte_count(cell_count: usize) -> usize {
    (cell_count + 7) / 8
}

#[inline]
fn bit_index(index: usize) -> usize {
    7 - (index & 7)
}


/// Upper bound for the compressed size of `byte_count` bytes.
pub fn max_compressed_size(byte_count: usize) -> usize {
    byte_count + 4 + 2 * byte_count.saturating_sub(1) / MAX_RUN_LENGTH
}

/// Exact size of `compress_bytes(data)`, without compressing.
pub fn compressed_size(data: Bytes<'_>) -> usize {
    let runs: usize = Runs::new(data).map(|run| match run {
        Run::Literal(bytes) => 2 + bytes.len(),
        Run::Repeat { .. } => 3,
    }).sum();

    runs + 2
}

/// Run length encode the bytes, terminated by the end marker.
pub fn compress_bytes(data: Bytes<'_>) -> ByteVec {
    let mut compressed = Vec::with_capacity(max_compressed_size(data.len()));

    for run in Runs::new(data) {
        match run {
            Run::Literal(bytes) => {
                push_count(&mut compressed, bytes.len() as i16);
                compressed.extend_from_slice(bytes);
            },

            Run::Repeat { value, count } => {
                push_count(&mut compressed, -(count as i16));
                compressed.push(value);
            },
        }
    }

    push_count(&mut compressed, END_OF_TRANSMISSION);
    compressed
}

/// Fill the whole target with decoded runs, then expect the end marker.
/// Runs with a count of zero are empty and may appear anywhere before the marker.
/// Never reads or writes out of bounds, any inconsistency is an `Error::Invalid`.
pub fn decompress_bytes(remaining: &mut Bytes<'_>, target: &mut [u8]) -> UnitResult {
    let mut write_index = 0;

    while write_index < target.len() {
        let count = i16::read(remaining)?;
        let capacity = target.len() - write_index;

        if count == END_OF_TRANSMISSION {
            return Err(Error::invalid("bit mask data ended before the mask was filled"));
        }

        if count >= 0 {
            let count = count as usize;
            if count > capacity { return Err(Error::invalid("bit mask run exceeds the mask")); }

            let values = take_n(remaining, count, "missing bit mask literal bytes")?;
            target[write_index .. write_index + count].copy_from_slice(values);
            write_index += count;
        }
        else {
            let count = usize::from(count.unsigned_abs());
            if count > capacity { return Err(Error::invalid("bit mask run exceeds the mask")); }

            let value = take_1(remaining, "missing bit mask repeated byte")?;
            target[write_index .. write_index + count].fill(value);
            write_index += count;
        }
    }

    // empty literal runs may still precede the end marker
    loop {
        match i16::read(remaining)? {
            END_OF_TRANSMISSION => return Ok(()),
            0 => {},
            _ => return Err(Error::invalid("missing bit mask end marker")),
        }
    }
}

fn push_count(compressed: &mut ByteVec, count: i16) {
    compressed.extend_from_slice(&count.to_le_bytes());
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'d> {
    Literal(Bytes<'d>),
    Repeat { value: u8, count: usize },
}

/// Splits bytes into the runs of the encoding.
/// Both the encoder and the size estimation consume these,
/// so their results always agree.
struct Runs<'d> {
    data: Bytes<'d>,
    index: usize,
}

impl<'d> Runs<'d> {
    fn new(data: Bytes<'d>) -> Self {
        Runs { data, index: 0 }
    }
}

impl<'d> Iterator for Runs<'d> {
    type Item = Run<'d>;

    fn next(&mut self) -> Option<Run<'d>> {
        let literal_start = self.index;

        while self.index < self.data.len() {
            let run_length = repetitions(&self.data[self.index ..]);

            if run_length >= MIN_RUN_LENGTH {
                if self.index > literal_start {
                    return Some(Run::Literal(&self.data[literal_start .. self.index]));
                }

                let value = self.data[self.index];
                self.index += run_length;
                return Some(Run::Repeat { value, count: run_length });
            }

            self.index += 1;
            if self.index - literal_start == MAX_RUN_LENGTH {
                break;
            }
        }

        if self.index > literal_start {
            Some(Run::Literal(&self.data[literal_start .. self.index]))
        }
        else {
            None
        }
    }
}

/// How often the first byte repeats, at most `MAX_RUN_LENGTH`.
fn repetitions(data: Bytes<'_>) -> usize {
    let max = data.len().min(MAX_RUN_LENGTH);
    let first = data[0];

    data[1 .. max].iter()
        .position(|&byte| byte != first)
        .map_or(max, |index| index + 1)
}


#[cfg(test)]
mod test {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn round_trip(data: &[u8]) {
        let compressed = compress_bytes(data);
        assert_eq!(compressed.len(), compressed_size(data), "size estimation for {} bytes", data.len());
        assert!(compressed.len() <= max_compressed_size(data.len()));

        let mut decompressed = vec![0xAB; data.len()];
        let mut remaining = compressed.as_slice();
        decompress_bytes(&mut remaining, &mut decompressed).unwrap();

        assert!(remaining.is_empty());
        assert_eq!(decompressed, data);
    }

    #[test]
    fn uniform_bytes(){
        for &value in &[0_u8, 0xff] {
            for &length in &[0, 1, 4, 5, 6, 100, MAX_RUN_LENGTH, MAX_RUN_LENGTH + 1, 3 * MAX_RUN_LENGTH + 17] {
                round_trip(&vec![value; length]);
            }
        }
    }

    #[test]
    fn random_bytes(){
        let mut random = StdRng::seed_from_u64(5);

        for length in (0 .. 200).chain(vec![MAX_RUN_LENGTH - 1, MAX_RUN_LENGTH, 70_000]) {
            let data: Vec<u8> = (0 .. length).map(|_| random.random()).collect();
            round_trip(&data);

            // mostly repetitive data, short and long runs mixed
            let data: Vec<u8> = (0 .. length).map(|_| if random.random_bool(0.9) { 0 } else { random.random() }).collect();
            round_trip(&data);
        }
    }

    #[test]
    fn short_repetitions_stay_literal(){
        let data = [1, 1, 1, 1, 2];
        let compressed = compress_bytes(&data);
        assert_eq!(compressed, vec![5, 0, 1, 1, 1, 1, 2, 0x00, 0x80]);

        let data = [3, 3, 3, 3, 3];
        let compressed = compress_bytes(&data);
        assert_eq!(compressed, vec![0xfb, 0xff, 3, 0x00, 0x80]);

        let data = [9, 3, 3, 3, 3, 3, 9];
        let compressed = compress_bytes(&data);
        assert_eq!(compressed, vec![1, 0, 9, 0xfb, 0xff, 3, 1, 0, 9, 0x00, 0x80]);
    }

    #[test]
    fn empty_mask_only_has_end_marker(){
        assert_eq!(compress_bytes(&[]), vec![0x00, 0x80]);

        let mut remaining: &[u8] = &[0x00, 0x80];
        decompress_bytes(&mut remaining, &mut []).unwrap();
    }

    #[test]
    fn corrupt_data_is_rejected(){
        let mut target = [0_u8; 8];

        // truncated count
        assert!(decompress_bytes(&mut &[8_u8][..], &mut target).is_err());

        // literal run longer than the mask
        assert!(decompress_bytes(&mut &[9_u8, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0x00, 0x80][..], &mut target).is_err());

        // literal run longer than the input
        assert!(decompress_bytes(&mut &[8_u8, 0, 1, 2][..], &mut target).is_err());

        // repeat run longer than the mask
        assert!(decompress_bytes(&mut &[0xf0_u8, 0xff, 1, 0x00, 0x80][..], &mut target).is_err());

        // end marker before the mask is full
        assert!(decompress_bytes(&mut &[0x00_u8, 0x80][..], &mut target).is_err());

        // missing end marker
        assert!(decompress_bytes(&mut &[0xf8_u8, 0xff, 1][..], &mut target).is_err());
        assert!(decompress_bytes(&mut &[0xf8_u8, 0xff, 1, 1, 0][..], &mut target).is_err());

        assert!(decompress_bytes(&mut &[0xf8_u8, 0xff, 1, 0x00, 0x80][..], &mut target).is_ok());
        assert_eq!(target, [1; 8]);
    }

    #[test]
    fn zero_count_is_an_empty_literal_run(){
        let mut target = [0_u8; 8];
        let mut remaining: &[u8] = &[0, 0, 0xf8, 0xff, 2, 0, 0, 0x00, 0x80];

        decompress_bytes(&mut remaining, &mut target).unwrap();
        assert_eq!(target, [2; 8]);
        assert!(remaining.is_empty());
    }

    #[test]
    fn bits_are_most_significant_first(){
        let mut mask = BitMask::new(Vec2(3, 3));
        assert_eq!(mask.bytes().len(), 2);

        mask.set(0, true);
        mask.set(8, true);
        assert_eq!(mask.bytes(), &[0x80, 0x80]);

        assert!(mask.is_valid(0));
        assert!(!mask.is_valid(1));
        assert!(mask.is_valid(8));

        mask.set(0, false);
        assert_eq!(mask.bytes(), &[0x00, 0x80]);
    }

    #[test]
    fn mask_round_trip(){
        let size = Vec2(100, 100);
        let mut mask = BitMask::new(size);

        for index in 0 .. size.area() {
            let (x, y) = (index % size.width(), index / size.width());
            mask.set(index, (x + y) % 2 == 0);
        }

        let compressed = mask.rle_compress();
        assert_eq!(compressed.len(), mask.rle_size());

        let mut decoded = BitMask::new(size);
        decoded.rle_decompress(&mut compressed.as_slice()).unwrap();
        assert_eq!(decoded, mask);
    }
}
