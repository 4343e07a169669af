
//! Packs non-negative integers with as few bits as the largest one needs.
//!
//! Layout: one header byte, where the low six bits hold the bit width
//! and the upper two bits select how many bytes the element count occupies.
//! The element count follows in one, two or four little-endian bytes.
//! The values follow as a big-endian bit stream inside little-endian 32 bit words,
//! where the last word is shortened to the bytes that actually hold bits.

use bit_field::BitField;
use std::convert::TryFrom;
use super::{Bytes, ByteVec};
use crate::error::{Error, Result, UnitResult};
use crate::io::{take_1, take_n};
use crate::math::bit_length;


/// Collects values of arbitrary bit width into 32 bit words, most significant bits first.
#[derive(Debug)]
pub struct BitWriter<'w> {
    out: &'w mut ByteVec,
    accumulator: u64,
    bit_count: u32,
}

impl<'w> BitWriter<'w> {
    /// Append the words to the vector.
    pub fn new(out: &'w mut ByteVec) -> Self {
        BitWriter { out, accumulator: 0, bit_count: 0 }
    }

    /// The value must fit into `width` bits, which must be at most 32.
    #[inline]
    pub fn put_bits(&mut self, value: u32, width: u32) {
        debug_assert!(width <= 32 && u64::from(value) <= low_bits_mask(width), "value does not fit bit width");

        self.accumulator = (self.accumulator << width) | u64::from(value);
        self.bit_count += width;

        if self.bit_count >= 32 {
            self.bit_count -= 32;
            let word = (self.accumulator >> self.bit_count) as u32;
            self.out.extend_from_slice(&word.to_le_bytes());
            self.accumulator &= low_bits_mask(self.bit_count);
        }
    }

    /// Flush the incomplete last word, omitting the bytes without any bits.
    pub fn finish(self) {
        if self.bit_count == 0 { return; }

        let word = (self.accumulator << (32 - self.bit_count)) as u32;
        let unused_bytes = (32 - self.bit_count) / 8;
        let word = word >> (8 * unused_bytes);

        let used_bytes = (4 - unused_bytes) as usize;
        self.out.extend_from_slice(&word.to_le_bytes()[.. used_bytes]);
    }
}


/// Reads values written by a `BitWriter`.
/// The byte slice must end where the writer stopped.
#[derive(Debug)]
pub struct BitReader<'r> {
    remaining: Bytes<'r>,
    accumulator: u64,
    bit_count: u32,
}

impl<'r> BitReader<'r> {
    /// Read the words from the start of the bytes.
    pub fn new(bytes: Bytes<'r>) -> Self {
        BitReader { remaining: bytes, accumulator: 0, bit_count: 0 }
    }

    /// Returns `Error::Invalid` when the bytes are exhausted.
    #[inline]
    pub fn get_bits(&mut self, width: u32) -> Result<u32> {
        debug_assert!(width <= 32, "bit width too large");

        if self.bit_count < width {
            let word = self.next_word()?;
            self.accumulator = (self.accumulator << 32) | u64::from(word);
            self.bit_count += 32;
        }

        self.bit_count -= width;
        let value = (self.accumulator >> self.bit_count) & low_bits_mask(width);
        self.accumulator &= low_bits_mask(self.bit_count);
        Ok(value as u32)
    }

    fn next_word(&mut self) -> Result<u32> {
        let byte_count = self.remaining.len().min(4);
        if byte_count == 0 { return Err(Error::invalid("missing bit stuffer bytes")); }

        let mut word_bytes = [0_u8; 4];
        word_bytes[.. byte_count].copy_from_slice(take_n(&mut self.remaining, byte_count, "missing bit stuffer bytes")?);

        // a shortened last word holds its bits in the lower bytes
        Ok(u32::from_le_bytes(word_bytes) << (8 * (4 - byte_count)))
    }
}

#[inline]
fn low_bits_mask(width: u32) -> u64 {
    (1_u64 << width) - 1
}


/// Number of bytes an unsigned integer needs: 1, 2 or 4.
pub fn num_bytes_uint(value: u32) -> usize {
    if value <= u32::from(u8::MAX) { 1 }
    else if value <= u32::from(u16::MAX) { 2 }
    else { 4 }
}

/// How many bytes of the last 32 bit word can be omitted.
pub fn num_tail_bytes_not_needed(element_count: usize, bit_count: u32) -> usize {
    let tail_bits = (element_count as u64 * u64::from(bit_count)) & 31;
    let tail_bytes = ((tail_bits + 7) >> 3) as usize;
    if tail_bytes > 0 { 4 - tail_bytes } else { 0 }
}

/// Exact number of bytes `write` produces for `element_count` values,
/// the largest of which is `max_element`.
pub fn num_bytes_needed(element_count: usize, max_element: u32) -> usize {
    let count_bytes = u32::try_from(element_count).map_or(4, num_bytes_uint);
    1 + count_bytes + num_bit_stream_bytes(element_count, bit_length(max_element))
}

fn num_bit_stream_bytes(element_count: usize, bit_count: u32) -> usize {
    let word_count = (element_count as u64 * u64::from(bit_count) + 31) / 32;
    word_count as usize * 4 - num_tail_bytes_not_needed(element_count, bit_count)
}


/// The upper two header bits for a count of 1, 2 or 4 bytes.
fn count_bytes_code(count_bytes: usize) -> u8 {
    match count_bytes {
        1 => 2,
        2 => 1,
        _ => 0,
    }
}

fn count_bytes_from_code(code: u8) -> Result<usize> {
    match code {
        0 => Ok(4),
        1 => Ok(2),
        2 => Ok(1),
        _ => Err(Error::invalid("bit stuffer element count size")),
    }
}


/// Append the header and bit stream of the values.
/// Fails for an empty slice.
pub fn write(out: &mut ByteVec, values: &[u32]) -> UnitResult {
    let max_element = values.iter().copied().max()
        .ok_or_else(|| Error::invalid("bit stuffing requires at least one element"))?;

    let element_count = u32::try_from(values.len())?;
    let bit_count = bit_length(max_element);
    let count_bytes = num_bytes_uint(element_count);

    let mut header = 0_u8;
    header.set_bits(0 .. 6, bit_count as u8);
    header.set_bits(6 .. 8, count_bytes_code(count_bytes));

    out.push(header);
    out.extend_from_slice(&element_count.to_le_bytes()[.. count_bytes]);

    if bit_count == 0 {
        return Ok(());
    }

    let mut bits = BitWriter::new(out);
    for &value in values {
        bits.put_bits(value, bit_count);
    }

    bits.finish();
    Ok(())
}

/// Replace the contents of `values` with the decoded elements,
/// advancing the slice past the consumed bytes.
/// Rejects streams with more than `max_element_count` elements.
pub fn read_into(remaining: &mut Bytes<'_>, values: &mut Vec<u32>, max_element_count: usize) -> UnitResult {
    let header = take_1(remaining, "missing bit stuffer header")?;
    let bit_count = u32::from(header.get_bits(0 .. 6));
    let count_bytes = count_bytes_from_code(header.get_bits(6 .. 8))?;

    if bit_count > 32 {
        return Err(Error::invalid("bit stuffer bit width"));
    }

    let mut count_le_bytes = [0_u8; 4];
    count_le_bytes[.. count_bytes].copy_from_slice(take_n(remaining, count_bytes, "missing bit stuffer element count")?);
    let element_count = u32::from_le_bytes(count_le_bytes) as usize;

    if element_count > max_element_count {
        return Err(Error::invalid("bit stuffer element count exceeds tile size"));
    }

    values.clear();

    if bit_count == 0 {
        values.resize(element_count, 0);
        return Ok(());
    }

    let stream_bytes = num_bit_stream_bytes(element_count, bit_count);
    let mut bits = BitReader::new(take_n(remaining, stream_bytes, "missing bit stuffer bytes")?);

    values.reserve(element_count);
    for _ in 0 .. element_count {
        values.push(bits.get_bits(bit_count)?);
    }

    Ok(())
}

/// Decode into a new vector.
pub fn read(remaining: &mut Bytes<'_>, max_element_count: usize) -> Result<Vec<u32>> {
    let mut values = Vec::new();
    read_into(remaining, &mut values, max_element_count)?;
    Ok(values)
}
