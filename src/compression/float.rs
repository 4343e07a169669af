
//! Stores a single float in 1, 2 or 4 bytes,
//! using an integer representation where that is lossless.

use crate::error::{Result, UnitResult};
use crate::io::{Data, Read, Write};


/// 1 if the value survives a round trip through `i8`, 2 for `i16`, otherwise 4.
pub fn num_bytes_flt(value: f32) -> usize {
    let short = value as i16;
    let byte = short as i8;

    if f32::from(byte) == value { 1 }
    else if f32::from(short) == value { 2 }
    else { 4 }
}

/// Write the value with the specified byte count, which should be `num_bytes_flt(value)`.
pub fn write_flt(write: &mut impl Write, value: f32, byte_count: usize) -> UnitResult {
    match byte_count {
        1 => (value as i16 as i8).write(write),
        2 => (value as i16).write(write),
        _ => value.write(write),
    }
}

/// Read a value that was written with the specified byte count.
pub fn read_flt(read: &mut impl Read, byte_count: usize) -> Result<f32> {
    Ok(match byte_count {
        1 => f32::from(i8::read(read)?),
        2 => f32::from(i16::read(read)?),
        _ => f32::read(read)?,
    })
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn narrowest_width(){
        assert_eq!(num_bytes_flt(0.0), 1);
        assert_eq!(num_bytes_flt(-128.0), 1);
        assert_eq!(num_bytes_flt(127.0), 1);
        assert_eq!(num_bytes_flt(128.0), 2);
        assert_eq!(num_bytes_flt(-32768.0), 2);
        assert_eq!(num_bytes_flt(32768.0), 4);
        assert_eq!(num_bytes_flt(300.5), 4);
        assert_eq!(num_bytes_flt(3.14159), 4);
        assert_eq!(num_bytes_flt(f32::NAN), 4);
        assert_eq!(num_bytes_flt(f32::INFINITY), 4);
    }

    #[test]
    fn round_trip(){
        for &value in &[0.0_f32, -7.0, 100.0, -1000.0, 31_000.0, 1.0e9, -0.25, 3.14159] {
            let byte_count = num_bytes_flt(value);

            let mut bytes = Vec::new();
            write_flt(&mut bytes, value, byte_count).unwrap();
            assert_eq!(bytes.len(), byte_count);

            let decoded = read_flt(&mut bytes.as_slice(), byte_count).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn truncated(){
        assert!(read_flt(&mut &[1_u8][..], 2).is_err());
        assert!(read_flt(&mut &[0_u8; 0][..], 1).is_err());
    }
}
