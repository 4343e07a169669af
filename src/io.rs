
//! Specialized binary input and output.
//! Uses the error handling for this crate.
//!
//! All lerc fields are little-endian. Reading happens from byte slices,
//! where the slice itself is the read cursor: every successful read
//! shortens the slice by the number of consumed bytes.

pub use ::std::io::{Read, Write};
use lebe::prelude::*;
use crate::error::{Error, Result, UnitResult, IoResult};


/// Take the next `count` bytes from the slice without copying them,
/// advancing the slice past them.
/// Returns `Error::Invalid` if the slice is too short.
#[inline]
pub fn take_n<'s>(slice: &mut &'s [u8], count: usize, error_message: &'static str) -> Result<&'s [u8]> {
    if count <= slice.len() {
        let (front, back) = slice.split_at(count);
        *slice = back;
        Ok(front)
    }
    else {
        Err(Error::invalid(error_message))
    }
}

/// Take the next byte from the slice, advancing the slice.
#[inline]
pub fn take_1(slice: &mut &[u8], error_message: &'static str) -> Result<u8> {
    take_n(slice, 1, error_message).map(|bytes| bytes[0])
}


/// Keep track of how many bytes have been written.
/// Used to verify that a part occupies exactly the number of bytes it announced.
#[derive(Debug)]
pub struct Tracking<T> {

    /// Do not expose to prevent writing without updating position
    inner: T,

    position: usize,
}

impl<T: Write> Write for Tracking<T> {
    fn write(&mut self, buffer: &[u8]) -> IoResult<usize> {
        let count = self.inner.write(buffer)?;
        self.position += count;
        Ok(count)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.inner.flush()
    }
}

impl<T> Tracking<T> {

    /// Start counting at zero.
    pub fn new(inner: T) -> Self {
        Tracking { inner, position: 0 }
    }

    /// Current number of bytes written.
    pub fn byte_position(&self) -> usize {
        self.position
    }
}


/// Generic trait that defines common binary operations such as reading and writing for this type.
pub trait Data: Sized + Default + Clone {

    /// Number of bytes this type occupies in a lerc blob.
    const BYTE_SIZE: usize = ::std::mem::size_of::<Self>();

    /// Read a value of type `Self`.
    fn read(read: &mut impl Read) -> Result<Self>;

    /// Write this value to the writer.
    fn write(self, write: &mut impl Write) -> UnitResult;
}


macro_rules! implement_data_for_primitive {
    ($kind: ident) => {
        impl Data for $kind {
            #[inline]
            fn read(read: &mut impl Read) -> Result<Self> {
                Ok(read.read_from_little_endian()?)
            }

            #[inline]
            fn write(self, write: &mut impl Write) -> Result<()> {
                write.write_as_little_endian(&self)?;
                Ok(())
            }
        }
    };
}

implement_data_for_primitive!(u8);
implement_data_for_primitive!(i8);
implement_data_for_primitive!(i16);
implement_data_for_primitive!(u16);
implement_data_for_primitive!(u32);
implement_data_for_primitive!(i32);
implement_data_for_primitive!(f32);
implement_data_for_primitive!(f64);
