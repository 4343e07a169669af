
//! The leaf codecs of lerc v1.
//! None of these know about tiles or error tolerances.

pub mod bit_mask;
pub mod bit_stuffer;
pub mod float;

pub use self::bit_mask::BitMask;


/// A byte vector.
pub type ByteVec = Vec<u8>;

/// A byte slice.
pub type Bytes<'s> = &'s [u8];
