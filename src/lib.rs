
//! Read and write lerc v1 compressed count and elevation grids, in pure safe Rust.
//!
//! A grid of `CntZ` cells is encoded into a `CntZImage` blob,
//! quantizing the valid values with a caller-chosen maximum error.
//! See `image::CntZImage` for the encoding and decoding functions.

#![forbid(unsafe_code)]

pub mod io;
pub mod math;
pub mod compression;
pub mod image;
pub mod error;


/// Export the most important items from `lerc1`.
/// _Note: This includes a type called `Result`, possibly overwriting the default `std::Result` type usage._
pub mod prelude {

    // core data types
    pub use crate::image::{
        CntZImage, CntZ, ZStats,
        EncodeOptions, DecodeOptions,
        Header, read_header,
    };

    // secondary data types
    pub use crate::math::{Vec2, IntegerBounds};
    pub use crate::compression::BitMask;
    pub use crate::error::{self, Error, Result};
}
