
//! The count and elevation grid, and its tiled lerc v1 encoding.
//!
//! Encoding is a two phase protocol. First, `compute_num_bytes_needed_to_write`
//! searches the best tiling and reports the exact blob size. Then `write`
//! produces exactly that many bytes, optionally reusing the search result.
//! `encode` does both at once.
//!
//! A blob consists of a header, an optional count part and a z part.
//! The count part stores which cells are valid, either as a single constant
//! or as a run length encoded bit mask. The z part stores the values of
//! the valid cells, quantized tile by tile.

pub mod header;
pub mod tiles;
mod write;
mod read;

pub use self::header::{Header, PartDescriptor};
pub use self::read::read_header;
pub use self::tiles::TileLayout;

use crate::error::{Error, Result, UnitResult};
use crate::math::{IntegerBounds, Vec2};
use self::write::EncodingInfo;


/// A single cell of the grid.
/// The cell is valid where `cnt` is positive.
/// The `z` value of an invalid cell is not stored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CntZ {

    /// The count, usually `1` for valid and `0` for invalid cells.
    pub cnt: f32,

    /// The elevation or any other value.
    pub z: f32,
}

impl CntZ {

    /// Create a cell from count and value.
    pub fn new(cnt: f32, z: f32) -> Self {
        CntZ { cnt, z }
    }

    /// A valid cell with count `1`.
    pub fn valid(z: f32) -> Self {
        CntZ { cnt: 1.0, z }
    }

    /// Whether this cell takes part in the z encoding.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cnt > 0.0
    }
}


/// Settings for encoding a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {

    /// The maximum difference between any original and decoded valid z value.
    /// Zero stores all values losslessly.
    pub max_z_error: f64,

    /// Omit the count part. Only the header and the z part are written.
    /// A reader must already know the valid cells.
    pub only_z_part: bool,
}

/// Settings for decoding a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {

    /// The largest error tolerance the caller accepts.
    /// Blobs that were encoded with a larger tolerance are rejected.
    pub max_z_error: f64,

    /// Expect a blob without count part and keep the count values of the grid.
    /// The grid must already have the dimensions of the blob.
    pub only_z_part: bool,
}

impl EncodeOptions {

    /// Store every z value exactly.
    pub fn lossless() -> Self {
        Self::with_max_z_error(0.0)
    }

    /// Quantize z values with the specified maximum error.
    pub fn with_max_z_error(max_z_error: f64) -> Self {
        EncodeOptions { max_z_error, only_z_part: false }
    }

    /// Omit the count part.
    pub fn z_part_only(self) -> Self {
        EncodeOptions { only_z_part: true, ..self }
    }

    /// Reject negative or non-finite tolerances.
    pub fn validate(&self) -> UnitResult {
        if self.max_z_error.is_finite() && self.max_z_error >= 0.0 { Ok(()) }
        else { Err(Error::invalid("max z error must be a finite, non-negative number")) }
    }
}

impl DecodeOptions {

    /// Only accept losslessly encoded blobs.
    pub fn lossless() -> Self {
        Self::with_max_z_error(0.0)
    }

    /// Accept blobs that were encoded with at most the specified error.
    pub fn with_max_z_error(max_z_error: f64) -> Self {
        DecodeOptions { max_z_error, only_z_part: false }
    }

    /// Accept blobs of any tolerance.
    pub fn any_error() -> Self {
        Self::with_max_z_error(f64::INFINITY)
    }

    /// Expect a blob without count part.
    pub fn z_part_only(self) -> Self {
        DecodeOptions { only_z_part: true, ..self }
    }
}

impl From<EncodeOptions> for DecodeOptions {
    fn from(options: EncodeOptions) -> Self {
        DecodeOptions { max_z_error: options.max_z_error, only_z_part: options.only_z_part }
    }
}


/// Value range of the valid cells in a rectangle.
/// The range only covers finite values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZStats {

    /// Smallest finite valid value, zero if there is none.
    pub min: f32,

    /// Largest finite valid value, zero if there is none.
    pub max: f32,

    /// Number of valid cells, including those with non-finite values.
    pub valid_count: usize,

    /// Number of valid cells that are NaN or infinite.
    pub non_finite_count: usize,
}

impl ZStats {

    /// Whether `min` and `max` were taken from any cell.
    pub fn has_finite_values(&self) -> bool {
        self.valid_count > self.non_finite_count
    }
}


/// A dense, row-major grid of count and value pairs.
///
/// Not meant to be shared while encoding:
/// `compute_num_bytes_needed_to_write` remembers its tiling decision,
/// and any mutation of the grid forgets it again.
#[derive(Debug, Clone, Default)]
pub struct CntZImage {
    size: Vec2<usize>,
    data: Vec<CntZ>,
    info_from_compute: Option<EncodingInfo>,
}

impl PartialEq for CntZImage {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.data == other.data
    }
}

impl CntZImage {

    /// An empty grid without any cells.
    pub fn new() -> Self {
        Self::default()
    }

    /// A grid of the specified size where every cell is zero.
    pub fn with_size(width: usize, height: usize) -> Self {
        let mut image = Self::new();
        image.resize_fill_0(width, height);
        image
    }

    /// Change the dimensions and set every cell to zero, which makes it invalid.
    pub fn resize_fill_0(&mut self, width: usize, height: usize) {
        self.size = Vec2(width, height);
        self.data.clear();
        self.data.resize(width * height, CntZ::default());
        self.info_from_compute = None;
    }

    pub fn width(&self) -> usize { self.size.width() }
    pub fn height(&self) -> usize { self.size.height() }
    pub fn size(&self) -> Vec2<usize> { self.size }

    /// All cells, row by row.
    pub fn data(&self) -> &[CntZ] { &self.data }

    /// All cells, row by row.
    pub fn data_mut(&mut self) -> &mut [CntZ] {
        self.info_from_compute = None;
        &mut self.data
    }

    /// Panics if the cell is outside of the grid.
    pub fn get(&self, row: usize, column: usize) -> CntZ {
        self.data[self.flat_index(row, column)]
    }

    /// Panics if the cell is outside of the grid.
    pub fn set(&mut self, row: usize, column: usize, value: CntZ) {
        let index = self.flat_index(row, column);
        self.info_from_compute = None;
        self.data[index] = value;
    }

    #[inline]
    fn flat_index(&self, row: usize, column: usize) -> usize {
        assert!(row < self.height() && column < self.width(), "cell index out of bounds");
        row * self.width() + column
    }

    /// Iterate the cells of a rectangle, row by row.
    /// The bounds must be inside the grid.
    fn cells(&self, bounds: IntegerBounds) -> impl Iterator<Item = &CntZ> + '_ {
        let width = self.width();
        let IntegerBounds { position, size } = bounds;

        (position.1 .. position.1 + size.1).flat_map(move |row| {
            let start = row * width + position.0;
            self.data[start .. start + size.0].iter()
        })
    }

    /// Smallest and largest count inside the rectangle.
    /// Both are zero for an empty rectangle.
    pub fn compute_cnt_stats(&self, bounds: IntegerBounds) -> Result<(f32, f32)> {
        self.validate_bounds(bounds)?;

        let mut cells = self.cells(bounds);
        let first = match cells.next() {
            Some(cell) => cell.cnt,
            None => return Ok((0.0, 0.0)),
        };

        Ok(cells.fold((first, first), |(min, max), cell| {
            (if cell.cnt < min { cell.cnt } else { min }, if cell.cnt > max { cell.cnt } else { max })
        }))
    }

    /// Value range and count of the valid cells inside the rectangle.
    pub fn compute_z_stats(&self, bounds: IntegerBounds) -> Result<ZStats> {
        self.validate_bounds(bounds)?;
        Ok(self.z_stats(bounds))
    }

    /// The bounds must be inside the grid.
    pub(crate) fn z_stats(&self, bounds: IntegerBounds) -> ZStats {
        let mut stats = ZStats::default();

        for cell in self.cells(bounds).filter(|cell| cell.is_valid()) {
            if !cell.z.is_finite() {
                stats.non_finite_count += 1;
            }
            else if !stats.has_finite_values() {
                stats.min = cell.z;
                stats.max = cell.z;
            }
            else {
                if cell.z < stats.min { stats.min = cell.z; }
                if cell.z > stats.max { stats.max = cell.z; }
            }

            stats.valid_count += 1;
        }

        stats
    }

    fn validate_bounds(&self, bounds: IntegerBounds) -> UnitResult {
        if bounds.is_inside(self.size) { Ok(()) }
        else { Err(Error::invalid("rectangle exceeds the grid")) }
    }
}
