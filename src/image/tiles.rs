
//! Division of the z part into tiles, and the encoding of a single tile.
//!
//! Every tile starts with a flag byte. The lower six bits select the mode,
//! the upper two bits select how many bytes the stored minimum occupies.

use bit_field::BitField;
use tracing::{debug, trace};
use crate::compression::{bit_stuffer, Bytes, ByteVec};
use crate::compression::float::{num_bytes_flt, read_flt, write_flt};
use crate::error::{Error, Result, UnitResult};
use crate::io::{Data, take_1};
use crate::math::{IntegerBounds, Vec2};
use super::{CntZ, CntZImage, ZStats};


/// Square tile widths that the tiling search tries, in this order.
pub const TILE_WIDTHS: [usize; 6] = [8, 11, 15, 20, 32, 64];

/// Above this many quantization steps, values are stored as raw floats.
const MAX_QUANTIZATION_STEPS: f64 = (1_u32 << 28) as f64;

const MODE_UNCOMPRESSED: u8 = 0;
const MODE_QUANTIZED: u8 = 1;
const MODE_ALL_ZERO: u8 = 2;
const MODE_CONSTANT: u8 = 3;


/// How many full tiles fit vertically and horizontally.
/// A grid that is not divisible by the tile size
/// additionally has a row and a column of smaller remainder tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {

    /// Number of full tile rows.
    pub vertical: usize,

    /// Number of full tile columns.
    pub horizontal: usize,
}

impl TileLayout {

    /// The whole grid as a single tile.
    pub const WHOLE_IMAGE: TileLayout = TileLayout { vertical: 1, horizontal: 1 };

    /// As many square tiles of the specified width as fit into the grid.
    pub fn with_tile_width(grid_size: Vec2<usize>, tile_width: usize) -> Self {
        TileLayout {
            vertical: grid_size.height() / tile_width,
            horizontal: grid_size.width() / tile_width,
        }
    }

    /// Number of full tiles.
    pub fn full_tile_count(self) -> usize {
        self.vertical * self.horizontal
    }

    /// All non-empty tiles, row by row. Both counts must be at least one.
    pub fn tiles(self, grid_size: Vec2<usize>) -> impl Iterator<Item = IntegerBounds> {
        let columns = spans(grid_size.width(), self.horizontal);

        spans(grid_size.height(), self.vertical).flat_map(move |(y, height)| {
            columns.clone().map(move |(x, width)| {
                IntegerBounds::new(Vec2(x, y), Vec2(width, height))
            })
        })
    }
}

/// Start and length of `count` equal spans and one remainder span, skipping empty spans.
fn spans(length: usize, count: usize) -> impl Iterator<Item = (usize, usize)> + Clone {
    let span = length / count;

    (0 ..= count)
        .map(move |index| {
            let size = if index == count { length % count } else { span };
            (index * span, size)
        })
        .filter(|&(_, size)| size > 0)
}


/// How a single tile is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TileEncoding {

    /// No valid cells, or all valid cells are zero. Only the flag byte.
    AllZero,

    /// Every valid cell as a raw `f32`.
    Uncompressed,

    /// All valid cells are equal to the minimum.
    Constant { z_min: f32 },

    /// The minimum, followed by one bit stuffed quantization step count per valid cell.
    Quantized { z_min: f32, max_element: u32 },
}

impl TileEncoding {

    /// Choose the encoding for the value range of a tile.
    pub fn choose(stats: ZStats, max_z_error: f64) -> Self {
        if stats.valid_count == 0 || (stats.non_finite_count == 0 && stats.min == 0.0 && stats.max == 0.0) {
            return TileEncoding::AllZero;
        }

        // non-finite values cannot be quantized
        if max_z_error == 0.0 || stats.non_finite_count > 0 {
            return TileEncoding::Uncompressed;
        }

        let steps = f64::from(stats.max - stats.min) / (2.0 * max_z_error);
        if !(steps <= MAX_QUANTIZATION_STEPS) {
            return TileEncoding::Uncompressed;
        }

        // the largest value is quantized like every other value,
        // so that it always yields exactly the estimated bit width
        match quantize(stats.max, stats.min, 1.0 / (2.0 * max_z_error)) {
            0 => TileEncoding::Constant { z_min: stats.min },
            max_element => TileEncoding::Quantized { z_min: stats.min, max_element },
        }
    }

    /// Exact number of bytes of the encoded tile.
    pub fn byte_size(self, valid_count: usize) -> usize {
        match self {
            TileEncoding::AllZero => 1,
            TileEncoding::Uncompressed => 1 + valid_count * f32::BYTE_SIZE,
            TileEncoding::Constant { z_min } => 1 + num_bytes_flt(z_min),
            TileEncoding::Quantized { z_min, max_element } =>
                1 + num_bytes_flt(z_min) + bit_stuffer::num_bytes_needed(valid_count, max_element),
        }
    }

    fn mode(self) -> u8 {
        match self {
            TileEncoding::AllZero => MODE_ALL_ZERO,
            TileEncoding::Uncompressed => MODE_UNCOMPRESSED,
            TileEncoding::Constant { .. } => MODE_CONSTANT,
            TileEncoding::Quantized { .. } => MODE_QUANTIZED,
        }
    }
}

/// Number of quantization steps between the minimum and the value, rounded to nearest.
#[inline]
fn quantize(z: f32, z_min: f32, scale: f64) -> u32 {
    ((f64::from(z) - f64::from(z_min)) * scale + 0.5) as u32
}

/// The upper two flag bits for a minimum of 1, 2 or 4 bytes.
fn float_width_code(byte_count: usize) -> u8 {
    match byte_count {
        1 => 2,
        2 => 1,
        _ => 0,
    }
}

fn float_width_from_code(code: u8) -> Result<usize> {
    match code {
        0 => Ok(4),
        1 => Ok(2),
        2 => Ok(1),
        _ => Err(Error::invalid("tile minimum size")),
    }
}


/// Number of bytes a tile with these statistics occupies.
pub fn num_bytes_z_tile(stats: ZStats, max_z_error: f64) -> usize {
    TileEncoding::choose(stats, max_z_error).byte_size(stats.valid_count)
}

/// Append the encoded tile. Returns the number of bytes appended.
pub fn write_z_tile(
    out: &mut ByteVec, image: &CntZImage, tile: IntegerBounds,
    stats: ZStats, max_z_error: f64,
) -> Result<usize>
{
    let start = out.len();
    let encoding = TileEncoding::choose(stats, max_z_error);
    let valid_cells = image.cells(tile).filter(|cell| cell.is_valid());

    let mut flag = 0_u8;
    flag.set_bits(0 .. 6, encoding.mode());

    match encoding {
        TileEncoding::AllZero => out.push(flag),

        TileEncoding::Uncompressed => {
            out.push(flag);
            for cell in valid_cells {
                cell.z.write(out)?;
            }
        },

        TileEncoding::Constant { z_min } => {
            let float_width = num_bytes_flt(z_min);
            flag.set_bits(6 .. 8, float_width_code(float_width));
            out.push(flag);
            write_flt(out, z_min, float_width)?;
        },

        TileEncoding::Quantized { z_min, .. } => {
            let float_width = num_bytes_flt(z_min);
            flag.set_bits(6 .. 8, float_width_code(float_width));
            out.push(flag);
            write_flt(out, z_min, float_width)?;

            let scale = 1.0 / (2.0 * max_z_error);
            let steps: Vec<u32> = valid_cells
                .map(|cell| quantize(cell.z, z_min, scale))
                .collect();

            if steps.len() != stats.valid_count {
                return Err(Error::invalid("tile statistics do not match the grid"));
            }

            bit_stuffer::write(out, &steps)?;
        },
    }

    let byte_count = out.len() - start;
    debug_assert_eq!(byte_count, encoding.byte_size(stats.valid_count), "tile size estimation bug");
    Ok(byte_count)
}

/// Decode a tile into the z values of the valid cells.
/// The count values of the grid must already be known.
/// `steps` is scratch memory that is reused across tiles.
pub fn read_z_tile(
    remaining: &mut Bytes<'_>, data: &mut [CntZ], grid_width: usize, tile: IntegerBounds,
    max_z_error_in_file: f64, max_z_in_image: f32, steps: &mut Vec<u32>,
) -> UnitResult
{
    let flag = take_1(remaining, "missing tile flag")?;
    let mode = flag.get_bits(0 .. 6);

    let valid_cells = tile_rows(data, grid_width, tile)
        .flat_map(|row| row.iter_mut())
        .filter(|cell| cell.is_valid());

    match mode {
        MODE_ALL_ZERO => {
            for cell in valid_cells { cell.z = 0.0; }
        },

        MODE_UNCOMPRESSED => {
            for cell in valid_cells { cell.z = f32::read(remaining)?; }
        },

        MODE_CONSTANT | MODE_QUANTIZED => {
            let z_min = read_flt(remaining, float_width_from_code(flag.get_bits(6 .. 8))?)?;

            if mode == MODE_CONSTANT {
                for cell in valid_cells { cell.z = z_min; }
                return Ok(());
            }

            bit_stuffer::read_into(remaining, steps, tile.area())?;

            let step_size = 2.0 * max_z_error_in_file;
            let mut steps = steps.iter();

            for cell in valid_cells {
                let &step = steps.next().ok_or_else(|| Error::invalid("too few quantized values in tile"))?;
                let z = (f64::from(z_min) + f64::from(step) * step_size) as f32;
                cell.z = z.min(max_z_in_image);
            }

            if steps.next().is_some() {
                return Err(Error::invalid("too many quantized values in tile"));
            }
        },

        _ => return Err(Error::invalid("tile compression mode")),
    }

    Ok(())
}

/// The rows of a tile as mutable slices.
fn tile_rows<'d>(data: &'d mut [CntZ], grid_width: usize, tile: IntegerBounds) -> impl Iterator<Item = &'d mut [CntZ]> {
    let IntegerBounds { position, size } = tile;

    data.chunks_exact_mut(grid_width)
        .skip(position.1)
        .take(size.1)
        .map(move |row| &mut row[position.0 .. position.0 + size.0])
}


/// Summary of the z part for a specific tiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZPartSize {

    /// Sum of all encoded tile sizes.
    pub byte_count: usize,

    /// The largest finite valid value, zero if there is none.
    pub max_z: f32,
}

/// Compute the encoded size of the z part without encoding it.
pub fn measure_tiles(image: &CntZImage, layout: TileLayout, max_z_error: f64) -> ZPartSize {
    let mut byte_count = 0;
    let mut max_z: Option<f32> = None;

    for tile in layout.tiles(image.size()) {
        let stats = image.z_stats(tile);
        byte_count += num_bytes_z_tile(stats, max_z_error);

        if stats.has_finite_values() {
            max_z = Some(max_z.map_or(stats.max, |max_z| max_z.max(stats.max)));
        }
    }

    ZPartSize { byte_count, max_z: max_z.unwrap_or(0.0) }
}

/// Search the tiling with the smallest z part.
///
/// Starts with the whole grid as a single tile, then tries the tile widths in
/// ascending order. The search stops as soon as a tile width produces a larger
/// z part than the previous one, so that not all widths are necessarily tried.
pub fn find_tiling(image: &CntZImage, max_z_error: f64) -> (TileLayout, ZPartSize) {
    let mut best_layout = TileLayout::WHOLE_IMAGE;
    let mut best_size = measure_tiles(image, best_layout, max_z_error);

    // all cells are invalid or zero, no tiling can be smaller
    if best_size.byte_count == num_bytes_z_tile(ZStats::default(), max_z_error) {
        debug!(bytes = best_size.byte_count, "z part is empty");
        return (best_layout, best_size);
    }

    let mut previous_byte_count = 0;

    for (index, &tile_width) in TILE_WIDTHS.iter().enumerate() {
        let layout = TileLayout::with_tile_width(image.size(), tile_width);
        if layout.full_tile_count() < 2 {
            break;
        }

        let size = measure_tiles(image, layout, max_z_error);
        trace!(tile_width, bytes = size.byte_count, "measured tiling");

        if size.byte_count < best_size.byte_count {
            best_layout = layout;
            best_size = size;
        }

        if index > 0 && size.byte_count > previous_byte_count {
            break;
        }

        previous_byte_count = size.byte_count;
    }

    debug!(
        vertical = best_layout.vertical, horizontal = best_layout.horizontal,
        bytes = best_size.byte_count, "chose z part tiling"
    );

    (best_layout, best_size)
}

/// Append all tiles of the z part.
pub fn write_tiles(out: &mut ByteVec, image: &CntZImage, layout: TileLayout, max_z_error: f64) -> UnitResult {
    for tile in layout.tiles(image.size()) {
        let stats = image.z_stats(tile);
        write_z_tile(out, image, tile, stats, max_z_error)?;
    }

    Ok(())
}

/// Decode all tiles of the z part. The bytes must contain exactly the tiles.
pub fn read_tiles(
    mut remaining: Bytes<'_>, image: &mut CntZImage, layout: TileLayout,
    max_z_error_in_file: f64, max_z_in_image: f32,
) -> UnitResult
{
    let size = image.size();
    let mut steps = Vec::new();

    for tile in layout.tiles(size) {
        read_z_tile(
            &mut remaining, &mut image.data, size.width(), tile,
            max_z_error_in_file, max_z_in_image, &mut steps
        )?;
    }

    if !remaining.is_empty() {
        return Err(Error::invalid("z part size mismatch"));
    }

    Ok(())
}
