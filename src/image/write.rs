
//! Size estimation and encoding of a whole grid.

use tracing::debug;
use crate::compression::{BitMask, ByteVec};
use crate::error::{Error, Result};
use crate::io::{Tracking, Write};
use crate::math::IntegerBounds;
use super::{CntZImage, EncodeOptions, Header, PartDescriptor};
use super::tiles::{self, TileLayout};


/// The decisions of the size estimation, reused by `write`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EncodingInfo {
    options: EncodeOptions,

    /// Absent if the count part is omitted.
    cnt_part: Option<PartDescriptor>,

    z_layout: TileLayout,
    z_part: PartDescriptor,
}

impl EncodingInfo {

    /// The exact size of the blob.
    fn byte_size(&self) -> usize {
        let cnt_part_size = self.cnt_part
            .map_or(0, |part| PartDescriptor::BYTE_SIZE + part.byte_count);

        Header::BYTE_SIZE + cnt_part_size + PartDescriptor::BYTE_SIZE + self.z_part.byte_count
    }
}


impl CntZImage {

    /// Compute the exact number of bytes `write` will produce with these options.
    /// Remembers the tiling, so that a following `write` does not need to search again.
    pub fn compute_num_bytes_needed_to_write(&mut self, options: EncodeOptions) -> Result<usize> {
        let info = self.compute_encoding_info(options)?;
        let byte_size = info.byte_size();

        self.info_from_compute = Some(info);
        Ok(byte_size)
    }

    /// Size of the blob of a grid without any valid cell:
    /// a constant count part and a single empty tile.
    pub fn compute_num_bytes_needed_to_write_void_image() -> usize {
        Header::BYTE_SIZE + PartDescriptor::BYTE_SIZE + PartDescriptor::BYTE_SIZE + 1
    }

    /// Encode the grid, returning the number of bytes written.
    ///
    /// If `use_info_from_prev_compute` is set, the tiling found by the preceding
    /// `compute_num_bytes_needed_to_write` call is reused, if it was computed with the same options
    /// and the grid did not change since. Otherwise, the tiling is searched again.
    pub fn write(&self, write: &mut impl Write, options: EncodeOptions, use_info_from_prev_compute: bool) -> Result<usize> {
        let computed;
        let info = match &self.info_from_compute {
            Some(info) if use_info_from_prev_compute && info.options == options => info,
            _ => {
                computed = self.compute_encoding_info(options)?;
                &computed
            }
        };

        let mut write = Tracking::new(write);
        Header::new(self.size, options.max_z_error).write(&mut write)?;

        if let Some(cnt_part) = info.cnt_part {
            cnt_part.write(&mut write)?;

            if cnt_part.byte_count > 0 {
                let compressed = self.validity_mask().rle_compress();
                write_part_bytes(&mut write, &compressed, cnt_part.byte_count)?;
            }
        }

        info.z_part.write(&mut write)?;

        let mut z_part = ByteVec::with_capacity(info.z_part.byte_count);
        tiles::write_tiles(&mut z_part, self, info.z_layout, options.max_z_error)?;
        write_part_bytes(&mut write, &z_part, info.z_part.byte_count)?;

        debug_assert_eq!(write.byte_position(), info.byte_size(), "blob size estimation bug");
        Ok(write.byte_position())
    }

    /// Compute the size, then write into a vector of exactly that size.
    pub fn encode(&mut self, options: EncodeOptions) -> Result<ByteVec> {
        let byte_size = self.compute_num_bytes_needed_to_write(options)?;

        let mut bytes = ByteVec::with_capacity(byte_size);
        self.write(&mut bytes, options, true)?;
        Ok(bytes)
    }

    fn compute_encoding_info(&self, options: EncodeOptions) -> Result<EncodingInfo> {
        options.validate()?;
        Header::new(self.size, options.max_z_error).validate()?;

        let cnt_part = if options.only_z_part { None } else { Some(self.cnt_part_descriptor()?) };
        let (z_layout, z_size) = tiles::find_tiling(self, options.max_z_error);

        Ok(EncodingInfo {
            options, cnt_part, z_layout,
            z_part: PartDescriptor::tiled(z_layout, z_size.byte_count, z_size.max_z),
        })
    }

    /// A constant count is stored without any bytes,
    /// otherwise the count part is a bit mask of the valid cells.
    fn cnt_part_descriptor(&self) -> Result<PartDescriptor> {
        let (cnt_min, cnt_max) = self.compute_cnt_stats(IntegerBounds::from_dimensions(self.size))?;

        Ok(if cnt_min == cnt_max {
            PartDescriptor::untiled(0, cnt_max)
        }
        else {
            PartDescriptor::untiled(self.validity_mask().rle_size(), 1.0)
        })
    }

    pub(crate) fn validity_mask(&self) -> BitMask {
        let mut mask = BitMask::new(self.size);

        for (index, cell) in self.data.iter().enumerate() {
            mask.set(index, cell.is_valid());
        }

        mask
    }
}

/// Write the bytes of a part, which must have the announced size.
fn write_part_bytes(write: &mut impl Write, bytes: &[u8], announced_byte_count: usize) -> Result<()> {
    if bytes.len() != announced_byte_count {
        debug!(announced_byte_count, actual = bytes.len(), "part size does not match its estimation");
        return Err(Error::invalid("part size does not match its estimation"));
    }

    write.write_all(bytes)?;
    Ok(())
}
