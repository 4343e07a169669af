
//! Decoding of a whole grid.

use tracing::debug;
use crate::compression::{BitMask, Bytes};
use crate::error::{Error, Result, UnitResult};
use crate::io::take_n;
use super::{CntZImage, DecodeOptions, Header, PartDescriptor};
use super::tiles;


/// Read and validate only the header, without decoding the grid.
/// Useful to find out the dimensions of a blob.
pub fn read_header(bytes: Bytes<'_>) -> Result<Header> {
    let mut remaining = bytes;
    Header::read(&mut remaining)
}


impl CntZImage {

    /// Decode a blob into this grid, advancing the slice past the blob.
    ///
    /// Unless only the z part is read, the grid is resized to the dimensions of the blob.
    /// Reading only the z part requires the grid to already have these dimensions,
    /// and keeps its count values.
    ///
    /// After an error, the contents of the grid are unspecified.
    pub fn read(&mut self, remaining: &mut Bytes<'_>, options: DecodeOptions) -> UnitResult {
        let header = Header::read(remaining)?;

        if header.max_z_error > options.max_z_error {
            debug!(in_blob = header.max_z_error, accepted = options.max_z_error, "rejected lerc tolerance");
            return Err(Error::invalid("blob was encoded with a larger error than accepted"));
        }

        if options.only_z_part {
            if header.size != self.size {
                return Err(Error::invalid("grid dimensions do not match the z part"));
            }

            self.info_from_compute = None;
        }
        else {
            self.resize_fill_0(header.size.width(), header.size.height());
            self.read_cnt_part(remaining)?;
        }

        self.read_z_part(remaining, header.max_z_error)
    }

    /// Decode a complete blob into a new grid.
    pub fn decode(bytes: Bytes<'_>, options: DecodeOptions) -> Result<Self> {
        let mut image = CntZImage::new();
        let mut remaining = bytes;
        image.read(&mut remaining, options)?;
        Ok(image)
    }

    fn read_cnt_part(&mut self, remaining: &mut Bytes<'_>) -> UnitResult {
        let descriptor = PartDescriptor::read(remaining)?;
        let mut part = take_n(remaining, descriptor.byte_count, "missing count part bytes")?;

        if !descriptor.is_untiled() {
            return Err(Error::unsupported("tiled count part"));
        }

        if descriptor.byte_count == 0 {
            for cell in &mut self.data {
                cell.cnt = descriptor.max_value;
            }

            return Ok(());
        }

        let mut mask = BitMask::new(self.size);
        mask.rle_decompress(&mut part)?;

        if !part.is_empty() {
            return Err(Error::invalid("count part size mismatch"));
        }

        for (index, cell) in self.data.iter_mut().enumerate() {
            cell.cnt = if mask.is_valid(index) { 1.0 } else { 0.0 };
        }

        Ok(())
    }

    fn read_z_part(&mut self, remaining: &mut Bytes<'_>, max_z_error_in_file: f64) -> UnitResult {
        let descriptor = PartDescriptor::read(remaining)?;
        let part = take_n(remaining, descriptor.byte_count, "missing z part bytes")?;
        let layout = descriptor.tile_layout(self.size)?;

        tiles::read_tiles(part, self, layout, max_z_error_in_file, descriptor.max_value)
    }
}
