
//! The fixed size fields in front of a blob and in front of each part.

use crate::error::{Error, Result, UnitResult, i32_to_usize, usize_to_i32};
use crate::io::{Data, Read, Write, take_n};
use crate::compression::Bytes;
use crate::math::Vec2;
use super::CntZ;
use super::tiles::TileLayout;


/// Every blob starts with these bytes, including the trailing space.
pub const MAGIC: &[u8; 10] = b"CntZImage ";

/// The only supported version of the format.
pub const VERSION: i32 = 11;

/// Type code of count and elevation grids.
pub const TYPE_CNT_Z: i32 = 8;

/// Neither width nor height may exceed this.
pub const MAX_DIMENSION: usize = 20_000;

/// Limits the memory a blob can make the reader allocate.
pub const MAX_CELL_COUNT: usize = 1_800_000_000 / std::mem::size_of::<CntZ>();


/// Describes the grid that a blob contains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {

    /// Format version, always `VERSION`.
    pub version: i32,

    /// Grid type, always `TYPE_CNT_Z`.
    pub image_type: i32,

    /// Width and height of the grid.
    pub size: Vec2<usize>,

    /// The tolerance the z values were quantized with.
    pub max_z_error: f64,
}

impl Header {

    /// Magic bytes, four `i32` fields and one `f64`.
    pub const BYTE_SIZE: usize = MAGIC.len() + 4 * i32::BYTE_SIZE + f64::BYTE_SIZE;

    /// A header for the current version.
    pub fn new(size: Vec2<usize>, max_z_error: f64) -> Self {
        Header { version: VERSION, image_type: TYPE_CNT_Z, size, max_z_error }
    }

    /// Check version, type and dimensions.
    pub fn validate(&self) -> UnitResult {
        if self.version != VERSION {
            return Err(Error::unsupported("lerc version"));
        }

        if self.image_type != TYPE_CNT_Z {
            return Err(Error::unsupported("lerc image type"));
        }

        let Vec2(width, height) = self.size;
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::invalid("grid dimensions"));
        }

        if width * height > MAX_CELL_COUNT {
            return Err(Error::invalid("grid too large"));
        }

        Ok(())
    }

    /// Validates the header after reading it, before anything is allocated.
    pub fn read(remaining: &mut Bytes<'_>) -> Result<Self> {
        if take_n(remaining, MAGIC.len(), "missing lerc magic")? != MAGIC {
            return Err(Error::invalid("file identifier missing"));
        }

        let version = i32::read(remaining)?;
        let image_type = i32::read(remaining)?;
        let height = i32::read(remaining)?;
        let width = i32::read(remaining)?;
        let max_z_error = f64::read(remaining)?;

        let header = Header {
            version, image_type, max_z_error,
            size: Vec2(width, height).to_usize("grid dimensions")?,
        };

        header.validate()?;
        Ok(header)
    }

    /// Write the magic bytes and all fields.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        let size = self.size.to_i32("grid dimensions")?;

        write.write_all(MAGIC)?;
        self.version.write(write)?;
        self.image_type.write(write)?;
        size.height().write(write)?;
        size.width().write(write)?;
        self.max_z_error.write(write)
    }
}


/// The fields in front of the count part and in front of the z part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartDescriptor {

    /// How the part is divided into tiles.
    /// The count part is never tiled and stores zero tiles.
    pub tiles: Vec2<usize>,

    /// Number of bytes following this descriptor that belong to the part.
    pub byte_count: usize,

    /// The largest value in the part.
    pub max_value: f32,
}

impl PartDescriptor {

    /// Three `i32` fields and one `f32`.
    pub const BYTE_SIZE: usize = 3 * i32::BYTE_SIZE + f32::BYTE_SIZE;

    /// Describe a tiled part.
    pub fn tiled(layout: TileLayout, byte_count: usize, max_value: f32) -> Self {
        PartDescriptor { tiles: Vec2(layout.horizontal, layout.vertical), byte_count, max_value }
    }

    /// Describe a part that is not tiled.
    pub fn untiled(byte_count: usize, max_value: f32) -> Self {
        PartDescriptor { tiles: Vec2(0, 0), byte_count, max_value }
    }

    /// Whether this part is stored as a whole.
    pub fn is_untiled(&self) -> bool {
        self.tiles == Vec2(0, 0)
    }

    /// The tiling of a z part, checked against the grid size.
    pub fn tile_layout(&self, grid_size: Vec2<usize>) -> Result<TileLayout> {
        let Vec2(horizontal, vertical) = self.tiles;

        if vertical == 0 || horizontal == 0 || vertical > grid_size.height() || horizontal > grid_size.width() {
            return Err(Error::invalid("tile count"));
        }

        Ok(TileLayout { vertical, horizontal })
    }

    /// Reads only the descriptor, the part bytes remain in the stream.
    pub fn read(read: &mut impl Read) -> Result<Self> {
        let vertical = i32::read(read)?;
        let horizontal = i32::read(read)?;
        let byte_count = i32::read(read)?;
        let max_value = f32::read(read)?;

        Ok(PartDescriptor {
            tiles: Vec2(horizontal, vertical).to_usize("tile count")?,
            byte_count: i32_to_usize(byte_count, "part byte count")?,
            max_value,
        })
    }

    /// Write the vertical tile count first, as the format expects.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        let tiles = self.tiles.to_i32("tile count")?;

        tiles.height().write(write)?;
        tiles.width().write(write)?;
        usize_to_i32(self.byte_count, "part byte count")?.write(write)?;
        self.max_value.write(write)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_layout(){
        let header = Header::new(Vec2(300, 2), 0.5);

        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), Header::BYTE_SIZE);
        assert_eq!(bytes.len(), 34);

        assert_eq!(&bytes[.. 10], b"CntZImage ");
        assert_eq!(&bytes[10 .. 14], &11_i32.to_le_bytes());
        assert_eq!(&bytes[14 .. 18], &8_i32.to_le_bytes());
        assert_eq!(&bytes[18 .. 22], &2_i32.to_le_bytes());
        assert_eq!(&bytes[22 .. 26], &300_i32.to_le_bytes());
        assert_eq!(&bytes[26 .. 34], &0.5_f64.to_le_bytes());

        let mut remaining = bytes.as_slice();
        assert_eq!(Header::read(&mut remaining).unwrap(), header);
        assert!(remaining.is_empty());
    }

    fn header_bytes(version: i32, image_type: i32, width: i32, height: i32) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        for value in &[version, image_type, height, width] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        bytes.extend_from_slice(&0.0_f64.to_le_bytes());
        bytes
    }

    #[test]
    fn header_validation(){
        assert!(Header::read(&mut header_bytes(11, 8, 20, 30).as_slice()).is_ok());

        assert!(matches!(Header::read(&mut header_bytes(10, 8, 20, 30).as_slice()), Err(Error::NotSupported(_))));
        assert!(matches!(Header::read(&mut header_bytes(11, 7, 20, 30).as_slice()), Err(Error::NotSupported(_))));

        assert!(Header::read(&mut header_bytes(11, 8, 0, 30).as_slice()).is_err());
        assert!(Header::read(&mut header_bytes(11, 8, 20, -30).as_slice()).is_err());
        assert!(Header::read(&mut header_bytes(11, 8, 20_001, 30).as_slice()).is_err());
        assert!(Header::read(&mut header_bytes(11, 8, 20_000, 20_000).as_slice()).is_err());
        assert!(Header::read(&mut header_bytes(11, 8, 20_000, 10_000).as_slice()).is_ok());

        let mut bytes = header_bytes(11, 8, 20, 30);
        bytes[0] = b'X';
        assert!(Header::read(&mut bytes.as_slice()).is_err());

        let bytes = header_bytes(11, 8, 20, 30);
        assert!(Header::read(&mut &bytes[.. bytes.len() - 1]).is_err());
    }

    #[test]
    fn descriptor_layout(){
        let descriptor = PartDescriptor::tiled(TileLayout { vertical: 3, horizontal: 5 }, 1234, 7.5);

        let mut bytes = Vec::new();
        descriptor.write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), PartDescriptor::BYTE_SIZE);
        assert_eq!(&bytes[0 .. 4], &3_i32.to_le_bytes());
        assert_eq!(&bytes[4 .. 8], &5_i32.to_le_bytes());

        let decoded = PartDescriptor::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, descriptor);
        assert_eq!(decoded.tile_layout(Vec2(10, 10)).unwrap(), TileLayout { vertical: 3, horizontal: 5 });
        assert!(decoded.tile_layout(Vec2(4, 10)).is_err());
        assert!(PartDescriptor::untiled(0, 1.0).tile_layout(Vec2(4, 4)).is_err());
    }
}
