
//! Simple math utilities.

use std::convert::TryFrom;
use crate::error::{i32_to_usize, usize_to_i32};
use crate::error::Result;

/// Simple two-dimensional vector of any numerical type.
/// Used as the size of a grid, where `.0` is the width and `.1` is the height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec2<T> (pub T, pub T);

impl<T> Vec2<T> {

    /// Maps all components of this vector to a new type, yielding a vector of that new type.
    pub fn map<B>(self, map: impl Fn(T) -> B) -> Vec2<B> {
        Vec2(map(self.0), map(self.1))
    }

    /// Try to convert all components of this vector to a new type,
    /// yielding either a vector of that new type, or an error.
    pub fn try_from<S>(value: Vec2<S>) -> std::result::Result<Self, T::Error> where T: TryFrom<S> {
        let x = T::try_from(value.0)?;
        let y = T::try_from(value.1)?;
        Ok(Vec2(x, y))
    }

    /// Seeing this vector as a dimension or size (width and height),
    /// this returns the area that this dimensions contains (`width * height`).
    pub fn area(self) -> T where T: std::ops::Mul<T, Output = T> {
        self.0 * self.1
    }

    /// The first component of this 2D vector.
    #[inline] pub fn width(self) -> T { self.0 }

    /// The second component of this 2D vector.
    #[inline] pub fn height(self) -> T { self.1 }
}

impl Vec2<i32> {

    /// Try to convert to `Vec2<usize>`, returning an error on negative numbers.
    pub fn to_usize(self, error_message: &'static str) -> Result<Vec2<usize>> {
        let x = i32_to_usize(self.0, error_message)?;
        let y = i32_to_usize(self.1, error_message)?;
        Ok(Vec2(x, y))
    }
}

impl Vec2<usize> {

    /// Try to convert to `Vec2<i32>`, returning an error for too large values.
    pub fn to_i32(self, error_message: &'static str) -> Result<Vec2<i32>> {
        let x = usize_to_i32(self.0, error_message)?;
        let y = usize_to_i32(self.1, error_message)?;
        Ok(Vec2(x, y))
    }
}

impl<T> From<(T, T)> for Vec2<T> {
    fn from((x, y): (T, T)) -> Self { Vec2(x, y) }
}

impl<T> From<Vec2<T>> for (T, T) {
    fn from(vec2: Vec2<T>) -> Self { (vec2.0, vec2.1) }
}


/// A rectangular section of cells inside a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntegerBounds {

    /// The top left corner of this rectangle, as column and row.
    /// The rectangle includes this cell if the size is not zero.
    pub position: Vec2<usize>,

    /// How many cells to include in this rectangle.
    /// Extends to the right and downwards.
    /// Does not include the actual boundary, just like `Vec::len()`.
    pub size: Vec2<usize>,
}

impl IntegerBounds {

    /// Create a box with the specified position and size.
    pub fn new(position: impl Into<Vec2<usize>>, size: impl Into<Vec2<usize>>) -> Self {
        Self { position: position.into(), size: size.into() }
    }

    /// A box covering a whole grid of the specified size.
    pub fn from_dimensions(size: impl Into<Vec2<usize>>) -> Self {
        Self::new(Vec2(0, 0), size)
    }

    /// Returns the bottom right boundary, exclusive.
    pub fn end(self) -> Vec2<usize> {
        Vec2(self.position.0 + self.size.0, self.position.1 + self.size.1)
    }

    /// Number of cells inside the box.
    pub fn area(self) -> usize {
        self.size.area()
    }

    /// Whether the box lies completely inside a grid of the specified size.
    pub fn is_inside(self, grid_size: Vec2<usize>) -> bool {
        let end_x = self.position.0.checked_add(self.size.0);
        let end_y = self.position.1.checked_add(self.size.1);

        match (end_x, end_y) {
            (Some(x), Some(y)) => x <= grid_size.0 && y <= grid_size.1,
            _ => false,
        }
    }
}


/// Number of bits required to represent the number, `0` for `0`.
#[inline]
pub(crate) fn bit_length(number: u32) -> u32 {
    u32::BITS - number.leading_zeros()
}
