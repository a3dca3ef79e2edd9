//! Dimension lists for numeric, logical, complex and character values
//!
//! A `Shape` of length 0 means "plain vector": the payload length alone
//! determines the extent. Any other shape must describe exactly as many
//! elements as the payload holds.

use crate::errors::{BridgeError, Result};
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Shape(SmallVec<[usize; 4]>);

impl Shape {
    /// Plain vector shape (no dimension information).
    #[inline]
    pub fn vector() -> Self {
        Self(SmallVec::new())
    }

    pub fn new(dims: impl IntoIterator<Item = usize>) -> Self {
        Self(dims.into_iter().collect())
    }

    #[inline]
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self::new([rows, cols])
    }

    /// `n x 1` column, the layout the matrix runtime uses for plain vectors.
    #[inline]
    pub fn column(n: usize) -> Self {
        Self::matrix(n, 1)
    }

    #[inline]
    pub fn row(n: usize) -> Self {
        Self::matrix(1, n)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.0.len()
    }

    /// Element count described by the dimensions, `None` for plain vectors.
    /// A product that does not fit `usize` is a `ShapeMismatch`.
    pub fn numel(&self) -> Result<Option<usize>> {
        if self.0.is_empty() {
            return Ok(None);
        }
        self.product()
            .map(Some)
            .ok_or_else(|| BridgeError::shape_mismatch(&self.0, usize::MAX, 0))
    }

    /// Checks the dimensions against a flattened payload length.
    pub fn check(&self, len: usize) -> Result<()> {
        if self.0.is_empty() {
            return Ok(());
        }
        match self.product() {
            Some(expected) if expected == len => Ok(()),
            Some(expected) => Err(BridgeError::shape_mismatch(&self.0, expected, len)),
            None => Err(BridgeError::shape_mismatch(&self.0, usize::MAX, len)),
        }
    }

    fn product(&self) -> Option<usize> {
        if self.0.contains(&0) {
            return Some(0);
        }
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.0.first().copied().unwrap_or(0)
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.0.get(1).copied().unwrap_or(1)
    }

    /// Two-dimensional with a singleton row or column count.
    pub fn is_degenerate_matrix(&self) -> bool {
        self.0.len() == 2 && (self.0[0] == 1 || self.0[1] == 1)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.iter().copied())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "vector");
        }
        let parts: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", parts.join("x"))
    }
}
