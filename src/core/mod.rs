//! Value model shared by both converters
//!
//! The vector runtime ("host") and the matrix runtime ("guest") each get a
//! closed sum type. `ValueKind` is the common tag vocabulary used in
//! diagnostics and errors.

pub mod complex;
pub mod guest;
pub mod host;
pub mod shape;

pub use complex::Complex;
pub use guest::{GuestArray, GuestClass, GuestNumeric, GuestStruct, GuestValue, NumericClass, NumericData};
pub use host::{ClassTags, Handle, HostArray, HostValue, Opaque, Record};
pub use shape::Shape;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Real,
    Integer,
    Logical,
    Complex,
    Character,
    Cell,
    Struct,
    Opaque,
}

impl ValueKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Real => "real",
            Self::Integer => "integer",
            Self::Logical => "logical",
            Self::Complex => "complex",
            Self::Character => "character",
            Self::Cell => "cell",
            Self::Struct => "struct",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
