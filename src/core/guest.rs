//! Matrix-runtime values
//!
//! Every atomic value is an N-D array (at least two dimensions) stored in
//! column-major order and tagged with a class. Cells hold arbitrary values,
//! structs map field names to values.

use super::{Complex, Shape, ValueKind};
use crate::errors::{BridgeError, ErrorKind, Result};
use num_traits::AsPrimitive;
use std::fmt;

/// Fixed-width numeric classes of the matrix runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericClass {
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl NumericClass {
    pub const ALL: [NumericClass; 10] = [
        Self::Double,
        Self::Single,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Single => "single",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|class| class.name() == name)
    }

    /// Integer classes whose full range fits the vector runtime's 32-bit integers.
    #[inline]
    pub const fn is_narrow_integer(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::UInt8 | Self::Int16 | Self::UInt16 | Self::Int32
        )
    }
}

impl fmt::Display for NumericClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumericData {
    Double(Vec<f64>),
    Single(Vec<f32>),
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
}

fn widen<T: AsPrimitive<f64>>(values: &[T]) -> Vec<f64> {
    values.iter().map(|v| v.as_()).collect()
}

fn narrow_to_i32<T: AsPrimitive<i32>>(values: &[T]) -> Vec<i32> {
    values.iter().map(|v| v.as_()).collect()
}

fn cast<S: AsPrimitive<T>, T: Copy + 'static>(values: &[S]) -> Vec<T> {
    values.iter().map(|v| v.as_()).collect()
}

impl NumericData {
    pub fn class(&self) -> NumericClass {
        match self {
            Self::Double(_) => NumericClass::Double,
            Self::Single(_) => NumericClass::Single,
            Self::Int8(_) => NumericClass::Int8,
            Self::UInt8(_) => NumericClass::UInt8,
            Self::Int16(_) => NumericClass::Int16,
            Self::UInt16(_) => NumericClass::UInt16,
            Self::Int32(_) => NumericClass::Int32,
            Self::UInt32(_) => NumericClass::UInt32,
            Self::Int64(_) => NumericClass::Int64,
            Self::UInt64(_) => NumericClass::UInt64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Double(v) => v.len(),
            Self::Single(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::UInt8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt64(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every element as a double. Lossy for 64-bit values above 2^53.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::Double(v) => v.clone(),
            Self::Single(v) => widen(v),
            Self::Int8(v) => widen(v),
            Self::UInt8(v) => widen(v),
            Self::Int16(v) => widen(v),
            Self::UInt16(v) => widen(v),
            Self::Int32(v) => widen(v),
            Self::UInt32(v) => widen(v),
            Self::Int64(v) => widen(v),
            Self::UInt64(v) => widen(v),
        }
    }

    /// Elements as 32-bit integers; only defined for the narrow integer classes.
    pub fn to_i32(&self) -> Option<Vec<i32>> {
        match self {
            Self::Int8(v) => Some(narrow_to_i32(v)),
            Self::UInt8(v) => Some(narrow_to_i32(v)),
            Self::Int16(v) => Some(narrow_to_i32(v)),
            Self::UInt16(v) => Some(narrow_to_i32(v)),
            Self::Int32(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Casts doubles into `class`, saturating out-of-range values.
    pub fn from_f64(class: NumericClass, values: &[f64]) -> Self {
        match class {
            NumericClass::Double => Self::Double(values.to_vec()),
            NumericClass::Single => Self::Single(cast(values)),
            NumericClass::Int8 => Self::Int8(cast(values)),
            NumericClass::UInt8 => Self::UInt8(cast(values)),
            NumericClass::Int16 => Self::Int16(cast(values)),
            NumericClass::UInt16 => Self::UInt16(cast(values)),
            NumericClass::Int32 => Self::Int32(cast(values)),
            NumericClass::UInt32 => Self::UInt32(cast(values)),
            NumericClass::Int64 => Self::Int64(cast(values)),
            NumericClass::UInt64 => Self::UInt64(cast(values)),
        }
    }

    pub fn from_i32(class: NumericClass, values: &[i32]) -> Self {
        match class {
            NumericClass::Int32 => Self::Int32(values.to_vec()),
            NumericClass::Double => Self::Double(widen(values)),
            other => Self::from_f64(other, &widen(values)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuestArray<T> {
    pub dims: Shape,
    pub data: Vec<T>,
}

/// Pads a dimension list to the two dimensions every matrix value has.
fn normalize_dims(dims: Shape, len: usize) -> Shape {
    match dims.dims() {
        [] => Shape::column(len),
        [n] => Shape::column(*n),
        _ => dims,
    }
}

impl<T> GuestArray<T> {
    pub fn new(dims: Shape, data: Vec<T>) -> Result<Self> {
        let dims = normalize_dims(dims, data.len());
        dims.check(data.len())?;
        Ok(Self { dims, data })
    }

    pub fn row(data: Vec<T>) -> Self {
        Self {
            dims: Shape::row(data.len()),
            data,
        }
    }

    pub fn column(data: Vec<T>) -> Self {
        Self {
            dims: Shape::column(data.len()),
            data,
        }
    }

    #[inline]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn check(&self) -> Result<()> {
        self.dims.check(self.data.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuestNumeric {
    pub dims: Shape,
    pub data: NumericData,
}

impl GuestNumeric {
    pub fn new(dims: Shape, data: NumericData) -> Result<Self> {
        let dims = normalize_dims(dims, data.len());
        dims.check(data.len())?;
        Ok(Self { dims, data })
    }

    #[inline]
    pub fn class(&self) -> NumericClass {
        self.data.class()
    }

    #[inline]
    pub fn check(&self) -> Result<()> {
        self.dims.check(self.data.len())
    }
}

/// Scalar (1x1) struct. Fields may be unset.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestStruct {
    pub class_name: String,
    fields: Vec<(String, Option<GuestValue>)>,
}

impl Default for GuestStruct {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestStruct {
    pub fn new() -> Self {
        Self {
            class_name: "struct".to_string(),
            fields: Vec::new(),
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<GuestValue>) -> Result<()> {
        let name = name.into();
        if self.fields.iter().any(|(existing, _)| *existing == name) {
            return Err(BridgeError::new(ErrorKind::DuplicateField { name }));
        }
        self.fields.push((name, value));
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&GuestValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_ref())
    }

    #[inline]
    pub fn fields(&self) -> &[(String, Option<GuestValue>)] {
        &self.fields
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Class id as the matrix runtime reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestClass {
    Numeric(NumericClass),
    Logical,
    Complex,
    Char,
    Cell,
    Struct,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuestValue {
    Numeric(GuestNumeric),
    Logical(GuestArray<bool>),
    Complex(GuestArray<Complex>),
    Char(GuestArray<char>),
    Cell(GuestArray<GuestValue>),
    Struct(GuestStruct),
    /// Anything without a conversion rule: function handles, class objects.
    Object { class_name: String },
}

impl GuestValue {
    pub fn class(&self) -> GuestClass {
        match self {
            Self::Numeric(n) => GuestClass::Numeric(n.class()),
            Self::Logical(_) => GuestClass::Logical,
            Self::Complex(_) => GuestClass::Complex,
            Self::Char(_) => GuestClass::Char,
            Self::Cell(_) => GuestClass::Cell,
            Self::Struct(_) => GuestClass::Struct,
            Self::Object { .. } => GuestClass::Unknown,
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            Self::Numeric(n) => n.class().name(),
            Self::Logical(_) => "logical",
            Self::Complex(_) => "double",
            Self::Char(_) => "char",
            Self::Cell(_) => "cell",
            Self::Struct(s) => &s.class_name,
            Self::Object { class_name } => class_name,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Numeric(n) if n.class().is_narrow_integer() => ValueKind::Integer,
            Self::Numeric(_) => ValueKind::Real,
            Self::Logical(_) => ValueKind::Logical,
            Self::Complex(_) => ValueKind::Complex,
            Self::Char(_) => ValueKind::Character,
            Self::Cell(_) => ValueKind::Cell,
            Self::Struct(_) => ValueKind::Struct,
            Self::Object { .. } => ValueKind::Opaque,
        }
    }

    pub fn dims(&self) -> Shape {
        match self {
            Self::Numeric(n) => n.dims.clone(),
            Self::Logical(a) => a.dims.clone(),
            Self::Complex(a) => a.dims.clone(),
            Self::Char(a) => a.dims.clone(),
            Self::Cell(a) => a.dims.clone(),
            Self::Struct(_) | Self::Object { .. } => Shape::matrix(1, 1),
        }
    }

    pub fn numel(&self) -> usize {
        match self {
            Self::Numeric(n) => n.data.len(),
            Self::Logical(a) => a.numel(),
            Self::Complex(a) => a.numel(),
            Self::Char(a) => a.numel(),
            Self::Cell(a) => a.numel(),
            Self::Struct(_) | Self::Object { .. } => 1,
        }
    }

    /// `[]`, the empty double matrix.
    pub fn empty() -> Self {
        Self::Numeric(GuestNumeric {
            dims: Shape::matrix(0, 0),
            data: NumericData::Double(Vec::new()),
        })
    }

    pub fn scalar(value: f64) -> Self {
        Self::Numeric(GuestNumeric {
            dims: Shape::matrix(1, 1),
            data: NumericData::Double(vec![value]),
        })
    }

    pub fn row(values: Vec<f64>) -> Self {
        Self::Numeric(GuestNumeric {
            dims: Shape::row(values.len()),
            data: NumericData::Double(values),
        })
    }

    pub fn column(values: Vec<f64>) -> Self {
        Self::Numeric(GuestNumeric {
            dims: Shape::column(values.len()),
            data: NumericData::Double(values),
        })
    }

    pub fn matrix(values: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self::Numeric(GuestNumeric::new(
            Shape::matrix(rows, cols),
            NumericData::Double(values),
        )?))
    }

    pub fn numeric(dims: Shape, data: NumericData) -> Result<Self> {
        Ok(Self::Numeric(GuestNumeric::new(dims, data)?))
    }

    pub fn logical_scalar(value: bool) -> Self {
        Self::Logical(GuestArray {
            dims: Shape::matrix(1, 1),
            data: vec![value],
        })
    }

    /// One-row character array. The empty string is `0x0`.
    pub fn string(text: &str) -> Self {
        let data: Vec<char> = text.chars().collect();
        let dims = if data.is_empty() {
            Shape::matrix(0, 0)
        } else {
            Shape::row(data.len())
        };
        Self::Char(GuestArray { dims, data })
    }

    /// Character matrix with one row per entry; rows must have equal length.
    pub fn char_matrix(rows: &[&str]) -> Result<Self> {
        let rows: Vec<Vec<char>> = rows.iter().map(|r| r.chars().collect()).collect();
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = vec![' '; rows.len() * cols];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(BridgeError::shape_mismatch(&[rows.len(), cols], cols, row.len()));
            }
            for (j, &ch) in row.iter().enumerate() {
                data[j * rows.len() + i] = ch;
            }
        }
        Ok(Self::Char(GuestArray {
            dims: Shape::matrix(rows.len(), cols),
            data,
        }))
    }

    pub fn cell_row(values: Vec<GuestValue>) -> Self {
        Self::Cell(GuestArray::row(values))
    }

    /// Text of a character array with at most one row.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Self::Char(a) if a.dims.ndims() == 2 && a.dims.rows() <= 1 => {
                Some(a.data.iter().collect())
            }
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Numeric(n) if n.data.len() == 1 => n.data.to_f64().first().copied(),
            Self::Logical(a) if a.data.len() == 1 => Some(if a.data[0] { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Re-validates dimensions of array-valued variants.
    pub fn check(&self) -> Result<()> {
        match self {
            Self::Numeric(n) => n.check(),
            Self::Logical(a) => a.check(),
            Self::Complex(a) => a.check(),
            Self::Char(a) => a.check(),
            Self::Cell(a) => a.check(),
            Self::Struct(_) | Self::Object { .. } => Ok(()),
        }
    }
}

impl From<f64> for GuestValue {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl From<&str> for GuestValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}
