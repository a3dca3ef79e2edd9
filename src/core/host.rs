//! Vector-runtime values
//!
//! Atomic data is a flat payload plus an optional dimension attribute.
//! Collections are either positional lists or named records.

use super::{Complex, GuestValue, Shape, ValueKind};
use crate::errors::{BridgeError, ErrorKind, Result};
use std::sync::Arc;

/// Provenance carried by values that came from the matrix runtime's
/// fixed-width numeric classes. Without it the original class cannot be
/// recovered after widening to real or narrowing to integer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTags {
    pub guest_class: Option<String>,
    pub single_precision: bool,
}

impl ClassTags {
    pub fn guest_class(name: impl Into<String>) -> Self {
        Self {
            guest_class: Some(name.into()),
            single_precision: false,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.guest_class.is_none() && !self.single_precision
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostArray<T> {
    pub data: Vec<T>,
    pub shape: Shape,
    pub tags: ClassTags,
}

impl<T> HostArray<T> {
    pub fn vector(data: Vec<T>) -> Self {
        Self {
            data,
            shape: Shape::vector(),
            tags: ClassTags::default(),
        }
    }

    pub fn scalar(value: T) -> Self {
        Self::vector(vec![value])
    }

    pub fn with_shape(data: Vec<T>, shape: Shape) -> Result<Self> {
        shape.check(data.len())?;
        Ok(Self {
            data,
            shape,
            tags: ClassTags::default(),
        })
    }

    pub fn tagged(mut self, tags: ClassTags) -> Self {
        self.tags = tags;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Re-validates the shape against the payload.
    #[inline]
    pub fn check(&self) -> Result<()> {
        self.shape.check(self.data.len())
    }
}

/// Reference to something the vector runtime cannot look inside.
#[derive(Debug, Clone, PartialEq)]
pub enum Handle {
    /// An unconverted matrix-runtime value.
    Guest(Arc<GuestValue>),
    /// An open interpreter session.
    Session(u64),
    Foreign(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Opaque {
    pub label: String,
    pub handle: Handle,
}

impl Opaque {
    pub const GUEST_REFERENCE: &'static str = "GuestReference";
    pub const GUEST_SESSION: &'static str = "GuestSession";

    pub fn guest_reference(value: GuestValue) -> Self {
        Self {
            label: Self::GUEST_REFERENCE.to_string(),
            handle: Handle::Guest(Arc::new(value)),
        }
    }
}

/// Named collection. Field names are unique; order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, HostValue)>,
    pub class: Option<String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<N: Into<String>>(
        fields: impl IntoIterator<Item = (N, HostValue)>,
    ) -> Result<Self> {
        let mut record = Self::new();
        for (name, value) in fields {
            record.push(name, value)?;
        }
        Ok(record)
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: HostValue) -> Result<()> {
        let name = name.into();
        if self.fields.iter().any(|(existing, _)| *existing == name) {
            return Err(BridgeError::new(ErrorKind::DuplicateField { name }));
        }
        self.fields.push((name, value));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    #[inline]
    pub fn fields(&self) -> &[(String, HostValue)] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<(String, HostValue)> {
        self.fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// The runtime's "no value".
    Null,
    Real(HostArray<f64>),
    Integer(HostArray<i32>),
    Logical(HostArray<bool>),
    Complex(HostArray<Complex>),
    Character(HostArray<String>),
    List(Vec<HostValue>),
    Record(Record),
    Opaque(Opaque),
}

impl HostValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Real(_) => ValueKind::Real,
            Self::Integer(_) => ValueKind::Integer,
            Self::Logical(_) => ValueKind::Logical,
            Self::Complex(_) => ValueKind::Complex,
            Self::Character(_) => ValueKind::Character,
            Self::List(_) => ValueKind::Cell,
            Self::Record(_) => ValueKind::Struct,
            Self::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Name the vector runtime would report for this value's type.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "NULL",
            Self::Real(_) => "double",
            Self::Integer(_) => "integer",
            Self::Logical(_) => "logical",
            Self::Complex(_) => "complex",
            Self::Character(_) => "character",
            Self::List(_) => "list",
            Self::Record(record) => record.class.as_deref().unwrap_or("list"),
            Self::Opaque(opaque) => &opaque.label,
        }
    }

    pub fn real(data: Vec<f64>) -> Self {
        Self::Real(HostArray::vector(data))
    }

    pub fn scalar(value: f64) -> Self {
        Self::Real(HostArray::scalar(value))
    }

    pub fn integer(data: Vec<i32>) -> Self {
        Self::Integer(HostArray::vector(data))
    }

    pub fn logical(data: Vec<bool>) -> Self {
        Self::Logical(HostArray::vector(data))
    }

    pub fn complex(data: Vec<Complex>) -> Self {
        Self::Complex(HostArray::vector(data))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::Character(HostArray::scalar(text.into()))
    }

    pub fn strings<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::Character(HostArray::vector(texts.into_iter().map(Into::into).collect()))
    }

    pub fn matrix(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self::Real(HostArray::with_shape(data, Shape::matrix(rows, cols))?))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Number of elements (fields for records, 0 for null and opaque values).
    pub fn len(&self) -> usize {
        match self {
            Self::Null | Self::Opaque(_) => 0,
            Self::Real(a) => a.len(),
            Self::Integer(a) => a.len(),
            Self::Logical(a) => a.len(),
            Self::Complex(a) => a.len(),
            Self::Character(a) => a.len(),
            Self::List(items) => items.len(),
            Self::Record(record) => record.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric payload widened to reals; logicals count as 0/1.
    pub fn to_reals(&self) -> Option<Vec<f64>> {
        match self {
            Self::Real(a) => Some(a.data.clone()),
            Self::Integer(a) => Some(a.data.iter().map(|&v| f64::from(v)).collect()),
            Self::Logical(a) => Some(a.data.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Character(a) if a.len() == 1 => Some(a.data[0].as_str()),
            _ => None,
        }
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::logical(vec![value])
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<Record> for HostValue {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rejects_duplicate_names() {
        let mut record = Record::new();
        record.push("a", HostValue::scalar(1.0)).unwrap();
        let err = record.push("a", HostValue::scalar(2.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateField { name: "a".to_string() });
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_record_preserves_order() {
        let record = Record::from_fields([
            ("z", HostValue::scalar(1.0)),
            ("a", HostValue::string("x")),
        ])
        .unwrap();
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(record.get("a"), Some(&HostValue::string("x")));
    }

    #[test]
    fn test_with_shape_checks_payload() {
        assert!(HostValue::matrix(vec![1.0, 2.0, 3.0, 4.0], 2, 2).is_ok());
        assert!(HostValue::matrix(vec![1.0, 2.0, 3.0], 2, 2).is_err());
    }

    #[test]
    fn test_to_reals_widens() {
        assert_eq!(HostValue::integer(vec![1, 2]).to_reals(), Some(vec![1.0, 2.0]));
        assert_eq!(HostValue::logical(vec![true, false]).to_reals(), Some(vec![1.0, 0.0]));
        assert_eq!(HostValue::string("a").to_reals(), None);
    }
}
