//! Cell homogeneity analysis
//!
//! A cell collapses into one typed vector only when every element is a
//! scalar (or a one-row string), all elements share a class, and that class
//! is one of the primitive classes below. A single non-conforming element
//! sends the whole cell down the heterogeneous path.

use crate::core::{ClassTags, GuestArray, GuestValue, HostArray, HostValue, NumericClass, NumericData};
use crate::logging::log_cell_decision;

/// Classes eligible for collapsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveClass {
    Char,
    Logical,
    Double,
    Int8,
}

impl PrimitiveClass {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::Logical => "logical",
            Self::Double => "double",
            Self::Int8 => "int8",
        }
    }
}

/// Typed payload of a collapsible cell, one entry per element in storage order.
#[derive(Debug, Clone, PartialEq)]
pub enum Collapsed {
    Char(Vec<String>),
    Logical(Vec<bool>),
    Double(Vec<f64>),
    Int8(Vec<i8>),
}

impl Collapsed {
    pub fn class(&self) -> PrimitiveClass {
        match self {
            Self::Char(_) => PrimitiveClass::Char,
            Self::Logical(_) => PrimitiveClass::Logical,
            Self::Double(_) => PrimitiveClass::Double,
            Self::Int8(_) => PrimitiveClass::Int8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Char(v) => v.len(),
            Self::Logical(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Int8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn first(element: Element) -> Self {
        match element {
            Element::Char(x) => Self::Char(vec![x]),
            Element::Logical(x) => Self::Logical(vec![x]),
            Element::Double(x) => Self::Double(vec![x]),
            Element::Int8(x) => Self::Int8(vec![x]),
        }
    }

    /// Appends `element`; `false` when it belongs to another class.
    fn push(&mut self, element: Element) -> bool {
        match (self, element) {
            (Self::Char(v), Element::Char(x)) => v.push(x),
            (Self::Logical(v), Element::Logical(x)) => v.push(x),
            (Self::Double(v), Element::Double(x)) => v.push(x),
            (Self::Int8(v), Element::Int8(x)) => v.push(x),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellLayout {
    Collapse(Collapsed),
    Heterogeneous,
}

/// A cell element that is a scalar (or one-row string) of a primitive class.
enum Element {
    Char(String),
    Logical(bool),
    Double(f64),
    Int8(i8),
}

fn primitive_element(value: &GuestValue) -> Option<Element> {
    match value {
        GuestValue::Char(_) => value.as_string().map(Element::Char),
        GuestValue::Logical(a) if a.data.len() == 1 => a.data.first().map(|&x| Element::Logical(x)),
        GuestValue::Numeric(n) if n.data.len() == 1 => match &n.data {
            NumericData::Double(v) => v.first().map(|&x| Element::Double(x)),
            NumericData::Int8(v) => v.first().map(|&x| Element::Int8(x)),
            _ => None,
        },
        _ => None,
    }
}

/// Decides how a cell crosses into the vector runtime, extracting the
/// typed values when it collapses.
pub fn analyze(cell: &GuestArray<GuestValue>) -> CellLayout {
    let mut collapsed: Option<Collapsed> = None;

    for value in &cell.data {
        let Some(element) = primitive_element(value) else {
            return CellLayout::Heterogeneous;
        };
        if let Some(values) = collapsed.as_mut() {
            if !values.push(element) {
                return CellLayout::Heterogeneous;
            }
        } else {
            collapsed = Some(Collapsed::first(element));
        }
    }

    // Empty cells carry no class to collapse into.
    match collapsed {
        Some(values) => CellLayout::Collapse(values),
        None => CellLayout::Heterogeneous,
    }
}

/// Builds the typed vector for a cell `analyze` approved.
pub fn collapse(values: Collapsed, tag_class: bool) -> HostValue {
    log_cell_decision(values.len(), true, values.class().name());

    match values {
        Collapsed::Char(v) => HostValue::Character(HostArray::vector(v)),
        Collapsed::Logical(v) => HostValue::Logical(HostArray::vector(v)),
        Collapsed::Double(v) => HostValue::Real(HostArray::vector(v)),
        Collapsed::Int8(v) => {
            let array = HostArray::vector(v.into_iter().map(i32::from).collect());
            if tag_class {
                HostValue::Integer(array.tagged(ClassTags::guest_class(NumericClass::Int8.name())))
            } else {
                HostValue::Integer(array)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Shape;

    fn cell(values: Vec<GuestValue>) -> GuestArray<GuestValue> {
        GuestArray::row(values)
    }

    fn int8(v: i8) -> GuestValue {
        GuestValue::numeric(Shape::matrix(1, 1), NumericData::Int8(vec![v])).unwrap()
    }

    fn collapsed(c: &GuestArray<GuestValue>) -> Collapsed {
        match analyze(c) {
            CellLayout::Collapse(values) => values,
            CellLayout::Heterogeneous => panic!("expected a collapsible cell"),
        }
    }

    #[test]
    fn test_double_scalars_collapse() {
        let c = cell((1..=5).map(|i| GuestValue::scalar(i as f64)).collect());
        let values = collapsed(&c);
        assert_eq!(values, Collapsed::Double(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(values.class(), PrimitiveClass::Double);
        assert_eq!(collapse(values, true), HostValue::real(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
    }

    #[test]
    fn test_one_vector_element_forces_heterogeneous() {
        let mut values: Vec<GuestValue> = (1..=5).map(|i| GuestValue::scalar(i as f64)).collect();
        values[2] = GuestValue::row(vec![1.0, 2.0]);
        assert_eq!(analyze(&cell(values)), CellLayout::Heterogeneous);
    }

    #[test]
    fn test_mixed_classes_are_heterogeneous() {
        let c = cell(vec![GuestValue::scalar(1.0), GuestValue::logical_scalar(true)]);
        assert_eq!(analyze(&c), CellLayout::Heterogeneous);

        let c = cell(vec![int8(1), GuestValue::scalar(1.0)]);
        assert_eq!(analyze(&c), CellLayout::Heterogeneous);
    }

    #[test]
    fn test_non_primitive_class_is_heterogeneous() {
        let u16 = GuestValue::numeric(Shape::matrix(1, 1), NumericData::UInt16(vec![3])).unwrap();
        assert_eq!(analyze(&cell(vec![u16.clone(), u16])), CellLayout::Heterogeneous);

        let mut s = crate::core::GuestStruct::new();
        s.push("a", None).unwrap();
        assert_eq!(analyze(&cell(vec![GuestValue::Struct(s)])), CellLayout::Heterogeneous);
    }

    #[test]
    fn test_strings_collapse_regardless_of_length() {
        let c = cell(vec![GuestValue::string("alpha"), GuestValue::string(""), GuestValue::string("b")]);
        let values = collapsed(&c);
        assert_eq!(values.class(), PrimitiveClass::Char);
        assert_eq!(collapse(values, true), HostValue::strings(["alpha", "", "b"]));
    }

    #[test]
    fn test_multi_row_char_is_not_a_string() {
        let block = GuestValue::char_matrix(&["ab", "cd"]).unwrap();
        assert_eq!(analyze(&cell(vec![block])), CellLayout::Heterogeneous);
    }

    #[test]
    fn test_int8_collapse_is_tagged() {
        let c = cell(vec![int8(-3), int8(7)]);
        assert_eq!(collapsed(&c), Collapsed::Int8(vec![-3, 7]));
        match collapse(collapsed(&c), true) {
            HostValue::Integer(a) => {
                assert_eq!(a.data, vec![-3, 7]);
                assert_eq!(a.tags.guest_class.as_deref(), Some("int8"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(collapse(collapsed(&c), false), HostValue::integer(vec![-3, 7]));
    }

    #[test]
    fn test_logicals_collapse() {
        let c = cell(vec![GuestValue::logical_scalar(true), GuestValue::logical_scalar(false)]);
        assert_eq!(collapse(collapsed(&c), true), HostValue::logical(vec![true, false]));
    }

    #[test]
    fn test_empty_cell_is_heterogeneous() {
        assert_eq!(analyze(&cell(Vec::new())), CellLayout::Heterogeneous);
    }
}
