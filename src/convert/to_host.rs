//! Matrix runtime -> vector runtime

use super::homogeneity::{self, CellLayout};
use crate::config::ConvertOptions;
use crate::core::{
    ClassTags, GuestArray, GuestNumeric, GuestStruct, GuestValue, HostArray, HostValue,
    NumericClass, Record, Shape, ValueKind,
};
use crate::errors::{BridgeError, ErrorKind, Result};
use crate::logging::{log_cell_decision, log_conversion, log_unsupported};

const DIRECTION: &str = "to_host";

/// Walks matrix-runtime values and builds vector-runtime values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestToHost {
    options: ConvertOptions,
}

impl GuestToHost {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Absent input is the vector runtime's "no value", not an error.
    pub fn convert_optional(&self, value: Option<&GuestValue>) -> Result<HostValue> {
        match value {
            Some(value) => self.convert(value),
            None => Ok(HostValue::Null),
        }
    }

    pub fn convert(&self, value: &GuestValue) -> Result<HostValue> {
        log_conversion(DIRECTION, value.class_name(), value.kind().name());

        match value {
            GuestValue::Cell(cell) => self.cell(cell),
            GuestValue::Struct(s) => self.record(s),
            GuestValue::Numeric(n) if n.class() == NumericClass::Double => {
                n.check()?;
                Ok(HostValue::Real(HostArray {
                    data: n.data.to_f64(),
                    shape: host_shape(&n.dims),
                    tags: ClassTags::default(),
                }))
            }
            GuestValue::Numeric(n) => self.fixed_width(n),
            GuestValue::Logical(a) => Ok(HostValue::Logical(copy_array(a)?)),
            GuestValue::Complex(a) => Ok(HostValue::Complex(copy_array(a)?)),
            GuestValue::Char(a) => Ok(HostValue::Character(char_rows(a)?)),
            GuestValue::Object { class_name } => {
                Err(BridgeError::unsupported(ValueKind::Opaque, class_name.clone()))
            }
        }
    }

    /// Like `convert`, but a value without a conversion rule is reported
    /// and yields `None` unless `strict_unsupported` is set.
    pub fn convert_lossy(&self, value: &GuestValue) -> Result<Option<HostValue>> {
        match self.convert(value) {
            Ok(converted) => Ok(Some(converted)),
            Err(e) if e.is_unsupported() && !self.options.strict_unsupported => {
                if let ErrorKind::UnsupportedType { kind, class_name } = &e.kind {
                    log_unsupported(DIRECTION, kind.name(), class_name);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Converts one element of a collection. Unsupported elements become
    /// `Null` so their siblings still convert.
    fn slot(&self, value: Option<&GuestValue>, context: impl FnOnce() -> String) -> Result<HostValue> {
        let Some(value) = value else {
            return Ok(HostValue::Null);
        };
        self.convert_lossy(value)
            .map(|converted| converted.unwrap_or(HostValue::Null))
            .map_err(|e| e.with_context(context()))
    }

    fn cell(&self, cell: &GuestArray<GuestValue>) -> Result<HostValue> {
        cell.check()?;

        if self.options.collapse_cells {
            if let CellLayout::Collapse(values) = homogeneity::analyze(cell) {
                return Ok(homogeneity::collapse(values, self.options.tag_numeric_class));
            }
        }
        log_cell_decision(cell.data.len(), false, "cell");

        let items = cell
            .data
            .iter()
            .enumerate()
            .map(|(i, el)| self.slot(Some(el), || format!("cell element {}", i + 1)))
            .collect::<Result<Vec<_>>>()?;
        Ok(HostValue::List(items))
    }

    fn record(&self, s: &GuestStruct) -> Result<HostValue> {
        let mut record = Record::new();
        for (name, value) in s.fields() {
            let converted = self.slot(value.as_ref(), || format!("field '{}'", name))?;
            record.push(name.clone(), converted)?;
        }
        if self.options.struct_class_tag {
            record.class = Some(s.class_name.clone());
        }
        Ok(HostValue::Record(record))
    }

    /// Integer classes that fit 32 bits become integers; everything wider,
    /// and single precision, becomes real. The class name is kept as a tag.
    fn fixed_width(&self, n: &GuestNumeric) -> Result<HostValue> {
        n.check()?;

        let class = n.class();
        let shape = host_shape(&n.dims);
        let tags = if self.options.tag_numeric_class {
            ClassTags {
                guest_class: Some(class.name().to_string()),
                single_precision: class == NumericClass::Single,
            }
        } else {
            ClassTags::default()
        };

        match n.data.to_i32() {
            Some(data) => Ok(HostValue::Integer(HostArray { data, shape, tags })),
            None => Ok(HostValue::Real(HostArray {
                data: n.data.to_f64(),
                shape,
                tags,
            })),
        }
    }
}

/// Two-dimensional arrays with a singleton row or column become plain
/// vectors; everything else keeps its dimensions.
fn host_shape(dims: &Shape) -> Shape {
    if dims.is_degenerate_matrix() {
        Shape::vector()
    } else {
        dims.clone()
    }
}

fn copy_array<T: Clone>(a: &GuestArray<T>) -> Result<HostArray<T>> {
    a.check()?;
    Ok(HostArray {
        data: a.data.clone(),
        shape: host_shape(&a.dims),
        tags: ClassTags::default(),
    })
}

/// Each row of a character array becomes one string. Pages beyond the
/// second dimension contribute further rows; the result keeps the row
/// count and the trailing dimensions.
fn char_rows(a: &GuestArray<char>) -> Result<HostArray<String>> {
    a.check()?;

    let dims = a.dims.dims();
    let rows = a.dims.rows();
    let cols = a.dims.cols();
    let overflow = || BridgeError::shape_mismatch(dims, usize::MAX, a.data.len());
    let pages = dims
        .iter()
        .skip(2)
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(overflow)?;
    let count = rows.checked_mul(pages).ok_or_else(overflow)?;

    // Capacity never exceeds the payload length.
    let mut strings = Vec::with_capacity(if cols == 0 { 0 } else { count });
    for page in 0..pages {
        let base = page * rows * cols;
        for i in 0..rows {
            strings.push((0..cols).map(|j| a.data[base + j * rows + i]).collect::<String>());
        }
    }

    let shape = if dims.len() > 2 {
        Shape::new(std::iter::once(rows).chain(dims[2..].iter().copied()))
    } else {
        Shape::vector()
    };
    Ok(HostArray {
        data: strings,
        shape,
        tags: ClassTags::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Complex, GuestStruct, NumericData};

    fn convert(value: &GuestValue) -> Result<HostValue> {
        GuestToHost::default().convert(value)
    }

    #[test]
    fn test_none_is_null() {
        assert_eq!(GuestToHost::default().convert_optional(None).unwrap(), HostValue::Null);
    }

    #[test]
    fn test_row_and_column_collapse_to_vectors() {
        assert_eq!(convert(&GuestValue::row(vec![1.0, 2.0])).unwrap(), HostValue::real(vec![1.0, 2.0]));
        assert_eq!(convert(&GuestValue::column(vec![1.0, 2.0])).unwrap(), HostValue::real(vec![1.0, 2.0]));
    }

    #[test]
    fn test_matrix_keeps_shape() {
        let value = GuestValue::matrix(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        match convert(&value).unwrap() {
            HostValue::Real(a) => {
                assert_eq!(a.shape, Shape::matrix(2, 3));
                assert_eq!(a.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_payload_is_shape_mismatch() {
        let value = GuestValue::Numeric(GuestNumeric {
            dims: Shape::matrix(2, 2),
            data: NumericData::Double(vec![1.0]),
        });
        let err = convert(&value).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ShapeMismatch { expected: 4, actual: 1, .. }));
    }

    #[test]
    fn test_narrow_integers_become_integers_with_tag() {
        let value = GuestValue::numeric(Shape::row(3), NumericData::UInt8(vec![1, 2, 255])).unwrap();
        match convert(&value).unwrap() {
            HostValue::Integer(a) => {
                assert_eq!(a.data, vec![1, 2, 255]);
                assert_eq!(a.tags.guest_class.as_deref(), Some("uint8"));
                assert!(!a.tags.single_precision);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wide_and_single_become_reals() {
        let single = GuestValue::numeric(Shape::matrix(1, 1), NumericData::Single(vec![1.5])).unwrap();
        match convert(&single).unwrap() {
            HostValue::Real(a) => {
                assert_eq!(a.data, vec![1.5]);
                assert_eq!(a.tags.guest_class.as_deref(), Some("single"));
                assert!(a.tags.single_precision);
            }
            other => panic!("unexpected {:?}", other),
        }

        let wide = GuestValue::numeric(Shape::matrix(1, 1), NumericData::UInt32(vec![4_000_000_000])).unwrap();
        match convert(&wide).unwrap() {
            HostValue::Real(a) => assert_eq!(a.data, vec![4_000_000_000.0]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_untagged_when_disabled() {
        let options = ConvertOptions {
            tag_numeric_class: false,
            ..ConvertOptions::default()
        };
        let value = GuestValue::numeric(Shape::matrix(1, 1), NumericData::Int16(vec![9])).unwrap();
        assert_eq!(GuestToHost::new(options).convert(&value).unwrap(), HostValue::integer(vec![9]));
    }

    #[test]
    fn test_char_matrix_rows_become_strings() {
        let value = GuestValue::char_matrix(&["abc", "def"]).unwrap();
        assert_eq!(convert(&value).unwrap(), HostValue::strings(["abc", "def"]));
    }

    #[test]
    fn test_char_pages_stack() {
        // 2 rows x 2 cols x 2 pages, column-major.
        let data = vec!['a', 'c', 'b', 'd', 'e', 'g', 'f', 'h'];
        let value = GuestValue::Char(GuestArray::new(Shape::new([2, 2, 2]), data).unwrap());
        match convert(&value).unwrap() {
            HostValue::Character(a) => {
                assert_eq!(a.data, vec!["ab", "cd", "ef", "gh"]);
                assert_eq!(a.shape, Shape::new([2, 2]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_char_dims_are_a_mismatch() {
        let value = GuestValue::Char(GuestArray {
            dims: Shape::matrix(1 << 63, 2),
            data: Vec::new(),
        });
        let err = convert(&value).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ShapeMismatch { expected: usize::MAX, actual: 0, .. }));
    }

    #[test]
    fn test_zero_width_char_rows_are_empty_strings() {
        let value = GuestValue::Char(GuestArray::new(Shape::matrix(3, 0), Vec::new()).unwrap());
        assert_eq!(convert(&value).unwrap(), HostValue::strings(["", "", ""]));
    }

    #[test]
    fn test_complex_copies_both_planes() {
        let data = vec![Complex::new(1.0, -1.0), Complex::new(0.0, 2.0)];
        let value = GuestValue::Complex(GuestArray::row(data.clone()));
        assert_eq!(convert(&value).unwrap(), HostValue::complex(data));
    }

    #[test]
    fn test_struct_becomes_tagged_record() {
        let mut s = GuestStruct::new();
        s.push("alpha", Some(GuestValue::scalar(1.0))).unwrap();
        s.push("beta", Some(GuestValue::string("x"))).unwrap();
        s.push("gamma", None).unwrap();

        match convert(&GuestValue::Struct(s)).unwrap() {
            HostValue::Record(r) => {
                assert_eq!(r.names().collect::<Vec<_>>(), vec!["alpha", "beta", "gamma"]);
                assert_eq!(r.get("alpha"), Some(&HostValue::scalar(1.0)));
                assert_eq!(r.get("beta"), Some(&HostValue::string("x")));
                assert_eq!(r.get("gamma"), Some(&HostValue::Null));
                assert_eq!(r.class.as_deref(), Some("struct"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_object_is_unsupported() {
        let err = convert(&GuestValue::Object { class_name: "function_handle".into() }).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_unsupported_cell_element_does_not_abort_siblings() {
        let cell = GuestValue::cell_row(vec![
            GuestValue::row(vec![1.0, 2.0]),
            GuestValue::Object { class_name: "containers.Map".into() },
            GuestValue::string("ok"),
        ]);
        assert_eq!(
            convert(&cell).unwrap(),
            HostValue::List(vec![
                HostValue::real(vec![1.0, 2.0]),
                HostValue::Null,
                HostValue::string("ok"),
            ])
        );
    }

    #[test]
    fn test_strict_mode_reports_element_context() {
        let cell = GuestValue::cell_row(vec![
            GuestValue::scalar(1.0),
            GuestValue::Object { class_name: "containers.Map".into() },
        ]);
        let err = GuestToHost::new(ConvertOptions::strict()).convert(&cell).unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(err.context, vec!["cell element 2".to_string()]);
    }

    #[test]
    fn test_collapse_can_be_disabled() {
        let options = ConvertOptions {
            collapse_cells: false,
            ..ConvertOptions::default()
        };
        let cell = GuestValue::cell_row(vec![GuestValue::scalar(1.0), GuestValue::scalar(2.0)]);
        assert_eq!(
            GuestToHost::new(options).convert(&cell).unwrap(),
            HostValue::List(vec![HostValue::scalar(1.0), HostValue::scalar(2.0)])
        );
    }
}
