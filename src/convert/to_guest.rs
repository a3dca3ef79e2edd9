//! Vector runtime -> matrix runtime

use super::fields::sanitize_field_name;
use crate::config::ConvertOptions;
use crate::core::{
    ClassTags, GuestArray, GuestNumeric, GuestStruct, GuestValue, Handle, HostArray, HostValue,
    NumericClass, NumericData, Record, Shape, ValueKind,
};
use crate::errors::{BridgeError, ErrorKind, Result};
use crate::logging::{log_conversion, log_unsupported};

const DIRECTION: &str = "to_guest";

/// Walks vector-runtime values and builds matrix-runtime values.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostToGuest {
    options: ConvertOptions,
}

impl HostToGuest {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Strict conversion: values without a conversion rule are errors.
    pub fn convert(&self, value: &HostValue) -> Result<GuestValue> {
        log_conversion(DIRECTION, value.type_name(), value.kind().name());

        match value {
            HostValue::Null => Ok(GuestValue::empty()),
            HostValue::List(items) => self.cell(items),
            HostValue::Record(record) => self.record(record),
            HostValue::Real(a) => {
                let dims = guest_dims(a)?;
                let class = restore_class(&a.tags).unwrap_or(NumericClass::Double);
                Ok(GuestValue::Numeric(GuestNumeric {
                    dims,
                    data: NumericData::from_f64(class, &a.data),
                }))
            }
            HostValue::Integer(a) => {
                let dims = guest_dims(a)?;
                let class = restore_class(&a.tags).unwrap_or(NumericClass::Double);
                Ok(GuestValue::Numeric(GuestNumeric {
                    dims,
                    data: NumericData::from_i32(class, &a.data),
                }))
            }
            HostValue::Logical(a) => Ok(GuestValue::Logical(GuestArray {
                dims: guest_dims(a)?,
                data: a.data.clone(),
            })),
            HostValue::Complex(a) => Ok(GuestValue::Complex(GuestArray {
                dims: guest_dims(a)?,
                data: a.data.clone(),
            })),
            HostValue::Character(a) => Ok(GuestValue::Cell(GuestArray {
                dims: guest_dims(a)?,
                data: a.data.iter().map(|s| GuestValue::string(s)).collect(),
            })),
            HostValue::Opaque(opaque) => match &opaque.handle {
                Handle::Guest(value) => Ok(GuestValue::clone(value)),
                Handle::Session(_) | Handle::Foreign(_) => {
                    Err(BridgeError::unsupported(ValueKind::Opaque, opaque.label.clone()))
                }
            },
        }
    }

    /// Lossy conversion: a value without a conversion rule is reported and
    /// yields `None`. Still fails on structural errors, and on everything
    /// when `strict_unsupported` is set.
    pub fn convert_lossy(&self, value: &HostValue) -> Result<Option<GuestValue>> {
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

    /// Cells are always `1 x N`.
    fn cell(&self, items: &[HostValue]) -> Result<GuestValue> {
        let data = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.convert_lossy(item)
                    .map(|v| v.unwrap_or_else(GuestValue::empty))
                    .map_err(|e| e.with_context(format!("list element {}", i + 1)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GuestValue::cell_row(data))
    }

    fn record(&self, record: &Record) -> Result<GuestValue> {
        let mut s = GuestStruct::new();
        for (name, value) in record.fields() {
            let converted = self
                .convert_lossy(value)
                .map_err(|e| e.with_context(format!("field '{}'", name)))?;
            s.push(sanitize_field_name(name).into_owned(), converted)
                .map_err(|e| e.with_context(format!("field '{}'", name)))?;
        }
        Ok(GuestValue::Struct(s))
    }
}

/// Plain and one-dimensional vectors become `N x 1` columns; two or more
/// dimensions carry over unchanged.
fn guest_dims<T>(a: &HostArray<T>) -> Result<Shape> {
    a.check()?;
    Ok(match a.shape.dims() {
        [] => Shape::column(a.len()),
        [n] => Shape::column(*n),
        _ => a.shape.clone(),
    })
}

/// The numeric class a tagged value originally had.
fn restore_class(tags: &ClassTags) -> Option<NumericClass> {
    if tags.single_precision {
        return Some(NumericClass::Single);
    }
    tags.guest_class.as_deref().and_then(NumericClass::from_name)
}
