//! Record field names for the matrix runtime
//!
//! The matrix runtime uses `.` to address struct fields, so a name
//! containing one cannot be declared. Every `.` becomes `_`.

use std::borrow::Cow;

const FIELD_SEPARATOR: char = '.';
const REPLACEMENT: char = '_';

/// Returns a legal field name for `name`. The input is never modified;
/// names without a separator are borrowed as-is.
pub fn sanitize_field_name(name: &str) -> Cow<'_, str> {
    if name.contains(FIELD_SEPARATOR) {
        Cow::Owned(name.replace(FIELD_SEPARATOR, &REPLACEMENT.to_string()))
    } else {
        Cow::Borrowed(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_separator_is_replaced() {
        assert_eq!(sanitize_field_name("a.b.c"), "a_b_c");
        assert_eq!(sanitize_field_name(".lead"), "_lead");
        assert_eq!(sanitize_field_name("trail."), "trail_");
        assert_eq!(sanitize_field_name("a..b"), "a__b");
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize_field_name("na.rm").into_owned();
        assert_eq!(sanitize_field_name(&once), once);
        assert!(!once.contains(FIELD_SEPARATOR));
    }

    #[test]
    fn test_clean_names_are_borrowed() {
        let name = String::from("a_b_c");
        assert!(matches!(sanitize_field_name(&name), Cow::Borrowed(_)));
        assert_eq!(name, "a_b_c");
    }

    #[test]
    fn test_source_is_untouched() {
        let name = String::from("x.y");
        let clean = sanitize_field_name(&name);
        assert_eq!(clean, "x_y");
        assert_eq!(name, "x.y");
    }
}
