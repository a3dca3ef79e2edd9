//! Value conversion between the two runtimes
//!
//! `GuestToHost` and `HostToGuest` are stateless walkers over the value
//! trees. Both consult [`ConvertOptions`] for cell collapsing, class tags
//! and how to treat values that have no conversion rule.

pub mod fields;
pub mod homogeneity;
pub mod to_guest;
pub mod to_host;

pub use fields::sanitize_field_name;
pub use homogeneity::{CellLayout, Collapsed, PrimitiveClass};
pub use to_guest::HostToGuest;
pub use to_host::GuestToHost;

use crate::config::ConvertOptions;
use crate::core::{GuestValue, HostValue};
use crate::errors::Result;

pub fn to_host(value: &GuestValue, options: &ConvertOptions) -> Result<HostValue> {
    GuestToHost::new(*options).convert(value)
}

pub fn to_guest(value: &HostValue, options: &ConvertOptions) -> Result<GuestValue> {
    HostToGuest::new(*options).convert(value)
}
