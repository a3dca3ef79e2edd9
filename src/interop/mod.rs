//! Interoperability - cross-runtime function calls
//!
//! Architecture:
//! - `request.rs` - call descriptors (`CallRequest`, `NamedArguments`, `HostCall`)
//! - `marshal.rs` - argument/result conversion around a dispatched call
//! - `entry.rs` - decoding of calls issued from the matrix runtime

mod entry;
mod marshal;
mod request;

pub use entry::{decode, dispatch};
pub use marshal::Marshaler;
pub use request::{CallRequest, HostArg, HostCall, NamedArguments};

/// Per-marshaler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteropStats {
    /// Calls actually dispatched to a runtime.
    pub calls_made: usize,
    /// Calls abandoned because an argument or result failed to convert.
    pub marshaling_errors: usize,
    /// Slots replaced with an empty value for lack of a conversion rule.
    pub unsupported_slots: usize,
}
