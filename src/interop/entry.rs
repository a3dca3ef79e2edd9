//! Entry point for calls issued from the matrix runtime
//!
//! The raw argument list is `fname, arg1, ..., argN[, {name, value, ...}]`:
//! a one-row character array naming the vector-runtime function, the
//! positional arguments, and optionally a trailing cell of keyword pairs.

use super::marshal::Marshaler;
use super::request::{CallRequest, NamedArguments};
use crate::core::GuestValue;
use crate::errors::{BridgeError, ErrorKind, Result};
use crate::runtime::HostRuntime;

fn invalid(reason: &str) -> BridgeError {
    BridgeError::new(ErrorKind::InvalidEntryCall {
        reason: reason.to_string(),
    })
}

/// Decodes a raw argument list into a call request.
pub fn decode(args: &[GuestValue], nout: usize) -> Result<CallRequest<GuestValue>> {
    let (head, rest) = args
        .split_first()
        .ok_or_else(|| invalid("missing function name"))?;

    let function = head
        .as_string()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| invalid("function name must be a one-row character array"))?;

    let (positional, named) = match rest.split_last() {
        Some((GuestValue::Cell(cell), positional)) => (positional, NamedArguments::from_guest_cell(cell)?),
        _ => (rest, NamedArguments::new()),
    };

    Ok(CallRequest::new(function, nout)
        .args(positional.iter().cloned())
        .with_named(named))
}

/// Decodes `args` and calls the named vector-runtime function.
pub fn dispatch<H: HostRuntime + ?Sized>(
    host: &mut H,
    marshaler: &mut Marshaler,
    args: &[GuestValue],
    nout: usize,
) -> Result<Vec<GuestValue>> {
    let request = decode(args, nout)?;
    marshaler.invoke_host(host, &request)
}
