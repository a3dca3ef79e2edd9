//! Runtime boundary
//!
//! The bridge never talks to an interpreter directly. A matrix-runtime
//! engine sits behind [`GuestEngine`], the vector runtime behind
//! [`HostRuntime`]. Both report faults as plain message strings; the
//! marshaler turns them into `RemoteEvaluation` errors.
//!
//! `GuestWorkspace` and `HostInterpreter` are small in-process runtimes
//! implementing these traits.

mod guest;
mod host;

pub use guest::{GuestFn, GuestWorkspace, WorkspaceFactory};
pub use host::{CallArgs, HostFn, HostInterpreter};

use crate::core::{GuestValue, HostValue};
use crate::interop::HostCall;
use std::fmt;

/// Variable workspace addressed by `get_variable` and `set_variable`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    #[default]
    Base,
    Caller,
    Global,
}

impl Scope {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "base" => Some(Self::Base),
            "caller" => Some(Self::Caller),
            "global" => Some(Self::Global),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Caller => "caller",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A live matrix-runtime interpreter.
///
/// Status codes follow the engine convention: `0` is success, anything
/// else is failure.
pub trait GuestEngine {
    /// Runs a raw command string. No values cross the boundary.
    fn eval_text(&mut self, text: &str) -> i32;

    fn get_variable(&self, name: &str, scope: Scope) -> Option<GuestValue>;

    fn put_variable(&mut self, name: &str, scope: Scope, value: GuestValue) -> i32;

    /// Calls `name` with error trapping. A fault inside the call comes
    /// back as `Err(message)`; the engine stays usable.
    fn call_function(
        &mut self,
        name: &str,
        args: &[GuestValue],
        nout: usize,
    ) -> std::result::Result<Vec<GuestValue>, String>;

    fn close(&mut self) -> i32;
}

/// Starts engines from an identifier (the engine start command).
pub trait EngineFactory {
    /// `None` when no engine can be started for `identifier`.
    fn open(&self, identifier: &str) -> Option<Box<dyn GuestEngine + Send>>;
}

impl<F> EngineFactory for F
where
    F: Fn(&str) -> Option<Box<dyn GuestEngine + Send>>,
{
    fn open(&self, identifier: &str) -> Option<Box<dyn GuestEngine + Send>> {
        self(identifier)
    }
}

/// The vector runtime as seen by the marshaler.
pub trait HostRuntime {
    /// Evaluates one call expression with error trapping. Several outputs
    /// are returned as a list.
    fn eval_call(&mut self, call: &HostCall) -> std::result::Result<HostValue, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_names() {
        assert_eq!(Scope::parse("base"), Some(Scope::Base));
        assert_eq!(Scope::parse(" Global "), Some(Scope::Global));
        assert_eq!(Scope::parse("caller"), Some(Scope::Caller));
        assert_eq!(Scope::parse("local"), None);
        assert_eq!(Scope::default().to_string(), "base");
    }

    #[test]
    fn test_closure_factory() {
        let factory = |identifier: &str| -> Option<Box<dyn GuestEngine + Send>> {
            (identifier == "ok").then(|| Box::new(GuestWorkspace::new()) as Box<dyn GuestEngine + Send>)
        };
        assert!(factory.open("ok").is_some());
        assert!(factory.open("matlab -nodesktop").is_none());
    }
}
