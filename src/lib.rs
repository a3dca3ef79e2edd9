//! numbridge - value conversion and call marshaling between a vector
//! runtime (plain vectors, named lists) and a matrix runtime (N-D arrays,
//! cells, structs).

// Core modules
pub mod core;
pub mod convert;
pub mod interop;
pub mod runtime;
pub mod session;

// Infrastructure
pub mod config;
pub mod errors;
pub mod logging;

// Re-export commonly used items
pub use crate::core::{
    ClassTags, Complex, GuestArray, GuestClass, GuestNumeric, GuestStruct, GuestValue, Handle,
    HostArray, HostValue, NumericClass, NumericData, Opaque, Record, Shape, ValueKind,
};
pub use config::{BridgeConfig, ConvertOptions, SessionConfig};
pub use convert::{sanitize_field_name, to_guest, to_host, GuestToHost, HostToGuest};
pub use errors::{BridgeError, ErrorKind, Result};
pub use interop::{CallRequest, HostArg, HostCall, InteropStats, Marshaler, NamedArguments};
pub use logging::{init_logging, LogConfig, LogFormat, LogOutput};
pub use runtime::{
    CallArgs, EngineFactory, GuestEngine, GuestWorkspace, HostInterpreter, HostRuntime, Scope,
    WorkspaceFactory,
};
pub use session::{
    close_session, default_session, evaluate_text, get_variable, invoke_guest_function,
    invoke_host_function, open_session, set_default_session, set_variable, SessionHandle, SessionId,
};
