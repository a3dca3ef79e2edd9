//! Interpreter sessions
//!
//! Every entry point takes an explicit `Option<&SessionHandle>`. `None`
//! resolves to the process-wide default session, the one most recently
//! opened with `make_default`. Closing that session clears the default.
//!
//! A handle serializes access to its engine through a mutex, so handles
//! may be shared between threads; each call into the engine holds the lock
//! for its whole duration.

use crate::config::{BridgeConfig, ConvertOptions};
use crate::convert::{GuestToHost, HostToGuest};
use crate::core::{GuestValue, Handle, HostValue, Opaque};
use crate::errors::{BridgeError, ErrorKind, Result};
use crate::interop::{CallRequest, InteropStats, Marshaler, NamedArguments};
use crate::logging::{log_default_session, log_session_close, log_session_open};
use crate::runtime::{EngineFactory, GuestEngine, HostRuntime, Scope};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

static DEFAULT_SESSION: Lazy<Mutex<Option<SessionHandle>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

struct SessionState {
    /// `None` once closed.
    engine: Option<Box<dyn GuestEngine + Send>>,
    identifier: String,
    options: ConvertOptions,
    marshaler: Marshaler,
}

#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    inner: Arc<Mutex<SessionState>>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("identifier", &state.identifier)
            .field("open", &state.engine.is_some())
            .finish()
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionHandle {}

impl SessionHandle {
    /// Wraps an already running engine. The handle is not installed as
    /// the default session.
    pub fn from_engine(
        engine: Box<dyn GuestEngine + Send>,
        identifier: impl Into<String>,
        options: ConvertOptions,
    ) -> Self {
        Self {
            id: SessionId::next(),
            inner: Arc::new(Mutex::new(SessionState {
                engine: Some(engine),
                identifier: identifier.into(),
                options,
                marshaler: Marshaler::new(options),
            })),
        }
    }

    #[inline]
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identifier(&self) -> String {
        self.inner.lock().identifier.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().engine.is_some()
    }

    pub fn stats(&self) -> InteropStats {
        self.inner.lock().marshaler.stats()
    }

    /// The session as an opaque vector-runtime value.
    pub fn to_host(&self) -> HostValue {
        HostValue::Opaque(Opaque {
            label: Opaque::GUEST_SESSION.to_string(),
            handle: Handle::Session(self.id.as_u64()),
        })
    }

    fn with_engine<T>(
        &self,
        f: impl FnOnce(&mut (dyn GuestEngine + Send), &mut Marshaler, ConvertOptions) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let engine = state.engine.as_mut().ok_or_else(BridgeError::session_unavailable)?;
        f(&mut **engine, &mut state.marshaler, state.options)
    }
}

/// Starts an engine for `config.session.identifier`.
///
/// Fails with `CannotStart` when the factory has no engine for the
/// identifier. With `make_default` the new session replaces the default.
pub fn open_session<F: EngineFactory + ?Sized>(factory: &F, config: &BridgeConfig) -> Result<SessionHandle> {
    let identifier = config.session.identifier.as_str();
    let engine = factory.open(identifier).ok_or_else(|| {
        BridgeError::new(ErrorKind::CannotStart {
            identifier: identifier.to_string(),
        })
    })?;

    let handle = SessionHandle::from_engine(engine, identifier, config.convert);
    if config.session.make_default {
        set_default_session(Some(handle.clone()));
    }
    log_session_open(handle.id.as_u64(), identifier, config.session.make_default);
    Ok(handle)
}

/// Closes the engine and returns its status code. Clears the default
/// session when it is the one being closed.
pub fn close_session(session: Option<&SessionHandle>) -> Result<i32> {
    let handle = resolve(session)?;

    let engine = handle.inner.lock().engine.take();
    let mut engine = engine.ok_or_else(BridgeError::session_unavailable)?;
    let status = engine.close();

    {
        let mut default = DEFAULT_SESSION.lock();
        if default.as_ref().map(SessionHandle::id) == Some(handle.id) {
            *default = None;
            log_default_session(None);
        }
    }

    log_session_close(handle.id.as_u64(), status);
    Ok(status)
}

pub fn default_session() -> Option<SessionHandle> {
    DEFAULT_SESSION.lock().clone()
}

/// Installs `session` as the default and returns the previous one.
pub fn set_default_session(session: Option<SessionHandle>) -> Option<SessionHandle> {
    log_default_session(session.as_ref().map(|s| s.id.as_u64()));
    std::mem::replace(&mut *DEFAULT_SESSION.lock(), session)
}

fn resolve(session: Option<&SessionHandle>) -> Result<SessionHandle> {
    match session {
        Some(handle) => Ok(handle.clone()),
        None => default_session().ok_or_else(BridgeError::session_unavailable),
    }
}

/// Passes a raw command string to the engine.
pub fn evaluate_text(session: Option<&SessionHandle>, text: &str) -> Result<i32> {
    resolve(session)?.with_engine(|engine, _, _| Ok(engine.eval_text(text)))
}

/// Fetches variables from `scope`.
///
/// `convert[i]` selects conversion for `names[i]`; names past the end of
/// `convert` are converted. Unconverted values come back as opaque
/// `GuestReference` handles.
pub fn get_variable(
    session: Option<&SessionHandle>,
    names: &[&str],
    scope: Scope,
    convert: &[bool],
) -> Result<Vec<HostValue>> {
    resolve(session)?.with_engine(|engine, _, options| {
        let converter = GuestToHost::new(options);
        names
            .iter()
            .enumerate()
            .map(|(i, &name)| {
                let value = engine.get_variable(name, scope).ok_or_else(|| {
                    BridgeError::new(ErrorKind::UndefinedVariable {
                        name: name.to_string(),
                    })
                })?;
                if convert.get(i).copied().unwrap_or(true) {
                    converter
                        .convert_lossy(&value)
                        .map(|v| v.unwrap_or(HostValue::Null))
                        .map_err(|e| e.with_context(format!("variable '{}'", name)))
                } else {
                    Ok(HostValue::Opaque(Opaque::guest_reference(value)))
                }
            })
            .collect()
    })
}

/// Converts and stores each value, returning one status code per name.
/// A value without a conversion rule is not written and reports status 1.
pub fn set_variable(
    session: Option<&SessionHandle>,
    names: &[&str],
    values: &[HostValue],
    scope: Scope,
) -> Result<Vec<i32>> {
    if names.len() != values.len() {
        return Err(BridgeError::new(ErrorKind::LengthMismatch {
            names: names.len(),
            values: values.len(),
        }));
    }

    resolve(session)?.with_engine(|engine, _, options| {
        let converter = HostToGuest::new(options);
        let mut statuses = Vec::with_capacity(names.len());
        for (&name, value) in names.iter().zip(values) {
            let converted = converter
                .convert_lossy(value)
                .map_err(|e| e.with_context(format!("variable '{}'", name)))?;
            statuses.push(match converted {
                Some(guest) => engine.put_variable(name, scope, guest),
                None => 1,
            });
        }
        Ok(statuses)
    })
}

/// Calls a matrix-runtime function with positional arguments only.
pub fn invoke_guest_function(
    session: Option<&SessionHandle>,
    name: &str,
    positional: &[HostValue],
    nout: usize,
) -> Result<Vec<HostValue>> {
    let request = CallRequest::new(name, nout).args(positional.iter().cloned());
    resolve(session)?.with_engine(|engine, marshaler, _| marshaler.invoke_guest(engine, &request))
}

/// Calls a vector-runtime function on behalf of the matrix runtime.
///
/// `named` is the raw `name, value, ...` sequence; an odd length fails
/// before anything is converted or called.
pub fn invoke_host_function<H: HostRuntime + ?Sized>(
    host: &mut H,
    marshaler: &mut Marshaler,
    name: &str,
    positional: &[GuestValue],
    named: &[GuestValue],
    nout: usize,
) -> Result<Vec<GuestValue>> {
    let named = NamedArguments::from_guest_slice(named)?;
    let request = CallRequest::new(name, nout)
        .args(positional.iter().cloned())
        .with_named(named);
    marshaler.invoke_host(host, &request)
}
