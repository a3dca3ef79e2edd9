//! Call marshaling in both directions
//!
//! Arguments are converted one by one; a slot without a conversion rule
//! becomes the target runtime's empty value and is counted. Structural
//! failures abort the call before anything is dispatched. Results are
//! returned whole or not at all.

use super::request::{CallRequest, HostArg, HostCall};
use super::InteropStats;
use crate::config::ConvertOptions;
use crate::convert::{GuestToHost, HostToGuest};
use crate::core::{GuestValue, HostValue};
use crate::errors::{BridgeError, ErrorKind, Result};
use crate::logging::{log_call, log_call_fault, log_call_return};
use crate::runtime::{GuestEngine, HostRuntime};

#[derive(Debug, Clone, Default)]
pub struct Marshaler {
    to_host: GuestToHost,
    to_guest: HostToGuest,
    stats: InteropStats,
}

impl Marshaler {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            to_host: GuestToHost::new(options),
            to_guest: HostToGuest::new(options),
            stats: InteropStats::default(),
        }
    }

    #[inline]
    pub fn stats(&self) -> InteropStats {
        self.stats
    }

    /// Calls a vector-runtime function with matrix-runtime arguments.
    ///
    /// Keyword arguments are bound by name on the host side. With `nout > 1`
    /// the host must return a list holding at least `nout` values.
    pub fn invoke_host<H: HostRuntime + ?Sized>(
        &mut self,
        host: &mut H,
        request: &CallRequest<GuestValue>,
    ) -> Result<Vec<GuestValue>> {
        let function = request.function();
        log_call(function, request.positional().len(), request.named_arguments().len(), request.nout());

        let call = self.host_call(request).map_err(|e| self.marshaling_failed(e, function))?;

        self.stats.calls_made += 1;
        let result = host.eval_call(&call).map_err(|message| {
            log_call_fault(function, &message);
            BridgeError::remote(function, message)
        })?;

        let outputs = match request.nout() {
            0 => Vec::new(),
            1 => vec![result],
            nout => match result {
                HostValue::List(items) if items.len() >= nout => items.into_iter().take(nout).collect(),
                other => {
                    let available = match &other {
                        HostValue::List(items) => items.len(),
                        _ => 1,
                    };
                    return Err(self.output_count(function, nout, available));
                }
            },
        };

        let converted = outputs
            .iter()
            .enumerate()
            .map(|(i, value)| {
                self.guest_slot(value)
                    .map_err(|e| e.with_context(format!("output {}", i + 1)))
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| self.marshaling_failed(e, function))?;

        log_call_return(function, converted.len());
        Ok(converted)
    }

    /// Calls a matrix-runtime function with vector-runtime arguments.
    ///
    /// Keyword arguments are flattened into `'name', value` pairs after the
    /// positional arguments. Exactly `nout` outputs are read back.
    pub fn invoke_guest<G: GuestEngine + ?Sized>(
        &mut self,
        engine: &mut G,
        request: &CallRequest<HostValue>,
    ) -> Result<Vec<HostValue>> {
        let function = request.function();
        log_call(function, request.positional().len(), request.named_arguments().len(), request.nout());

        let args = self.guest_args(request).map_err(|e| self.marshaling_failed(e, function))?;

        self.stats.calls_made += 1;
        let outputs = engine.call_function(function, &args, request.nout()).map_err(|message| {
            log_call_fault(function, &message);
            BridgeError::remote(function, message)
        })?;

        let nout = request.nout();
        if outputs.len() < nout {
            return Err(self.output_count(function, nout, outputs.len()));
        }

        let converted = outputs[..nout]
            .iter()
            .enumerate()
            .map(|(i, value)| {
                self.host_slot(value)
                    .map_err(|e| e.with_context(format!("output {}", i + 1)))
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| self.marshaling_failed(e, function))?;

        log_call_return(function, converted.len());
        Ok(converted)
    }

    fn host_call(&mut self, request: &CallRequest<GuestValue>) -> Result<HostCall> {
        let mut args = Vec::with_capacity(request.arity());

        for (i, value) in request.positional().iter().enumerate() {
            let value = self
                .host_slot(value)
                .map_err(|e| e.with_context(format!("argument {}", i + 1)))?;
            args.push(HostArg::positional(value));
        }
        for (name, value) in request.named_arguments().iter() {
            let value = self
                .host_slot(value)
                .map_err(|e| e.with_context(format!("argument '{}'", name)))?;
            args.push(HostArg::named(name, value));
        }

        Ok(HostCall {
            function: request.function().to_string(),
            args,
        })
    }

    fn guest_args(&mut self, request: &CallRequest<HostValue>) -> Result<Vec<GuestValue>> {
        let mut args = Vec::with_capacity(request.positional().len() + 2 * request.named_arguments().len());

        for (i, value) in request.positional().iter().enumerate() {
            let value = self
                .guest_slot(value)
                .map_err(|e| e.with_context(format!("argument {}", i + 1)))?;
            args.push(value);
        }
        for (name, value) in request.named_arguments().iter() {
            let value = self
                .guest_slot(value)
                .map_err(|e| e.with_context(format!("argument '{}'", name)))?;
            args.push(GuestValue::string(name));
            args.push(value);
        }

        Ok(args)
    }

    fn host_slot(&mut self, value: &GuestValue) -> Result<HostValue> {
        Ok(match self.to_host.convert_lossy(value)? {
            Some(converted) => converted,
            None => {
                self.stats.unsupported_slots += 1;
                HostValue::Null
            }
        })
    }

    fn guest_slot(&mut self, value: &HostValue) -> Result<GuestValue> {
        Ok(match self.to_guest.convert_lossy(value)? {
            Some(converted) => converted,
            None => {
                self.stats.unsupported_slots += 1;
                GuestValue::empty()
            }
        })
    }

    fn marshaling_failed(&mut self, error: BridgeError, function: &str) -> BridgeError {
        self.stats.marshaling_errors += 1;
        error.with_context(format!("call to '{}'", function))
    }

    fn output_count(&mut self, function: &str, requested: usize, available: usize) -> BridgeError {
        self.stats.marshaling_errors += 1;
        BridgeError::new(ErrorKind::OutputCount {
            function: function.to_string(),
            requested,
            available,
        })
    }
}
