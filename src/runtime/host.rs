//! In-process vector runtime

use super::HostRuntime;
use crate::core::{HostValue, ValueKind};
use crate::interop::HostCall;
use std::collections::HashMap;
use std::fmt;

pub type HostFn = Box<dyn Fn(&CallArgs) -> Result<HostValue, String> + Send + Sync>;

/// Arguments of one call, split into positional and keyword parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<HostValue>,
    named: Vec<(String, HostValue)>,
}

impl CallArgs {
    pub fn from_call(call: &HostCall) -> Self {
        let mut args = Self::default();
        for arg in &call.args {
            match &arg.name {
                Some(name) => args.named.push((name.clone(), arg.value.clone())),
                None => args.positional.push(arg.value.clone()),
            }
        }
        args
    }

    #[inline]
    pub fn positional(&self) -> &[HostValue] {
        &self.positional
    }

    pub fn named(&self, name: &str) -> Option<&HostValue> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// All argument values in call order, keyword arguments last.
    pub fn values(&self) -> impl Iterator<Item = &HostValue> {
        self.positional.iter().chain(self.named.iter().map(|(_, v)| v))
    }

    /// Matches arguments to `params`: keywords by exact name first, then
    /// positional arguments fill the remaining parameters in order.
    pub fn bind(&self, params: &[&str]) -> Result<Vec<Option<HostValue>>, String> {
        let mut bound: Vec<Option<HostValue>> = vec![None; params.len()];

        for (name, value) in &self.named {
            let slot = params
                .iter()
                .position(|p| *p == name.as_str())
                .ok_or_else(|| format!("unused argument ({} = {})", name, value.type_name()))?;
            if bound[slot].is_some() {
                return Err(format!("formal argument \"{}\" matched by multiple actual arguments", name));
            }
            bound[slot] = Some(value.clone());
        }

        let mut free = bound.iter_mut().filter(|slot| slot.is_none());
        for value in &self.positional {
            match free.next() {
                Some(slot) => *slot = Some(value.clone()),
                None => return Err(format!("unused argument ({})", value.type_name())),
            }
        }

        Ok(bound)
    }
}

/// Function registry standing in for the vector runtime's evaluator.
pub struct HostInterpreter {
    functions: HashMap<String, HostFn>,
}

impl fmt::Debug for HostInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HostInterpreter").field("functions", &names).finish()
    }
}

impl Default for HostInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl HostInterpreter {
    /// Interpreter with the builtin functions registered.
    pub fn new() -> Self {
        let mut interp = Self::empty();
        interp.register("sum", builtin_sum);
        interp.register("length", builtin_length);
        interp.register("c", builtin_c);
        interp.register("list", builtin_list);
        interp.register("identity", builtin_identity);
        interp
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registers `f` under `name`, replacing any previous definition.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&CallArgs) -> Result<HostValue, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl HostRuntime for HostInterpreter {
    fn eval_call(&mut self, call: &HostCall) -> Result<HostValue, String> {
        let f = self
            .functions
            .get(&call.function)
            .ok_or_else(|| format!("could not find function \"{}\"", call.function))?;
        f(&CallArgs::from_call(call))
    }
}

fn numeric(value: &HostValue) -> Result<Vec<f64>, String> {
    value
        .to_reals()
        .ok_or_else(|| format!("invalid 'type' ({}) of argument", value.type_name()))
}

fn builtin_sum(args: &CallArgs) -> Result<HostValue, String> {
    let mut total = 0.0;
    for value in args.values() {
        total += numeric(value)?.iter().sum::<f64>();
    }
    Ok(HostValue::scalar(total))
}

fn builtin_length(args: &CallArgs) -> Result<HostValue, String> {
    let x = required(args, "x")?;
    Ok(HostValue::integer(vec![x.len() as i32]))
}

/// Concatenates atomic vectors. Text wins over numbers; dimensions and
/// class tags are dropped.
fn builtin_c(args: &CallArgs) -> Result<HostValue, String> {
    let values: Vec<&HostValue> = args.values().filter(|v| !v.is_null()).collect();
    if values.is_empty() {
        return Ok(HostValue::Null);
    }

    if values.iter().any(|v| v.kind() == ValueKind::Character) {
        let mut out = Vec::new();
        for value in values {
            match value {
                HostValue::Character(a) => out.extend(a.data.iter().cloned()),
                other => out.extend(numeric(other)?.iter().map(|x| x.to_string())),
            }
        }
        return Ok(HostValue::strings(out));
    }

    if values.iter().all(|v| v.kind() == ValueKind::Logical) {
        let data = values
            .iter()
            .filter_map(|v| match v {
                HostValue::Logical(a) => Some(a.data.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect();
        return Ok(HostValue::logical(data));
    }

    let mut out = Vec::new();
    for value in values {
        out.extend(numeric(value)?);
    }
    Ok(HostValue::real(out))
}

fn builtin_list(args: &CallArgs) -> Result<HostValue, String> {
    Ok(HostValue::List(args.values().cloned().collect()))
}

fn builtin_identity(args: &CallArgs) -> Result<HostValue, String> {
    required(args, "x")
}

/// Binds a single required parameter.
fn required(args: &CallArgs, param: &str) -> Result<HostValue, String> {
    args.bind(&[param])?
        .pop()
        .flatten()
        .ok_or_else(|| format!("argument \"{}\" is missing, with no default", param))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interop::HostArg;

    fn call(function: &str, args: Vec<HostArg>) -> HostCall {
        HostCall {
            function: function.to_string(),
            args,
        }
    }

    #[test]
    fn test_sum_builtin() {
        let mut interp = HostInterpreter::new();
        let result = interp
            .eval_call(&call("sum", vec![HostArg::positional(HostValue::real(vec![1.0, 2.0, 3.0]))]))
            .unwrap();
        assert_eq!(result, HostValue::scalar(6.0));
    }

    #[test]
    fn test_unknown_function_faults() {
        let mut interp = HostInterpreter::new();
        let message = interp.eval_call(&call("nosuch", Vec::new())).unwrap_err();
        assert!(message.contains("nosuch"));
    }

    #[test]
    fn test_bind_keywords_before_positions() {
        let args = CallArgs::from_call(&call(
            "f",
            vec![
                HostArg::positional(HostValue::scalar(1.0)),
                HostArg::named("tol", HostValue::scalar(0.01)),
            ],
        ));
        let bound = args.bind(&["tol", "x"]).unwrap();
        assert_eq!(bound, vec![Some(HostValue::scalar(0.01)), Some(HostValue::scalar(1.0))]);
    }

    #[test]
    fn test_bind_rejects_unknown_keyword() {
        let args = CallArgs::from_call(&call("f", vec![HostArg::named("bogus", HostValue::Null)]));
        assert!(args.bind(&["x"]).unwrap_err().contains("bogus"));
    }

    #[test]
    fn test_bind_rejects_extra_positionals() {
        let args = CallArgs::from_call(&call(
            "f",
            vec![
                HostArg::positional(HostValue::scalar(1.0)),
                HostArg::positional(HostValue::scalar(2.0)),
            ],
        ));
        assert!(args.bind(&["x"]).is_err());
    }

    #[test]
    fn test_c_and_length() {
        let mut interp = HostInterpreter::new();
        let joined = interp
            .eval_call(&call(
                "c",
                vec![
                    HostArg::positional(HostValue::integer(vec![1, 2])),
                    HostArg::positional(HostValue::scalar(3.5)),
                ],
            ))
            .unwrap();
        assert_eq!(joined, HostValue::real(vec![1.0, 2.0, 3.5]));

        let len = interp
            .eval_call(&call("length", vec![HostArg::positional(joined)]))
            .unwrap();
        assert_eq!(len, HostValue::integer(vec![3]));
    }

    #[test]
    fn test_registered_function_replaces_builtin() {
        let mut interp = HostInterpreter::new();
        interp.register("sum", |_: &CallArgs| Ok(HostValue::scalar(-1.0)));
        assert!(interp.contains("sum"));
        assert_eq!(interp.eval_call(&call("sum", Vec::new())).unwrap(), HostValue::scalar(-1.0));
    }
}
