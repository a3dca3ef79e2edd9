//! In-process matrix runtime
//!
//! A variable workspace, a function registry and a statement evaluator
//! covering what the bridge sends through `eval_text`: assignments,
//! multi-output calls, bare calls and `clear`.

use super::{EngineFactory, GuestEngine, Scope};
use crate::core::{GuestValue, Shape};
use std::collections::HashMap;
use std::fmt;

pub type GuestFn = Box<dyn Fn(&[GuestValue], usize) -> Result<Vec<GuestValue>, String> + Send + Sync>;

pub struct GuestWorkspace {
    base: HashMap<String, GuestValue>,
    global: HashMap<String, GuestValue>,
    functions: HashMap<String, GuestFn>,
    closed: bool,
}

impl fmt::Debug for GuestWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestWorkspace")
            .field("variables", &self.base.len())
            .field("globals", &self.global.len())
            .field("functions", &self.functions.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Default for GuestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestWorkspace {
    pub fn new() -> Self {
        let mut ws = Self {
            base: HashMap::new(),
            global: HashMap::new(),
            functions: HashMap::new(),
            closed: false,
        };
        ws.register("sum", builtin_sum);
        ws.register("size", builtin_size);
        ws.register("numel", builtin_numel);
        ws.register("error", builtin_error);
        ws
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[GuestValue], usize) -> Result<Vec<GuestValue>, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(f));
    }

    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.base.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The top-level workspace is its own caller.
    fn scope(&self, scope: Scope) -> &HashMap<String, GuestValue> {
        match scope {
            Scope::Base | Scope::Caller => &self.base,
            Scope::Global => &self.global,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut HashMap<String, GuestValue> {
        match scope {
            Scope::Base | Scope::Caller => &mut self.base,
            Scope::Global => &mut self.global,
        }
    }

    fn run_statement(&mut self, statement: &str) -> Result<(), String> {
        let mut words = statement.split_whitespace();
        if words.next() == Some("clear") && !statement.contains(|c: char| c == '=' || c == '(') {
            let names: Vec<&str> = words.collect();
            if names.is_empty() {
                self.base.clear();
            } else {
                for name in names {
                    self.base.remove(name);
                }
            }
            return Ok(());
        }

        match split_assignment(statement) {
            Some((lhs, rhs)) => {
                let targets = parse_targets(lhs)?;
                let values = self.eval_expr(rhs, targets.len())?;
                if values.len() < targets.len() {
                    return Err("Too many output arguments.".to_string());
                }
                for (name, value) in targets.into_iter().zip(values) {
                    self.base.insert(name.to_string(), value);
                }
                Ok(())
            }
            None => self.eval_expr(statement, 0).map(|_| ()),
        }
    }

    fn eval_expr(&mut self, expr: &str, nout: usize) -> Result<Vec<GuestValue>, String> {
        let expr = expr.trim();
        if let Some((name, inner)) = split_call(expr) {
            let args = split_top_level(inner, ',')
                .into_iter()
                .filter(|a| !a.trim().is_empty())
                .map(|a| self.eval_atom(a))
                .collect::<Result<Vec<_>, _>>()?;
            return self.call_function(name, &args, nout);
        }
        Ok(vec![self.eval_atom(expr)?])
    }

    fn eval_atom(&mut self, atom: &str) -> Result<GuestValue, String> {
        let atom = atom.trim();

        if let Some(text) = atom.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
            return Ok(GuestValue::string(&text.replace("''", "'")));
        }
        if let Ok(number) = atom.parse::<f64>() {
            return Ok(GuestValue::scalar(number));
        }
        if let Some(body) = atom.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let values = body
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<f64>().map_err(|_| format!("Invalid number '{}'.", s)))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(if values.is_empty() {
                GuestValue::empty()
            } else {
                GuestValue::row(values)
            });
        }
        if split_call(atom).is_some() {
            return self
                .eval_expr(atom, 1)?
                .into_iter()
                .next()
                .ok_or_else(|| "Too many output arguments.".to_string());
        }
        if is_identifier(atom) {
            return self
                .base
                .get(atom)
                .cloned()
                .ok_or_else(|| format!("Undefined function or variable '{}'.", atom));
        }
        Err(format!("Cannot evaluate '{}'.", atom))
    }
}

impl GuestEngine for GuestWorkspace {
    fn eval_text(&mut self, text: &str) -> i32 {
        if self.closed {
            return 1;
        }
        for statement in text
            .split(|c: char| c == ';' || c == '\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            if let Err(message) = self.run_statement(statement) {
                tracing::warn!(target: "session", statement, fault = %message, "statement failed");
                return 1;
            }
        }
        0
    }

    fn get_variable(&self, name: &str, scope: Scope) -> Option<GuestValue> {
        if self.closed {
            return None;
        }
        self.scope(scope).get(name).cloned()
    }

    fn put_variable(&mut self, name: &str, scope: Scope, value: GuestValue) -> i32 {
        if self.closed || !is_identifier(name) {
            return 1;
        }
        self.scope_mut(scope).insert(name.to_string(), value);
        0
    }

    fn call_function(&mut self, name: &str, args: &[GuestValue], nout: usize) -> Result<Vec<GuestValue>, String> {
        if self.closed {
            return Err("Engine is closed.".to_string());
        }
        let f = self
            .functions
            .get(name)
            .ok_or_else(|| format!("Undefined function '{}' for input arguments.", name))?;
        f(args, nout)
    }

    fn close(&mut self) -> i32 {
        if self.closed {
            return 1;
        }
        self.closed = true;
        self.base.clear();
        self.global.clear();
        0
    }
}

/// Starts a `GuestWorkspace` for an empty identifier or one beginning with
/// `workspace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceFactory;

impl EngineFactory for WorkspaceFactory {
    fn open(&self, identifier: &str) -> Option<Box<dyn GuestEngine + Send>> {
        let identifier = identifier.trim();
        if identifier.is_empty() || identifier.starts_with("workspace") {
            Some(Box::new(GuestWorkspace::new()))
        } else {
            None
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits `text` on `sep` outside quotes, brackets and parentheses.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' | '[' if !quoted => depth += 1,
            ')' | ']' if !quoted => depth -= 1,
            c if c == sep && !quoted && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// `lhs = rhs`, ignoring `=` inside quotes and comparisons.
fn split_assignment(statement: &str) -> Option<(&str, &str)> {
    let parts = split_top_level(statement, '=');
    match parts.as_slice() {
        [lhs, rhs] if !lhs.trim().is_empty() && !rhs.trim().is_empty() => Some((lhs.trim(), rhs.trim())),
        _ => None,
    }
}

fn parse_targets(lhs: &str) -> Result<Vec<&str>, String> {
    let names: Vec<&str> = match lhs.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(list) => list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect(),
        None => vec![lhs],
    };
    match names.iter().find(|n| !is_identifier(n)) {
        Some(bad) => Err(format!("Invalid assignment target '{}'.", bad)),
        None if names.is_empty() => Err("Empty assignment target.".to_string()),
        None => Ok(names),
    }
}

/// `name(args)` -> (`name`, `args`).
fn split_call(expr: &str) -> Option<(&str, &str)> {
    let open = expr.find('(')?;
    let name = expr[..open].trim();
    let inner = expr[open + 1..].strip_suffix(')')?;
    is_identifier(name).then_some((name, inner))
}

fn first_arg(args: &[GuestValue]) -> Result<&GuestValue, String> {
    args.first().ok_or_else(|| "Not enough input arguments.".to_string())
}

fn builtin_sum(args: &[GuestValue], _nout: usize) -> Result<Vec<GuestValue>, String> {
    let total = match first_arg(args)? {
        GuestValue::Numeric(n) => n.data.to_f64().iter().sum(),
        GuestValue::Logical(a) => a.data.iter().filter(|&&b| b).count() as f64,
        other => {
            return Err(format!(
                "Invalid data type. Argument of class '{}' must be numeric or logical.",
                other.class_name()
            ))
        }
    };
    Ok(vec![GuestValue::scalar(total)])
}

fn builtin_size(args: &[GuestValue], nout: usize) -> Result<Vec<GuestValue>, String> {
    let dims: Shape = first_arg(args)?.dims();
    if nout <= 1 {
        return Ok(vec![GuestValue::row(dims.dims().iter().map(|&d| d as f64).collect())]);
    }
    Ok((0..nout)
        .map(|i| GuestValue::scalar(dims.dims().get(i).copied().unwrap_or(1) as f64))
        .collect())
}

fn builtin_numel(args: &[GuestValue], _nout: usize) -> Result<Vec<GuestValue>, String> {
    Ok(vec![GuestValue::scalar(first_arg(args)?.numel() as f64)])
}

fn builtin_error(args: &[GuestValue], _nout: usize) -> Result<Vec<GuestValue>, String> {
    Err(args
        .first()
        .and_then(GuestValue::as_string)
        .unwrap_or_else(|| "Unspecified error.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_and_lookup() {
        let mut ws = GuestWorkspace::new();
        assert_eq!(ws.eval_text("x = [1 2 3]; y = x"), 0);
        assert_eq!(ws.get_variable("y", Scope::Base), Some(GuestValue::row(vec![1.0, 2.0, 3.0])));
        assert_eq!(ws.variable_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_multi_output_assignment() {
        let mut ws = GuestWorkspace::new();
        assert_eq!(ws.eval_text("m = [1 2 3]\n[r, c] = size(m)"), 0);
        assert_eq!(ws.get_variable("r", Scope::Base), Some(GuestValue::scalar(1.0)));
        assert_eq!(ws.get_variable("c", Scope::Base), Some(GuestValue::scalar(3.0)));
    }

    #[test]
    fn test_call_result_assignment() {
        let mut ws = GuestWorkspace::new();
        assert_eq!(ws.eval_text("s = sum([4, 5])"), 0);
        assert_eq!(ws.get_variable("s", Scope::Caller), Some(GuestValue::scalar(9.0)));
    }

    #[test]
    fn test_clear() {
        let mut ws = GuestWorkspace::new();
        ws.eval_text("a = 1; b = 2; c = 3");
        assert_eq!(ws.eval_text("clear a b"), 0);
        assert_eq!(ws.variable_names(), vec!["c"]);
        assert_eq!(ws.eval_text("clear"), 0);
        assert!(ws.variable_names().is_empty());
    }

    #[test]
    fn test_failures_return_nonzero() {
        let mut ws = GuestWorkspace::new();
        assert_eq!(ws.eval_text("x = nosuch(1)"), 1);
        assert_eq!(ws.eval_text("error('boom')"), 1);
        assert_eq!(ws.eval_text("y = undefined_name"), 1);
        assert_eq!(ws.eval_text("1x = 2"), 1);
    }

    #[test]
    fn test_error_builtin_message() {
        let mut ws = GuestWorkspace::new();
        let err = ws.call_function("error", &[GuestValue::string("bad input")], 0).unwrap_err();
        assert_eq!(err, "bad input");
    }

    #[test]
    fn test_string_literal_with_separator_characters() {
        let mut ws = GuestWorkspace::new();
        assert_eq!(ws.eval_text("t = 'a=b, it''s'"), 0);
        assert_eq!(ws.get_variable("t", Scope::Base), Some(GuestValue::string("a=b, it's")));
    }

    #[test]
    fn test_global_scope_is_separate() {
        let mut ws = GuestWorkspace::new();
        assert_eq!(ws.put_variable("g", Scope::Global, GuestValue::scalar(1.0)), 0);
        assert_eq!(ws.get_variable("g", Scope::Base), None);
        assert_eq!(ws.get_variable("g", Scope::Global), Some(GuestValue::scalar(1.0)));
        assert_eq!(ws.put_variable("not valid", Scope::Base, GuestValue::empty()), 1);
    }

    #[test]
    fn test_closed_engine_refuses_work() {
        let mut ws = GuestWorkspace::new();
        ws.put_variable("x", Scope::Base, GuestValue::scalar(1.0));
        assert_eq!(ws.close(), 0);
        assert_eq!(ws.close(), 1);
        assert_eq!(ws.get_variable("x", Scope::Base), None);
        assert!(ws.call_function("sum", &[GuestValue::scalar(1.0)], 1).is_err());
    }

    #[test]
    fn test_factory_identifiers() {
        assert!(WorkspaceFactory.open("").is_some());
        assert!(WorkspaceFactory.open("workspace -nojvm").is_some());
        assert!(WorkspaceFactory.open("/opt/other/bin/engine").is_none());
    }
}
