//! Call descriptors

use crate::core::{GuestArray, GuestValue, HostValue};
use crate::errors::{BridgeError, ErrorKind, Result};

/// Keyword arguments in call order. Names are kept as given.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArguments<V> {
    pairs: Vec<(String, V)>,
}

impl<V> Default for NamedArguments<V> {
    fn default() -> Self {
        Self { pairs: Vec::new() }
    }
}

impl<V> NamedArguments<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<N: Into<String>>(pairs: impl IntoIterator<Item = (N, V)>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: V) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: V) {
        self.pairs.push((name.into(), value));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn into_pairs(self) -> Vec<(String, V)> {
        self.pairs
    }
}

impl NamedArguments<GuestValue> {
    /// Decodes a flat `name, value, name, value, ...` sequence.
    ///
    /// Fails with `OddNamedArgumentArity` for an odd element count and
    /// `InvalidArgumentName` (1-based slot) when a name is not a character row.
    pub fn from_guest_slice(values: &[GuestValue]) -> Result<Self> {
        if values.len() % 2 != 0 {
            return Err(BridgeError::new(ErrorKind::OddNamedArgumentArity {
                count: values.len(),
            }));
        }

        let mut named = Self::new();
        for (i, pair) in values.chunks_exact(2).enumerate() {
            let name = pair[0]
                .as_string()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| BridgeError::new(ErrorKind::InvalidArgumentName { index: 2 * i + 1 }))?;
            named.push(name, pair[1].clone());
        }
        Ok(named)
    }

    pub fn from_guest_cell(cell: &GuestArray<GuestValue>) -> Result<Self> {
        Self::from_guest_slice(&cell.data)
    }
}

/// One cross-runtime invocation: function, positional arguments, keyword
/// arguments and the number of outputs to read back.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest<V> {
    function: String,
    positional: Vec<V>,
    named: NamedArguments<V>,
    nout: usize,
}

impl<V> CallRequest<V> {
    pub fn new(function: impl Into<String>, nout: usize) -> Self {
        Self {
            function: function.into(),
            positional: Vec::new(),
            named: NamedArguments::new(),
            nout,
        }
    }

    pub fn arg(mut self, value: V) -> Self {
        self.positional.push(value);
        self
    }

    pub fn args(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.positional.extend(values);
        self
    }

    pub fn named(mut self, name: impl Into<String>, value: V) -> Self {
        self.named.push(name, value);
        self
    }

    pub fn with_named(mut self, named: NamedArguments<V>) -> Self {
        self.named = named;
        self
    }

    #[inline]
    pub fn function(&self) -> &str {
        &self.function
    }

    #[inline]
    pub fn positional(&self) -> &[V] {
        &self.positional
    }

    #[inline]
    pub fn named_arguments(&self) -> &NamedArguments<V> {
        &self.named
    }

    #[inline]
    pub fn nout(&self) -> usize {
        self.nout
    }

    /// Positional count plus named-pair count.
    #[inline]
    pub fn arity(&self) -> usize {
        self.positional.len() + self.named.len()
    }
}

/// A call expression as the vector runtime evaluates it.
#[derive(Debug, Clone, PartialEq)]
pub struct HostCall {
    pub function: String,
    pub args: Vec<HostArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostArg {
    /// Keyword the runtime binds this slot by; `None` for positional.
    pub name: Option<String>,
    pub value: HostValue,
}

impl HostArg {
    pub fn positional(value: HostValue) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: HostValue) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

impl HostCall {
    pub fn positional_count(&self) -> usize {
        self.args.iter().filter(|a| a.name.is_none()).count()
    }

    pub fn named_count(&self) -> usize {
        self.args.len() - self.positional_count()
    }
}
