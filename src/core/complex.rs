use std::fmt;

/// Complex element with separate real and imaginary planes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    #[inline]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Splits a slice into its real and imaginary planes.
    pub fn split(values: &[Complex]) -> (Vec<f64>, Vec<f64>) {
        values.iter().map(|c| (c.re, c.im)).unzip()
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0.0 {
            write!(f, "{}-{}i", self.re, -self.im)
        } else {
            write!(f, "{}+{}i", self.re, self.im)
        }
    }
}
