//! Maximum load factor configuration.

use core::fmt;

/// Upper bound on `len / table_size` that growth maintains. Fixed when a
/// set is constructed.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct LoadFactor(f64);

impl LoadFactor {
    pub const DEFAULT: LoadFactor = LoadFactor(0.7);

    /// Accepts any finite value in `(0.0, 1.0]`. Larger values would let the
    /// key count outgrow the bucket count.
    pub fn new(value: f64) -> Result<Self, InvalidLoadFactor> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(LoadFactor(value))
        } else {
            Err(InvalidLoadFactor(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for LoadFactor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for LoadFactor {
    type Error = InvalidLoadFactor;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        LoadFactor::new(value)
    }
}

/// A load factor outside `(0.0, 1.0]`, or not finite.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InvalidLoadFactor(f64);

impl InvalidLoadFactor {
    /// The rejected value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for InvalidLoadFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "max load factor must be finite and in (0, 1], got {}", self.0)
    }
}

impl std::error::Error for InvalidLoadFactor {}
