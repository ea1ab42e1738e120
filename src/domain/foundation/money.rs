//! Monetary amounts in minor currency units.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A non-negative amount in minor currency units (cents, pence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MinorUnits(i64);

impl MinorUnits {
    /// Creates an amount, rejecting negative values.
    pub fn new(amount: i64) -> Result<Self, ValidationError> {
        if amount < 0 {
            return Err(ValidationError::negative("amount", amount));
        }
        Ok(Self(amount))
    }

    /// Returns the raw amount.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for MinorUnits {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MinorUnits> for i64 {
    fn from(value: MinorUnits) -> Self {
        value.0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
