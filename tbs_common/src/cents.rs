use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

/// A monetary amount in minor currency units.
///
/// All prices and payment amounts in the system are integer cents. Floating point never
/// touches money.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Cents(i64);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Price for `count` items at this per-item amount. `None` on overflow.
    pub fn times(&self, count: usize) -> Option<Cents> {
        i64::try_from(count).ok().and_then(|n| self.0.checked_mul(n)).map(Cents)
    }
}

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Cents)
            .map_err(|_| CentsConversionError(format!("{value} is too large")))
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Self) -> Self::Output {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Self) -> Self::Output {
        Cents(self.0 - rhs.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Cents::default(), |acc, c| acc + c)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(Cents::from(123_456).to_string(), "1234.56");
        assert_eq!(Cents::from(5).to_string(), "0.05");
    }

    #[test]
    fn times_scales_and_catches_overflow() {
        assert_eq!(Cents::from(2_500).times(4), Some(Cents::from(10_000)));
        assert_eq!(Cents::from(i64::MAX).times(2), None);
    }

    #[test]
    fn serializes_as_a_bare_integer() {
        let as_json = serde_json::to_string(&Cents::from(1500)).unwrap();
        assert_eq!(as_json, "1500");
        let back: Cents = serde_json::from_str(&as_json).unwrap();
        assert_eq!(back, Cents::from(1500));
    }
}
