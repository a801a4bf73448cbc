use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------      Points       -----------------------------------------------------------
/// A quantity of loyalty points.
///
/// Stored as an integer number of centipoints so that ledger arithmetic is exact. The upstream accrual service and
/// the REST API exchange points as decimal numbers, so (de)serialization goes through `f64` with two digits of
/// precision.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Points(i64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, AddAssign, add_assign);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Mul<i64> for Points {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in points: {0}")]
pub struct PointsConversionError(String);

impl From<i64> for Points {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Points {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Points {}

impl TryFrom<f64> for Points {
    type Error = PointsConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PointsConversionError(format!("{value} is not a finite number")));
        }
        let centi = (value * 100.0).round();
        if centi.abs() > i64::MAX as f64 {
            return Err(PointsConversionError(format!("{value} is too large to convert to Points")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(centi as i64))
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let points = self.0 as f64 / 100.0;
        write!(f, "{points:0.2}pt")
    }
}

impl Points {
    pub const ZERO: Points = Points(0);

    /// The raw value in centipoints.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_points(points: i64) -> Self {
        Self(points * 100)
    }

    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_decimal())
        }
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Points::try_from(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic_is_exact() {
        let a = Points::from_points(5);
        let b = Points::from(25); // 0.25pt
        assert_eq!(a + b, Points::from(525));
        assert_eq!(a - b, Points::from(475));
        assert_eq!(-b, Points::from(-25));
        assert_eq!([a, b, b].into_iter().sum::<Points>(), Points::from(550));
    }

    #[test]
    fn whole_points_serialize_as_integers() {
        assert_eq!(serde_json::to_string(&Points::from_points(500)).unwrap(), "500");
        assert_eq!(serde_json::to_string(&Points::from(72998)).unwrap(), "729.98");
    }

    #[test]
    fn deserializes_from_decimal_numbers() {
        let p: Points = serde_json::from_str("729.98").unwrap();
        assert_eq!(p, Points::from(72998));
        let p: Points = serde_json::from_str("500").unwrap();
        assert_eq!(p, Points::from_points(500));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(Points::try_from(f64::NAN).is_err());
        assert!(Points::try_from(f64::INFINITY).is_err());
    }
}
