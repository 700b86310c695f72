//! Unit quantities using decimal arithmetic.
//!
//! Stock and sales figures arrive from several systems and are not always
//! whole numbers, so quantities are kept as exact decimals and never rounded.
//! Parsing is deliberately forgiving: anything that is missing or not a
//! number becomes zero (see [`Quantity::parse_or_zero`]). Numbers beyond
//! [`Quantity::LIMIT`] are refused rather than coerced.
//!
//! Arithmetic saturates at the `Decimal` bounds instead of panicking.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from parsing a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity {0} is out of range")]
    OutOfRange(String),
}

/// A quantity of units (stock, sales, targets, allocations).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct Quantity(Decimal);

impl Quantity {
    /// Zero units.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest magnitude accepted from client input: 10^15 units.
    pub const LIMIT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

    /// Wrap a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the quantity is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the quantity is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Clamp negative values to zero.
    #[must_use]
    pub fn non_negative(self) -> Self {
        self.max(Self::ZERO)
    }

    /// Wrap a decimal, refusing magnitudes above [`Quantity::LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::OutOfRange` for values beyond the limit.
    pub fn bounded(value: Decimal) -> Result<Self, QuantityError> {
        if value.abs() > Self::LIMIT {
            return Err(QuantityError::OutOfRange(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parse loosely formatted input.
    ///
    /// Surrounding whitespace is ignored and scientific notation is
    /// accepted. Empty or non-numeric text yields zero.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::OutOfRange` if the text is a number beyond
    /// [`Quantity::LIMIT`] (or beyond what a decimal can hold).
    pub fn parse_or_zero(raw: &str) -> Result<Self, QuantityError> {
        let trimmed = raw.trim();
        if let Ok(value) = Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)) {
            return Self::bounded(value);
        }
        if trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
            return Err(QuantityError::OutOfRange(trimmed.to_string()));
        }
        Ok(Self::ZERO)
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<i32> for Quantity {
    fn from(value: i32) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Quantity {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// Whole quantities go out as JSON integers, fractional ones as floats.
impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let normalized = self.0.normalize();
        if normalized.fract().is_zero() {
            if let Some(whole) = normalized.to_i64() {
                return serializer.serialize_i64(whole);
            }
        }
        serializer.serialize_f64(normalized.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

struct QuantityVisitor;

impl<'de> Visitor<'de> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a quantity (anything non-numeric reads as zero)")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Quantity::bounded(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Quantity::bounded(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Decimal::from_f64(v)
            .ok_or_else(|| QuantityError::OutOfRange(v.to_string()))
            .and_then(Quantity::bounded)
            .map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Quantity::parse_or_zero(v).map_err(E::custom)
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(Quantity::ZERO)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Quantity::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Quantity::ZERO)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(Self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Quantity::ZERO)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Quantity::ZERO)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOO_BIG: &str = "79228162514264337593543950335";

    fn parse(json: &str) -> Result<Quantity, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_parse_or_zero_numbers_and_strings() {
        assert_eq!(Quantity::parse_or_zero("12").unwrap(), Quantity::from(12));
        assert_eq!(
            Quantity::parse_or_zero(" 2.5 ").unwrap(),
            Quantity::new(Decimal::new(25, 1))
        );
        assert_eq!(Quantity::parse_or_zero("1e3").unwrap(), Quantity::from(1000));
    }

    #[test]
    fn test_parse_or_zero_defaults() {
        assert_eq!(Quantity::parse_or_zero("").unwrap(), Quantity::ZERO);
        assert_eq!(Quantity::parse_or_zero("abc").unwrap(), Quantity::ZERO);
        assert_eq!(Quantity::parse_or_zero("n/a").unwrap(), Quantity::ZERO);
    }

    #[test]
    fn test_limit_is_ten_to_the_fifteenth() {
        assert_eq!(Quantity::LIMIT, Decimal::from(1_000_000_000_000_000_i64));
        assert!(Quantity::bounded(Quantity::LIMIT).is_ok());
        assert!(Quantity::bounded(-Quantity::LIMIT).is_ok());
    }

    #[test]
    fn test_out_of_range_numbers_are_refused() {
        assert!(matches!(
            Quantity::parse_or_zero(TOO_BIG),
            Err(QuantityError::OutOfRange(_))
        ));
        assert!(Quantity::parse_or_zero("1e40").is_err());
        assert!(parse(&format!("\"{TOO_BIG}\"")).is_err());
        assert!(parse("10000000000000001").is_err());
        assert!(parse("-1e20").is_err());
        assert!(parse("1e300").is_err());
    }

    #[test]
    fn test_arithmetic_saturates() {
        let big = Quantity::new(Decimal::MAX);
        assert_eq!(big + big, big);
        assert_eq!(Quantity::new(Decimal::MIN) - big, Quantity::new(Decimal::MIN));

        let mut total = big;
        total += Quantity::from(1);
        assert_eq!(total, big);
        assert_eq!([big, big, big].iter().sum::<Quantity>(), big);
    }

    #[test]
    fn test_fractions_are_not_rounded() {
        let q = parse("0.5").unwrap() + parse("0.25").unwrap();
        assert_eq!(q, Quantity::new(Decimal::new(75, 2)));
    }

    #[test]
    fn test_deserialize_is_lenient() {
        #[derive(Deserialize)]
        struct Row {
            a: Quantity,
            b: Quantity,
            c: Quantity,
            #[serde(default)]
            d: Quantity,
            e: Quantity,
            f: Quantity,
        }

        let row: Row =
            serde_json::from_str(r#"{"a": 3, "b": "4", "c": null, "e": true, "f": {"x": 1}}"#)
                .unwrap();
        assert_eq!(row.a, Quantity::from(3));
        assert_eq!(row.b, Quantity::from(4));
        assert_eq!(row.c, Quantity::ZERO);
        assert_eq!(row.d, Quantity::ZERO);
        assert_eq!(row.e, Quantity::ZERO);
        assert_eq!(row.f, Quantity::ZERO);
    }

    #[test]
    fn test_serialize_whole_as_integer() {
        assert_eq!(serde_json::to_string(&Quantity::from(6)).unwrap(), "6");
        assert_eq!(
            serde_json::to_string(&Quantity::new(Decimal::new(600, 2))).unwrap(),
            "6"
        );
        assert_eq!(
            serde_json::to_string(&Quantity::new(Decimal::new(15, 1))).unwrap(),
            "1.5"
        );
    }

    #[test]
    fn test_non_negative_clamps() {
        assert_eq!(Quantity::from(-3).non_negative(), Quantity::ZERO);
        assert_eq!(Quantity::from(3).non_negative(), Quantity::from(3));
    }
}
