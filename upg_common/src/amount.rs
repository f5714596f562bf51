use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of decimal places carried by [`Amount`]. The gateway reports amounts as `Decimal{10,4}`.
pub const AMOUNT_SCALE: u32 = 4;
const UNIT: i64 = 10_i64.pow(AMOUNT_SCALE);

//--------------------------------------       Amount        ---------------------------------------------------------
/// A fixed-point currency amount with four decimal places, stored as an integer number of ten-thousandths.
///
/// Amounts travel as decimal strings ("10.00", "0.0000") on both external APIs, so `Amount` parses from and
/// serializes to strings. It also accepts JSON numbers when deserializing.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash)]
#[sqlx(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, SubAssign, sub_assign);
op!(unary Amount, Neg, neg);

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Value cannot be represented as a currency amount: {0}")]
pub struct AmountConversionError(String);

impl Amount {
    /// Creates an amount from its raw value in ten-thousandths of a currency unit.
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    pub fn from_units(units: i64) -> Self {
        Self(units * UNIT)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / UNIT as f64
    }

    /// Divides the amount by a whole quantity, truncating towards zero.
    pub fn per_unit(&self, quantity: i64) -> Self {
        if quantity == 0 {
            return Self::default();
        }
        Self(self.0 / quantity)
    }
}

impl FromStr for Amount {
    type Err = AmountConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || AmountConversionError(s.to_string());
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut parts = digits.splitn(2, '.');
        let whole = parts.next().filter(|w| !w.is_empty()).ok_or_else(err)?;
        if !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let whole = whole.parse::<i64>().map_err(|_| err())?;
        let frac = match parts.next() {
            None => 0,
            Some(f) if f.is_empty() || !f.chars().all(|c| c.is_ascii_digit()) => return Err(err()),
            Some(f) if f.len() <= AMOUNT_SCALE as usize => {
                let padded = format!("{f:0<width$}", width = AMOUNT_SCALE as usize);
                padded.parse::<i64>().map_err(|_| err())?
            },
            // Trailing zeros beyond the supported scale are harmless, anything else would lose precision
            Some(f) => {
                let (kept, rest) = f.split_at(AMOUNT_SCALE as usize);
                if !rest.chars().all(|c| c == '0') {
                    return Err(err());
                }
                kept.parse::<i64>().map_err(|_| err())?
            },
        };
        let value = whole.checked_mul(UNIT).and_then(|w| w.checked_add(frac)).ok_or_else(err)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let scaled = (value * UNIT as f64).round();
        if !scaled.is_finite() || scaled.abs() > i64::MAX as f64 {
            return Err(AmountConversionError(value.to_string()));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(scaled as i64))
    }
}

impl Display for Amount {
    /// Formats with at least two and at most four decimal places, e.g. `10.00`, `12.3456`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let unit = UNIT as u64;
        let frac = format!("{:04}", abs % unit);
        let frac = frac.trim_end_matches('0');
        let frac = format!("{frac:0<2}");
        write!(f, "{sign}{}.{frac}", abs / unit)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StrOrNum {
            Str(String),
            Int(i64),
            Float(f64),
        }
        match StrOrNum::deserialize(deserializer)? {
            StrOrNum::Str(s) => s.parse().map_err(de::Error::custom),
            StrOrNum::Int(i) => i.checked_mul(UNIT).map(Amount).ok_or_else(|| de::Error::custom("amount overflow")),
            StrOrNum::Float(v) => Amount::try_from(v).map_err(de::Error::custom),
        }
    }
}

/// Serializes an [`Amount`] as a JSON number, for APIs that require numeric amounts.
pub fn as_number<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(amount.to_f64())
}
