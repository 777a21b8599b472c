// In crates/core-types/src/money.rs

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of nano units in one whole unit.
pub const NANO_IN_UNIT: i64 = 1_000_000_000;

const NANO_SCALE: u32 = 9;

/// The broker-native encoding of a price or amount: whole units plus billionths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Quotation {
    pub units: i64,
    pub nano: i32,
}

impl Quotation {
    pub fn new(units: i64, nano: i32) -> Self {
        Self { units, nano }
    }
}

/// A monetary amount with fixed 1e-9 precision.
///
/// The value is kept normalized: `units` and `nano` always share a sign and
/// `|nano| < 1_000_000_000`. Addition, subtraction and multiplication by an
/// integer are exact. Multiplying two amounts rounds the product to the nearest
/// nano. The only lossy conversion is [`Money::to_f64`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Quotation", into = "Quotation")]
pub struct Money {
    units: i64,
    nano: i32,
}

impl Money {
    pub const ZERO: Money = Money { units: 0, nano: 0 };

    /// Builds an amount from a possibly unnormalized pair, e.g. `(1, 1_500_000_000)`.
    ///
    /// # Panics
    ///
    /// Panics if the normalized amount does not fit into `i64` units.
    pub fn new(units: i64, nano: i32) -> Self {
        Self::from_nanos(i128::from(units) * i128::from(NANO_IN_UNIT) + i128::from(nano))
    }

    pub fn units(&self) -> i64 {
        self.units
    }

    pub fn nano(&self) -> i32 {
        self.nano
    }

    /// The whole amount expressed in nanos.
    pub fn total_nanos(&self) -> i128 {
        i128::from(self.units) * i128::from(NANO_IN_UNIT) + i128::from(self.nano)
    }

    /// # Panics
    ///
    /// Panics if the amount does not fit into `i64` units.
    pub fn from_nanos(total: i128) -> Self {
        Self::checked_from_nanos(total).expect("Money amount overflowed i64 units")
    }

    pub fn checked_from_nanos(total: i128) -> Option<Self> {
        let nano_in_unit = i128::from(NANO_IN_UNIT);
        // Remainder takes the sign of the dividend, so both parts share it.
        let units = i64::try_from(total / nano_in_unit).ok()?;
        let nano = (total % nano_in_unit) as i32;
        Some(Self { units, nano })
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        Self::checked_from_nanos(self.total_nanos().checked_add(rhs.total_nanos())?)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        Self::checked_from_nanos(self.total_nanos().checked_sub(rhs.total_nanos())?)
    }

    pub fn checked_mul_int(self, rhs: i64) -> Option<Money> {
        Self::checked_from_nanos(self.total_nanos().checked_mul(i128::from(rhs))?)
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0 && self.nano == 0
    }

    pub fn is_positive(&self) -> bool {
        self.units > 0 || self.nano > 0
    }

    pub fn is_negative(&self) -> bool {
        self.units < 0 || self.nano < 0
    }

    pub fn abs(self) -> Money {
        if self.is_negative() { -self } else { self }
    }

    /// Floating approximation: `units + nano * 1e-9`.
    pub fn to_f64(&self) -> f64 {
        self.units as f64 + f64::from(self.nano) / NANO_IN_UNIT as f64
    }

    /// Rounds a float to the nearest nano. Returns `None` for NaN, infinities
    /// and values outside the `i64` unit range.
    pub fn from_f64(value: f64) -> Option<Money> {
        if !value.is_finite() || value.abs() >= i64::MAX as f64 {
            return None;
        }
        let units = value.trunc();
        let nano = ((value - units) * NANO_IN_UNIT as f64).round();
        Self::checked_from_nanos(units as i128 * i128::from(NANO_IN_UNIT) + nano as i128)
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.total_nanos(), NANO_SCALE).normalize()
    }

    pub fn to_quotation(&self) -> Quotation {
        Quotation {
            units: self.units,
            nano: self.nano,
        }
    }

    /// Divides an amount by a count of items, rounding to the nearest nano.
    /// Returns `None` when `count` is zero.
    pub fn checked_div_int(self, count: i64) -> Option<Money> {
        if count == 0 {
            return None;
        }
        let total = self.total_nanos();
        let count = i128::from(count);
        let quotient = total / count;
        let remainder = total % count;
        let rounded = if 2 * remainder.abs() >= count.abs() {
            quotient + total.signum() * count.signum()
        } else {
            quotient
        };
        Self::checked_from_nanos(rounded)
    }
}

impl TryFrom<Quotation> for Money {
    type Error = Error;

    /// Normalizes the pair, failing when it does not fit into `i64` units.
    fn try_from(value: Quotation) -> Result<Self> {
        let total = i128::from(value.units) * i128::from(NANO_IN_UNIT) + i128::from(value.nano);
        Money::checked_from_nanos(total)
            .ok_or_else(|| Error::MoneyOutOfRange(format!("{} units {} nano", value.units, value.nano)))
    }
}

impl From<Money> for Quotation {
    fn from(value: Money) -> Self {
        value.to_quotation()
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Money { units, nano: 0 }
    }
}

impl TryFrom<Decimal> for Money {
    type Error = Error;

    /// Rounds to nine fractional digits.
    fn try_from(value: Decimal) -> Result<Self> {
        let mut scaled = value;
        scaled.rescale(NANO_SCALE);
        if scaled.scale() != NANO_SCALE {
            return Err(Error::MoneyOutOfRange(value.to_string()));
        }
        Money::checked_from_nanos(scaled.mantissa())
            .ok_or_else(|| Error::MoneyOutOfRange(value.to_string()))
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let decimal = Decimal::from_str(s.trim()).map_err(|_| Error::InvalidMoney(s.to_string()))?;
        Money::try_from(decimal)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_decimal(), f)
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_nanos().cmp(&other.total_nanos())
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<i64> for Money {
    fn eq(&self, other: &i64) -> bool {
        self.units == *other && self.nano == 0
    }
}

impl PartialOrd<i64> for Money {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        Some(self.cmp(&Money::from(*other)))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::from_nanos(self.total_nanos() + rhs.total_nanos())
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::from_nanos(self.total_nanos() - rhs.total_nanos())
    }
}

impl Add<i64> for Money {
    type Output = Money;

    fn add(self, rhs: i64) -> Money {
        self + Money::from(rhs)
    }
}

impl Sub<i64> for Money {
    type Output = Money;

    fn sub(self, rhs: i64) -> Money {
        self - Money::from(rhs)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money {
            units: -self.units,
            nano: -self.nano,
        }
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money::from_nanos(self.total_nanos() * i128::from(rhs))
    }
}

impl Mul for Money {
    type Output = Money;

    /// Rounds the product to the nearest nano.
    fn mul(self, rhs: Money) -> Money {
        Money::try_from(self.to_decimal() * rhs.to_decimal())
            .expect("Money product out of range")
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
