//! # Money Module
//!
//! Provides the `Money` type for monetary values and `TaxRate` for the flat
//! GST percentage applied per product line.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0.1 + 0.2 = 0.30000000000000004   (f64)          ❌                   │
//! │  10 + 20   = 30                    (i64 paise)     ✅                   │
//! │                                                                         │
//! │  Every amount is stored in the smallest currency unit (paise/cents).   │
//! │  Only presentation layers convert to "245.00".                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kirana_core::money::{Money, TaxRate};
//!
//! let price = Money::from_major_minor(10, 99); // 10.99
//! let line = price * 3_i64;                    // 32.97
//! assert_eq!(line.cents(), 3297);
//!
//! let gst = TaxRate::from_percent(18);
//! assert_eq!(line.calculate_tax(gst).cents(), 593); // 5.9346 → 5.93
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Basis points in one whole (100%).
const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed, so it can hold a customer balance that has been overpaid or a
/// grand total pushed below zero by a large bill discount.
///
/// The operators follow `i64` semantics. Amounts that come from a request
/// are combined with the `checked_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ```rust
    /// use kirana_core::money::Money;
    /// assert_eq!(Money::from_major(245).cents(), 24_500);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -5.50, not -4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds, or `None` if the result leaves the `i64` range.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Subtracts, or `None` if the result leaves the `i64` range.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Multiplies by a quantity, or `None` on overflow.
    ///
    /// ```rust
    /// use kirana_core::money::Money;
    /// assert_eq!(Money::from_cents(299).checked_mul(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).checked_mul(3), None);
    /// ```
    #[inline]
    pub const fn checked_mul(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Calculates tax on this amount, rounding half away from zero.
    ///
    /// Used for a single amount. Bill totals accumulate exact numerators
    /// with [`TaxRate::numerator`] and round once through
    /// [`Money::from_bps_numerator`].
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money::from_bps_numerator(rate.numerator(*self))
    }

    /// Converts an exact `cents × bps` numerator back into money.
    ///
    /// ```rust
    /// use kirana_core::money::Money;
    /// // 0.825 cents rounds to 1, -0.5 rounds to -1
    /// assert_eq!(Money::from_bps_numerator(8_250).cents(), 1);
    /// assert_eq!(Money::from_bps_numerator(-5_000).cents(), -1);
    /// ```
    ///
    /// Saturates at the `i64` bounds; totals go through
    /// [`Money::checked_from_bps_numerator`] instead.
    pub fn from_bps_numerator(numerator: i128) -> Money {
        let rounded = round_bps(numerator);
        let saturated = if rounded < 0 { i64::MIN } else { i64::MAX };
        Money(i64::try_from(rounded).unwrap_or(saturated))
    }

    /// Like [`Money::from_bps_numerator`], but `None` when the rounded value
    /// does not fit in an `i64`.
    pub fn checked_from_bps_numerator(numerator: i128) -> Option<Money> {
        i64::try_from(round_bps(numerator)).ok().map(Money)
    }
}

/// Divides by [`BPS_SCALE`], rounding half away from zero.
fn round_bps(numerator: i128) -> i128 {
    let half = BPS_SCALE / 2;
    if numerator >= 0 {
        numerator.saturating_add(half) / BPS_SCALE
    } else {
        numerator.saturating_sub(half) / BPS_SCALE
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// GST rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 18% GST is 1800 bps and 2.5% is 250 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage.
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        TaxRate(percent * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Exact tax numerator for `amount`, in units of cents / 10000.
    #[inline]
    pub fn numerator(&self, amount: Money) -> i128 {
        i128::from(amount.cents()) * i128::from(self.0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
        assert_eq!(Money::from_major(271).cents(), 27_100);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(24_500).to_string(), "245.00");
        assert_eq!(Money::from_cents(505).to_string(), "5.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let mut total = Money::from_major(100);
        total += Money::from_major(50);
        total -= Money::from_major(5);
        assert_eq!(total, Money::from_major(145));
        assert_eq!(-total, Money::from_major(-145));
        assert_eq!(Money::from_cents(299) * 3, Money::from_cents(897));
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_major(1), Money::from_cents(50), Money::from_cents(-25)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 125);
    }

    #[test]
    fn test_calculate_tax() {
        let rate = TaxRate::from_percent(18);
        assert_eq!(Money::from_major(200).calculate_tax(rate), Money::from_major(36));

        // 10.00 at 8.25% = 0.825 → 0.83
        assert_eq!(
            Money::from_major(10).calculate_tax(TaxRate::from_bps(825)).cents(),
            83
        );
        assert!(Money::from_major(10).calculate_tax(TaxRate::zero()).is_zero());
    }

    #[test]
    fn test_checked_arithmetic() {
        let big = Money::from_cents(i64::MAX - 1);
        assert_eq!(big.checked_add(Money::from_cents(1)), Some(Money::from_cents(i64::MAX)));
        assert_eq!(big.checked_add(Money::from_cents(2)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MAX / 2).checked_mul(3), None);
        assert_eq!(Money::from_major(40).checked_mul(3), Some(Money::from_major(120)));
    }

    #[test]
    fn test_bps_numerator_out_of_range() {
        let huge = i128::from(i64::MAX) * 20_000;
        assert_eq!(Money::checked_from_bps_numerator(huge), None);
        assert_eq!(Money::checked_from_bps_numerator(15_000), Some(Money::from_cents(2)));
        assert_eq!(Money::from_bps_numerator(huge).cents(), i64::MAX);
        assert_eq!(Money::from_bps_numerator(-huge).cents(), i64::MIN);
    }

    #[test]
    fn test_negative_rounding_is_symmetric() {
        assert_eq!(Money::from_bps_numerator(15_000).cents(), 2);
        assert_eq!(Money::from_bps_numerator(-15_000).cents(), -2);
        assert_eq!(Money::from_bps_numerator(4_999).cents(), 0);
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::from_percent(18).to_string(), "18.00%");
        assert_eq!(TaxRate::from_bps(250).to_string(), "2.50%");
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&Money::from_cents(1099)).unwrap();
        assert_eq!(json, "1099");
        let rate: TaxRate = serde_json::from_str("1800").unwrap();
        assert_eq!(rate, TaxRate::from_percent(18));
    }
}
