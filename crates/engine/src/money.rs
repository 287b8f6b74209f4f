use std::{fmt, ops::Neg};

use serde::{Deserialize, Serialize};

use crate::{Currency, LedgerError};

/// Signed money amount represented as **integer minor units** plus a
/// [`Currency`] code.
///
/// Use this type for **all** monetary values in the engine (expense totals,
/// owed shares, payments, balances) to avoid floating-point drift. Arithmetic
/// stays in minor units until display.
///
/// All operations are checked: mixing currencies or overflowing `i64` returns
/// an error instead of silently producing a wrong amount.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(12_34, Currency::Eur);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34 EUR");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// The zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self { minor: 0, currency }
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.minor
    }

    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.minor == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.minor > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.minor < 0
    }

    /// Absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self {
            minor: self.minor.abs(),
            currency: self.currency,
        }
    }

    fn ensure_same_currency(self, rhs: Money) -> Result<(), LedgerError> {
        if self.currency != rhs.currency {
            return Err(LedgerError::CurrencyMismatch(format!(
                "cannot combine {} with {}",
                self.currency.code(),
                rhs.currency.code()
            )));
        }
        Ok(())
    }

    /// Checked addition; fails on currency mismatch or i64 overflow.
    pub fn checked_add(self, rhs: Money) -> Result<Money, LedgerError> {
        self.ensure_same_currency(rhs)?;
        self.minor
            .checked_add(rhs.minor)
            .map(|minor| Money::new(minor, self.currency))
            .ok_or_else(|| LedgerError::InvalidAmount("amount overflow".to_string()))
    }

    /// Checked subtraction; fails on currency mismatch or i64 overflow.
    pub fn checked_sub(self, rhs: Money) -> Result<Money, LedgerError> {
        self.ensure_same_currency(rhs)?;
        self.minor
            .checked_sub(rhs.minor)
            .map(|minor| Money::new(minor, self.currency))
            .ok_or_else(|| LedgerError::InvalidAmount("amount overflow".to_string()))
    }

    /// Multiplies by `numerator / denominator` with i128 intermediates,
    /// flooring the result (toward negative infinity).
    pub fn multiply_by_ratio(self, numerator: i64, denominator: i64) -> Result<Money, LedgerError> {
        if denominator == 0 {
            return Err(LedgerError::InvalidAmount(
                "ratio denominator must not be zero".to_string(),
            ));
        }
        let scaled = i128::from(self.minor) * i128::from(numerator);
        let minor = scaled.div_euclid(i128::from(denominator));
        i64::try_from(minor)
            .map(|minor| Money::new(minor, self.currency))
            .map_err(|_| LedgerError::InvalidAmount("amount overflow".to_string()))
    }

    /// Splits the amount proportionally over `weights` without creating or
    /// destroying a single minor unit.
    ///
    /// Largest-remainder method: every element starts at the floor of its
    /// proportional share; the remainder is then handed out one minor unit at
    /// a time to the elements with the largest fractional remainder, ties
    /// broken by input order. The result always sums exactly to `self` and is
    /// deterministic.
    ///
    /// Fails with `InvalidSplit` on a negative amount, an empty weight list,
    /// or weights summing to zero.
    pub fn allocate(self, weights: &[u64]) -> Result<Vec<Money>, LedgerError> {
        if self.is_negative() {
            return Err(LedgerError::InvalidSplit(
                "cannot allocate a negative amount".to_string(),
            ));
        }
        if weights.is_empty() {
            return Err(LedgerError::InvalidSplit(
                "allocation weights must not be empty".to_string(),
            ));
        }
        let total_weight: u128 = weights.iter().map(|w| u128::from(*w)).sum();
        if total_weight == 0 {
            return Err(LedgerError::InvalidSplit(
                "allocation weights must not all be zero".to_string(),
            ));
        }

        let amount = u128::from(self.minor.unsigned_abs());
        let mut floors: Vec<i64> = Vec::with_capacity(weights.len());
        let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(weights.len());
        let mut assigned: u128 = 0;

        for (index, weight) in weights.iter().enumerate() {
            let scaled = amount * u128::from(*weight);
            let floor = scaled / total_weight;
            assigned += floor;
            // amount fits in i64, and floor <= amount.
            floors.push(floor as i64);
            remainders.push((index, scaled % total_weight));
        }

        let mut leftover = amount - assigned;
        remainders.sort_by(|(ia, ra), (ib, rb)| rb.cmp(ra).then(ia.cmp(ib)));
        for (index, _) in remainders {
            if leftover == 0 {
                break;
            }
            floors[index] += 1;
            leftover -= 1;
        }

        Ok(floors
            .into_iter()
            .map(|minor| Money::new(minor, self.currency))
            .collect())
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money::new(-self.minor, self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        match self.currency.minor_units() {
            0 => write!(f, "{sign}{abs} {}", self.currency.code()),
            digits => {
                let scale = 10u64.pow(u32::from(digits));
                let major = abs / scale;
                let frac = abs % scale;
                write!(
                    f,
                    "{sign}{major}.{frac:0width$} {}",
                    self.currency.code(),
                    width = usize::from(digits)
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur(minor: i64) -> Money {
        Money::new(minor, Currency::Eur)
    }

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(eur(0).to_string(), "0.00 EUR");
        assert_eq!(eur(1).to_string(), "0.01 EUR");
        assert_eq!(eur(1050).to_string(), "10.50 EUR");
        assert_eq!(eur(-1050).to_string(), "-10.50 EUR");
        assert_eq!(Money::new(1050, Currency::Jpy).to_string(), "1050 JPY");
    }

    #[test]
    fn checked_add_rejects_currency_mix() {
        let err = eur(100)
            .checked_add(Money::new(100, Currency::Usd))
            .unwrap_err();
        assert!(matches!(err, LedgerError::CurrencyMismatch(_)));
    }

    #[test]
    fn allocate_equal_weights_puts_remainder_first() {
        let parts = eur(1000).allocate(&[1, 1, 1]).unwrap();
        let minors: Vec<i64> = parts.iter().map(|p| p.minor()).collect();
        assert_eq!(minors, vec![334, 333, 333]);
    }

    #[test]
    fn allocate_exact_proportions_have_no_remainder() {
        let parts = eur(100).allocate(&[50, 30, 20]).unwrap();
        let minors: Vec<i64> = parts.iter().map(|p| p.minor()).collect();
        assert_eq!(minors, vec![50, 30, 20]);
    }

    #[test]
    fn allocate_sums_exactly_to_amount() {
        for (amount, weights) in [
            (997, vec![1, 1, 1]),
            (1, vec![3, 7]),
            (12345, vec![1, 2, 3, 4, 5, 6, 7]),
            (100, vec![0, 1, 0]),
        ] {
            let parts = eur(amount).allocate(&weights).unwrap();
            let sum: i64 = parts.iter().map(|p| p.minor()).sum();
            assert_eq!(sum, amount, "weights {weights:?}");
        }
    }

    #[test]
    fn allocate_rejects_degenerate_input() {
        assert!(eur(-1).allocate(&[1]).is_err());
        assert!(eur(100).allocate(&[]).is_err());
        assert!(eur(100).allocate(&[0, 0]).is_err());
    }

    #[test]
    fn multiply_by_ratio_floors() {
        assert_eq!(eur(100).multiply_by_ratio(1, 3).unwrap().minor(), 33);
        assert_eq!(eur(-100).multiply_by_ratio(1, 3).unwrap().minor(), -34);
        assert!(eur(100).multiply_by_ratio(1, 0).is_err());
    }
}
