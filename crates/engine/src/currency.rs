use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// ISO-like currency code attached to every monetary value.
///
/// A group fixes one currency at creation time and every expense and payment
/// inside it must carry the same code; the engine rejects mixed-currency
/// arithmetic instead of converting.
///
/// ## Minor units
///
/// Amounts are stored as an `i64` number of **minor units** (see [`Money`]).
/// `minor_units()` returns how many decimal digits separate minor units from
/// major units when formatting:
/// - `10.50 EUR` ⇄ `1050` (2 minor units)
/// - `1050 JPY` ⇄ `1050` (0 minor units)
///
/// [`Money`]: crate::Money
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Jpy,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
        }
    }

    /// Number of fraction digits used when formatting amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Eur | Currency::Usd | Currency::Gbp => 2,
            Currency::Jpy => 0,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "JPY" => Ok(Currency::Jpy),
            other => Err(LedgerError::CurrencyMismatch(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Currency::try_from("eur").unwrap(), Currency::Eur);
        assert_eq!(Currency::try_from(" USD ").unwrap(), Currency::Usd);
        assert!(Currency::try_from("XXX").is_err());
    }

    #[test]
    fn jpy_has_no_minor_units() {
        assert_eq!(Currency::Jpy.minor_units(), 0);
        assert_eq!(Currency::Eur.minor_units(), 2);
    }
}
