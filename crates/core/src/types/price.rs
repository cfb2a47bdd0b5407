//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    #[serde(default)]
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Price of `quantity` units, `None` on overflow.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Option<Self> {
        Some(Self {
            amount: self.amount.checked_mul(Decimal::from(quantity))?,
            currency_code: self.currency_code,
        })
    }

    /// Sum of two prices.
    ///
    /// `None` if the currencies differ or the sum overflows.
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        if self.currency_code != other.currency_code {
            return None;
        }
        Some(Self {
            amount: self.amount.checked_add(other.amount)?,
            currency_code: self.currency_code,
        })
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_to_cents() {
        let price = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
        assert_eq!(price.display(), "$19.99");

        let price = Price::new(Decimal::new(5, 0), CurrencyCode::GBP);
        assert_eq!(price.display(), "£5.00");
    }

    #[test]
    fn test_times() {
        let price = Price::new(Decimal::new(250, 2), CurrencyCode::EUR);
        assert_eq!(price.times(3).map(|p| p.display()).as_deref(), Some("€7.50"));
    }

    #[test]
    fn test_times_overflow_is_none() {
        let price = Price::new(Decimal::MAX, CurrencyCode::USD);
        assert_eq!(price.times(2), None);
        assert_eq!(price.times(1), Some(price));
    }

    #[test]
    fn test_checked_add() {
        let usd = Price::new(Decimal::new(150, 2), CurrencyCode::USD);
        let eur = Price::new(Decimal::new(150, 2), CurrencyCode::EUR);

        assert_eq!(
            usd.checked_add(&usd).map(|p| p.display()).as_deref(),
            Some("$3.00")
        );
        assert_eq!(usd.checked_add(&eur), None);
        assert_eq!(Price::new(Decimal::MAX, CurrencyCode::USD).checked_add(&usd), None);
    }
}
