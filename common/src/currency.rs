use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported display currencies. Amounts are always stored internally as
/// integer cents (the smallest unit of the currency).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Krw,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Eur => write!(f, "EUR"),
            Currency::Krw => write!(f, "KRW"),
        }
    }
}

impl Currency {
    pub fn all() -> &'static [Currency] {
        &[Currency::Usd, Currency::Eur, Currency::Krw]
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Krw => "₩",
        }
    }

    /// KRW has no minor unit; USD/EUR use 100 cents per unit.
    pub fn minor_units(&self) -> u64 {
        match self {
            Currency::Krw => 1,
            _ => 100,
        }
    }
}

/// Format an amount (stored in cents) for display in the given currency.
pub fn format_amount(amount_cents: u64, currency: &Currency) -> String {
    let minor = currency.minor_units();
    if minor == 1 {
        format!("{}{}", currency.symbol(), amount_cents)
    } else {
        format!(
            "{}{}.{:02}",
            currency.symbol(),
            amount_cents / minor,
            amount_cents % minor
        )
    }
}
