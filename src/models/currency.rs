use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currencies a ticket type can be priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ars,
    Sat,
}

impl Currency {
    /// Display currency used when an event prices tickets in more than one currency.
    pub const FALLBACK: Currency = Currency::Usd;

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ars => "ARS",
            Currency::Sat => "SAT",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported currency code: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "ARS" => Ok(Currency::Ars),
            "SAT" => Ok(Currency::Sat),
            _ => Err(UnknownCurrency(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" Sat ".parse::<Currency>().unwrap(), Currency::Sat);
        assert!("EUR".parse::<Currency>().is_err());
    }

    #[test]
    fn test_serializes_as_upper_case_code() {
        let json = serde_json::to_string(&Currency::Ars).unwrap();
        assert_eq!(json, "\"ARS\"");

        let parsed: Currency = serde_json::from_str("\"SAT\"").unwrap();
        assert_eq!(parsed, Currency::Sat);
    }
}
