//! Market selection and the fixed table names behind each market.

use crate::domain::error::{CodeListError, MarketPanelError};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Cn,
    Us,
}

impl Market {
    pub fn daily_table(self) -> &'static str {
        match self {
            Market::Cn => "daily",
            Market::Us => "us_daily",
        }
    }

    /// Adjusted daily bars exist only for the US market.
    pub fn daily_adjusted_table(self) -> Result<&'static str, MarketPanelError> {
        match self {
            Market::Us => Ok("us_daily_adj"),
            Market::Cn => Err(MarketPanelError::UnsupportedMarket {
                market: self.to_string(),
                operation: "adjusted daily prices".into(),
            }),
        }
    }

    pub fn calendar_table(self) -> &'static str {
        match self {
            Market::Cn => "trade_cal",
            Market::Us => "us_tradecal",
        }
    }

    pub fn basic_table(self) -> &'static str {
        match self {
            Market::Cn => "stock_basic",
            Market::Us => "us_basic",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Cn => write!(f, "cn"),
            Market::Us => write!(f, "us"),
        }
    }
}

impl FromStr for Market {
    type Err = MarketPanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cn" => Ok(Market::Cn),
            "us" => Ok(Market::Us),
            other => Err(MarketPanelError::InvalidArgument {
                reason: format!("market must be \"cn\" or \"us\", got \"{other}\""),
            }),
        }
    }
}

/// Which component leads the compound index of a daily query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyOrder {
    #[default]
    SymbolFirst,
    DateFirst,
}

impl KeyOrder {
    pub fn index_names(self) -> [String; 2] {
        match self {
            KeyOrder::SymbolFirst => ["symbol".into(), "date".into()],
            KeyOrder::DateFirst => ["date".into(), "symbol".into()],
        }
    }
}

impl FromStr for KeyOrder {
    type Err = MarketPanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "symbol" => Ok(KeyOrder::SymbolFirst),
            "date" => Ok(KeyOrder::DateFirst),
            other => Err(MarketPanelError::InvalidArgument {
                reason: format!("first index must be \"symbol\" or \"date\", got \"{other}\""),
            }),
        }
    }
}

/// Parse a comma-separated code list, normalizing to uppercase.
pub fn parse_codes(input: &str) -> Result<Vec<String>, CodeListError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(CodeListError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if seen.contains(&code) {
            return Err(CodeListError::DuplicateCode(code));
        }
        seen.insert(code.clone());
        codes.push(code);
    }

    Ok(codes)
}
