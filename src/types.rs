// 1.0: all the primitives live here. nothing in the index or the engine works without these types.
// sides, instrument kinds, expiry keys, strikes, prices, amounts. each is a newtype so key mixups
// fail to compile instead of failing a lookup.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical exchange key format for expiries.
pub const EXPIRY_KEY_FORMAT: &str = "%Y%m%d";
/// Human expiry format used by the exchange master files (e.g. `27-Feb-2025`).
pub const EXPIRY_DISPLAY_FORMAT: &str = "%d-%b-%Y";

// Buy = long the contract, Sell = short / writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Futures,
    Options,
}

// 1.1: option right. the risk file encodes it as a single letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn code(&self) -> &'static str {
        match self {
            OptionType::Call => "C",
            OptionType::Put => "P",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "C" => Some(OptionType::Call),
            "P" => Some(OptionType::Put),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// 1.2: expiry date. keyed and displayed as YYYYMMDD, which is what the risk file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ExpiryKey(NaiveDate);

impl ExpiryKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses the canonical `YYYYMMDD` form.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.len() != 8 || !key.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(key, EXPIRY_KEY_FORMAT).ok().map(Self)
    }

    /// Normalises the human `DD-Mon-YYYY` form used by the contract master.
    pub fn from_display(display: &str) -> Option<Self> {
        NaiveDate::parse_from_str(display.trim(), EXPIRY_DISPLAY_FORMAT)
            .ok()
            .map(Self)
    }

    /// Accepts either form; canonical first.
    pub fn parse_any(value: &str) -> Option<Self> {
        Self::parse(value).or_else(|| Self::from_display(value))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn to_display(&self) -> String {
        self.0.format(EXPIRY_DISPLAY_FORMAT).to_string()
    }
}

impl fmt::Display for ExpiryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(EXPIRY_KEY_FORMAT))
    }
}

impl From<ExpiryKey> for String {
    fn from(key: ExpiryKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ExpiryKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid expiry key {value:?}, expected YYYYMMDD"))
    }
}

/// Parses a decimal the way the risk file writes them: plain or scientific notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

// 1.3: strike price. normalised on construction so 100, 100.0 and 100.00 are one key.
// every strike, whether from the risk file or from a caller, goes through `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Strike(Decimal);

impl Strike {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value.normalize()))
        } else {
            None
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        parse_decimal(raw).and_then(Self::new)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Strike {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("strike must be positive, got {value}"))
    }
}

impl fmt::Display for Strike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: price in document currency per unit. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.5: currency amount. span, exposure and total all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote(Decimal);

impl Quote {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `None` when the sum leaves the decimal range.
    pub fn checked_add(&self, other: Quote) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Rounded to paise/cents for display.
    pub fn round_cents(&self) -> Decimal {
        self.0.round_dp(2)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
