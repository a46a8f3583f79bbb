//! Typed risk records held by the index.
//!
//! A record pairs an instrument with its risk array: the per-unit gain or loss
//! under each exchange stress scenario. Records are built once from the risk
//! document and never mutated afterwards.

use crate::types::{ExpiryKey, OptionType, Price, Strike};
use rust_decimal::Decimal;
use serde::Serialize;

/// Scenario P&L values per unit, in file order. Never empty, so the extremes
/// are fixed once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSet {
    values: Vec<Decimal>,
    #[serde(skip)]
    min: Decimal,
    #[serde(skip)]
    max: Decimal,
}

impl ScenarioSet {
    #[must_use]
    pub fn new(values: Vec<Decimal>) -> Option<Self> {
        let (&first, rest) = values.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((first, first), |(min, max), &v| (min.min(v), max.max(v)));
        Some(Self { values, min, max })
    }

    pub fn values(&self) -> &[Decimal] {
        &self.values
    }

    pub fn scenario_count(&self) -> usize {
        self.values.len()
    }

    /// Most negative scenario: the largest loss for a long holder.
    pub fn min(&self) -> Decimal {
        self.min
    }

    /// Most positive scenario: the largest loss for a short holder.
    pub fn max(&self) -> Decimal {
        self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuturesRiskRecord {
    pub symbol: String,
    pub expiry: ExpiryKey,
    pub scenarios: ScenarioSet,
    pub reference_price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionRiskRecord {
    pub symbol: String,
    pub expiry: ExpiryKey,
    pub option_type: OptionType,
    pub strike: Strike,
    pub scenarios: ScenarioSet,
    /// Always >= 0.
    pub premium: Decimal,
}
