//! Risk index: the queryable form of a parsed risk document.
//!
//! Futures records are keyed by (symbol, expiry), option records by
//! (symbol, expiry, option type, strike). A strike list per
//! (symbol, expiry, option type) is derived once for front ends that need to
//! offer selectable strikes. The index is immutable after `build`, so a shared
//! reference can be handed to any number of readers.
//!
//! Duplicate keys in the document resolve last-write-wins. Scenario arrays
//! are never merged; a conflicting duplicate is logged and replaces the
//! earlier record.

use crate::document::RiskDocument;
use crate::error::{InstrumentKey, SpanError};
use crate::record::{FuturesRiskRecord, OptionRiskRecord, ScenarioSet};
use crate::types::{ExpiryKey, OptionType, Price, Strike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// Exchange convention for the length of a risk array.
pub const STANDARD_SCENARIO_COUNT: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParams {
    /// Fail the build when the document has no `phy` reference price.
    pub require_underlying_reference: bool,
    pub expected_scenarios: usize,
    /// Reject risk arrays whose length differs from `expected_scenarios`.
    pub enforce_scenario_count: bool,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            require_underlying_reference: true,
            expected_scenarios: STANDARD_SCENARIO_COUNT,
            enforce_scenario_count: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    symbol: String,
    expiry: ExpiryKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OptionKey {
    symbol: String,
    expiry: ExpiryKey,
    option_type: OptionType,
    strike: Strike,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StrikeKey {
    symbol: String,
    expiry: ExpiryKey,
    option_type: OptionType,
}

#[derive(Debug, Clone)]
pub struct RiskIndex {
    futures: HashMap<SeriesKey, FuturesRiskRecord>,
    options: HashMap<OptionKey, OptionRiskRecord>,
    strikes: HashMap<StrikeKey, Vec<Strike>>,
    underlying_reference: Option<Price>,
}

impl RiskIndex {
    pub fn build(document: &RiskDocument, params: &IndexParams) -> Result<Self, SpanError> {
        let underlying_reference = match document.underlying_reference {
            Some(value) => Some(Price::new(value).ok_or_else(|| {
                SpanError::malformed(format!("phy reference price must be positive, got {value}"))
            })?),
            None if params.require_underlying_reference => {
                return Err(SpanError::malformed("no <phy> underlying reference price in document"));
            }
            None => None,
        };

        let mut futures: HashMap<SeriesKey, FuturesRiskRecord> = HashMap::new();
        for portfolio in &document.futures_portfolios {
            for contract in &portfolio.contracts {
                let context = format!("FUT {} {}", portfolio.symbol, contract.expiry);
                let record = FuturesRiskRecord {
                    symbol: portfolio.symbol.clone(),
                    expiry: contract.expiry,
                    scenarios: scenario_set(&contract.scenarios, params, &context)?,
                    reference_price: Price::new(contract.price).ok_or_else(|| {
                        SpanError::malformed(format!(
                            "{context}: price must be positive, got {}",
                            contract.price
                        ))
                    })?,
                };

                let key = SeriesKey {
                    symbol: record.symbol.clone(),
                    expiry: record.expiry,
                };
                if let Some(existing) = futures.get(&key) {
                    if *existing != record {
                        warn!(instrument = %context, "conflicting duplicate futures record, keeping the later one");
                    }
                }
                futures.insert(key, record);
            }
        }

        let mut options: HashMap<OptionKey, OptionRiskRecord> = HashMap::new();
        for portfolio in &document.option_portfolios {
            for series in &portfolio.series {
                for contract in &series.options {
                    let context = format!(
                        "OPT {} {} {} {}",
                        portfolio.symbol, series.expiry, contract.option_type, contract.strike
                    );
                    let strike = Strike::new(contract.strike).ok_or_else(|| {
                        SpanError::malformed(format!("{context}: strike must be positive"))
                    })?;
                    if contract.premium < Decimal::ZERO {
                        return Err(SpanError::malformed(format!(
                            "{context}: premium must not be negative, got {}",
                            contract.premium
                        )));
                    }

                    let record = OptionRiskRecord {
                        symbol: portfolio.symbol.clone(),
                        expiry: series.expiry,
                        option_type: contract.option_type,
                        strike,
                        scenarios: scenario_set(&contract.scenarios, params, &context)?,
                        premium: contract.premium,
                    };

                    let key = OptionKey {
                        symbol: record.symbol.clone(),
                        expiry: record.expiry,
                        option_type: record.option_type,
                        strike,
                    };
                    if let Some(existing) = options.get(&key) {
                        if *existing != record {
                            warn!(instrument = %context, "conflicting duplicate option record, keeping the later one");
                        }
                    }
                    options.insert(key, record);
                }
            }
        }

        let strikes = strike_index(&options);

        info!(
            futures = futures.len(),
            options = options.len(),
            strike_lists = strikes.len(),
            underlying_reference = ?underlying_reference.map(|p| p.value()),
            "risk index built"
        );

        Ok(Self {
            futures,
            options,
            strikes,
            underlying_reference,
        })
    }

    /// Parses the file at `path` and builds the index from it.
    pub fn from_path(path: impl AsRef<Path>, params: &IndexParams) -> Result<Self, SpanError> {
        let document = RiskDocument::from_path(path)?;
        Self::build(&document, params)
    }

    pub fn lookup_futures(
        &self,
        symbol: &str,
        expiry: ExpiryKey,
    ) -> Result<&FuturesRiskRecord, SpanError> {
        let key = SeriesKey {
            symbol: symbol.to_string(),
            expiry,
        };
        self.futures.get(&key).ok_or_else(|| {
            debug!(symbol, %expiry, "futures lookup miss");
            SpanError::UnknownInstrument(InstrumentKey::Futures {
                symbol: key.symbol,
                expiry,
            })
        })
    }

    pub fn lookup_option(
        &self,
        symbol: &str,
        expiry: ExpiryKey,
        option_type: OptionType,
        strike: Strike,
    ) -> Result<&OptionRiskRecord, SpanError> {
        let key = OptionKey {
            symbol: symbol.to_string(),
            expiry,
            option_type,
            strike,
        };
        self.options.get(&key).ok_or_else(|| {
            debug!(symbol, %expiry, %option_type, %strike, "option lookup miss");
            SpanError::UnknownInstrument(InstrumentKey::Option {
                symbol: key.symbol,
                expiry,
                option_type,
                strike,
            })
        })
    }

    /// Ascending, distinct. Empty when nothing is listed for the key.
    pub fn available_strikes(
        &self,
        symbol: &str,
        expiry: ExpiryKey,
        option_type: OptionType,
    ) -> &[Strike] {
        let key = StrikeKey {
            symbol: symbol.to_string(),
            expiry,
            option_type,
        };
        self.strikes.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn underlying_reference(&self) -> Result<Price, SpanError> {
        self.underlying_reference
            .ok_or_else(|| SpanError::malformed("no <phy> underlying reference price was captured"))
    }

    pub fn futures_symbols(&self) -> Vec<&str> {
        sorted_distinct(self.futures.keys().map(|k| k.symbol.as_str()))
    }

    pub fn option_symbols(&self) -> Vec<&str> {
        sorted_distinct(self.options.keys().map(|k| k.symbol.as_str()))
    }

    pub fn futures_expiries(&self, symbol: &str) -> Vec<ExpiryKey> {
        sorted_distinct(
            self.futures
                .keys()
                .filter(|k| k.symbol == symbol)
                .map(|k| k.expiry),
        )
    }

    pub fn option_expiries(&self, symbol: &str) -> Vec<ExpiryKey> {
        sorted_distinct(
            self.options
                .keys()
                .filter(|k| k.symbol == symbol)
                .map(|k| k.expiry),
        )
    }

    pub fn futures_count(&self) -> usize {
        self.futures.len()
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

fn scenario_set(
    values: &[Decimal],
    params: &IndexParams,
    context: &str,
) -> Result<ScenarioSet, SpanError> {
    if values.len() != params.expected_scenarios {
        if params.enforce_scenario_count {
            return Err(SpanError::malformed(format!(
                "{context}: expected {} scenarios, found {}",
                params.expected_scenarios,
                values.len()
            )));
        }
        debug!(instrument = context, found = values.len(), "non-standard risk array length");
    }
    ScenarioSet::new(values.to_vec())
        .ok_or_else(|| SpanError::malformed(format!("{context}: empty risk array")))
}

// derived from the final option map, so overwritten duplicates contribute one strike.
fn strike_index(options: &HashMap<OptionKey, OptionRiskRecord>) -> HashMap<StrikeKey, Vec<Strike>> {
    let mut sets: HashMap<StrikeKey, BTreeSet<Strike>> = HashMap::new();
    for key in options.keys() {
        sets.entry(StrikeKey {
            symbol: key.symbol.clone(),
            expiry: key.expiry,
            option_type: key.option_type,
        })
        .or_default()
        .insert(key.strike);
    }
    sets.into_iter()
        .map(|(key, set)| (key, set.into_iter().collect()))
        .collect()
}

fn sorted_distinct<T: Ord>(items: impl Iterator<Item = T>) -> Vec<T> {
    items.collect::<BTreeSet<_>>().into_iter().collect()
}
