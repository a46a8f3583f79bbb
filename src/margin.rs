//! SPAN-style margin for a single futures or option position.
//!
//! Span margin covers the worst one-day loss the exchange risk array predicts
//! for the position side. Exposure margin is a flat percentage of notional on
//! top of it. Longs lose most in the most negative scenario, shorts in the most
//! positive one; both are taken as magnitudes.
//!
//! Long options are not margined: the holder's loss is bounded by the premium
//! already paid, so a buy-side option is always zero.

use crate::error::SpanError;
use crate::index::RiskIndex;
use crate::record::{FuturesRiskRecord, OptionRiskRecord, ScenarioSet};
use crate::reference::ReferenceTables;
use crate::types::{ExpiryKey, InstrumentKind, OptionType, Price, Quote, Side, Strike};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Exchange convention: 2% of notional.
pub const DEFAULT_EXPOSURE_RATE: Decimal = dec!(0.02);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginParams {
    /// Fraction of notional charged as exposure margin.
    pub exposure_rate: Decimal,
}

impl Default for MarginParams {
    fn default() -> Self {
        Self {
            exposure_rate: DEFAULT_EXPOSURE_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginResult {
    pub span: Quote,
    pub exposure: Quote,
    pub total: Quote,
}

impl MarginResult {
    pub fn new(span: Quote, exposure: Quote) -> Result<Self, SpanError> {
        let total = span
            .checked_add(exposure)
            .ok_or_else(|| SpanError::invalid_position("total margin overflows the decimal range"))?;
        Ok(Self {
            span,
            exposure,
            total,
        })
    }

    pub fn zero() -> Self {
        Self {
            span: Quote::zero(),
            exposure: Quote::zero(),
            total: Quote::zero(),
        }
    }
}

/// A single position as a front end collects it. Option fields are optional
/// here so an incomplete request can be rejected with a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub expiry: ExpiryKey,
    pub kind: InstrumentKind,
    pub side: Side,
    pub option_type: Option<OptionType>,
    pub strike: Option<Strike>,
    /// Lots as entered; must be positive.
    pub lots: i64,
}

impl Position {
    pub fn futures(symbol: impl Into<String>, expiry: ExpiryKey, side: Side, lots: i64) -> Self {
        Self {
            symbol: symbol.into(),
            expiry,
            kind: InstrumentKind::Futures,
            side,
            option_type: None,
            strike: None,
            lots,
        }
    }

    pub fn option(
        symbol: impl Into<String>,
        expiry: ExpiryKey,
        side: Side,
        option_type: OptionType,
        strike: Strike,
        lots: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            expiry,
            kind: InstrumentKind::Options,
            side,
            option_type: Some(option_type),
            strike: Some(strike),
            lots,
        }
    }

    fn validated_lots(&self) -> Result<u32, SpanError> {
        if self.lots <= 0 {
            return Err(SpanError::invalid_position(format!(
                "lots must be positive, got {}",
                self.lots
            )));
        }
        u32::try_from(self.lots).map_err(|_| {
            SpanError::invalid_position(format!("lots {} exceeds {}", self.lots, u32::MAX))
        })
    }
}

// 3.1: worst scenario for the side. Buy → min, Sell → max.
pub fn worst_case_scenario(scenarios: &ScenarioSet, side: Side) -> Decimal {
    match side {
        Side::Buy => scenarios.min(),
        Side::Sell => scenarios.max(),
    }
}

// amount × lots, or InvalidPosition when the product leaves the decimal range.
fn scaled(amount: Decimal, lots: Decimal, component: &str) -> Result<Quote, SpanError> {
    amount.checked_mul(lots).map(Quote::new).ok_or_else(|| {
        SpanError::invalid_position(format!("{component} margin overflows for {lots} units"))
    })
}

fn exposure_margin(reference: Price, params: &MarginParams, lots: Decimal) -> Result<Quote, SpanError> {
    let per_unit = reference
        .value()
        .checked_mul(params.exposure_rate)
        .ok_or_else(|| SpanError::invalid_position("exposure rate overflows the reference price"))?;
    scaled(per_unit, lots, "exposure")
}

pub fn futures_margin(
    record: &FuturesRiskRecord,
    side: Side,
    lot_size: u64,
    params: &MarginParams,
) -> Result<MarginResult, SpanError> {
    let lots = Decimal::from(lot_size);
    let worst = worst_case_scenario(&record.scenarios, side);

    let span = scaled(worst.abs(), lots, "span")?;
    let exposure = exposure_margin(record.reference_price, params, lots)?;
    MarginResult::new(span, exposure)
}

// 3.2: writer covers the worst down-scenario plus the full premium buy-back.
// exposure uses the document-wide phy price, not the option's own underlying.
pub fn option_margin(
    record: &OptionRiskRecord,
    underlying_reference: Price,
    side: Side,
    lot_size: u64,
    params: &MarginParams,
) -> Result<MarginResult, SpanError> {
    match side {
        Side::Buy => Ok(MarginResult::zero()),
        Side::Sell => {
            let lots = Decimal::from(lot_size);
            let worst = record
                .scenarios
                .min()
                .abs()
                .checked_add(record.premium)
                .ok_or_else(|| SpanError::invalid_position("premium overflows the worst-case loss"))?;

            let span = scaled(worst, lots, "span")?;
            let exposure = exposure_margin(underlying_reference, params, lots)?;
            MarginResult::new(span, exposure)
        }
    }
}

/// Requested lots scaled by the contract lot size. Without a known lot size the
/// requested count is used as the multiplier unchanged.
pub fn select_lot_multiplier(requested_lots: u32, contract_lot_size: Option<u32>) -> u64 {
    match contract_lot_size {
        Some(lot_size) => u64::from(requested_lots) * u64::from(lot_size),
        None => u64::from(requested_lots),
    }
}

/// Borrows the index and the reference tables; holds no mutable state.
#[derive(Debug, Clone)]
pub struct MarginEngine<'a> {
    index: &'a RiskIndex,
    reference: Option<&'a ReferenceTables>,
    params: MarginParams,
}

impl<'a> MarginEngine<'a> {
    pub fn new(index: &'a RiskIndex, params: MarginParams) -> Self {
        Self {
            index,
            reference: None,
            params,
        }
    }

    pub fn with_reference(mut self, reference: &'a ReferenceTables) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn compute_futures(
        &self,
        record: &FuturesRiskRecord,
        side: Side,
        lot_size: u64,
    ) -> Result<MarginResult, SpanError> {
        futures_margin(record, side, lot_size, &self.params)
    }

    pub fn compute_option(
        &self,
        record: &OptionRiskRecord,
        underlying_reference: Price,
        side: Side,
        lot_size: u64,
    ) -> Result<MarginResult, SpanError> {
        option_margin(record, underlying_reference, side, lot_size, &self.params)
    }

    pub fn lot_multiplier(&self, symbol: &str, requested_lots: u32) -> u64 {
        let contract_lot_size = self
            .reference
            .and_then(|tables| tables.lot_sizes.lot_size(symbol));
        if contract_lot_size.is_none() {
            warn!(symbol, requested_lots, "no contract lot size known, using requested lots as multiplier");
        }
        select_lot_multiplier(requested_lots, contract_lot_size)
    }

    /// Validates, resolves the lot multiplier, looks up and computes.
    pub fn compute(&self, position: &Position) -> Result<MarginResult, SpanError> {
        let lots = position.validated_lots()?;

        let result = match position.kind {
            InstrumentKind::Futures => {
                let lot_size = self.lot_multiplier(&position.symbol, lots);
                let record = self.index.lookup_futures(&position.symbol, position.expiry)?;
                self.compute_futures(record, position.side, lot_size)?
            }
            InstrumentKind::Options => {
                let (option_type, strike) = match (position.option_type, position.strike) {
                    (Some(option_type), Some(strike)) => (option_type, strike),
                    (None, _) => {
                        return Err(SpanError::invalid_position("option position without option type"))
                    }
                    (_, None) => {
                        return Err(SpanError::invalid_position("option position without strike"))
                    }
                };

                match position.side {
                    // long options carry no margin; nothing to look up
                    Side::Buy => MarginResult::zero(),
                    Side::Sell => {
                        let lot_size = self.lot_multiplier(&position.symbol, lots);
                        let record = self.index.lookup_option(
                            &position.symbol,
                            position.expiry,
                            option_type,
                            strike,
                        )?;
                        let underlying = self.index.underlying_reference()?;
                        self.compute_option(record, underlying, position.side, lot_size)?
                    }
                }
            }
        };

        debug!(
            symbol = %position.symbol,
            expiry = %position.expiry,
            side = %position.side,
            span = %result.span,
            exposure = %result.exposure,
            total = %result.total,
            "margin computed"
        );
        Ok(result)
    }
}
