//! End-to-end tests over a sample exchange risk file.
//!
//! Parse, index and margin a handful of positions the way a front end would.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use span_core::*;
use std::path::PathBuf;

const SAMPLE: &str = include_str!("fixtures/risk_sample.xml");

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/risk_sample.xml")
}

fn sample_index() -> RiskIndex {
    let document = RiskDocument::parse_str(SAMPLE).unwrap();
    RiskIndex::build(&document, &IndexParams::default()).unwrap()
}

fn feb() -> ExpiryKey {
    ExpiryKey::from_display("27-Feb-2025").unwrap()
}

#[test]
fn file_and_string_parse_agree() {
    let from_file = RiskDocument::from_path(sample_path()).unwrap();
    let from_str = RiskDocument::parse_str(SAMPLE).unwrap();
    assert_eq!(from_file, from_str);

    let index = RiskIndex::from_path(sample_path(), &IndexParams::default()).unwrap();
    assert_eq!(index.futures_count(), 3);
    assert_eq!(index.option_count(), 6);
}

#[test]
fn phy_reference_captured_once() {
    let index = sample_index();
    assert_eq!(index.underlying_reference().unwrap().value(), dec!(2000));
}

#[test]
fn lookups_exist_iff_listed() {
    let index = sample_index();
    let mar = ExpiryKey::parse("20250327").unwrap();

    assert!(index.lookup_futures("NIFTY", feb()).is_ok());
    assert!(index.lookup_futures("NIFTY", mar).is_ok());
    assert!(index.lookup_futures("SBIN", feb()).is_ok());
    assert!(matches!(
        index.lookup_futures("SBIN", mar),
        Err(SpanError::UnknownInstrument(InstrumentKey::Futures { .. }))
    ));

    let strike = Strike::parse("22000").unwrap();
    assert!(index.lookup_option("NIFTY", feb(), OptionType::Call, strike).is_ok());
    assert!(index.lookup_option("NIFTY", feb(), OptionType::Put, strike).is_ok());
    assert!(index.lookup_option("NIFTY", mar, OptionType::Call, strike).is_ok());
    assert!(matches!(
        index.lookup_option("NIFTY", mar, OptionType::Put, strike),
        Err(SpanError::UnknownInstrument(InstrumentKey::Option { .. }))
    ));
    assert!(index.lookup_option("SBIN", feb(), OptionType::Call, strike).is_err());
}

#[test]
fn strike_spellings_resolve_to_one_record() {
    let index = sample_index();
    for raw in ["22000", "22000.0", "22000.00", "2.2e4"] {
        let strike = Strike::parse(raw).unwrap();
        let record = index
            .lookup_option("NIFTY", feb(), OptionType::Call, strike)
            .unwrap_or_else(|err| panic!("{raw}: {err}"));
        assert_eq!(record.premium, dec!(5));
    }
}

#[test]
fn strikes_listed_in_order() {
    let index = sample_index();

    let calls: Vec<Decimal> = index
        .available_strikes("NIFTY", feb(), OptionType::Call)
        .iter()
        .map(Strike::value)
        .collect();
    assert_eq!(calls, vec![dec!(21900.5), dec!(22000), dec!(22100)]);

    let puts: Vec<Decimal> = index
        .available_strikes("NIFTY", feb(), OptionType::Put)
        .iter()
        .map(Strike::value)
        .collect();
    assert_eq!(puts, vec![dec!(21800), dec!(22000)]);

    assert!(index
        .available_strikes("NIFTY", ExpiryKey::parse("20250424").unwrap(), OptionType::Call)
        .is_empty());
}

#[test]
fn futures_buy_example() {
    let index = sample_index();
    let tables = ReferenceTables::with_lot_sizes(LotSizeTable::from_rows([("NIFTY", 50)]));
    let engine = MarginEngine::new(&index, MarginParams::default()).with_reference(&tables);

    let result = engine
        .compute(&Position::futures("NIFTY", feb(), Side::Buy, 1))
        .unwrap();
    assert_eq!(result.span.value(), dec!(6000));
    assert_eq!(result.exposure.value(), dec!(1000));
    assert_eq!(result.total.value(), dec!(7000));
}

#[test]
fn option_sell_example() {
    let index = sample_index();
    let tables = ReferenceTables::with_lot_sizes(LotSizeTable::from_rows([("NIFTY", 25)]));
    let engine = MarginEngine::new(&index, MarginParams::default()).with_reference(&tables);

    let position = Position::option(
        "NIFTY",
        feb(),
        Side::Sell,
        OptionType::Call,
        Strike::parse("22000").unwrap(),
        1,
    );
    let result = engine.compute(&position).unwrap();
    assert_eq!(result.span.value(), dec!(1125));
    assert_eq!(result.exposure.value(), dec!(1000));
    assert_eq!(result.total.value(), dec!(2125));
}

#[test]
fn option_buy_example_is_zero() {
    let index = sample_index();
    let engine = MarginEngine::new(&index, MarginParams::default());

    let position = Position::option(
        "NIFTY",
        feb(),
        Side::Buy,
        OptionType::Put,
        Strike::parse("21800").unwrap(),
        10,
    );
    let result = engine.compute(&position).unwrap();
    assert_eq!(result.span.value(), Decimal::ZERO);
    assert_eq!(result.exposure.value(), Decimal::ZERO);
    assert_eq!(result.total.value(), Decimal::ZERO);
}

#[test]
fn option_exposure_uses_phy_not_series_price() {
    let index = sample_index();
    let engine = MarginEngine::new(&index, MarginParams::default());

    // March series: exposure is still priced off the single phy value
    let position = Position::option(
        "NIFTY",
        ExpiryKey::parse("20250327").unwrap(),
        Side::Sell,
        OptionType::Call,
        Strike::parse("22000").unwrap(),
        3,
    );
    let result = engine.compute(&position).unwrap();
    assert_eq!(result.span.value(), dec!(660)); // (140 + 80) × 3
    assert_eq!(result.exposure.value(), dec!(120)); // 2000 × 0.02 × 3
}

#[test]
fn unknown_lot_size_falls_back_to_requested_lots() {
    let index = sample_index();
    let engine = MarginEngine::new(&index, MarginParams::default());

    let result = engine
        .compute(&Position::futures("SBIN", feb(), Side::Sell, 4))
        .unwrap();
    // max scenario 8.75 × 4, 750.40 × 0.02 × 4
    assert_eq!(result.span.value(), dec!(35));
    assert_eq!(result.exposure.value(), dec!(60.032));
    assert_eq!(result.total.round_cents(), dec!(95.03));
}

#[test]
fn display_and_key_expiry_forms_price_identically() {
    let index = sample_index();
    let engine = MarginEngine::new(&index, MarginParams::default());

    let by_key = Position::futures("NIFTY", ExpiryKey::parse("20250327").unwrap(), Side::Buy, 2);
    let by_display = Position::futures("NIFTY", ExpiryKey::parse_any("27-Mar-2025").unwrap(), Side::Buy, 2);
    assert_eq!(engine.compute(&by_key).unwrap(), engine.compute(&by_display).unwrap());
}

#[test]
fn document_without_phy_cannot_build() {
    let xml = SAMPLE.replace("<phy>", "<notPhy>").replace("</phy>", "</notPhy>");
    let document = RiskDocument::parse_str(&xml).unwrap();
    assert!(document.underlying_reference.is_none());
    assert!(matches!(
        RiskIndex::build(&document, &IndexParams::default()),
        Err(SpanError::MalformedRiskDocument { .. })
    ));
}

#[test]
fn option_sell_without_phy_reports_malformed() {
    let xml = SAMPLE.replace("<phy>", "<notPhy>").replace("</phy>", "</notPhy>");
    let document = RiskDocument::parse_str(&xml).unwrap();
    let params = IndexParams {
        require_underlying_reference: false,
        ..IndexParams::default()
    };
    let index = RiskIndex::build(&document, &params).unwrap();
    let engine = MarginEngine::new(&index, MarginParams::default());

    let position = Position::option(
        "NIFTY",
        feb(),
        Side::Sell,
        OptionType::Call,
        Strike::parse("22000").unwrap(),
        1,
    );
    assert!(matches!(
        engine.compute(&position),
        Err(SpanError::MalformedRiskDocument { .. })
    ));

    // futures don't need the phy price
    assert!(engine
        .compute(&Position::futures("NIFTY", feb(), Side::Buy, 1))
        .is_ok());
}

#[test]
fn strict_config_rejects_short_arrays() {
    let config = CalculatorConfig::strict();
    let document = RiskDocument::parse_str(SAMPLE).unwrap();
    assert!(matches!(
        RiskIndex::build(&document, &config.index),
        Err(SpanError::MalformedRiskDocument { .. })
    ));
}

#[test]
fn index_is_shareable_across_threads() {
    let index = std::sync::Arc::new(sample_index());
    let handles: Vec<_> = (1..=4)
        .map(|lots| {
            let index = std::sync::Arc::clone(&index);
            std::thread::spawn(move || {
                let engine = MarginEngine::new(&index, MarginParams::default());
                engine
                    .compute(&Position::futures("NIFTY", feb(), Side::Buy, lots))
                    .unwrap()
                    .span
                    .value()
            })
        })
        .collect();

    let spans: Vec<Decimal> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(spans, vec![dec!(120), dec!(240), dec!(360), dec!(480)]);
}
