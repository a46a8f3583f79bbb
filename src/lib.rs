// span-core: SPAN-style initial margin over exchange risk-array files.
// risk file in, worst-scenario span plus flat exposure out.
// all computation is deterministic; the only I/O is reading the risk file once.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Side, OptionType, ExpiryKey, Strike, Price, Quote
//   2.x  document.rs: quick-xml parse of the risk file into typed portfolio nodes
//   3.x  margin.rs: worst-case selection, span/exposure, MarginEngine
//   4.x  reference.rs: lot sizes, expiry calendar, eligibility
//   5.x  index.rs: RiskIndex: record lookup, strike lists, phy reference price
//   5.1  record.rs: scenario sets, futures and option risk records
//   6.x  config.rs: margin + index params, presets, validation
//   7.x  error.rs: SpanError

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod margin;
pub mod record;
pub mod reference;
pub mod types;

// re exports for convenience
pub use config::{CalculatorConfig, ConfigError};
pub use document::RiskDocument;
pub use error::{InstrumentKey, SpanError};
pub use index::{IndexParams, RiskIndex};
pub use margin::*;
pub use record::*;
pub use reference::*;
pub use types::*;
