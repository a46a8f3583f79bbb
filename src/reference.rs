// 4.0: reference tables handed over by the loader: contract lot sizes, the expiry
// calendar and the eligibility list. built once from rows, read-only afterwards.
// reading the files themselves is the loader's job, not this module's.

use crate::types::ExpiryKey;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::warn;

/// Exchange test symbols end with this and are never offered for selection.
pub const TEST_SYMBOL_SUFFIX: &str = "TEST";

// 4.1: symbol → contract lot size. a repeated symbol keeps its last row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotSizeTable {
    sizes: HashMap<String, u32>,
}

impl LotSizeTable {
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut sizes = HashMap::new();
        for (symbol, lot_size) in rows {
            let symbol = symbol.into();
            match u32::try_from(lot_size) {
                Ok(size) if size > 0 => {
                    sizes.insert(symbol, size);
                }
                _ => warn!(symbol = %symbol, lot_size, "skipping non-positive lot size row"),
            }
        }
        Self { sizes }
    }

    pub fn lot_size(&self, symbol: &str) -> Option<u32> {
        self.sizes.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

// 4.2: symbol → listed expiries, ordered by date rather than by display string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiryCalendar {
    expiries: BTreeMap<String, BTreeSet<ExpiryKey>>,
}

impl ExpiryCalendar {
    /// Rows carry the expiry as `DD-Mon-YYYY` or `YYYYMMDD`; anything else is skipped.
    pub fn from_rows<I, S, E>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, E)>,
        S: Into<String>,
        E: AsRef<str>,
    {
        let mut expiries: BTreeMap<String, BTreeSet<ExpiryKey>> = BTreeMap::new();
        for (symbol, raw) in rows {
            let symbol = symbol.into();
            let raw = raw.as_ref();
            match ExpiryKey::parse_any(raw) {
                Some(expiry) => {
                    expiries.entry(symbol).or_default().insert(expiry);
                }
                None => warn!(symbol = %symbol, expiry = raw, "skipping unparsable expiry row"),
            }
        }
        Self { expiries }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.expiries.keys().map(String::as_str)
    }

    /// Sorted symbols, exchange test symbols removed.
    pub fn selectable_symbols(&self) -> Vec<&str> {
        self.symbols()
            .filter(|s| !s.ends_with(TEST_SYMBOL_SUFFIX))
            .collect()
    }

    pub fn expiries(&self, symbol: &str) -> Vec<ExpiryKey> {
        self.expiries
            .get(symbol)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityList {
    symbols: HashSet<String>,
}

impl EligibilityList {
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Everything the loader hands over in one place. The margin engine reads the
/// lot sizes from here; the calendar and eligibility feed instrument pickers.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub lot_sizes: LotSizeTable,
    pub calendar: ExpiryCalendar,
    pub eligibility: EligibilityList,
}

impl ReferenceTables {
    /// Tables with only lot sizes known.
    pub fn with_lot_sizes(lot_sizes: LotSizeTable) -> Self {
        Self {
            lot_sizes,
            ..Self::default()
        }
    }
}
