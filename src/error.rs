// 7.0: the one error type the index and the engine return.

use crate::types::{ExpiryKey, OptionType, Strike};
use std::fmt;
use std::path::PathBuf;

/// Identifies the instrument a lookup was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentKey {
    Futures {
        symbol: String,
        expiry: ExpiryKey,
    },
    Option {
        symbol: String,
        expiry: ExpiryKey,
        option_type: OptionType,
        strike: Strike,
    },
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKey::Futures { symbol, expiry } => write!(f, "FUT {symbol} {expiry}"),
            InstrumentKey::Option {
                symbol,
                expiry,
                option_type,
                strike,
            } => write!(f, "OPT {symbol} {expiry} {option_type} {strike}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpanError {
    #[error("Malformed risk document: {reason}")]
    MalformedRiskDocument { reason: String },

    #[error("Unknown instrument {0}")]
    UnknownInstrument(InstrumentKey),

    #[error("Invalid position: {reason}")]
    InvalidPosition { reason: String },

    #[error("Failed to read risk file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpanError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        SpanError::MalformedRiskDocument {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_position(reason: impl Into<String>) -> Self {
        SpanError::InvalidPosition {
            reason: reason.into(),
        }
    }
}
