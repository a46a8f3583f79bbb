//! SPAN margin calculator.
//!
//! Loads an exchange risk file once, then prices a single futures or option
//! position, or lists what the file offers.

use clap::{Parser, Subcommand, ValueEnum};
use span_core::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// SPAN margin calculator over exchange risk-array files
#[derive(Parser, Debug)]
#[command(name = "span-calc")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Exchange risk file (SPAN XML)
    #[arg(short, long, value_name = "FILE")]
    risk_file: PathBuf,

    /// Calculator configuration (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SPAN_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Margin for one position
    Margin {
        #[arg(short, long)]
        symbol: String,

        /// YYYYMMDD or DD-Mon-YYYY
        #[arg(short, long)]
        expiry: String,

        #[arg(short, long, value_enum)]
        kind: KindArg,

        #[arg(long, value_enum)]
        side: SideArg,

        #[arg(short, long, default_value = "1", allow_negative_numbers = true)]
        lots: i64,

        #[arg(short = 't', long, value_enum)]
        option_type: Option<OptionTypeArg>,

        #[arg(long)]
        strike: Option<String>,

        /// Contract lot size; without it lots are used as units
        #[arg(long)]
        lot_size: Option<i64>,
    },

    /// Listed strikes for a symbol, expiry and option type
    Strikes {
        #[arg(short, long)]
        symbol: String,

        #[arg(short, long)]
        expiry: String,

        #[arg(short = 't', long, value_enum)]
        option_type: OptionTypeArg,
    },

    /// Symbols and expiries present in the risk file
    Symbols,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Futures,
    Options,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SideArg {
    Buy,
    Sell,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OptionTypeArg {
    Call,
    Put,
}

impl From<KindArg> for InstrumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Futures => InstrumentKind::Futures,
            KindArg::Options => InstrumentKind::Options,
        }
    }
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => Side::Buy,
            SideArg::Sell => Side::Sell,
        }
    }
}

impl From<OptionTypeArg> for OptionType {
    fn from(option_type: OptionTypeArg) -> Self {
        match option_type {
            OptionTypeArg::Call => OptionType::Call,
            OptionTypeArg::Put => OptionType::Put,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_expiry(raw: &str) -> Result<ExpiryKey, String> {
    ExpiryKey::parse_any(raw).ok_or_else(|| format!("expiry {raw:?} is neither YYYYMMDD nor DD-Mon-YYYY"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match &cli.config {
        Some(path) => CalculatorConfig::from_path(path)?,
        None => CalculatorConfig::default(),
    };
    config.validate()?;

    info!(risk_file = %cli.risk_file.display(), "loading risk file");
    let index = RiskIndex::from_path(&cli.risk_file, &config.index)?;

    match cli.command {
        Command::Margin {
            symbol,
            expiry,
            kind,
            side,
            lots,
            option_type,
            strike,
            lot_size,
        } => {
            let strike = strike
                .map(|raw| Strike::parse(&raw).ok_or_else(|| format!("strike {raw:?} is not a positive number")))
                .transpose()?;

            let position = Position {
                symbol: symbol.clone(),
                expiry: parse_expiry(&expiry)?,
                kind: kind.into(),
                side: side.into(),
                option_type: option_type.map(Into::into),
                strike,
                lots,
            };

            let tables = ReferenceTables::with_lot_sizes(LotSizeTable::from_rows(
                lot_size.map(|size| (symbol, size)),
            ));
            let engine = MarginEngine::new(&index, config.margin.clone()).with_reference(&tables);
            let result = engine.compute(&position)?;

            println!("SPAN Margin : {:>16.2}", result.span.round_cents());
            println!("Exposure    : {:>16.2}", result.exposure.round_cents());
            println!("Total       : {:>16.2}", result.total.round_cents());
        }

        Command::Strikes {
            symbol,
            expiry,
            option_type,
        } => {
            let expiry = parse_expiry(&expiry)?;
            let strikes = index.available_strikes(&symbol, expiry, option_type.into());
            if strikes.is_empty() {
                println!("no strikes listed for {symbol} {expiry}");
            }
            for strike in strikes {
                println!("{strike}");
            }
        }

        Command::Symbols => {
            for symbol in index.futures_symbols() {
                let expiries: Vec<String> = index
                    .futures_expiries(symbol)
                    .iter()
                    .map(ExpiryKey::to_display)
                    .collect();
                println!("FUT {symbol}: {}", expiries.join(", "));
            }
            for symbol in index.option_symbols() {
                let expiries: Vec<String> = index
                    .option_expiries(symbol)
                    .iter()
                    .map(ExpiryKey::to_display)
                    .collect();
                println!("OPT {symbol}: {}", expiries.join(", "));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn margin_command_parses() {
        let cli = Cli::try_parse_from([
            "span-calc",
            "--risk-file",
            "risk.xml",
            "--log-level",
            "debug",
            "margin",
            "--symbol",
            "NIFTY",
            "--expiry",
            "27-Feb-2025",
            "--kind",
            "options",
            "--side",
            "sell",
            "-t",
            "call",
            "--strike",
            "22000",
            "--lots",
            "-2",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Margin { lots, strike, lot_size, .. } => {
                assert_eq!(lots, -2);
                assert_eq!(strike.as_deref(), Some("22000"));
                assert_eq!(lot_size, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
