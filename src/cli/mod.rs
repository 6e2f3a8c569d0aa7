//! CLI argument parsing using clap.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Execution core: order reconciliation, OCO pairs, trailing stops
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set the verbosity level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub verbose: String,

    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run all daemons against paper venues until Ctrl-C
    Run {
        /// Initial paper price, e.g. "BTCUSDT=65000" (repeatable)
        #[arg(long = "seed-price", value_parser = parse_seed_price)]
        seed_prices: Vec<(String, Decimal)>,
        /// Maximum per-second random price move as a fraction
        #[arg(long, default_value_t = 0.002, value_parser = parse_walk_step)]
        walk_step: f64,
    },

    /// Run a single reconciliation pass and print the report
    ReconcileOnce,
}

/// Parse `SYMBOL=PRICE`.
pub fn parse_seed_price(s: &str) -> Result<(String, Decimal), String> {
    let (symbol, price) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected SYMBOL=PRICE, got '{}'", s))?;
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(format!("Missing symbol in '{}'", s));
    }
    let price: Decimal = price
        .trim()
        .parse()
        .map_err(|e| format!("Invalid price in '{}': {}", s, e))?;
    if price <= Decimal::ZERO {
        return Err(format!("Price must be positive in '{}'", s));
    }
    Ok((symbol.to_string(), price))
}

/// Parse a random-walk step: a finite fraction in `[0, 1)`.
pub fn parse_walk_step(s: &str) -> Result<f64, String> {
    let step: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("Invalid walk step '{}': {}", s, e))?;
    if !step.is_finite() || !(0.0..1.0).contains(&step) {
        return Err(format!("Walk step must be in [0, 1), got '{}'", s));
    }
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_seed_price() {
        assert_eq!(parse_seed_price("BTCUSDT=65000.5"), Ok(("BTCUSDT".to_string(), dec!(65000.5))));
        assert!(parse_seed_price("BTCUSDT").is_err());
        assert!(parse_seed_price("=5").is_err());
        assert!(parse_seed_price("X=abc").is_err());
        assert!(parse_seed_price("X=-1").is_err());
    }

    #[test]
    fn test_parse_walk_step() {
        assert_eq!(parse_walk_step("0.01"), Ok(0.01));
        assert_eq!(parse_walk_step("0"), Ok(0.0));
        assert!(parse_walk_step("-0.01").is_err());
        assert!(parse_walk_step("NaN").is_err());
        assert!(parse_walk_step("inf").is_err());
        assert!(parse_walk_step("1.5").is_err());
        assert!(parse_walk_step("fast").is_err());
    }

    #[test]
    fn test_cli_rejects_negative_walk_step() {
        let result = Cli::try_parse_from(["execution-core", "run", "--walk-step=-0.5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "execution-core",
            "--verbose",
            "debug",
            "run",
            "--seed-price",
            "BTC=100",
            "--seed-price",
            "ETH=10",
        ])
        .unwrap();
        assert_eq!(cli.verbose, "debug");
        match cli.command {
            Commands::Run { seed_prices, walk_step } => {
                assert_eq!(seed_prices.len(), 2);
                assert_eq!(walk_step, 0.002);
            }
            Commands::ReconcileOnce => panic!("wrong command"),
        }
    }

    #[test]
    fn test_cli_parses_reconcile_once_with_config() {
        let cli = Cli::try_parse_from(["execution-core", "reconcile-once", "--config", "core.json"]).unwrap();
        assert!(matches!(cli.command, Commands::ReconcileOnce));
        assert_eq!(cli.config.as_deref(), Some("core.json"));
    }
}
