//! Command line configuration

use std::path::PathBuf;

use clap::{Args, Parser};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Checkout inputs.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Directory holding the fixture sets
    #[arg(long, env = "TALLY_FIXTURES", default_value = "./fixtures")]
    pub fixtures: PathBuf,

    /// Fixture set to price
    #[arg(long, default_value = "default")]
    pub fixture: String,

    /// Coupon code to apply (repeatable)
    #[arg(long = "coupon", value_name = "CODE")]
    pub coupons: Vec<String>,

    /// Shipping method id; defaults to the first available method
    #[arg(long, value_name = "ID")]
    pub shipping: Option<u32>,

    /// Key of the order snapshot to create
    #[arg(long, default_value = "ORDER-1")]
    pub order: String,
}

/// Tally configuration
#[derive(Debug, Parser)]
#[command(name = "tally", about = "Price a cart and freeze it into an order", long_about = None)]
pub struct CliConfig {
    /// Checkout inputs.
    #[command(flatten)]
    pub checkout: CheckoutArgs,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl CliConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}
