use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxb::log::init_logging;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxb::AppCommand {
    fn from(cmd: Commands) -> fxb::AppCommand {
        match cmd {
            Commands::Rates => fxb::AppCommand::Rates,
            Commands::Total => fxb::AppCommand::Total,
            Commands::Balance { set, add } => fxb::AppCommand::Balance { set, add },
            Commands::Watch { period } => fxb::AppCommand::Watch {
                period_minutes: period,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

/// Parses a `code=amount` balance entry.
fn parse_entry(s: &str) -> Result<(String, Decimal), String> {
    let (code, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=AMOUNT, got {s:?}"))?;
    let amount = amount
        .parse::<Decimal>()
        .map_err(|e| format!("invalid amount {amount:?}: {e}"))?;
    Ok((code.to_string(), amount))
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display exchange rates between the held currencies
    Rates,
    /// Display the total balance value in each held currency
    Total,
    /// Display the balance, optionally replacing or adjusting it first
    Balance {
        /// Replace the balance with the given entries, e.g. --set usd=100
        #[arg(long = "set", value_name = "CODE=AMOUNT", value_parser = parse_entry)]
        set: Vec<(String, Decimal)>,
        /// Add deltas to held currencies, e.g. --add usd=10
        #[arg(long = "add", value_name = "CODE=AMOUNT", value_parser = parse_entry, allow_hyphen_values = true)]
        add: Vec<(String, Decimal)>,
    },
    /// Periodically refresh and display rates and totals
    Watch {
        /// Refresh period in minutes (defaults to refresh_minutes from config)
        #[arg(long)]
        period: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => fxb::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = fxb::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
balance:
  usd: 100
  eur: 50
  rub: 1000

providers:
  cbr:
    base_url: "https://www.cbr-xml-daily.ru"

refresh_minutes: 5
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
