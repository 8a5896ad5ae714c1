use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use evrent::SettlementEngine;
use evrent::application::payments::payment_params;
use evrent::config::{GatewayConfig, SettlementConfig};
use evrent::domain::money::Money;
use evrent::domain::ports::{ClockRef, Stores};
use evrent::domain::pricing;
use evrent::infrastructure::clock::SystemClock;
use evrent::interfaces::csv::bill_writer::BillWriter;
use evrent::interfaces::csv::command_reader::CommandReader;
use evrent::interfaces::csv::replay;
use evrent::interfaces::vnpay;
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote billable days and cost for a rental interval
    Quote {
        /// Daily rate, e.g. 500000
        #[arg(long)]
        rate: Money,
        /// Start instant (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// End instant (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
    },
    /// Build a signed payment URL
    Sign {
        /// Gateway configuration file (TOML)
        #[arg(long)]
        config: PathBuf,
        /// Merchant order reference
        #[arg(long)]
        order: String,
        #[arg(long)]
        amount: Money,
        /// Customer IP address
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,
        /// Order description shown by the gateway
        #[arg(long)]
        info: Option<String>,
    },
    /// Verify the signature of a gateway callback query string
    Verify {
        #[arg(long)]
        config: PathBuf,
        /// Callback URL or raw query string
        query: String,
    },
    /// Replay a CSV command file and print the resulting bills
    Replay {
        /// Input commands CSV file
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        /// Gateway configuration file (optional)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Quote { rate, start, end } => {
            let quote = pricing::calculate(rate, start, end).into_diagnostic()?;
            println!("days: {}", quote.days);
            println!("cost: {}", quote.cost);
        }
        Commands::Sign {
            config,
            order,
            amount,
            ip,
            info,
        } => {
            let gateway = SettlementConfig::load(config).into_diagnostic()?.gateway;
            let info = info.unwrap_or_else(|| format!("Payment {order}"));
            let params =
                payment_params(&gateway, &order, amount, &ip, &info, Utc::now()).into_diagnostic()?;
            let url = vnpay::build_signed_url(&gateway.base_url, &gateway.hash_secret, &params)
                .into_diagnostic()?;
            println!("{url}");
        }
        Commands::Verify { config, query } => {
            let gateway = SettlementConfig::load(config).into_diagnostic()?.gateway;
            let params = vnpay::parse_query(&query);
            if !vnpay::validate_callback(&params, &gateway.hash_secret) {
                return Err(miette!("signature invalid"));
            }
            println!("signature valid");
        }
        Commands::Replay {
            input,
            format,
            config,
        } => {
            let gateway = match config {
                Some(path) => SettlementConfig::load(path).into_diagnostic()?.gateway,
                // Replay never signs or verifies anything.
                None => GatewayConfig::new("offline", "offline"),
            };
            let clock: ClockRef = Arc::new(SystemClock);
            let engine = SettlementEngine::new(Stores::in_memory(), clock, gateway);

            let file = File::open(input).into_diagnostic()?;
            let reader = CommandReader::new(file);
            for command in reader.commands() {
                match command {
                    Ok(command) => {
                        if let Err(e) = replay::apply(&engine, command).await {
                            eprintln!("Error processing command: {}", e);
                        }
                    }
                    Err(e) => {
                        eprintln!("Error reading command: {}", e);
                    }
                }
            }

            let bills = engine.bills().await.into_diagnostic()?;
            let stdout = io::stdout();
            match format {
                OutputFormat::Csv => {
                    BillWriter::new(stdout.lock())
                        .write_bills(&bills)
                        .into_diagnostic()?;
                }
                OutputFormat::Json => {
                    let mut out = stdout.lock();
                    serde_json::to_writer_pretty(&mut out, &bills).into_diagnostic()?;
                    writeln!(out).into_diagnostic()?;
                }
            }
        }
    }

    Ok(())
}
