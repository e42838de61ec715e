//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::MarketPanelError;
use crate::domain::market::{parse_codes, KeyOrder, Market};
use crate::domain::table::{Index, Table};
use crate::ports::config_port::ConfigPort;
use crate::ports::query_port::{DailyRequest, QueryPort};

#[derive(Parser, Debug)]
#[command(name = "marketpanel", about = "Market data query tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List table names visible on the connection
    Tables {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Fetch the trading calendar
    Calendar {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value = "cn")]
        market: String,
        /// Filter to open (1) or closed (0) days
        #[arg(long)]
        is_open: Option<u8>,
    },
    /// Fetch static reference data
    Basic {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value = "cn")]
        market: String,
        /// Comma-separated code list
        #[arg(long)]
        codes: Option<String>,
    },
    /// Fetch daily bars
    Daily {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated code list
        #[arg(long)]
        codes: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "cn")]
        market: String,
        /// Leading index component: "symbol" or "date"
        #[arg(long, default_value = "symbol")]
        first_index: String,
        /// Query the adjusted-price table
        #[arg(long)]
        adjusted: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Tables { config } => run_tables(&config),
        Command::Calendar {
            config,
            market,
            is_open,
        } => run_calendar(&config, &market, is_open),
        Command::Basic {
            config,
            market,
            codes,
        } => run_basic(&config, &market, codes.as_deref()),
        Command::Daily {
            config,
            codes,
            start,
            end,
            market,
            first_index,
            adjusted,
        } => run_daily(&config, &codes, start, end, &market, &first_index, adjusted),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

#[cfg(feature = "sqlite")]
const DEFAULT_BACKEND: &str = "sqlite";
#[cfg(all(not(feature = "sqlite"), feature = "postgres"))]
const DEFAULT_BACKEND: &str = "postgres";
#[cfg(all(not(feature = "sqlite"), not(feature = "postgres")))]
const DEFAULT_BACKEND: &str = "none";

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, MarketPanelError> {
    FileConfigAdapter::from_file(path).map_err(|e| MarketPanelError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn build_query_port(config: &FileConfigAdapter) -> Result<Box<dyn QueryPort>, MarketPanelError> {
    let backend = config
        .get_string("database", "backend")
        .unwrap_or_else(|| DEFAULT_BACKEND.to_string());
    match backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Box::new(
            crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?,
        )),
        #[cfg(feature = "postgres")]
        "postgres" => Ok(Box::new(
            crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?,
        )),
        other => Err(MarketPanelError::ConfigInvalid {
            section: "database".into(),
            key: "backend".into(),
            reason: format!("unsupported backend \"{other}\""),
        }),
    }
}

fn run_tables(config_path: &PathBuf) -> Result<(), MarketPanelError> {
    let config = load_config(config_path)?;
    let port = build_query_port(&config)?;
    for table in port.show_tables()? {
        println!("{table}");
    }
    Ok(())
}

fn run_calendar(
    config_path: &PathBuf,
    market: &str,
    is_open: Option<u8>,
) -> Result<(), MarketPanelError> {
    let market: Market = market.parse()?;
    let is_open = match is_open {
        None => None,
        Some(0) => Some(false),
        Some(1) => Some(true),
        Some(other) => {
            return Err(MarketPanelError::InvalidArgument {
                reason: format!("--is-open must be 0 or 1, got {other}"),
            });
        }
    };

    let config = load_config(config_path)?;
    let port = build_query_port(&config)?;
    let table = port.trade_calendar(market, is_open)?;
    print_table(&table);
    Ok(())
}

fn run_basic(
    config_path: &PathBuf,
    market: &str,
    codes: Option<&str>,
) -> Result<(), MarketPanelError> {
    let market: Market = market.parse()?;
    let codes = codes.map(parse_codes).transpose()?;

    let config = load_config(config_path)?;
    let port = build_query_port(&config)?;
    let table = port.stock_basic(market, codes.as_deref())?;
    print_table(&table);
    Ok(())
}

fn run_daily(
    config_path: &PathBuf,
    codes: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    market: &str,
    first_index: &str,
    adjusted: bool,
) -> Result<(), MarketPanelError> {
    let market: Market = market.parse()?;
    let key_order: KeyOrder = first_index.parse()?;
    let codes = parse_codes(codes)?;

    let mut req = DailyRequest::new(codes, market).with_key_order(key_order);
    match (start, end) {
        (Some(start), Some(end)) => req = req.with_range(start, end),
        (None, None) => {}
        _ => {
            return Err(MarketPanelError::InvalidArgument {
                reason: "--start and --end must be given together".into(),
            });
        }
    }

    let config = load_config(config_path)?;
    let port = build_query_port(&config)?;
    let table = if adjusted {
        port.daily_adjusted(&req)?
    } else {
        port.daily(&req)?
    };

    eprintln!("{} rows", table.row_count());
    print_table(&table);
    Ok(())
}

fn print_table(table: &Table) {
    let columns = table.columns().join("\t");
    match table.index() {
        Index::Single { name, keys } => {
            println!("{name}\t{columns}");
            for (key, row) in keys.iter().zip(table.rows()) {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("{key}\t{}", cells.join("\t"));
            }
        }
        Index::Compound { names, keys } => {
            println!("{}\t{}\t{columns}", names[0], names[1]);
            for ((a, b), row) in keys.iter().zip(table.rows()) {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("{a}\t{b}\t{}", cells.join("\t"));
            }
        }
    }
}
