use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::models::Resolution;
use crate::utils::TimelineOption;

#[derive(Parser)]
#[command(name = "vntrend")]
#[command(about = "Vietnamese stock trend and market breadth CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show price history, indicators and trend for one symbol
    Stock {
        /// Ticker symbol (e.g. VNM)
        symbol: String,
        /// Bar resolution: 1D, 1W or 1M
        #[arg(short, long, default_value = "1D")]
        resolution: Resolution,
        /// Display window: 3m, 6m, 1y, ytd
        #[arg(short, long)]
        timeline: Option<TimelineOption>,
        /// Custom window start (YYYY-MM-DD), overrides --timeline
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Custom window end (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Print the latest indicator values
        #[arg(short, long)]
        indicators: bool,
        /// Number of recent bars to print
        #[arg(short, long, default_value_t = 10)]
        bars: usize,
    },
    /// Score every symbol and report market breadth
    Trend {
        /// Comma-separated symbols; the full listing when omitted
        #[arg(short, long, value_delimiter = ',')]
        symbols: Vec<String>,
        /// Days of daily history to load
        #[arg(short, long, default_value_t = 365)]
        days: i64,
        /// Number of breadth rows to print
        #[arg(long, default_value_t = 10)]
        history: usize,
        /// Number of top and bottom signals to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// List the symbol universe
    Symbols,
}

pub async fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stock { symbol, resolution, timeline, start, end, indicators, bars } => {
            let args = commands::stock::StockArgs { symbol, resolution, timeline, start, end, indicators, bars };
            commands::stock::run(args).await;
        }
        Commands::Trend { symbols, days, history, top } => {
            commands::trend::run(symbols, days, history, top).await;
        }
        Commands::Symbols => {
            commands::symbols::run().await;
        }
    }
}
