use crate::analysis::{breadth_history, latest_day_signals, score_series, summarize, LatestSignal, ScoredSeries};
use crate::error::{AppError, Result};
use crate::models::{FetchConfig, Resolution};
use crate::services::{StockService, SymbolUniverse};
use crate::utils::{format_price, market_date, SystemClock};
use chrono::{Duration, Utc};
use std::sync::Arc;

pub async fn run(symbols: Vec<String>, days: i64, history: usize, top: usize) {
    println!("📊 Market Trend\n");

    if let Err(e) = show_trend(symbols, days, history, top).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn show_trend(symbols: Vec<String>, days: i64, history: usize, top: usize) -> Result<()> {
    if days <= 0 {
        return Err(AppError::InvalidInput(format!("days must be positive, got {}", days)));
    }

    let config = FetchConfig::from_env();
    let symbols = if symbols.is_empty() {
        let universe = SymbolUniverse::with_clock(
            config.symbols_url.clone(),
            config.symbols_ttl_secs,
            Arc::new(SystemClock),
        )?;
        universe.symbols().await.as_ref().clone()
    } else {
        symbols
    };

    let end = market_date(Utc::now());
    let start = end - Duration::days(days);
    let service = StockService::from_config(&config)?;
    let market = service.get_multiple_stocks(&symbols, start, end, Resolution::Day1).await;

    let mut failed: Vec<&String> = market
        .iter()
        .filter_map(|(symbol, result)| result.is_err().then_some(symbol))
        .collect();
    failed.sort();

    let mut universe: Vec<ScoredSeries> = market
        .values()
        .filter_map(|result| result.as_ref().ok())
        .map(|series| score_series(series))
        .collect();
    universe.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    println!("   Loaded {} of {} symbols ({} → {})", universe.len(), market.len(), start, end);
    if !failed.is_empty() {
        println!("   ⚠️  No data: {}", failed.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "));
    }

    let signals = latest_day_signals(&universe);
    if signals.is_empty() {
        println!("\n⚠️  No scored bars available");
        return Ok(());
    }

    let summary = summarize(&signals);
    println!(
        "\n🔹 Latest session {}: {} symbols, {} positive ({:.1}%), {} negative ({:.1}%)",
        signals[0].date, summary.total, summary.positive, summary.positive_pct, summary.negative, summary.negative_pct
    );

    let (strongest, weakest) = strongest_and_weakest(&signals, top);
    println!("\n🟢 Strongest");
    for signal in strongest {
        print_signal(signal);
    }
    if !weakest.is_empty() {
        println!("\n🔴 Weakest");
        for signal in weakest.iter().rev() {
            print_signal(signal);
        }
    }

    let breadth = breadth_history(&universe);
    println!(
        "\n{:<12} {:>5} {:>5} {:>8} {:>7} {:>7} {:>7} {:>6}  {}",
        "Date", "Adv", "Dec", "ADLine", "TRIN", ">MA50", ">MA200", "Score", "Status"
    );
    let skip = breadth.len().saturating_sub(history);
    for snap in breadth[skip..].iter().rev() {
        println!(
            "{:<12} {:>5} {:>5} {:>8} {:>7.2} {:>6.0}% {:>6.0}% {:>6}  {}",
            snap.date,
            snap.advances,
            snap.declines,
            snap.ad_line,
            snap.trin,
            snap.pct_above_ma50 * 100.0,
            snap.pct_above_ma200 * 100.0,
            snap.total_score,
            snap.status
        );
    }

    Ok(())
}

/// Head and tail of score-sorted signals, at most `top` each and never overlapping
fn strongest_and_weakest(signals: &[LatestSignal], top: usize) -> (&[LatestSignal], &[LatestSignal]) {
    let head = top.min(signals.len());
    let tail_start = signals.len().saturating_sub(top).max(head);
    (&signals[..head], &signals[tail_start..])
}

fn print_signal(signal: &LatestSignal) {
    println!(
        "   {:<6} {:>12} {:>4}  {:<14} ADX {:>6}{}",
        signal.symbol,
        format_price(Some(signal.close)),
        signal.raw_score,
        signal.label.to_string(),
        format_price(signal.adx),
        if signal.high_volume { "  🔊 high volume" } else { "" }
    );
}
