use crate::analysis::{score_series, ScoredBar};
use crate::constants::INDICATOR_LOOKBACK_DAYS;
use crate::error::{AppError, Result};
use crate::models::{FetchConfig, Resolution};
use crate::services::StockService;
use crate::utils::{
    calculate_change, format_price, format_volume, market_date, week52_stats, TimelineOption,
};
use chrono::{Duration, NaiveDate, Utc};

pub struct StockArgs {
    pub symbol: String,
    pub resolution: Resolution,
    pub timeline: Option<TimelineOption>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub indicators: bool,
    pub bars: usize,
}

pub async fn run(args: StockArgs) {
    println!("📈 {} ({})\n", args.symbol.trim().to_uppercase(), args.resolution);

    if let Err(e) = show_stock(args).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Display window from `--start/--end`, else the timeline preset ending today
fn display_window(args: &StockArgs, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let end = args.end.unwrap_or(today);
    let (start, end) = match args.start {
        Some(start) => (start, end),
        None => {
            let timeline = args.timeline.unwrap_or_else(|| TimelineOption::default_for(args.resolution));
            let (start, _) = timeline.date_range(args.resolution, end);
            (start, end)
        }
    };

    if start > end {
        return Err(AppError::InvalidInput(format!("start {} is after end {}", start, end)));
    }
    Ok((start, end))
}

async fn show_stock(args: StockArgs) -> Result<()> {
    let today = market_date(Utc::now());
    let (display_start, display_end) = display_window(&args, today)?;
    let fetch_start = display_start.min(display_end - Duration::days(INDICATOR_LOOKBACK_DAYS));

    let service = StockService::from_config(&FetchConfig::from_env())?;
    let data = service
        .get_stock(&args.symbol, fetch_start, display_end, args.resolution, args.indicators)
        .await?;

    let scored = score_series(&data.series);
    let visible: Vec<&ScoredBar> = scored
        .rows
        .iter()
        .filter(|row| row.bar.date() >= display_start)
        .collect();

    let Some(latest) = visible.last() else {
        println!("⚠️  No bars between {} and {}", display_start, display_end);
        return Ok(());
    };

    println!("   Window:  {} → {} ({} bars)", display_start, display_end, visible.len());
    println!(
        "   Close:   {} ({:+.2}%)",
        format_price(Some(latest.bar.close)),
        calculate_change(latest.bar.close, latest.prev_close)
    );
    println!("   Volume:  {}", format_volume(latest.bar.volume));
    println!(
        "   Trend:   {} (raw {}, 10-bar {})",
        latest.label(),
        latest.raw_score,
        latest.trend_score.map(|s| format!("{:.1}", s)).unwrap_or_else(|| "N/A".to_string())
    );

    if let Some(stats) = week52_stats(&data.series) {
        println!(
            "   52W:     high {} ({:+.2}%), low {} ({:+.2}%), max volume {}",
            format_price(Some(stats.high)),
            stats.from_high_pct,
            format_price(Some(stats.low)),
            stats.from_low_pct,
            format_volume(stats.max_volume)
        );
    }

    if args.indicators {
        let ind = &latest.indicators;
        println!("\n🔹 Indicators");
        println!("   SMA20 {}  SMA50 {}  SMA200 {}", format_price(ind.sma20), format_price(ind.sma50), format_price(ind.sma200));
        println!(
            "   RSI14 {}  MACD {} / {}  ADX14 {}",
            format_price(ind.rsi14),
            format_price(ind.macd),
            format_price(ind.macd_signal),
            format_price(ind.adx14)
        );
        println!("   BB    {} | {} | {}", format_price(ind.bb_lower), format_price(ind.bb_middle), format_price(ind.bb_upper));
        if let Some(bundle) = &data.indicators {
            let mut names: Vec<&String> = bundle.keys().collect();
            names.sort();
            println!("   Cached series: {}", names.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", "));
        }
    }

    println!("\n{:<12} {:>12} {:>12} {:>12} {:>12} {:>14} {:>6}", "Date", "Open", "High", "Low", "Close", "Volume", "Score");
    let skip = visible.len().saturating_sub(args.bars);
    for row in &visible[skip..] {
        println!(
            "{:<12} {:>12} {:>12} {:>12} {:>12} {:>14} {:>6}",
            row.bar.date(),
            format_price(Some(row.bar.open)),
            format_price(Some(row.bar.high)),
            format_price(Some(row.bar.low)),
            format_price(Some(row.bar.close)),
            format_volume(row.bar.volume),
            row.raw_score
        );
    }

    let stats = service.cache_stats().await;
    tracing::debug!(entries = stats.total, valid = stats.valid, "Fetch cache");

    Ok(())
}
