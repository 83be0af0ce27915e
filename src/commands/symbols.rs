use crate::models::FetchConfig;
use crate::services::SymbolUniverse;
use crate::utils::SystemClock;
use std::sync::Arc;

pub async fn run() {
    let config = FetchConfig::from_env();
    let universe = match SymbolUniverse::with_clock(config.symbols_url, config.symbols_ttl_secs, Arc::new(SystemClock)) {
        Ok(universe) => universe,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    let symbols = universe.symbols().await;
    println!("📋 {} symbols\n", symbols.len());
    for chunk in symbols.chunks(10) {
        println!("   {}", chunk.join("  "));
    }
}
