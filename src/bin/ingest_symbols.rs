// src/bin/ingest_symbols.rs

use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Duration;

use stock_forecast_backend::config::AppConfig;
use stock_forecast_backend::models::price::OutputSize;
use stock_forecast_backend::models::symbol::Symbol;
use stock_forecast_backend::services::ingest::ingest_symbol;
use stock_forecast_backend::AppState;

// Alpha Vantage free tier allows 5 requests per minute
const REQUEST_DELAY: Duration = Duration::from_secs(12);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Usage: cargo run --bin ingest_symbols -- [--full] [--file symbols.txt] [SYMBOL ...]
    let args: Vec<String> = env::args().collect();
    let mut size = OutputSize::Compact;
    let mut raw_symbols = Vec::new();

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--full" => size = OutputSize::Full,
            "--file" => {
                let path = rest
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--file needs a path"))?;
                raw_symbols.extend(read_symbol_file(path)?);
            }
            other => raw_symbols.push(other.to_string()),
        }
    }

    if raw_symbols.is_empty() {
        eprintln!(
            "Usage: {} [--full] [--file symbols.txt] [SYMBOL ...]",
            args.first().map(String::as_str).unwrap_or("ingest_symbols")
        );
        std::process::exit(1);
    }

    let symbols = raw_symbols
        .iter()
        .map(|s| Symbol::parse(s))
        .collect::<Result<Vec<_>, _>>()?;

    let state = AppState::from_config(AppConfig::from_env()?)?;

    println!(
        "Ingesting {} symbols ({}) into {} store...",
        symbols.len(),
        size.as_str(),
        state.store.name()
    );

    let mut ingested = 0;
    let mut failed = 0;

    for (idx, symbol) in symbols.iter().enumerate() {
        match ingest_symbol(state.market_data.as_ref(), state.store.as_ref(), symbol, size).await {
            Ok(rows) => {
                println!("   {}: {} rows", symbol, rows);
                ingested += 1;
            }
            Err(e) => {
                eprintln!("   {}: {}", symbol, e);
                failed += 1;
            }
        }

        if idx + 1 < symbols.len() {
            tokio::time::sleep(REQUEST_DELAY).await;
        }
    }

    println!("\nIngest complete!");
    println!("   Ingested: {}", ingested);
    if failed > 0 {
        println!("   Failed: {}", failed);
        std::process::exit(2);
    }

    Ok(())
}

/// One symbol per line; blank lines and `#` comments are skipped
fn read_symbol_file(path: &str) -> anyhow::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut symbols = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        symbols.push(trimmed.to_string());
    }

    Ok(symbols)
}
