//! # Auth0 Test Connection Sweeper
//!
//! Deletes connections left behind by acceptance test runs against a real
//! tenant. Tenant and credentials come from the usual `AUTH0_*` environment
//! variables.
//!
//! ## Usage
//!
//! ```bash
//! AUTH0_DOMAIN=example.eu.auth0.com AUTH0_API_TOKEN=... cargo run --bin auth0-sweep
//! AUTH0_DOMAIN=... AUTH0_CLIENT_ID=... AUTH0_CLIENT_SECRET=... cargo run --bin auth0-sweep Acceptance
//! ```
//!
//! Without an argument every connection whose name contains `Test` is
//! deleted. With an argument, names containing that pattern are deleted
//! instead. Set `RUST_LOG=debug` to see every connection examined.

use auth0_provider::Auth0Provider;
use auth0_provider::config::ProviderConfig;
use auth0_provider::sweep::sweep_connections;
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 || args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: {} [name-pattern]", args[0]);
        eprintln!();
        eprintln!("Deletes connections whose name contains the pattern (default: Test).");
        process::exit(1);
    }
    let pattern = args.get(1).cloned().unwrap_or_else(|| "Test".to_string());

    let config = match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            process::exit(1);
        }
    };
    let provider = match Auth0Provider::from_config(&config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("❌ Failed to create provider: {}", e);
            process::exit(1);
        }
    };

    println!("Sweeping connections matching '{}' on {}", pattern, config.domain);
    let report = match sweep_connections(provider.api(), |name| name.contains(pattern.as_str())).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };

    println!("\nSweep Summary:");
    println!("  Examined: {}", report.examined);
    println!("  Deleted: {}", report.deleted.len());
    for id in &report.deleted {
        println!("    - {}", id);
    }

    if let Err(e) = report.into_result() {
        eprintln!("❌ {}", e);
        process::exit(1);
    }
    println!("✓ Sweep complete");
}
