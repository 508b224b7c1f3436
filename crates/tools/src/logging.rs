//! Operator output and structured logging
//!
//! Each helper prints the line the operator watches and records the same
//! event through `tracing`, so `RUST_LOG=zns_tools=debug` shows the full
//! pipeline without cluttering the console by default.

use alloy::primitives::{hex, Address, Bytes, B256};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize structured logging; `RUST_LOG` overrides the default filter
pub fn init() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zns_tools=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(env_filter)
        .try_init();
}

/// A unit is about to be deployed
pub fn unit_started(name: &str, network: &str, position: usize, total: usize) {
    println!(
        "[{}/{}] Deploying {}! If it takes too long, run the deployment again",
        position, total, name
    );
    info!(contract = name, network, position, total, "Deploying contract");
}

/// A unit was deployed; prints the address and the encoded constructor call
pub fn unit_deployed(name: &str, address: Address, tx_hash: B256, constructor_args: &Bytes) {
    println!("{} was deployed to {}", name, address);
    println!("{}", hex::encode_prefixed(constructor_args));
    info!(contract = name, address = %address, tx_hash = %tx_hash, "Contract deployed");
}

/// A unit failed before or during deployment
pub fn unit_failed(name: &str, error: &dyn std::error::Error) {
    eprintln!("{} failed: {}", name, error);
    error!(contract = name, error = %error, "Deployment failed");
}

/// Verification was accepted by the explorer
pub fn verification_requested(name: &str, address: Address, id: u64) {
    println!("Verification of {} requested (id {})", name, id);
    info!(contract = name, address = %address, verification_id = id, "Verification requested");
}

/// Verification failed; the deployment stands
pub fn verification_failed(name: &str, address: Address, error: &dyn std::error::Error) {
    eprintln!("Verification of {} at {} failed: {}", name, address, error);
    warn!(contract = name, address = %address, error = %error, "Verification failed");
}
