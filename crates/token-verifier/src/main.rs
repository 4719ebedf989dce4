//! Token Verifier
//!
//! Reads one token per line from stdin, verifies it against keys published on
//! the Kafka key topic, and writes the verified `data` claim as a JSON line to
//! stdout. Rejected tokens are reported on stderr with their error kind.

use anyhow::Context;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use token_verifier::config::{Config, LogFormat};
use token_verifier::kafka::KafkaKeyFeed;
use token_verifier::{KeyCache, KeyResolver, TokenVerifier, VerifierOptions};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.log_format);

    info!(
        config = ?config,
        "Starting token verifier"
    );

    let feed = KafkaKeyFeed::new(&config.kafka).map_err(|e| {
        error!("Failed to connect to key feed: {}", e);
        e
    })?;

    let cache = Arc::new(KeyCache::new(config.key_cache_capacity));
    let resolver =
        Arc::new(KeyResolver::new(cache, feed).with_drain_timeout(config.drain_timeout));
    let verifier = TokenVerifier::with_options(
        resolver,
        VerifierOptions {
            max_token_size: config.max_token_size,
            ..VerifierOptions::default()
        },
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read token from stdin")?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }

        match verifier.verify::<serde_json::Value>(token) {
            Ok(data) => {
                writeln!(out, "{data}").context("Failed to write result")?;
                out.flush().context("Failed to flush stdout")?;
            }
            Err(e) => eprintln!("rejected: {} ({})", e.kind(), e),
        }
    }

    info!("Input closed, shutting down");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "token_verifier=info,verifier=info".into());

    // Logs go to stderr; stdout carries verified payloads
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init(),
    }
}
