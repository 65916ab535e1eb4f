//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Graceful exit handling

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// Defaults
// ============================================================================

/// Endpoint used when `--endpoint` is not given.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8080/chat";

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub endpoint: String,
    pub user: String,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            endpoint: value_of("--endpoint").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            user: value_of("--user").unwrap_or_else(|| "demo-user".to_string()),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "quarks_chat=debug"
    } else {
        "quarks_chat=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Wait for Ctrl+C.
pub async fn wait_for_exit() {
    println!("\nPress Ctrl+C to exit...");
    let _ = tokio::signal::ctrl_c().await;
}
