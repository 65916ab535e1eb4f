//! Basic chat session demonstration.
//!
//! Demonstrates:
//! - Connecting with a configured default room
//! - Subscribing to messages, state changes and errors
//! - Sending a broadcast message
//!
//! Usage:
//!   cargo run --example 001_basic_chat
//!   cargo run --example 001_basic_chat -- --endpoint ws://host:port/chat --user alice
//!   cargo run --example 001_basic_chat -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::sleep;

use common::Args;
use quarks_chat::{ChatClient, ChatConfig};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    println!("=== 001: Basic Chat ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    let config = ChatConfig::new(&args.endpoint, &args.user)
        .with_default_room("lobby")
        .with_debug(args.debug);
    let client = ChatClient::new(config);

    let _messages = client.on_message(|envelope| {
        if let Some(text) = envelope.content() {
            println!("<{}> {}", envelope.from.as_deref().unwrap_or("?"), text);
        } else if let Some(user) = envelope.joined.as_deref() {
            println!("* {user} joined");
        } else if let Some(user) = envelope.left.as_deref() {
            println!("* {user} left");
        }
    });
    let _states = client.on_connection(|state| println!("[state] {state}"));
    let _errors = client.on_error(|error| eprintln!("[error] {error}"));

    // ========================================================================
    // Chat
    // ========================================================================

    println!("[Setup] Connecting to {}...", args.endpoint);
    client.connect();

    sleep(Duration::from_secs(1)).await;
    client.send_message("hello from quarks-chat");
    client.list_users();

    common::wait_for_exit().await;
    client.disconnect();
}
