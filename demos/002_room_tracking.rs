//! Multi-room tracking demonstration.
//!
//! Demonstrates:
//! - Joining several rooms through a RoomTracker
//! - Requesting message history for the current room
//! - Leaving all tracked rooms on exit
//!
//! Usage:
//!   cargo run --example 002_room_tracking
//!   cargo run --example 002_room_tracking -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::sleep;

use common::Args;
use quarks_chat::{ChatClient, ChatConfig, RoomTracker};

// ============================================================================
// Constants
// ============================================================================

const ROOMS: &[&str] = &["lobby", "random", "support"];

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    println!("=== 002: Room Tracking ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    let config = ChatConfig::new(&args.endpoint, &args.user).with_debug(args.debug);
    let client = ChatClient::new(config);

    let _messages = client.on_message(|envelope| {
        if let Some(entries) = envelope.history() {
            println!("[history] {} entries", entries.len());
            for entry in entries {
                if let Some(text) = entry.value.content() {
                    println!("  {} | {}", entry.key, text);
                }
            }
        } else if let Some(text) = envelope.content() {
            let room = envelope.room.as_deref().unwrap_or("?");
            println!("[{room}] {text}");
        }
    });
    let _states = client.on_connection(|state| println!("[state] {state}"));

    println!("[Setup] Connecting to {}...", args.endpoint);
    client.connect();
    sleep(Duration::from_secs(1)).await;

    // ========================================================================
    // Rooms
    // ========================================================================

    let tracker = RoomTracker::new(client.clone());
    for room in ROOMS {
        tracker.join_room(*room);
    }
    println!("[Rooms] tracking: {:?}", tracker.rooms());

    // The last join set the current room; fetch its history.
    client.message_history();

    common::wait_for_exit().await;

    tracker.leave_all();
    client.disconnect();
}
