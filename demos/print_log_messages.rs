//! Read the runtime's log messages, first through a callback and then by
//! polling with a minimum level of WARNING.
//!
//! Usage: cargo run --example print_log_messages

use hrgls::{Api, ApiParams, LogMessage, MessageLevel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const MESSAGES_PER_PHASE: usize = 5;
const PHASE_TIMEOUT_SECS: i64 = 5;

fn main() {
    env_logger::init();

    let api = match Api::open(ApiParams::default()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Could not open API: {}", e);
            std::process::exit(1);
        }
    };

    // The counter is shared with the callback, which runs on a runtime thread.
    let count = Arc::new(AtomicUsize::new(0));
    let count_cb = count.clone();
    api.set_log_message_callback(Some(Arc::new(move |message: LogMessage| {
        count_cb.fetch_add(1, Ordering::SeqCst);
        println!(
            "Callback message with level {} received: {}",
            message.level().0,
            message.value()
        );
    })));
    api.set_log_message_streaming_state(true);

    let start = api.current_system_time();
    while count.load(Ordering::SeqCst) < MESSAGES_PER_PHASE {
        let now = api.current_system_time();
        if now.tv_sec - start.tv_sec > PHASE_TIMEOUT_SECS {
            eprintln!("Timeout waiting for callback-based messages.");
            std::process::exit(4);
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    // Stop the stream before unhooking the callback.
    api.set_log_message_streaming_state(false);
    api.set_log_message_callback(None);

    api.set_log_message_minimum_level(MessageLevel::WARNING);
    api.set_log_message_streaming_state(true);

    let mut received = 0;
    let start = api.current_system_time();
    while received < MESSAGES_PER_PHASE {
        match api.pending_log_messages(0) {
            Ok(messages) => {
                received += messages.len();
                for message in messages {
                    if message.level() < MessageLevel::WARNING {
                        eprintln!("Message received with too-low level: {}", message.level().0);
                        std::process::exit(101);
                    }
                    println!(
                        "Get-based message with level {} received: {}",
                        message.level().0,
                        message.value()
                    );
                }
            }
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                eprintln!("Error reading messages: {}", e);
                std::process::exit(8);
            }
        }
        let now = api.current_system_time();
        if now.tv_sec - start.tv_sec > PHASE_TIMEOUT_SECS {
            eprintln!("Timeout waiting for get-based messages.");
            std::process::exit(9);
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    api.set_log_message_streaming_state(false);
    println!("Success!");
}
