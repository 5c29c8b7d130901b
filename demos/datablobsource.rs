//! Read blobs from a data blob source, first through a callback and then by
//! polling.
//!
//! Usage: cargo run --example datablobsource

use hrgls::{Api, ApiParams, DataBlob, DataBlobSource, StreamProperties};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BLOBS_PER_PHASE: usize = 10;
const PHASE_TIMEOUT: Duration = Duration::from_secs(5);

fn main() {
    env_logger::init();

    let api = match Api::open(ApiParams::default()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Could not create API with default parameters: {}", e);
            std::process::exit(2);
        }
    };

    let stream = match DataBlobSource::open(&api, &StreamProperties::new(), "") {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Could not create stream: {}", e);
            std::process::exit(17);
        }
    };
    println!("Opened {} on {}", stream.info().name, stream.source().name);

    println!("Callback-based blob reading");
    {
        let done = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicUsize::new(0));
        let (done_cb, count_cb) = (done.clone(), count.clone());
        stream.set_stream_callback(Some(Arc::new(move |mut blob: DataBlob| {
            // Replace with whatever work each blob needs.
            blob.release_data();
            if count_cb.fetch_add(1, Ordering::SeqCst) + 1 >= BLOBS_PER_PHASE {
                done_cb.store(true, Ordering::SeqCst);
            }
        })));
        stream.set_streaming_state(true);

        let start = Instant::now();
        while !done.load(Ordering::SeqCst) {
            if start.elapsed() > PHASE_TIMEOUT {
                eprintln!("Timeout waiting for callback-based blobs");
                std::process::exit(21);
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        stream.set_streaming_state(false);
        stream.set_stream_callback(None);
        println!(" received {} blobs", count.load(Ordering::SeqCst));
    }

    println!("Get-based blob reading");
    {
        stream.set_streaming_state(true);

        let start = Instant::now();
        let mut count = 0;
        while count < BLOBS_PER_PHASE {
            // Return immediately if no blob is waiting.
            match stream.next_blob(Duration::ZERO) {
                Ok(mut blob) => {
                    let data = blob.data();
                    if data.len() >= 2 {
                        println!(" first character = {}", data[0]);
                        println!(" second character = {}", data[1]);
                    }
                    count += 1;
                    blob.release_data();
                }
                Err(e) if e.is_timeout() => {}
                Err(e) => {
                    eprintln!("Bad blob received: {}", e);
                    std::process::exit(31);
                }
            }
            if start.elapsed() > PHASE_TIMEOUT {
                eprintln!("Timeout waiting for get-based blobs");
                std::process::exit(32);
            }
        }

        stream.set_streaming_state(false);
    }

    stream.close();
    api.close();
    println!("Success!");
}
