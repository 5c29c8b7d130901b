//! List the data blob sources offered by the runtime.
//!
//! Usage: cargo run --example list_datablobsources

fn main() {
    env_logger::init();

    let api = match hrgls::Api::open(hrgls::ApiParams::default()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Could not open API: {}", e);
            std::process::exit(1);
        }
    };

    let sources = api.available_data_blob_sources();
    println!("Found {} data blob source(s):", sources.len());
    for (i, source) in sources.iter().enumerate() {
        println!("  [{}] {}", i, source.name);
    }
}
