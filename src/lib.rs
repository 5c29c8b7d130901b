//! # hrgls - Hourglass streaming SDK
//!
//! Session-based access to streams of opaque binary blobs and to the
//! runtime's own log messages. Provides:
//! - Data blob source discovery and streaming, with get-based or
//!   callback-based delivery
//! - Log message retrieval with a minimum severity filter, in the same two styles
//! - A C FFI with opaque handles and integer status codes
//!
//! The built-in null runtime generates both blobs and log messages in
//! software, so everything here works without hardware.
//!
//! ## Quick Start
//! ```no_run
//! use hrgls::{Api, ApiParams, DataBlobSource, StreamProperties};
//! use std::time::Duration;
//!
//! let api = Api::open(ApiParams::default()).unwrap();
//! let source = DataBlobSource::open(&api, &StreamProperties::new(), "").unwrap();
//! source.set_streaming_state(true);
//! for _ in 0..10 {
//!     match source.next_blob(Duration::from_secs(1)) {
//!         Ok(mut blob) => {
//!             println!("{} bytes at {:?}", blob.size(), blob.time());
//!             blob.release_data();
//!         }
//!         Err(e) if e.is_timeout() => continue,
//!         Err(e) => panic!("{}", e),
//!     }
//! }
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod blob;
pub mod message;
mod dispatch;
pub mod api;
pub mod source;
pub mod ffi;

pub use error::{error_message, HrglsError, Status};
pub use types::*;
pub use config::RuntimeConfig;
pub use blob::DataBlob;
pub use message::LogMessage;
pub use dispatch::Callback;
pub use api::{Api, LogMessageCallback};
pub use source::{DataBlobSource, StreamCallback};

/// Result type alias for hrgls operations.
pub type Result<T> = std::result::Result<T, HrglsError>;
