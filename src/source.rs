use crate::api::{Api, ApiShared};
use crate::blob::{BlobBuffer, DataBlob};
use crate::dispatch::{Callback, Dispatcher};
use crate::types::{DataBlobSourceDescription, StreamProperties, TimeVal};
use crate::{HrglsError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Handler for callback-based blob delivery. Runs on the source's producer
/// thread and receives its own reference to each blob.
pub type StreamCallback = Callback<DataBlob>;

/// Size of each generated blob.
pub const BLOB_SIZE: usize = 256;

static NUM_CREATED_SOURCES: AtomicUsize = AtomicUsize::new(0);

struct SourceShared {
    api: Arc<ApiShared>,
    properties: StreamProperties,
    streaming: AtomicBool,
    blobs: Dispatcher<DataBlob>,
}

/// An open stream of data blobs.
///
/// A producer thread generates blobs at the stream rate while streaming is on.
/// Each blob goes to the registered callback or is queued for
/// [`next_blob`](DataBlobSource::next_blob).
pub struct DataBlobSource {
    shared: Arc<SourceShared>,
    description: DataBlobSourceDescription,
    stream_name: String,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl DataBlobSource {
    /// Open the source called `name` on `api`. An empty name opens the first
    /// available source.
    pub fn open(api: &Api, properties: &StreamProperties, name: &str) -> Result<DataBlobSource> {
        let api_shared = api.shared().clone();

        let found = if name.is_empty() {
            api_shared.sources.first()
        } else {
            api_shared.sources.iter().find(|d| d.name == name)
        };
        let description = found
            .cloned()
            .ok_or_else(|| HrglsError::UnknownSource(name.to_string()))?;

        let stream_name = format!(
            "/hrgls/null/DataBlobSource/{}",
            NUM_CREATED_SOURCES.fetch_add(1, Ordering::Relaxed)
        );

        let shared = Arc::new(SourceShared {
            blobs: Dispatcher::new("data blob", api_shared.config.queue_capacity),
            api: api_shared,
            properties: properties.clone(),
            streaming: AtomicBool::new(false),
        });

        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_shared = shared.clone();
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("hrgls-blob".into())
            .spawn(move || {
                blob_producer_loop(thread_shared, stop_clone);
            })
            .map_err(|e| HrglsError::ThreadSpawn {
                name: "data blob",
                source: e,
            })?;

        log::info!(
            "Opened data blob source {} as {} at {} Hz",
            description.name,
            stream_name,
            properties.rate()
        );

        Ok(DataBlobSource {
            shared,
            description,
            stream_name,
            stop_flag,
            thread: Some(thread),
        })
    }

    /// The stream's own name, unique within the process.
    pub fn info(&self) -> DataBlobSourceDescription {
        DataBlobSourceDescription::new(self.stream_name.clone())
    }

    /// The available source this stream was opened on.
    pub fn source(&self) -> &DataBlobSourceDescription {
        &self.description
    }

    pub fn properties(&self) -> &StreamProperties {
        &self.shared.properties
    }

    pub fn set_streaming_state(&self, running: bool) {
        self.shared.streaming.store(running, Ordering::Relaxed);
        if self.shared.api.is_chatty() {
            log::info!(
                "{}: streaming {}",
                self.stream_name,
                if running { "on" } else { "off" }
            );
        }
    }

    pub fn streaming_state(&self) -> bool {
        self.shared.streaming.load(Ordering::Relaxed)
    }

    /// Install (`Some`) or remove (`None`) the blob callback. Stored blobs are
    /// discarded either way.
    pub fn set_stream_callback(&self, callback: Option<StreamCallback>) {
        self.shared.blobs.set_callback(callback);
    }

    /// Take the oldest stored blob, waiting up to `timeout` for one to arrive.
    /// A zero timeout returns at once.
    ///
    /// Returns [`HrglsError::Timeout`] if no blob is available in time.
    pub fn next_blob(&self, timeout: Duration) -> Result<DataBlob> {
        self.shared.blobs.recv_timeout(timeout)
    }

    /// Number of blobs stored and not yet taken.
    pub fn pending_blobs(&self) -> usize {
        self.shared.blobs.pending()
    }

    /// Stop the producer thread and close the stream.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            log::debug!("{}: closed", self.stream_name);
        }
    }
}

impl Drop for DataBlobSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The bytes `0, 1, ..., 255`, shared by every generated blob.
fn blob_payload() -> BlobBuffer {
    let bytes: Vec<u8> = (0..BLOB_SIZE).map(|i| (i % 256) as u8).collect();
    Arc::new(bytes)
}

/// Emits one blob per stream period while streaming is on.
fn blob_producer_loop(shared: Arc<SourceShared>, stop_flag: Arc<AtomicBool>) {
    let period = shared.properties.period();
    let payload = blob_payload();
    let mut last_blob = Instant::now();

    log::debug!("Blob producer started (period {:?})", period);

    while !stop_flag.load(Ordering::Relaxed) {
        if shared.streaming.load(Ordering::Relaxed) && last_blob.elapsed() >= period {
            last_blob = Instant::now();
            shared
                .blobs
                .deliver(DataBlob::from_buffer(TimeVal::now(), payload.clone()));
        }
        std::thread::sleep(shared.api.config.poll_interval);
    }

    log::debug!("Blob producer stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::types::ApiParams;

    fn open_api() -> Api {
        Api::open_with_config(ApiParams::default(), RuntimeConfig::default()).unwrap()
    }

    fn fast_properties() -> StreamProperties {
        let mut props = StreamProperties::new();
        props.set_rate(200.0).unwrap();
        props
    }

    #[test]
    fn test_empty_name_opens_first_source() {
        let api = open_api();
        let source = DataBlobSource::open(&api, &StreamProperties::new(), "").unwrap();
        assert_eq!(source.source().name, "/hrgls/null/DataBlobSource/1");
        assert!(source.info().name.starts_with("/hrgls/null/DataBlobSource/"));
        assert_eq!(source.properties().rate(), 30.0);
    }

    #[test]
    fn test_named_and_unknown_sources() {
        let api = open_api();
        let second =
            DataBlobSource::open(&api, &StreamProperties::new(), "/hrgls/null/DataBlobSource/2")
                .unwrap();
        assert_eq!(second.source().name, "/hrgls/null/DataBlobSource/2");

        let err = DataBlobSource::open(&api, &StreamProperties::new(), "/nope")
            .err()
            .unwrap();
        assert_eq!(err.status(), crate::Status::BadParameter);
    }

    #[test]
    fn test_stream_names_are_unique() {
        let api = open_api();
        let a = DataBlobSource::open(&api, &StreamProperties::new(), "").unwrap();
        let b = DataBlobSource::open(&api, &StreamProperties::new(), "").unwrap();
        assert_ne!(a.info(), b.info());
    }

    #[test]
    fn test_get_based_blobs() {
        let api = open_api();
        let source = DataBlobSource::open(&api, &fast_properties(), "").unwrap();
        assert!(source.next_blob(Duration::ZERO).unwrap_err().is_timeout());

        source.set_streaming_state(true);
        let start = Instant::now();
        let mut received = 0;
        while received < 5 {
            assert!(start.elapsed() < Duration::from_secs(5), "blobs never arrived");
            match source.next_blob(Duration::from_millis(50)) {
                Ok(mut blob) => {
                    assert_eq!(blob.size(), BLOB_SIZE);
                    assert_eq!(blob.data()[0], 0);
                    assert_eq!(blob.data()[1], 1);
                    assert_eq!(blob.data()[255], 255);
                    assert!(blob.time().tv_sec > 0);
                    blob.release_data();
                    assert!(blob.is_released());
                    received += 1;
                }
                Err(e) => assert!(e.is_timeout(), "unexpected error: {}", e),
            }
        }
        source.set_streaming_state(false);
    }

    #[test]
    fn test_stopped_stream_produces_nothing() {
        let api = open_api();
        let source = DataBlobSource::open(&api, &fast_properties(), "").unwrap();
        source.set_streaming_state(true);
        assert!(source.next_blob(Duration::from_secs(5)).is_ok());
        source.set_streaming_state(false);
        std::thread::sleep(Duration::from_millis(20));

        // Drain what was produced before the stop, then nothing more arrives.
        while source.next_blob(Duration::ZERO).is_ok() {}
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(source.pending_blobs(), 0);
    }

    #[test]
    fn test_callback_based_blobs() {
        let api = open_api();
        let source = DataBlobSource::open(&api, &fast_properties(), "").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicBool::new(false));
        let (count_cb, done_cb) = (count.clone(), done.clone());
        source.set_stream_callback(Some(Arc::new(move |mut blob: DataBlob| {
            assert_eq!(blob.size(), BLOB_SIZE);
            blob.release_data();
            if count_cb.fetch_add(1, Ordering::SeqCst) + 1 >= 10 {
                done_cb.store(true, Ordering::SeqCst);
            }
        })));
        source.set_streaming_state(true);

        let start = Instant::now();
        while !done.load(Ordering::SeqCst) {
            assert!(start.elapsed() < Duration::from_secs(5), "callback never finished");
            std::thread::sleep(Duration::from_millis(1));
        }
        source.set_streaming_state(false);
        std::thread::sleep(Duration::from_millis(20));
        source.set_stream_callback(None);

        assert!(count.load(Ordering::SeqCst) >= 10);
        assert_eq!(source.pending_blobs(), 0);
    }

    #[test]
    fn test_setting_callback_flushes_stored_blobs() {
        let api = open_api();
        let source = DataBlobSource::open(&api, &fast_properties(), "").unwrap();
        source.set_streaming_state(true);
        std::thread::sleep(Duration::from_millis(50));
        source.set_streaming_state(false);
        std::thread::sleep(Duration::from_millis(20));
        assert!(source.pending_blobs() > 0);

        source.set_stream_callback(None);
        assert_eq!(source.pending_blobs(), 0);
    }

    #[test]
    fn test_source_outlives_api_handle() {
        let api = open_api();
        let source = DataBlobSource::open(&api, &fast_properties(), "").unwrap();
        drop(api);
        source.set_streaming_state(true);
        assert!(source.next_blob(Duration::from_secs(5)).is_ok());
        source.close();
    }
}
