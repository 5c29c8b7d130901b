use crate::types::TimeVal;
use std::fmt;
use std::sync::Arc;

/// Backing storage for a [`DataBlob`].
pub type BlobBuffer = Arc<dyn AsRef<[u8]> + Send + Sync>;

/// A timestamped unit of streamed binary data.
///
/// Clones share the same buffer. Each holder releases its reference with
/// [`DataBlob::release_data`] once it is done with the bytes; the buffer is
/// freed when the last reference is released or dropped.
#[derive(Clone, Default)]
pub struct DataBlob {
    time: TimeVal,
    data: Option<BlobBuffer>,
}

impl DataBlob {
    /// An empty blob with no time and no data.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(time: TimeVal, data: Vec<u8>) -> Self {
        Self {
            time,
            data: Some(Arc::new(data)),
        }
    }

    /// Wrap an externally owned buffer. Its `Drop` runs once every blob
    /// referencing it has been released.
    pub fn from_buffer(time: TimeVal, buffer: BlobBuffer) -> Self {
        Self {
            time,
            data: Some(buffer),
        }
    }

    pub fn time(&self) -> TimeVal {
        self.time
    }

    pub fn set_time(&mut self, time: TimeVal) {
        self.time = time;
    }

    /// The blob's bytes; empty once released.
    pub fn data(&self) -> &[u8] {
        match &self.data {
            Some(buffer) => bytes(buffer),
            None => &[],
        }
    }

    pub fn size(&self) -> usize {
        self.data().len()
    }

    /// Replace the data. Any previously held reference is released first.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = Some(Arc::new(data));
    }

    pub fn set_buffer(&mut self, buffer: BlobBuffer) {
        self.data = Some(buffer);
    }

    /// Release this blob's reference to its data. Releasing twice is a no-op.
    pub fn release_data(&mut self) {
        if let Some(buffer) = self.data.take() {
            log::trace!(
                "Released {} bytes ({} other holders)",
                bytes(&buffer).len(),
                Arc::strong_count(&buffer) - 1
            );
        }
    }

    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }
}

fn bytes(buffer: &BlobBuffer) -> &[u8] {
    (**buffer).as_ref()
}

impl fmt::Debug for DataBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataBlob")
            .field("time", &self.time)
            .field("size", &self.size())
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBuffer {
        bytes: Vec<u8>,
        drops: Arc<AtomicUsize>,
    }

    impl AsRef<[u8]> for CountingBuffer {
        fn as_ref(&self) -> &[u8] {
            &self.bytes
        }
    }

    impl Drop for CountingBuffer {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_empty_blob() {
        let blob = DataBlob::new();
        assert_eq!(blob.size(), 0);
        assert_eq!(blob.time(), TimeVal::default());
        assert!(blob.is_released());
    }

    #[test]
    fn test_release_data() {
        let time = TimeVal { tv_sec: 10, tv_usec: 20 };
        let mut blob = DataBlob::with_data(time, vec![1, 2, 3]);
        assert_eq!(blob.data(), &[1, 2, 3]);
        assert_eq!(blob.time(), time);

        blob.release_data();
        assert!(blob.is_released());
        assert!(blob.data().is_empty());
        // Second release is harmless.
        blob.release_data();
        assert_eq!(blob.time(), time);
    }

    #[test]
    fn test_clones_share_buffer_until_last_release() {
        let drops = Arc::new(AtomicUsize::new(0));
        let buffer = CountingBuffer {
            bytes: vec![9; 16],
            drops: drops.clone(),
        };
        let mut first = DataBlob::from_buffer(TimeVal::default(), Arc::new(buffer));
        let mut second = first.clone();
        assert_eq!(second.data().as_ptr(), first.data().as_ptr());

        first.release_data();
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(second.size(), 16);

        second.release_data();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_data_replaces_buffer() {
        let mut blob = DataBlob::new();
        blob.set_data(vec![4, 5]);
        assert_eq!(blob.data(), &[4, 5]);
        blob.set_data(Vec::new());
        assert!(!blob.is_released());
        assert_eq!(blob.size(), 0);
    }
}
