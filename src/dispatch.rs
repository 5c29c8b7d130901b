use crate::{HrglsError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Handler invoked on a producer thread for every delivered item.
pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Routes items from a producer thread either to a registered callback or to
/// a bounded queue drained by get-style calls.
pub(crate) struct Dispatcher<T> {
    callback: Mutex<Option<Callback<T>>>,
    sender: Sender<T>,
    receiver: Receiver<T>,
    label: &'static str,
}

impl<T> Dispatcher<T> {
    pub fn new(label: &'static str, capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            callback: Mutex::new(None),
            sender,
            receiver,
            label,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Callback<T>>> {
        self.callback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install or remove the callback. Anything still queued is discarded.
    pub fn set_callback(&self, callback: Option<Callback<T>>) {
        let mut slot = self.slot();
        *slot = callback;
        let flushed = self.receiver.try_iter().count();
        if flushed > 0 {
            log::debug!("Flushed {} pending {} item(s)", flushed, self.label);
        }
    }

    pub fn has_callback(&self) -> bool {
        self.slot().is_some()
    }

    /// Hand an item to the callback, or queue it if there is none.
    ///
    /// The callback runs outside the lock so it may reconfigure the dispatcher.
    pub fn deliver(&self, item: T) {
        let slot = self.slot();
        if let Some(callback) = slot.clone() {
            drop(slot);
            callback(item);
            return;
        }
        // Both channel ends live here, so the only send failure is a full queue.
        if self.sender.try_send(item).is_err() {
            log::trace!("{} queue full, dropping item", self.label);
        }
    }

    /// Take the oldest queued item, waiting up to `timeout`. A zero timeout
    /// checks once without blocking.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T> {
        if timeout.is_zero() {
            return self.receiver.try_recv().map_err(|_| HrglsError::Timeout);
        }
        self.receiver
            .recv_timeout(timeout)
            .map_err(|_| HrglsError::Timeout)
    }

    /// Take up to `max` queued items without waiting; `0` takes them all.
    pub fn drain(&self, max: usize) -> Vec<T> {
        let limit = if max == 0 { usize::MAX } else { max };
        self.receiver.try_iter().take(limit).collect()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_queue_without_callback() {
        let d = Dispatcher::new("test", 4);
        d.deliver(1);
        d.deliver(2);
        assert_eq!(d.pending(), 2);
        assert_eq!(d.recv_timeout(Duration::ZERO).unwrap(), 1);
        assert_eq!(d.drain(0), vec![2]);
        assert!(d.recv_timeout(Duration::ZERO).unwrap_err().is_timeout());
        assert!(d
            .recv_timeout(Duration::from_millis(5))
            .unwrap_err()
            .is_timeout());
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let d = Dispatcher::new("test", 2);
        for i in 0..5 {
            d.deliver(i);
        }
        assert_eq!(d.drain(0), vec![0, 1]);
    }

    #[test]
    fn test_drain_respects_max() {
        let d = Dispatcher::new("test", 8);
        for i in 0..5 {
            d.deliver(i);
        }
        assert_eq!(d.drain(3), vec![0, 1, 2]);
        assert_eq!(d.pending(), 2);
    }

    #[test]
    fn test_set_callback_flushes_and_receives() {
        let d = Dispatcher::new("test", 8);
        d.deliver(10);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        d.set_callback(Some(Arc::new(move |v: usize| {
            seen_clone.fetch_add(v, Ordering::SeqCst);
        })));
        assert!(d.has_callback());
        assert_eq!(d.pending(), 0);

        d.deliver(3);
        d.deliver(4);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(d.pending(), 0);

        d.set_callback(None);
        d.deliver(5);
        assert_eq!(d.pending(), 1);
    }

    #[test]
    fn test_callback_may_reconfigure() {
        let d = Arc::new(Dispatcher::new("test", 8));
        let inner = d.clone();
        d.set_callback(Some(Arc::new(move |_: u8| {
            inner.set_callback(None);
        })));
        d.deliver(1);
        assert!(!d.has_callback());
        d.deliver(2);
        assert_eq!(d.drain(0), vec![2]);
    }
}
