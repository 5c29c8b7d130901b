use crate::config::RuntimeConfig;
use crate::dispatch::{Callback, Dispatcher};
use crate::message::LogMessage;
use crate::types::{ApiParams, DataBlobSourceDescription, MessageLevel, TimeVal, Version, VERSION};
use crate::{HrglsError, Result};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Handler for callback-based log message delivery. Runs on the runtime's
/// log-message thread.
pub type LogMessageCallback = Callback<LogMessage>;

/// Names of the sources the null runtime offers.
pub const NULL_SOURCE_NAMES: [&str; 2] = [
    "/hrgls/null/DataBlobSource/1",
    "/hrgls/null/DataBlobSource/2",
];

/// Text carried by every generated log message.
pub const GENERATED_MESSAGE_VALUE: &str = "value of the message";

/// Verbosity above which the runtime logs its internal state changes.
const CHATTY_VERBOSITY: u16 = 200;

/// State shared between an [`Api`], its log-message thread and the sources
/// opened from it.
pub(crate) struct ApiShared {
    pub(crate) params: ApiParams,
    pub(crate) config: RuntimeConfig,
    pub(crate) sources: Vec<DataBlobSourceDescription>,
    verbosity: AtomicU16,
    log_streaming: AtomicBool,
    min_level: AtomicI32,
    messages: Dispatcher<LogMessage>,
}

impl ApiShared {
    pub(crate) fn is_chatty(&self) -> bool {
        self.verbosity.load(Ordering::Relaxed) > CHATTY_VERBOSITY
    }

    fn min_level(&self) -> MessageLevel {
        MessageLevel(self.min_level.load(Ordering::Relaxed))
    }
}

/// A session with the hrgls runtime.
///
/// Owns log-message configuration and data source discovery. A background
/// thread generates log messages while log streaming is on and delivers them
/// to the registered callback or queues them for
/// [`pending_log_messages`](Api::pending_log_messages).
pub struct Api {
    shared: Arc<ApiShared>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Api {
    /// Open a session, reading runtime tunables from the environment.
    pub fn open(params: ApiParams) -> Result<Api> {
        Self::open_with_config(params, RuntimeConfig::from_env())
    }

    pub fn open_with_config(params: ApiParams, config: RuntimeConfig) -> Result<Api> {
        let sources = NULL_SOURCE_NAMES
            .iter()
            .map(|name| DataBlobSourceDescription::new(*name))
            .collect();

        let shared = Arc::new(ApiShared {
            verbosity: AtomicU16::new(config.verbosity),
            log_streaming: AtomicBool::new(false),
            min_level: AtomicI32::new(MessageLevel::INFO.0),
            messages: Dispatcher::new("log message", config.queue_capacity),
            params,
            config,
            sources,
        });

        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_shared = shared.clone();
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("hrgls-log".into())
            .spawn(move || {
                log_message_loop(thread_shared, stop_clone);
            })
            .map_err(|e| HrglsError::ThreadSpawn {
                name: "log message",
                source: e,
            })?;

        log::info!(
            "Opened API: user={:?} credentials={} bytes sources={}",
            shared.params.name,
            shared.params.credentials.len(),
            shared.sources.len()
        );

        Ok(Api {
            shared,
            stop_flag,
            thread: Some(thread),
        })
    }

    pub(crate) fn shared(&self) -> &Arc<ApiShared> {
        &self.shared
    }

    /// User name the session was opened with.
    pub fn user(&self) -> &str {
        &self.shared.params.name
    }

    pub fn version(&self) -> Version {
        VERSION
    }

    /// Current wall-clock time as seen by the runtime.
    pub fn current_system_time(&self) -> TimeVal {
        TimeVal::now()
    }

    pub fn verbosity(&self) -> u16 {
        self.shared.verbosity.load(Ordering::Relaxed)
    }

    pub fn set_verbosity(&self, verbosity: u16) {
        self.shared.verbosity.store(verbosity, Ordering::Relaxed);
        if self.shared.is_chatty() {
            log::info!("New verbosity: {}", verbosity);
        }
    }

    pub fn available_data_blob_sources(&self) -> Vec<DataBlobSourceDescription> {
        self.shared.sources.clone()
    }

    /// Turn log-message generation on or off.
    pub fn set_log_message_streaming_state(&self, running: bool) {
        self.shared.log_streaming.store(running, Ordering::Relaxed);
        log::debug!("Log message streaming {}", if running { "on" } else { "off" });
    }

    pub fn log_message_streaming_state(&self) -> bool {
        self.shared.log_streaming.load(Ordering::Relaxed)
    }

    /// Install (`Some`) or remove (`None`) the log-message callback.
    ///
    /// Pending messages are discarded either way. While a callback is set,
    /// nothing is queued. Stop streaming before removing the callback, or
    /// messages produced in between are queued.
    pub fn set_log_message_callback(&self, callback: Option<LogMessageCallback>) {
        self.shared.messages.set_callback(callback);
    }

    /// Take up to `max` queued messages, oldest first (`0` takes all).
    ///
    /// Returns [`HrglsError::Timeout`] when nothing is queued.
    pub fn pending_log_messages(&self, max: usize) -> Result<Vec<LogMessage>> {
        let messages = self.shared.messages.drain(max);
        if messages.is_empty() {
            return Err(HrglsError::Timeout);
        }
        Ok(messages)
    }

    /// Take the oldest queued message, or [`HrglsError::Timeout`] if none.
    pub fn next_log_message(&self) -> Result<LogMessage> {
        self.pending_log_messages(1)?
            .pop()
            .ok_or(HrglsError::Timeout)
    }

    /// Only messages at or above `level` are delivered from now on.
    pub fn set_log_message_minimum_level(&self, level: MessageLevel) {
        self.shared.min_level.store(level.0, Ordering::Relaxed);
        log::debug!("Log message minimum level set to {}", level.0);
    }

    pub fn log_message_minimum_level(&self) -> MessageLevel {
        self.shared.min_level()
    }

    /// Stop the log-message thread and close the session.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if self.shared.is_chatty() {
                log::info!("Destroying API");
            }
            let _ = thread.join();
        }
    }
}

impl Drop for Api {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Generates one message per interval while streaming, cycling through the
/// named levels. Filtered-out messages still advance the cycle.
fn log_message_loop(shared: Arc<ApiShared>, stop_flag: Arc<AtomicBool>) {
    let interval = shared.config.log_message_interval;
    let mut last_message = Instant::now();
    let mut level = MessageLevel::INFO;

    log::debug!("Log message thread started");

    while !stop_flag.load(Ordering::Relaxed) {
        if shared.log_streaming.load(Ordering::Relaxed) && last_message.elapsed() >= interval {
            last_message = Instant::now();
            let message = LogMessage::new(GENERATED_MESSAGE_VALUE, TimeVal::now(), level);
            level = level.next_in_cycle();

            if message.level() >= shared.min_level() {
                shared.messages.deliver(message);
            }
        }
        std::thread::sleep(shared.config.poll_interval);
    }

    log::debug!("Log message thread stopping");
}
