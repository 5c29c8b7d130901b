use std::time::Duration;

/// Tunables for the runtime's producer threads.
///
/// Defaults match the stock null runtime. [`RuntimeConfig::from_env`] lets each
/// value be overridden without recompiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Period between generated log messages while log streaming is on.
    pub log_message_interval: Duration,
    /// Capacity of each pending blob or message queue. Producers drop new items
    /// when it is full.
    pub queue_capacity: usize,
    /// How long producer threads sleep between checks of their state.
    pub poll_interval: Duration,
    /// Verbosity the `Api` starts with.
    pub verbosity: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_message_interval: Duration::from_millis(100),
            queue_capacity: 1024,
            poll_interval: Duration::from_millis(1),
            verbosity: 0,
        }
    }
}

impl RuntimeConfig {
    /// Read overrides from `HRGLS_LOG_MESSAGE_INTERVAL_MS`, `HRGLS_QUEUE_CAPACITY`,
    /// `HRGLS_POLL_INTERVAL_MS` and `HRGLS_VERBOSITY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_message_interval: Duration::from_millis(read_env_u64(
                "HRGLS_LOG_MESSAGE_INTERVAL_MS",
                defaults.log_message_interval.as_millis() as u64,
            )),
            queue_capacity: read_env_u64("HRGLS_QUEUE_CAPACITY", defaults.queue_capacity as u64)
                .max(1) as usize,
            poll_interval: Duration::from_millis(
                read_env_u64(
                    "HRGLS_POLL_INTERVAL_MS",
                    defaults.poll_interval.as_millis() as u64,
                )
                .max(1),
            ),
            verbosity: read_env_u16("HRGLS_VERBOSITY", defaults.verbosity),
        }
    }
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    read_env_parsed(name, default)
}

fn read_env_u16(name: &str, default: u16) -> u16 {
    read_env_parsed(name, default)
}

fn read_env_parsed<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match std::env::var(name) {
        Ok(v) => match v.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("Ignoring {}='{}', using {}", name, v, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.log_message_interval, Duration::from_millis(100));
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.verbosity, 0);
    }

    #[test]
    fn test_read_env_parsed() {
        std::env::set_var("HRGLS_TEST_CONFIG_GOOD", " 250 ");
        std::env::set_var("HRGLS_TEST_CONFIG_BAD", "lots");
        assert_eq!(read_env_u64("HRGLS_TEST_CONFIG_GOOD", 7), 250);
        assert_eq!(read_env_u64("HRGLS_TEST_CONFIG_BAD", 7), 7);
        assert_eq!(read_env_u16("HRGLS_TEST_CONFIG_MISSING", 9), 9);
        assert_eq!(read_env_u16("HRGLS_TEST_CONFIG_BAD", 3), 3);
    }
}
