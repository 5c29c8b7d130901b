use crate::{HrglsError, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock time as seconds plus microseconds since the Unix epoch.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeVal {
    /// Whole seconds since the epoch.
    pub tv_sec: i64,
    /// Microseconds past `tv_sec`, 0..1_000_000.
    pub tv_usec: i64,
}

impl TimeVal {
    pub fn now() -> TimeVal {
        TimeVal::from(SystemTime::now())
    }

    pub fn from_duration(d: Duration) -> TimeVal {
        TimeVal {
            tv_sec: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            tv_usec: i64::from(d.subsec_micros()),
        }
    }

    /// Negative components clamp to zero.
    pub fn as_duration(&self) -> Duration {
        let secs = self.tv_sec.max(0) as u64;
        let micros = self.tv_usec.max(0) as u64;
        Duration::from_secs(secs) + Duration::from_micros(micros)
    }
}

impl From<SystemTime> for TimeVal {
    fn from(t: SystemTime) -> Self {
        // Clocks set before 1970 report the epoch.
        TimeVal::from_duration(t.duration_since(UNIX_EPOCH).unwrap_or_default())
    }
}

/// Runtime version. Matching major numbers are backwards compatible.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Incremented on incompatible changes.
    pub major: u16,
    /// Incremented when features are added compatibly.
    pub minor: u16,
    /// Incremented for fixes.
    pub patch: u16,
}

pub const VERSION: Version = Version {
    major: 0,
    minor: 1,
    patch: 0,
};

/// Log-message severity. Larger is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageLevel(pub i32);

impl MessageLevel {
    pub const INFO: MessageLevel = MessageLevel(i32::MIN);
    pub const WARNING: MessageLevel = MessageLevel(0);
    pub const ERROR: MessageLevel = MessageLevel(i32::MAX / 3);
    pub const CRITICAL_ERROR: MessageLevel = MessageLevel(2 * (i32::MAX / 3));

    /// The level that follows this one when the runtime cycles through them.
    pub(crate) fn next_in_cycle(self) -> MessageLevel {
        match self {
            MessageLevel::INFO => MessageLevel::WARNING,
            MessageLevel::WARNING => MessageLevel::ERROR,
            MessageLevel::ERROR => MessageLevel::CRITICAL_ERROR,
            _ => MessageLevel::INFO,
        }
    }
}

impl Default for MessageLevel {
    fn default() -> Self {
        MessageLevel::INFO
    }
}

/// Properties used when opening a [`DataBlobSource`](crate::DataBlobSource).
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProperties {
    rate: f64,
}

impl StreamProperties {
    pub const DEFAULT_RATE: f64 = 30.0;

    pub fn new() -> Self {
        Self {
            rate: Self::DEFAULT_RATE,
        }
    }

    /// Blobs per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// The rate must be positive and its period must fit in a `Duration`.
    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(HrglsError::BadParameter(format!(
                "stream rate must be positive, got {}",
                rate
            )));
        }
        if Duration::try_from_secs_f64(1.0 / rate).is_err() {
            return Err(HrglsError::BadParameter(format!(
                "stream rate {} is too small",
                rate
            )));
        }
        self.rate = rate;
        Ok(())
    }

    pub(crate) fn period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.rate).unwrap_or(Duration::MAX)
    }
}

impl Default for StreamProperties {
    fn default() -> Self {
        Self::new()
    }
}

/// Describes a data blob source that the runtime can open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBlobSourceDescription {
    pub name: String,
}

impl DataBlobSourceDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Parameters for opening an [`Api`](crate::Api) session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiParams {
    pub name: String,
    pub credentials: Vec<u8>,
}

impl ApiParams {
    pub fn new(name: impl Into<String>, credentials: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            credentials: credentials.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeval_duration_conversion() {
        let tv = TimeVal::from_duration(Duration::from_micros(2_500_001));
        assert_eq!(tv, TimeVal { tv_sec: 2, tv_usec: 500_001 });
        assert_eq!(tv.as_duration(), Duration::from_micros(2_500_001));
        let negative = TimeVal { tv_sec: -3, tv_usec: 10 };
        assert_eq!(negative.as_duration(), Duration::from_micros(10));
    }

    #[test]
    fn test_timeval_now_is_after_2020() {
        assert!(TimeVal::now().tv_sec > 1_577_836_800);
    }

    #[test]
    fn test_message_level_ordering_and_cycle() {
        assert!(MessageLevel::INFO < MessageLevel::WARNING);
        assert!(MessageLevel::WARNING < MessageLevel::ERROR);
        assert!(MessageLevel::ERROR < MessageLevel::CRITICAL_ERROR);

        let mut level = MessageLevel::INFO;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(level);
            level = level.next_in_cycle();
        }
        assert_eq!(
            seen,
            vec![
                MessageLevel::INFO,
                MessageLevel::WARNING,
                MessageLevel::ERROR,
                MessageLevel::CRITICAL_ERROR,
                MessageLevel::INFO,
            ]
        );
        assert_eq!(MessageLevel(5).next_in_cycle(), MessageLevel::INFO);
    }

    #[test]
    fn test_stream_properties_rate() {
        let mut props = StreamProperties::default();
        assert_eq!(props.rate(), 30.0);
        props.set_rate(100.0).unwrap();
        assert_eq!(props.period(), Duration::from_millis(10));
        assert!(props.set_rate(0.0).is_err());
        assert!(props.set_rate(f64::NAN).is_err());
        assert_eq!(props.rate(), 100.0);
    }

    #[test]
    fn test_stream_rate_with_unrepresentable_period_rejected() {
        let mut props = StreamProperties::new();
        let err = props.set_rate(1e-300).unwrap_err();
        assert_eq!(err.status(), crate::Status::BadParameter);
        assert!(props.set_rate(f64::MIN_POSITIVE).is_err());
        assert_eq!(props.rate(), StreamProperties::DEFAULT_RATE);
        assert_eq!(props.period(), Duration::from_secs_f64(1.0 / 30.0));

        // Slow but representable rates are fine.
        props.set_rate(1e-6).unwrap();
        assert!(props.period() > Duration::from_secs(999_999));
    }

    #[test]
    fn test_timeval_from_huge_duration_saturates() {
        let tv = TimeVal::from_duration(Duration::MAX);
        assert_eq!(tv.tv_sec, i64::MAX);
        assert_eq!(tv.tv_usec, 999_999);
    }
}
