use crate::types::{MessageLevel, TimeVal};

/// A log event produced by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMessage {
    value: String,
    time_stamp: TimeVal,
    level: MessageLevel,
}

impl LogMessage {
    pub fn new(value: impl Into<String>, time_stamp: TimeVal, level: MessageLevel) -> Self {
        Self {
            value: value.into(),
            time_stamp,
            level,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn time_stamp(&self) -> TimeVal {
        self.time_stamp
    }

    pub fn set_time_stamp(&mut self, time_stamp: TimeVal) {
        self.time_stamp = time_stamp;
    }

    pub fn level(&self) -> MessageLevel {
        self.level
    }

    pub fn set_level(&mut self, level: MessageLevel) {
        self.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let mut msg = LogMessage::new("hello", TimeVal { tv_sec: 1, tv_usec: 2 }, MessageLevel::ERROR);
        assert_eq!(msg.value(), "hello");
        assert_eq!(msg.level(), MessageLevel::ERROR);

        msg.set_value("bye");
        msg.set_level(MessageLevel::WARNING);
        msg.set_time_stamp(TimeVal::default());
        assert_eq!(msg, LogMessage::new("bye", TimeVal::default(), MessageLevel::WARNING));
    }

    #[test]
    fn test_default_is_info() {
        assert_eq!(LogMessage::default().level(), MessageLevel::INFO);
    }
}
