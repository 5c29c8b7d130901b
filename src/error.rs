use std::fmt;

/// Status code shared by the Rust and C surfaces.
///
/// Codes at or below [`Status::HIGHEST_WARNING`] are warnings; everything above
/// it is an error.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Okay = 0,
    Timeout = 1,
    BadParameter = 1001,
    OutOfMemory = 1002,
    NotImplemented = 1003,
    DeleteOfNullPointer = 1004,
    DeletionFailed = 1005,
    NullObjectPointer = 1006,
    InternalException = 1007,
}

impl Status {
    pub const HIGHEST_WARNING: i32 = 1000;

    /// Numeric code as seen by C callers.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a code; `None` for values the runtime never reports.
    pub fn from_code(code: i32) -> Option<Status> {
        let status = match code {
            0 => Status::Okay,
            1 => Status::Timeout,
            1001 => Status::BadParameter,
            1002 => Status::OutOfMemory,
            1003 => Status::NotImplemented,
            1004 => Status::DeleteOfNullPointer,
            1005 => Status::DeletionFailed,
            1006 => Status::NullObjectPointer,
            1007 => Status::InternalException,
            _ => return None,
        };
        Some(status)
    }

    /// Okay and timeouts are warnings rather than failures.
    pub fn is_warning(self) -> bool {
        self.code() <= Self::HIGHEST_WARNING
    }

    pub fn message(self) -> &'static str {
        error_message(self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Human-readable description of a status code, including unknown ones.
pub fn error_message(code: i32) -> &'static str {
    message_with_nul(code).trim_end_matches('\0')
}

/// Same text as [`error_message`], NUL-terminated for C callers.
pub(crate) fn error_message_ptr(code: i32) -> *const std::ffi::c_char {
    message_with_nul(code).as_ptr() as *const std::ffi::c_char
}

fn message_with_nul(code: i32) -> &'static str {
    match Status::from_code(code) {
        Some(Status::Okay) => "No error\0",
        Some(Status::Timeout) => "Timeout\0",
        Some(Status::BadParameter) => "Bad parameter\0",
        Some(Status::OutOfMemory) => "Out of memory\0",
        Some(Status::NotImplemented) => "Feature not yet implemented\0",
        Some(Status::DeleteOfNullPointer) => "Deletion of NULL pointer\0",
        Some(Status::DeletionFailed) => "Pointer deletion failed\0",
        Some(Status::NullObjectPointer) => "Object method called with NULL object pointer\0",
        Some(Status::InternalException) => "Exception thrown inside implementation\0",
        None => "Unrecognized error code\0",
    }
}

/// Errors returned by the hrgls runtime.
#[derive(Debug, thiserror::Error)]
pub enum HrglsError {
    #[error("Timeout")]
    Timeout,

    #[error("Bad parameter: {0}")]
    BadParameter(String),

    #[error("No data blob source named {0:?}")]
    UnknownSource(String),

    #[error("Object method called with NULL object pointer")]
    NullObjectPointer,

    #[error("Deletion of NULL pointer")]
    DeleteOfNullPointer,

    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl HrglsError {
    /// Status code reported for this error on the C surface.
    pub fn status(&self) -> Status {
        match self {
            HrglsError::Timeout => Status::Timeout,
            HrglsError::BadParameter(_) | HrglsError::UnknownSource(_) => Status::BadParameter,
            HrglsError::NullObjectPointer => Status::NullObjectPointer,
            HrglsError::DeleteOfNullPointer => Status::DeleteOfNullPointer,
            HrglsError::ThreadSpawn { .. } => Status::InternalException,
        }
    }

    /// Timeouts are expected while polling and are not failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HrglsError::Timeout)
    }
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &HrglsError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    /// Pointer to the stored NUL-terminated message, or null if none is set.
    ///
    /// The buffer is replaced by the next `set` from any thread, so the pointer
    /// must not be held while another thread may be making failing calls.
    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_known_codes() {
        assert_eq!(error_message(0), "No error");
        assert_eq!(error_message(1), "Timeout");
        assert_eq!(error_message(1001), "Bad parameter");
        assert_eq!(
            error_message(1006),
            "Object method called with NULL object pointer"
        );
    }

    #[test]
    fn test_error_message_ptr_is_nul_terminated() {
        let text = unsafe { std::ffi::CStr::from_ptr(error_message_ptr(1)) };
        assert_eq!(text.to_str().unwrap(), "Timeout");
    }

    #[test]
    fn test_error_message_unknown_code() {
        assert_eq!(error_message(42), "Unrecognized error code");
        assert_eq!(error_message(-1), "Unrecognized error code");
    }

    #[test]
    fn test_status_round_trip_and_warning_split() {
        for status in [Status::Okay, Status::Timeout, Status::InternalException] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert!(Status::Okay.is_warning());
        assert!(Status::Timeout.is_warning());
        assert!(!Status::BadParameter.is_warning());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(HrglsError::Timeout.status(), Status::Timeout);
        assert!(HrglsError::Timeout.is_timeout());
        assert_eq!(
            HrglsError::UnknownSource("x".into()).status(),
            Status::BadParameter
        );
        let spawn = HrglsError::ThreadSpawn {
            name: "test",
            source: std::io::Error::new(std::io::ErrorKind::Other, "no threads"),
        };
        assert_eq!(spawn.status(), Status::InternalException);
    }

    #[test]
    fn test_last_error() {
        let last = LastError::new();
        assert!(last.as_ptr().is_null());
        last.set(&HrglsError::Timeout);
        let text = unsafe { std::ffi::CStr::from_ptr(last.as_ptr()) };
        assert_eq!(text.to_str().unwrap(), "Timeout");
    }
}
