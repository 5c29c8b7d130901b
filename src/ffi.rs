//! C FFI layer for hrgls.
//!
//! Provides an opaque handle-based API for C/C++ consumers. Every function
//! returns one of the `HRGLS_STATUS_*` codes; `hrgls_error_message` turns a
//! code into text and `hrgls_last_error` gives details of the last failure.
//! The generated C header is written to `include/hrgls.h` by cbindgen.
//!
//! Handles returned through out-pointers are owned by the caller and must be
//! released with the matching `*_destroy` function. That includes the blob
//! and message handles passed to callbacks.

use crate::blob::DataBlob;
use crate::error::{error_message_ptr, LastError};
use crate::message::LogMessage;
use crate::source::DataBlobSource;
use crate::types::{ApiParams, MessageLevel, StreamProperties, TimeVal, Version};
use crate::{Api, HrglsError};
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::sync::Arc;

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

pub const HRGLS_STATUS_OKAY: c_int = 0;
pub const HRGLS_STATUS_TIMEOUT: c_int = 1;
pub const HRGLS_STATUS_HIGHEST_WARNING: c_int = 1000;
pub const HRGLS_STATUS_BAD_PARAMETER: c_int = 1001;
pub const HRGLS_STATUS_OUT_OF_MEMORY: c_int = 1002;
pub const HRGLS_STATUS_NOT_IMPLEMENTED: c_int = 1003;
pub const HRGLS_STATUS_DELETE_OF_NULL_POINTER: c_int = 1004;
pub const HRGLS_STATUS_DELETION_FAILED: c_int = 1005;
pub const HRGLS_STATUS_NULL_OBJECT_POINTER: c_int = 1006;
pub const HRGLS_STATUS_INTERNAL_EXCEPTION: c_int = 1007;

pub const HRGLS_MESSAGE_MINIMUM_INFO: i32 = MessageLevel::INFO.0;
pub const HRGLS_MESSAGE_MINIMUM_WARNING: i32 = MessageLevel::WARNING.0;
pub const HRGLS_MESSAGE_MINIMUM_ERROR: i32 = MessageLevel::ERROR.0;
pub const HRGLS_MESSAGE_MINIMUM_CRITICAL_ERROR: i32 = MessageLevel::CRITICAL_ERROR.0;

/// Called for each log message while a callback is installed. The callee owns
/// `message` and must destroy it.
pub type HrglsLogMessageCallback =
    Option<unsafe extern "C" fn(message: *mut HrglsMessage, user_data: *mut c_void)>;

/// Called for each blob while a callback is installed. The callee owns `blob`
/// and must release its data and destroy it.
pub type HrglsDataBlobSourceCallback =
    Option<unsafe extern "C" fn(blob: *mut HrglsDataBlob, user_data: *mut c_void)>;

/// Frees caller-provided blob data once no blob references it.
pub type HrglsDeletionFunction =
    Option<unsafe extern "C" fn(user_data: *mut c_void, data: *const u8)>;

/// Opaque API creation parameters.
pub struct HrglsApiParams {
    params: ApiParams,
    name: CString,
}

/// Opaque API session handle.
pub struct HrglsApi {
    api: Api,
    source_names: Vec<CString>,
}

/// Opaque stream properties handle.
pub struct HrglsStreamProperties(StreamProperties);

/// Opaque data blob handle.
pub struct HrglsDataBlob(DataBlob);

/// Opaque log message handle.
pub struct HrglsMessage {
    message: LogMessage,
    value: CString,
}

/// Opaque data blob source creation parameters.
pub struct HrglsDataBlobSourceParams {
    api: *const HrglsApi,
    name: String,
    properties: StreamProperties,
}

/// Opaque data blob source handle.
pub struct HrglsDataBlobSource {
    source: DataBlobSource,
    name: CString,
}

impl HrglsMessage {
    fn new(message: LogMessage) -> Self {
        let value = to_c_string(message.value());
        Self { message, value }
    }
}

/// Raw user data handed back to a C callback.
struct UserData(*mut c_void);

// The pointer is never dereferenced on the Rust side; the C caller owns its
// thread-safety contract.
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

impl UserData {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

/// Blob data owned by the C caller, freed through its deletion function.
struct ExternalBuffer {
    data: *const u8,
    size: usize,
    delete: HrglsDeletionFunction,
    user_data: UserData,
}

unsafe impl Send for ExternalBuffer {}
unsafe impl Sync for ExternalBuffer {}

impl AsRef<[u8]> for ExternalBuffer {
    fn as_ref(&self) -> &[u8] {
        if self.data.is_null() || self.size == 0 {
            return &[];
        }
        // Valid until the deletion function runs in `drop`.
        unsafe { std::slice::from_raw_parts(self.data, self.size) }
    }
}

impl Drop for ExternalBuffer {
    fn drop(&mut self) {
        if let Some(delete) = self.delete {
            unsafe { delete(self.user_data.get(), self.data) };
        }
    }
}

fn fail(err: HrglsError) -> c_int {
    let status = err.status();
    LAST_ERROR.set(&err);
    status.code()
}

fn null_object() -> c_int {
    fail(HrglsError::NullObjectPointer)
}

fn bad_parameter(what: &str) -> c_int {
    fail(HrglsError::BadParameter(what.to_string()))
}

fn to_c_string(s: &str) -> CString {
    CString::new(s).unwrap_or_else(|e| {
        let end = e.nul_position();
        let mut bytes = e.into_vec();
        bytes.truncate(end);
        CString::new(bytes).unwrap_or_default()
    })
}

unsafe fn from_c_str(s: *const c_char) -> String {
    if s.is_null() {
        return String::new();
    }
    CStr::from_ptr(s).to_string_lossy().into_owned()
}

unsafe fn destroy<T>(handle: *mut T) -> c_int {
    if handle.is_null() {
        return fail(HrglsError::DeleteOfNullPointer);
    }
    drop(Box::from_raw(handle));
    HRGLS_STATUS_OKAY
}

/// Text for a status code. The returned string is static.
#[no_mangle]
pub extern "C" fn hrgls_error_message(status: c_int) -> *const c_char {
    error_message_ptr(status)
}

/// Get the last error message. Returns NULL if no error has occurred.
/// The returned pointer is valid until the next failing hrgls call on any
/// thread. Copy the text before other threads can make failing calls.
#[no_mangle]
pub extern "C" fn hrgls_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

// ---------------------------------------------------------------------------
// API creation parameters

/// # Safety
/// `out` must be a valid pointer to write the new handle into, or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_params_create(out: *mut *mut HrglsApiParams) -> c_int {
    if out.is_null() {
        return bad_parameter("out");
    }
    let params = HrglsApiParams {
        params: ApiParams::default(),
        name: CString::default(),
    };
    out.write(Box::into_raw(Box::new(params)));
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `params` must be a handle from `hrgls_api_params_create`, or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_params_destroy(params: *mut HrglsApiParams) -> c_int {
    destroy(params)
}

/// The returned string is valid until the name changes or `params` is destroyed.
///
/// # Safety
/// `params` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_params_get_name(
    params: *const HrglsApiParams,
    out: *mut *const c_char,
) -> c_int {
    let Some(params) = params.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(params.name.as_ptr());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `params` must be a valid handle or null; `name` a NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_params_set_name(
    params: *mut HrglsApiParams,
    name: *const c_char,
) -> c_int {
    let Some(params) = params.as_mut() else {
        return null_object();
    };
    params.params.name = from_c_str(name);
    params.name = to_c_string(&params.params.name);
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `params` must be a valid handle or null; `out` and `size` valid pointers or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_params_get_credentials(
    params: *const HrglsApiParams,
    out: *mut *const u8,
    size: *mut u32,
) -> c_int {
    let Some(params) = params.as_ref() else {
        return null_object();
    };
    if out.is_null() || size.is_null() {
        return bad_parameter("out");
    }
    out.write(params.params.credentials.as_ptr());
    size.write(params.params.credentials.len() as u32);
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `params` must be a valid handle or null; `credentials` must point to `size`
/// readable bytes, or be null when `size` is 0.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_params_set_credentials(
    params: *mut HrglsApiParams,
    credentials: *const u8,
    size: u32,
) -> c_int {
    let Some(params) = params.as_mut() else {
        return null_object();
    };
    if credentials.is_null() && size > 0 {
        return bad_parameter("credentials");
    }
    params.params.credentials = if size == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(credentials, size as usize).to_vec()
    };
    HRGLS_STATUS_OKAY
}

// ---------------------------------------------------------------------------
// API session

/// Open an API session. `params` may be null for defaults.
///
/// # Safety
/// `out` must be a valid pointer or null; `params` a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_create(
    out: *mut *mut HrglsApi,
    params: *const HrglsApiParams,
) -> c_int {
    if out.is_null() {
        return bad_parameter("out");
    }
    let params = params
        .as_ref()
        .map(|p| p.params.clone())
        .unwrap_or_default();

    match Api::open(params) {
        Ok(api) => {
            let source_names = api
                .available_data_blob_sources()
                .iter()
                .map(|d| to_c_string(&d.name))
                .collect();
            out.write(Box::into_raw(Box::new(HrglsApi { api, source_names })));
            HRGLS_STATUS_OKAY
        }
        Err(e) => fail(e),
    }
}

/// # Safety
/// `api` must be a handle from `hrgls_api_create`, or null. Sources opened on
/// it keep working after it is destroyed.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_destroy(api: *mut HrglsApi) -> c_int {
    destroy(api)
}

/// # Safety
/// `api` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_get_version(api: *const HrglsApi, out: *mut Version) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(api.api.version());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `api` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_get_current_system_time(
    api: *const HrglsApi,
    out: *mut TimeVal,
) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(api.api.current_system_time());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `api` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_get_verbosity(api: *const HrglsApi, out: *mut u16) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(api.api.verbosity());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `api` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_set_verbosity(api: *const HrglsApi, verbosity: u16) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    api.api.set_verbosity(verbosity);
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `api` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_get_available_data_blob_source_count(
    api: *const HrglsApi,
    out: *mut u32,
) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(api.source_names.len() as u32);
    HRGLS_STATUS_OKAY
}

/// Name of the `which`th available source. Valid for the lifetime of `api`.
///
/// # Safety
/// `api` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_get_available_data_blob_source_name(
    api: *const HrglsApi,
    which: u32,
    out: *mut *const c_char,
) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    match api.source_names.get(which as usize) {
        Some(name) => {
            out.write(name.as_ptr());
            HRGLS_STATUS_OKAY
        }
        None => bad_parameter("which"),
    }
}

/// # Safety
/// `api` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_set_log_message_streaming_state(
    api: *const HrglsApi,
    running: bool,
) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    api.api.set_log_message_streaming_state(running);
    HRGLS_STATUS_OKAY
}

/// Install `handler` (or remove it when NULL). Pending messages are discarded.
///
/// # Safety
/// `api` must be a valid handle or null. `handler` is called from a runtime
/// thread with `user_data`, which must stay valid until the handler is removed.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_set_log_message_callback(
    api: *const HrglsApi,
    handler: HrglsLogMessageCallback,
    user_data: *mut c_void,
) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    let callback = handler.map(|handler| {
        let user_data = UserData(user_data);
        let callback: crate::LogMessageCallback = Arc::new(move |message: LogMessage| {
            let handle = Box::into_raw(Box::new(HrglsMessage::new(message)));
            unsafe { handler(handle, user_data.get()) };
        });
        callback
    });
    api.api.set_log_message_callback(callback);
    HRGLS_STATUS_OKAY
}

/// Take the oldest pending message. Returns `HRGLS_STATUS_TIMEOUT` and leaves
/// `out` untouched when none is pending.
///
/// # Safety
/// `api` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_get_next_log_message(
    api: *const HrglsApi,
    out: *mut *mut HrglsMessage,
) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    match api.api.next_log_message() {
        Ok(message) => {
            out.write(Box::into_raw(Box::new(HrglsMessage::new(message))));
            HRGLS_STATUS_OKAY
        }
        Err(e) => fail(e),
    }
}

/// # Safety
/// `api` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_api_set_log_message_minimum_level(
    api: *const HrglsApi,
    level: i32,
) -> c_int {
    let Some(api) = api.as_ref() else {
        return null_object();
    };
    api.api.set_log_message_minimum_level(MessageLevel(level));
    HRGLS_STATUS_OKAY
}

// ---------------------------------------------------------------------------
// Log messages

/// # Safety
/// `out` must be a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_create(out: *mut *mut HrglsMessage) -> c_int {
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(Box::into_raw(Box::new(HrglsMessage::new(LogMessage::default()))));
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `out` must be a valid pointer or null; `message` a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_copy(
    out: *mut *mut HrglsMessage,
    message: *const HrglsMessage,
) -> c_int {
    let Some(message) = message.as_ref() else {
        return bad_parameter("message");
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(Box::into_raw(Box::new(HrglsMessage::new(message.message.clone()))));
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `message` must be a message handle, or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_destroy(message: *mut HrglsMessage) -> c_int {
    destroy(message)
}

/// The returned string is valid until the value changes or `message` is destroyed.
///
/// # Safety
/// `message` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_get_value(
    message: *const HrglsMessage,
    out: *mut *const c_char,
) -> c_int {
    let Some(message) = message.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(message.value.as_ptr());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `message` must be a valid handle or null; `value` a NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_set_value(
    message: *mut HrglsMessage,
    value: *const c_char,
) -> c_int {
    let Some(message) = message.as_mut() else {
        return null_object();
    };
    message.message.set_value(from_c_str(value));
    message.value = to_c_string(message.message.value());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `message` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_get_time_stamp(
    message: *const HrglsMessage,
    out: *mut TimeVal,
) -> c_int {
    let Some(message) = message.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(message.message.time_stamp());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `message` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_set_time_stamp(
    message: *mut HrglsMessage,
    time_stamp: TimeVal,
) -> c_int {
    let Some(message) = message.as_mut() else {
        return null_object();
    };
    message.message.set_time_stamp(time_stamp);
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `message` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_get_level(
    message: *const HrglsMessage,
    out: *mut i32,
) -> c_int {
    let Some(message) = message.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(message.message.level().0);
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `message` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_message_set_level(message: *mut HrglsMessage, level: i32) -> c_int {
    let Some(message) = message.as_mut() else {
        return null_object();
    };
    message.message.set_level(MessageLevel(level));
    HRGLS_STATUS_OKAY
}

// ---------------------------------------------------------------------------
// Stream properties

/// # Safety
/// `out` must be a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_stream_properties_create(
    out: *mut *mut HrglsStreamProperties,
) -> c_int {
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(Box::into_raw(Box::new(HrglsStreamProperties(
        StreamProperties::new(),
    ))));
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `props` must be a stream properties handle, or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_stream_properties_destroy(
    props: *mut HrglsStreamProperties,
) -> c_int {
    destroy(props)
}

/// # Safety
/// `props` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_stream_properties_get_rate(
    props: *const HrglsStreamProperties,
    out: *mut f64,
) -> c_int {
    let Some(props) = props.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(props.0.rate());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `props` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_stream_properties_set_rate(
    props: *mut HrglsStreamProperties,
    rate: f64,
) -> c_int {
    let Some(props) = props.as_mut() else {
        return null_object();
    };
    match props.0.set_rate(rate) {
        Ok(()) => HRGLS_STATUS_OKAY,
        Err(e) => fail(e),
    }
}

// ---------------------------------------------------------------------------
// Data blobs

/// # Safety
/// `out` must be a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_create(out: *mut *mut HrglsDataBlob) -> c_int {
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(Box::into_raw(Box::new(HrglsDataBlob(DataBlob::new()))));
    HRGLS_STATUS_OKAY
}

/// The copy shares `blob`'s data; each must release it.
///
/// # Safety
/// `out` must be a valid pointer or null; `blob` a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_copy(
    out: *mut *mut HrglsDataBlob,
    blob: *const HrglsDataBlob,
) -> c_int {
    let Some(blob) = blob.as_ref() else {
        return bad_parameter("blob");
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(Box::into_raw(Box::new(HrglsDataBlob(blob.0.clone()))));
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `blob` must be a blob handle, or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_destroy(blob: *mut HrglsDataBlob) -> c_int {
    destroy(blob)
}

/// # Safety
/// `blob` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_get_time(
    blob: *const HrglsDataBlob,
    out: *mut TimeVal,
) -> c_int {
    let Some(blob) = blob.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(blob.0.time());
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `blob` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_set_time(blob: *mut HrglsDataBlob, time: TimeVal) -> c_int {
    let Some(blob) = blob.as_mut() else {
        return null_object();
    };
    blob.0.set_time(time);
    HRGLS_STATUS_OKAY
}

/// Data pointer and size. The pointer is valid until the blob's data is
/// released or replaced; a released blob reports NULL and size 0.
///
/// # Safety
/// `blob` must be a valid handle or null; `data` and `size` valid pointers or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_get_data(
    blob: *const HrglsDataBlob,
    data: *mut *const u8,
    size: *mut u32,
) -> c_int {
    let Some(blob) = blob.as_ref() else {
        return null_object();
    };
    if data.is_null() || size.is_null() {
        return bad_parameter("out");
    }
    if blob.0.is_released() {
        data.write(std::ptr::null());
    } else {
        data.write(blob.0.data().as_ptr());
    }
    size.write(blob.0.size() as u32);
    HRGLS_STATUS_OKAY
}

/// Point the blob at caller-owned data. `delete_function` (which may be NULL)
/// is called with `user_data` and `data` once every blob sharing it has
/// released it.
///
/// # Safety
/// `blob` must be a valid handle or null. `data` must point to `size` bytes
/// that stay valid until the deletion function is called.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_set_data(
    blob: *mut HrglsDataBlob,
    data: *const u8,
    size: u32,
    delete_function: HrglsDeletionFunction,
    user_data: *mut c_void,
) -> c_int {
    let Some(blob) = blob.as_mut() else {
        return null_object();
    };
    if data.is_null() && size > 0 {
        return bad_parameter("data");
    }
    blob.0.set_buffer(Arc::new(ExternalBuffer {
        data,
        size: size as usize,
        delete: delete_function,
        user_data: UserData(user_data),
    }));
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `blob` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_release_data(blob: *mut HrglsDataBlob) -> c_int {
    let Some(blob) = blob.as_mut() else {
        return null_object();
    };
    blob.0.release_data();
    HRGLS_STATUS_OKAY
}

// ---------------------------------------------------------------------------
// Data blob source creation parameters

/// # Safety
/// `out` must be a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_params_create(
    out: *mut *mut HrglsDataBlobSourceParams,
) -> c_int {
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(Box::into_raw(Box::new(HrglsDataBlobSourceParams {
        api: std::ptr::null(),
        name: String::new(),
        properties: StreamProperties::new(),
    })));
    HRGLS_STATUS_OKAY
}

/// # Safety
/// `params` must be a source params handle, or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_params_destroy(
    params: *mut HrglsDataBlobSourceParams,
) -> c_int {
    destroy(params)
}

/// # Safety
/// `params` must be a valid handle or null. `api` must outlive the call to
/// `hrgls_data_blob_source_create`.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_params_set_api(
    params: *mut HrglsDataBlobSourceParams,
    api: *const HrglsApi,
) -> c_int {
    let Some(params) = params.as_mut() else {
        return null_object();
    };
    params.api = api;
    HRGLS_STATUS_OKAY
}

/// An empty or NULL name selects the first available source.
///
/// # Safety
/// `params` must be a valid handle or null; `name` a NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_params_set_name(
    params: *mut HrglsDataBlobSourceParams,
    name: *const c_char,
) -> c_int {
    let Some(params) = params.as_mut() else {
        return null_object();
    };
    params.name = from_c_str(name);
    HRGLS_STATUS_OKAY
}

/// Copies `props` into the parameters.
///
/// # Safety
/// `params` and `props` must be valid handles or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_params_set_stream_properties(
    params: *mut HrglsDataBlobSourceParams,
    props: *const HrglsStreamProperties,
) -> c_int {
    let Some(params) = params.as_mut() else {
        return null_object();
    };
    let Some(props) = props.as_ref() else {
        return bad_parameter("props");
    };
    params.properties = props.0.clone();
    HRGLS_STATUS_OKAY
}

// ---------------------------------------------------------------------------
// Data blob sources

/// # Safety
/// `out` must be a valid pointer or null; `params` a valid handle or null
/// whose API handle is still alive.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_create(
    out: *mut *mut HrglsDataBlobSource,
    params: *const HrglsDataBlobSourceParams,
) -> c_int {
    if out.is_null() {
        return bad_parameter("out");
    }
    let Some(params) = params.as_ref() else {
        return bad_parameter("params");
    };
    let Some(api) = params.api.as_ref() else {
        return bad_parameter("api");
    };
    match DataBlobSource::open(&api.api, &params.properties, &params.name) {
        Ok(source) => {
            let name = to_c_string(&source.info().name);
            out.write(Box::into_raw(Box::new(HrglsDataBlobSource { source, name })));
            HRGLS_STATUS_OKAY
        }
        Err(e) => fail(e),
    }
}

/// # Safety
/// `stream` must be a handle from `hrgls_data_blob_source_create`, or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_destroy(stream: *mut HrglsDataBlobSource) -> c_int {
    destroy(stream)
}

/// # Safety
/// `stream` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_set_streaming_state(
    stream: *const HrglsDataBlobSource,
    running: bool,
) -> c_int {
    let Some(stream) = stream.as_ref() else {
        return null_object();
    };
    stream.source.set_streaming_state(running);
    HRGLS_STATUS_OKAY
}

/// Install `handler` (or remove it when NULL). Stored blobs are discarded.
///
/// # Safety
/// `stream` must be a valid handle or null. `handler` is called from a runtime
/// thread with `user_data`, which must stay valid until the handler is removed.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_set_stream_callback(
    stream: *const HrglsDataBlobSource,
    handler: HrglsDataBlobSourceCallback,
    user_data: *mut c_void,
) -> c_int {
    let Some(stream) = stream.as_ref() else {
        return null_object();
    };
    let callback = handler.map(|handler| {
        let user_data = UserData(user_data);
        let callback: crate::StreamCallback = Arc::new(move |blob: DataBlob| {
            let handle = Box::into_raw(Box::new(HrglsDataBlob(blob)));
            unsafe { handler(handle, user_data.get()) };
        });
        callback
    });
    stream.source.set_stream_callback(callback);
    HRGLS_STATUS_OKAY
}

/// Take the oldest stored blob, waiting up to `timeout`. Returns
/// `HRGLS_STATUS_TIMEOUT` and leaves `out` untouched if none arrives.
///
/// # Safety
/// `stream` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_get_next_blob(
    stream: *const HrglsDataBlobSource,
    out: *mut *mut HrglsDataBlob,
    timeout: TimeVal,
) -> c_int {
    let Some(stream) = stream.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    match stream.source.next_blob(timeout.as_duration()) {
        Ok(blob) => {
            out.write(Box::into_raw(Box::new(HrglsDataBlob(blob))));
            HRGLS_STATUS_OKAY
        }
        Err(e) => fail(e),
    }
}

/// The stream's unique name. Valid for the lifetime of `stream`.
///
/// # Safety
/// `stream` must be a valid handle or null; `out` a valid pointer or null.
#[no_mangle]
pub unsafe extern "C" fn hrgls_data_blob_source_get_name(
    stream: *const HrglsDataBlobSource,
    out: *mut *const c_char,
) -> c_int {
    let Some(stream) = stream.as_ref() else {
        return null_object();
    };
    if out.is_null() {
        return bad_parameter("out");
    }
    out.write(stream.name.as_ptr());
    HRGLS_STATUS_OKAY
}
