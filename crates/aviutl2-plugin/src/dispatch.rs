//! `extern "system"` trampolines installed in the native tables.
//!
//! Each one is monomorphised per plugin type, resolves the runtime through
//! [`InputPluginExport::runtime`] / [`OutputPluginExport::runtime`], runs
//! inside [`guard`] and maps every failure to the host's vocabulary:
//! null handles, `false`, or `0`.

use std::ffi::c_void;
use std::ptr::{self, NonNull};

use aviutl2_plugin_abi::{InputHandle, InputInfo, InputPluginTable, OutputInfo, OutputPluginTable};
use tracing::{debug, error, trace, warn};

use crate::capability::ConfigureContext;
use crate::config::AdapterConfig;
use crate::error::{BuildError, ErrorCategory, PluginError};
use crate::ffi_guard::guard;
use crate::job::OutputJob;
use crate::registry::HandleToken;
use crate::runtime::{InputPluginExport, OutputPluginExport};
use crate::wide::read_wide_path;

fn trace_call(config: &AdapterConfig, plugin: &'static str, operation: &'static str, handle: *mut c_void) {
    if config.trace_calls {
        trace!(plugin, operation, token = handle.addr(), "Host call");
    }
}

/// Logs a refused call. Stale and mistyped tokens log different reasons but
/// return the same failure value.
fn refuse(plugin: &'static str, operation: &'static str, err: &PluginError) {
    match err {
        PluginError::Handle(handle) => warn!(
            plugin,
            operation,
            token = handle.token(),
            reason = handle.reason(),
            "Rejected handle"
        ),
        PluginError::FormatOverflow { produced, capacity } => warn!(
            plugin,
            operation,
            produced,
            capacity,
            "Refused read larger than the declared format"
        ),
        other => match other.category() {
            ErrorCategory::Allocation => warn!(plugin, operation, error = %other, "Call failed"),
            category => debug!(
                plugin,
                operation,
                category = category.as_str(),
                error = %other,
                "Call failed"
            ),
        },
    }
}

fn token_of(plugin: &'static str, operation: &'static str, handle: InputHandle) -> Option<HandleToken> {
    let token = HandleToken::from_raw_handle(handle);
    if token.is_none() {
        warn!(plugin, operation, "Rejected null handle");
    }
    token
}

pub(crate) unsafe extern "system" fn input_open<P: InputPluginExport>(file: *const u16) -> InputHandle {
    guard("func_open", P::NAME, ptr::null_mut(), || {
        let runtime = P::runtime();
        trace_call(runtime.config(), P::NAME, "func_open", ptr::null_mut());
        // SAFETY: the host passes a NUL-terminated path; length is capped by config.
        let opened = unsafe { read_wide_path(file, runtime.config().max_path_units) }
            .and_then(|path| runtime.open_path(&path));
        match opened {
            Ok(token) => token.into_raw_handle(),
            Err(err) => {
                refuse(P::NAME, "func_open", &err);
                ptr::null_mut()
            }
        }
    })
}

pub(crate) unsafe extern "system" fn input_close<P: InputPluginExport>(ih: InputHandle) -> bool {
    guard("func_close", P::NAME, false, || {
        let runtime = P::runtime();
        trace_call(runtime.config(), P::NAME, "func_close", ih);
        let Some(token) = token_of(P::NAME, "func_close", ih) else {
            return false;
        };
        match runtime.close(token) {
            Ok(()) => true,
            Err(err) => {
                refuse(P::NAME, "func_close", &err);
                false
            }
        }
    })
}

pub(crate) unsafe extern "system" fn input_info_get<P: InputPluginExport>(
    ih: InputHandle,
    iip: *mut InputInfo,
) -> bool {
    guard("func_info_get", P::NAME, false, || {
        let runtime = P::runtime();
        trace_call(runtime.config(), P::NAME, "func_info_get", ih);
        let Some(token) = token_of(P::NAME, "func_info_get", ih) else {
            return false;
        };
        if iip.is_null() {
            warn!(plugin = P::NAME, "Rejected null INPUT_INFO pointer");
            return false;
        }
        match runtime.info(token) {
            Ok(info) => {
                // SAFETY: non-null, and the host passes a writable INPUT_INFO.
                unsafe { iip.write(info) };
                true
            }
            Err(err) => {
                refuse(P::NAME, "func_info_get", &err);
                false
            }
        }
    })
}

pub(crate) unsafe extern "system" fn input_read_video<P: InputPluginExport>(
    ih: InputHandle,
    frame: i32,
    buf: *mut c_void,
) -> i32 {
    guard("func_read_video", P::NAME, 0, || {
        let runtime = P::runtime();
        trace_call(runtime.config(), P::NAME, "func_read_video", ih);
        let Some(token) = token_of(P::NAME, "func_read_video", ih) else {
            return 0;
        };
        if buf.is_null() {
            return 0;
        }
        let bytes = match runtime.read_video(token, frame) {
            Ok(bytes) => bytes,
            Err(err) => {
                refuse(P::NAME, "func_read_video", &err);
                return 0;
            }
        };
        let Ok(written) = i32::try_from(bytes.len()) else {
            return 0;
        };
        // SAFETY: the host buffer holds the frame size declared by the
        // handle's format, and `read_video` never returns more than that.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), bytes.len()) };
        written
    })
}

pub(crate) unsafe extern "system" fn input_read_audio<P: InputPluginExport>(
    ih: InputHandle,
    start: i32,
    length: i32,
    buf: *mut c_void,
) -> i32 {
    guard("func_read_audio", P::NAME, 0, || {
        let runtime = P::runtime();
        trace_call(runtime.config(), P::NAME, "func_read_audio", ih);
        let Some(token) = token_of(P::NAME, "func_read_audio", ih) else {
            return 0;
        };
        if buf.is_null() {
            return 0;
        }
        let chunk = match runtime.read_audio(token, start, length) {
            Ok(chunk) => chunk,
            Err(err) => {
                refuse(P::NAME, "func_read_audio", &err);
                return 0;
            }
        };
        // SAFETY: the host buffer holds `length` sample frames of the declared
        // format, and `read_audio` never returns more than that.
        unsafe {
            ptr::copy_nonoverlapping(chunk.bytes.as_ptr(), buf.cast::<u8>(), chunk.bytes.len());
        };
        chunk.samples
    })
}

pub(crate) unsafe extern "system" fn input_config<P: InputPluginExport>(
    hwnd: *mut c_void,
    dll_hinst: *mut c_void,
) -> bool {
    guard("func_config", P::NAME, false, || {
        P::runtime().configure(ConfigureContext::new(hwnd, dll_hinst))
    })
}

pub(crate) unsafe extern "system" fn unsupported_read_video(
    _ih: InputHandle,
    _frame: i32,
    _buf: *mut c_void,
) -> i32 {
    0
}

pub(crate) unsafe extern "system" fn unsupported_read_audio(
    _ih: InputHandle,
    _start: i32,
    _length: i32,
    _buf: *mut c_void,
) -> i32 {
    0
}

pub(crate) unsafe extern "system" fn output_run<P: OutputPluginExport>(oip: *mut OutputInfo) -> bool {
    guard("func_output", P::NAME, false, || {
        let runtime = P::runtime();
        trace_call(runtime.config(), P::NAME, "func_output", oip.cast());
        // SAFETY: the host passes a valid OUTPUT_INFO or null.
        let Some(info) = (unsafe { oip.as_ref() }) else {
            warn!(plugin = P::NAME, "Rejected null OUTPUT_INFO pointer");
            return false;
        };
        // SAFETY: callbacks and savefile come from the host for this export.
        let result = unsafe { OutputJob::from_raw(info, runtime.config().max_path_units) }
            .and_then(|mut job| runtime.output(&mut job));
        match result {
            Ok(()) => true,
            Err(err) => {
                refuse(P::NAME, "func_output", &err);
                false
            }
        }
    })
}

pub(crate) unsafe extern "system" fn output_config<P: OutputPluginExport>(
    hwnd: *mut c_void,
    dll_hinst: *mut c_void,
) -> bool {
    guard("func_config", P::NAME, false, || {
        P::runtime().configure(ConfigureContext::new(hwnd, dll_hinst))
    })
}

pub(crate) unsafe extern "system" fn output_config_text<P: OutputPluginExport>() -> *const u16 {
    guard("func_get_config_text", P::NAME, ptr::null(), || {
        match P::runtime().refresh_config_text() {
            Ok(text) => text,
            Err(err) => {
                refuse(P::NAME, "func_get_config_text", &err);
                ptr::null()
            }
        }
    })
}

/// The input table of `P`, built on first use.
///
/// # Errors
///
/// Any [`BuildError`].
pub fn input_table<P: InputPluginExport>() -> Result<NonNull<InputPluginTable>, BuildError> {
    P::runtime().table()
}

/// Frees and rebuilds the input table of `P`.
///
/// Not safe against a concurrent rebuild of the same table from another
/// thread while the host is reading it.
///
/// # Errors
///
/// Any [`BuildError`].
pub fn rebuild_input_table<P: InputPluginExport>() -> Result<NonNull<InputPluginTable>, BuildError> {
    P::runtime().rebuild_table()
}

/// The output table of `P`, built on first use.
///
/// # Errors
///
/// Any [`BuildError`].
pub fn output_table<P: OutputPluginExport>() -> Result<NonNull<OutputPluginTable>, BuildError> {
    P::runtime().table()
}

/// Frees and rebuilds the output table of `P`.
///
/// # Errors
///
/// Any [`BuildError`].
pub fn rebuild_output_table<P: OutputPluginExport>() -> Result<NonNull<OutputPluginTable>, BuildError> {
    P::runtime().rebuild_table()
}

/// Body of the exported `GetInputPluginTable`: the table, or null on failure.
pub fn export_input_table<P: InputPluginExport>() -> *mut InputPluginTable {
    guard("GetInputPluginTable", P::NAME, ptr::null_mut(), || {
        match input_table::<P>() {
            Ok(table) => table.as_ptr(),
            Err(err) => {
                error!(plugin = P::NAME, error = %err, "Failed to build input table");
                ptr::null_mut()
            }
        }
    })
}

/// Body of the exported `GetOutputPluginTable`: the table, or null on failure.
pub fn export_output_table<P: OutputPluginExport>() -> *mut OutputPluginTable {
    guard("GetOutputPluginTable", P::NAME, ptr::null_mut(), || {
        match output_table::<P>() {
            Ok(table) => table.as_ptr(),
            Err(err) => {
                error!(plugin = P::NAME, error = %err, "Failed to build output table");
                ptr::null_mut()
            }
        }
    })
}
