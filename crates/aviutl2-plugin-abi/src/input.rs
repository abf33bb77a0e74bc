//! `INPUT_PLUGIN_TABLE` and `INPUT_INFO`.

use std::ffi::c_void;
use std::ptr;

use crate::types::{InputInfoFlags, InputPluginFlags};

/// Opaque per-file handle returned by `func_open`. Null means failure.
pub type InputHandle = *mut c_void;

/// `func_open(file) -> handle`
pub type FuncOpen = unsafe extern "system" fn(file: *const u16) -> InputHandle;
/// `func_close(handle) -> ok`
pub type FuncClose = unsafe extern "system" fn(ih: InputHandle) -> bool;
/// `func_info_get(handle, info) -> ok`
pub type FuncInfoGet = unsafe extern "system" fn(ih: InputHandle, iip: *mut InputInfo) -> bool;
/// `func_read_video(handle, frame, buf) -> bytes written`
pub type FuncReadVideo =
    unsafe extern "system" fn(ih: InputHandle, frame: i32, buf: *mut c_void) -> i32;
/// `func_read_audio(handle, start, length, buf) -> samples written`
pub type FuncReadAudio =
    unsafe extern "system" fn(ih: InputHandle, start: i32, length: i32, buf: *mut c_void) -> i32;
/// `func_config(hwnd, hinstance) -> ok`. Shared by the output table.
pub type FuncConfig = unsafe extern "system" fn(hwnd: *mut c_void, dll_hinst: *mut c_void) -> bool;

/// Signature of the exported `GetInputPluginTable` entry point.
pub type GetInputPluginTableFn = unsafe extern "system" fn() -> *mut InputPluginTable;

/// `INPUT_PLUGIN_TABLE`: the descriptor the host fetches once per load.
///
/// # Memory Layout (64-bit)
///
/// | Offset | Size | Field           |
/// |--------|------|-----------------|
/// | 0      | 4    | flag (+4 pad)   |
/// | 8      | 8    | name            |
/// | 16     | 8    | filefilter      |
/// | 24     | 8    | information     |
/// | 32     | 8    | func_open       |
/// | 40     | 8    | func_close      |
/// | 48     | 8    | func_info_get   |
/// | 56     | 8    | func_read_video |
/// | 64     | 8    | func_read_audio |
/// | 72     | 8    | func_config     |
///
/// Every function slot is nullable at the ABI level. Tables produced by the
/// adapter fill all of them except `func_config`, which is null when the
/// plugin has no settings dialog.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InputPluginTable {
    /// Capability flags
    pub flag: InputPluginFlags,
    /// Display name
    pub name: *const u16,
    /// File filter, `desc\0pattern\0...\0`
    pub filefilter: *const u16,
    /// Free-form plugin information
    pub information: *const u16,
    /// Open a file
    pub func_open: Option<FuncOpen>,
    /// Close a handle
    pub func_close: Option<FuncClose>,
    /// Describe an opened file
    pub func_info_get: Option<FuncInfoGet>,
    /// Decode one video frame
    pub func_read_video: Option<FuncReadVideo>,
    /// Decode a run of audio samples
    pub func_read_audio: Option<FuncReadAudio>,
    /// Show the settings dialog
    pub func_config: Option<FuncConfig>,
}

impl Default for InputPluginTable {
    fn default() -> Self {
        Self {
            flag: InputPluginFlags::empty(),
            name: ptr::null(),
            filefilter: ptr::null(),
            information: ptr::null(),
            func_open: None,
            func_close: None,
            func_info_get: None,
            func_read_video: None,
            func_read_audio: None,
            func_config: None,
        }
    }
}

/// `INPUT_INFO`: filled in by `func_info_get`.
///
/// `format` and `audio_format` point into memory owned by the plugin. They
/// must stay valid until the handle is closed or the next `func_info_get`.
///
/// # Memory Layout (64-bit)
///
/// | Offset | Size | Field                   |
/// |--------|------|-------------------------|
/// | 0      | 4    | flag                    |
/// | 4      | 4    | rate                    |
/// | 8      | 4    | scale                   |
/// | 12     | 4    | n                       |
/// | 16     | 8    | format                  |
/// | 24     | 4    | format_size             |
/// | 28     | 4    | audio_n                 |
/// | 32     | 8    | audio_format            |
/// | 40     | 4    | audio_format_size (+4)  |
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InputInfo {
    /// Streams present in the file
    pub flag: InputInfoFlags,
    /// Frame rate numerator
    pub rate: i32,
    /// Frame rate denominator
    pub scale: i32,
    /// Frame count
    pub n: i32,
    /// `BITMAPINFOHEADER*` describing decoded frames
    pub format: *mut c_void,
    /// Size in bytes of `*format`
    pub format_size: i32,
    /// Audio sample count
    pub audio_n: i32,
    /// `WAVEFORMATEX*` describing decoded samples
    pub audio_format: *mut c_void,
    /// Size in bytes of `*audio_format`
    pub audio_format_size: i32,
}

impl Default for InputInfo {
    fn default() -> Self {
        Self {
            flag: InputInfoFlags::empty(),
            rate: 0,
            scale: 0,
            n: 0,
            format: ptr::null_mut(),
            format_size: 0,
            audio_n: 0,
            audio_format: ptr::null_mut(),
            audio_format_size: 0,
        }
    }
}

#[cfg(target_pointer_width = "64")]
mod layout {
    use super::{InputInfo, InputPluginTable};
    use static_assertions::const_assert_eq;
    use std::mem::{offset_of, size_of};

    const_assert_eq!(size_of::<InputPluginTable>(), 80);
    const_assert_eq!(offset_of!(InputPluginTable, name), 8);
    const_assert_eq!(offset_of!(InputPluginTable, func_open), 32);
    const_assert_eq!(offset_of!(InputPluginTable, func_config), 72);

    const_assert_eq!(size_of::<InputInfo>(), 48);
    const_assert_eq!(offset_of!(InputInfo, format), 16);
    const_assert_eq!(offset_of!(InputInfo, audio_n), 28);
    const_assert_eq!(offset_of!(InputInfo, audio_format), 32);
    const_assert_eq!(offset_of!(InputInfo, audio_format_size), 40);
}
