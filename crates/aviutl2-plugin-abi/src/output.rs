//! `OUTPUT_PLUGIN_TABLE` and `OUTPUT_INFO`.

use std::ffi::c_void;
use std::ptr;

use crate::input::FuncConfig;
use crate::types::{OutputInfoFlags, OutputPluginFlags};

/// `func_output(oip) -> ok`
pub type FuncOutput = unsafe extern "system" fn(oip: *mut OutputInfo) -> bool;
/// `func_get_config_text() -> text`
pub type FuncGetConfigText = unsafe extern "system" fn() -> *const u16;

/// Host callback: `func_get_video(frame, format) -> frame data`.
///
/// `format` is a FOURCC or [`BI_RGB`](crate::BI_RGB). The returned buffer is
/// owned by the host and valid until the next call.
pub type FuncGetVideo = unsafe extern "system" fn(frame: i32, format: u32) -> *mut c_void;
/// Host callback: `func_get_audio(start, length, readed, format) -> samples`.
pub type FuncGetAudio = unsafe extern "system" fn(
    start: i32,
    length: i32,
    readed: *mut i32,
    format: u32,
) -> *mut c_void;
/// Host callback: has the user cancelled the export?
pub type FuncIsAbort = unsafe extern "system" fn() -> bool;
/// Host callback: progress report, `now` of `total` frames.
pub type FuncRestTimeDisp = unsafe extern "system" fn(now: i32, total: i32);
/// Host callback: prefetch depth for video frames and audio blocks.
pub type FuncSetBufferSize = unsafe extern "system" fn(video_size: i32, audio_size: i32);

/// Signature of the exported `GetOutputPluginTable` entry point.
pub type GetOutputPluginTableFn = unsafe extern "system" fn() -> *mut OutputPluginTable;

/// `OUTPUT_PLUGIN_TABLE`.
///
/// # Memory Layout (64-bit)
///
/// | Offset | Size | Field                |
/// |--------|------|----------------------|
/// | 0      | 4    | flag (+4 pad)        |
/// | 8      | 8    | name                 |
/// | 16     | 8    | filefilter           |
/// | 24     | 8    | information          |
/// | 32     | 8    | func_output          |
/// | 40     | 8    | func_config          |
/// | 48     | 8    | func_get_config_text |
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OutputPluginTable {
    /// Media the plugin consumes
    pub flag: OutputPluginFlags,
    /// Display name
    pub name: *const u16,
    /// File filter, `desc\0pattern\0...\0`
    pub filefilter: *const u16,
    /// Free-form plugin information
    pub information: *const u16,
    /// Run an export
    pub func_output: Option<FuncOutput>,
    /// Show the settings dialog
    pub func_config: Option<FuncConfig>,
    /// Describe the current settings
    pub func_get_config_text: Option<FuncGetConfigText>,
}

impl Default for OutputPluginTable {
    fn default() -> Self {
        Self {
            flag: OutputPluginFlags::empty(),
            name: ptr::null(),
            filefilter: ptr::null(),
            information: ptr::null(),
            func_output: None,
            func_config: None,
            func_get_config_text: None,
        }
    }
}

/// `OUTPUT_INFO`: the job description passed to `func_output`.
///
/// # Memory Layout (64-bit)
///
/// | Offset | Size | Field                  |
/// |--------|------|------------------------|
/// | 0      | 4    | flag                   |
/// | 4      | 4    | w                      |
/// | 8      | 4    | h                      |
/// | 12     | 4    | rate                   |
/// | 16     | 4    | scale                  |
/// | 20     | 4    | n                      |
/// | 24     | 4    | audio_rate             |
/// | 28     | 4    | audio_ch               |
/// | 32     | 4    | audio_n (+4 pad)       |
/// | 40     | 8    | savefile               |
/// | 48     | 8    | func_get_video         |
/// | 56     | 8    | func_get_audio         |
/// | 64     | 8    | func_is_abort          |
/// | 72     | 8    | func_rest_time_disp    |
/// | 80     | 8    | func_set_buffer_size   |
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OutputInfo {
    /// Streams available to this export
    pub flag: OutputInfoFlags,
    /// Frame width
    pub w: i32,
    /// Frame height
    pub h: i32,
    /// Frame rate numerator
    pub rate: i32,
    /// Frame rate denominator
    pub scale: i32,
    /// Frame count
    pub n: i32,
    /// Audio sample rate
    pub audio_rate: i32,
    /// Audio channel count
    pub audio_ch: i32,
    /// Audio sample count
    pub audio_n: i32,
    /// Destination path, NUL-terminated UTF-16
    pub savefile: *const u16,
    /// Fetch a frame
    pub func_get_video: Option<FuncGetVideo>,
    /// Fetch audio samples
    pub func_get_audio: Option<FuncGetAudio>,
    /// Poll for cancellation
    pub func_is_abort: Option<FuncIsAbort>,
    /// Report progress
    pub func_rest_time_disp: Option<FuncRestTimeDisp>,
    /// Set prefetch depth
    pub func_set_buffer_size: Option<FuncSetBufferSize>,
}

impl Default for OutputInfo {
    fn default() -> Self {
        Self {
            flag: OutputInfoFlags::empty(),
            w: 0,
            h: 0,
            rate: 0,
            scale: 0,
            n: 0,
            audio_rate: 0,
            audio_ch: 0,
            audio_n: 0,
            savefile: ptr::null(),
            func_get_video: None,
            func_get_audio: None,
            func_is_abort: None,
            func_rest_time_disp: None,
            func_set_buffer_size: None,
        }
    }
}

#[cfg(target_pointer_width = "64")]
mod layout {
    use super::{OutputInfo, OutputPluginTable};
    use static_assertions::const_assert_eq;
    use std::mem::{offset_of, size_of};

    const_assert_eq!(size_of::<OutputPluginTable>(), 56);
    const_assert_eq!(offset_of!(OutputPluginTable, func_output), 32);
    const_assert_eq!(offset_of!(OutputPluginTable, func_get_config_text), 48);

    const_assert_eq!(size_of::<OutputInfo>(), 88);
    const_assert_eq!(offset_of!(OutputInfo, audio_n), 32);
    const_assert_eq!(offset_of!(OutputInfo, savefile), 40);
    const_assert_eq!(offset_of!(OutputInfo, func_set_buffer_size), 80);
}
