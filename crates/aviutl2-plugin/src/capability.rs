//! Capability traits a plugin implements, and the composition tags that
//! decide which table slots are filled.
//!
//! A plugin states its composition through associated types:
//!
//! ```ignore
//! impl InputPlugin for MyReader {
//!     type Handle = MyFile;
//!     type Media = VideoOnly;        // requires `SupportsVideo`
//!     type Config = NoConfigDialog;
//!     ...
//! }
//! ```
//!
//! `VideoOnly` only implements [`MediaKind<P>`] when `P: SupportsVideo`, so a
//! composition that names a capability the plugin lacks fails to compile.
//! Operations outside the composition are answered by the tag's default
//! methods with [`PluginError::CapabilityMismatch`].

use std::ffi::c_void;
use std::path::Path;

use aviutl2_plugin_abi::{BitmapInfoHeader, InputPluginFlags, OutputPluginFlags, WaveFormatEx};

use crate::config::AdapterConfig;
use crate::error::{PluginError, PluginResult};
use crate::job::OutputJob;
use crate::wide::FilterEntry;

/// A file reader exposed to the host through an input table.
pub trait InputPlugin: Sized + Send + Sync + 'static {
    /// Per-file state created by [`open`](Self::open).
    type Handle: Send + Sync + 'static;
    /// Media composition: [`VideoOnly`], [`AudioOnly`] or [`VideoAndAudio`].
    type Media: MediaKind<Self>;
    /// Settings dialog composition: [`WithConfigDialog`] or [`NoConfigDialog`].
    type Config: ConfigDialogKind<Self>;

    /// Display name
    const NAME: &'static str;
    /// File dialog filter
    const FILE_FILTER: &'static [FilterEntry];
    /// Free-form information text
    const INFORMATION: &'static str;
    /// Video and audio reads on one handle may run at the same time.
    ///
    /// When set, `read_video` and `read_audio` must synchronise any state
    /// they share through the handle.
    const CONCURRENT: bool = false;

    /// Boundary settings for this plugin.
    fn adapter_config() -> AdapterConfig {
        AdapterConfig::default()
    }

    /// Opens `path`.
    ///
    /// # Errors
    ///
    /// Any failure becomes a null handle for the host.
    fn open(&self, path: &Path) -> PluginResult<Self::Handle>;

    /// Releases a handle. The default just drops it.
    ///
    /// # Errors
    ///
    /// Reported to the host as `false`; the handle is gone either way.
    fn close(&self, handle: Self::Handle) -> PluginResult<()> {
        drop(handle);
        Ok(())
    }

    /// Describes the streams of an opened file.
    ///
    /// # Errors
    ///
    /// Reported to the host as `false`.
    fn info(&self, handle: &Self::Handle) -> PluginResult<MediaInfo>;
}

/// Input plugins that decode video frames.
pub trait SupportsVideo: InputPlugin {
    /// Decodes `frame` in the format last returned by
    /// [`info`](InputPlugin::info). The result may not exceed
    /// `format.frame_bytes()`.
    ///
    /// # Errors
    ///
    /// Reported to the host as 0 bytes.
    fn read_video(&self, handle: &Self::Handle, frame: i32) -> PluginResult<Vec<u8>>;
}

/// Input plugins that decode audio.
pub trait SupportsAudio: InputPlugin {
    /// Decodes up to `length` sample frames starting at `start`, as raw
    /// interleaved bytes in the format last returned by
    /// [`info`](InputPlugin::info).
    ///
    /// # Errors
    ///
    /// Reported to the host as 0 samples.
    fn read_audio(&self, handle: &Self::Handle, start: i32, length: i32) -> PluginResult<Vec<u8>>;
}

/// Window handles passed to a settings dialog.
#[derive(Debug, Clone, Copy)]
pub struct ConfigureContext {
    window: *mut c_void,
    instance: *mut c_void,
}

impl ConfigureContext {
    /// Wraps the host's `HWND` and the plugin module's `HINSTANCE`.
    #[must_use]
    pub fn new(window: *mut c_void, instance: *mut c_void) -> Self {
        Self { window, instance }
    }

    /// Parent window, possibly null.
    #[must_use]
    pub fn window(&self) -> *mut c_void {
        self.window
    }

    /// Plugin module instance, possibly null.
    #[must_use]
    pub fn instance(&self) -> *mut c_void {
        self.instance
    }
}

/// Plugins with a settings dialog.
pub trait HasConfigDialog: Send + Sync + 'static {
    /// Shows the dialog. Returns whether settings were accepted.
    fn configure(&self, context: ConfigureContext) -> bool;
}

/// Output plugins that can summarise their settings as text.
pub trait HasConfigText: Send + Sync + 'static {
    /// Current settings, shown by the host next to the plugin name.
    fn config_text(&self) -> String;
}

/// Media composition of an input plugin.
pub trait MediaKind<P: InputPlugin> {
    /// Table flags contributed by this composition.
    const FLAGS: InputPluginFlags;

    /// Routes a video read; refused unless overridden.
    ///
    /// # Errors
    ///
    /// [`PluginError::CapabilityMismatch`] by default.
    fn read_video(_plugin: &P, _handle: &P::Handle, _frame: i32) -> PluginResult<Vec<u8>> {
        Err(PluginError::CapabilityMismatch {
            operation: "read_video",
        })
    }

    /// Routes an audio read; refused unless overridden.
    ///
    /// # Errors
    ///
    /// [`PluginError::CapabilityMismatch`] by default.
    fn read_audio(
        _plugin: &P,
        _handle: &P::Handle,
        _start: i32,
        _length: i32,
    ) -> PluginResult<Vec<u8>> {
        Err(PluginError::CapabilityMismatch {
            operation: "read_audio",
        })
    }
}

/// Video frames only.
#[derive(Debug)]
pub enum VideoOnly {}

/// Audio samples only.
#[derive(Debug)]
pub enum AudioOnly {}

/// Both video frames and audio samples.
#[derive(Debug)]
pub enum VideoAndAudio {}

impl<P: SupportsVideo> MediaKind<P> for VideoOnly {
    const FLAGS: InputPluginFlags = InputPluginFlags::VIDEO;

    fn read_video(plugin: &P, handle: &P::Handle, frame: i32) -> PluginResult<Vec<u8>> {
        SupportsVideo::read_video(plugin, handle, frame)
    }
}

impl<P: SupportsAudio> MediaKind<P> for AudioOnly {
    const FLAGS: InputPluginFlags = InputPluginFlags::AUDIO;

    fn read_audio(plugin: &P, handle: &P::Handle, start: i32, length: i32) -> PluginResult<Vec<u8>> {
        SupportsAudio::read_audio(plugin, handle, start, length)
    }
}

impl<P: SupportsVideo + SupportsAudio> MediaKind<P> for VideoAndAudio {
    const FLAGS: InputPluginFlags = InputPluginFlags::VIDEO.union(InputPluginFlags::AUDIO);

    fn read_video(plugin: &P, handle: &P::Handle, frame: i32) -> PluginResult<Vec<u8>> {
        SupportsVideo::read_video(plugin, handle, frame)
    }

    fn read_audio(plugin: &P, handle: &P::Handle, start: i32, length: i32) -> PluginResult<Vec<u8>> {
        SupportsAudio::read_audio(plugin, handle, start, length)
    }
}

/// Settings dialog composition.
pub trait ConfigDialogKind<P> {
    /// Whether the table's `func_config` slot is filled.
    const PRESENT: bool;

    /// Shows the dialog; `false` unless overridden.
    fn configure(_plugin: &P, _context: ConfigureContext) -> bool {
        false
    }
}

/// Plugin has a settings dialog.
#[derive(Debug)]
pub enum WithConfigDialog {}

/// Plugin has no settings dialog; `func_config` is null.
#[derive(Debug)]
pub enum NoConfigDialog {}

impl<P: HasConfigDialog> ConfigDialogKind<P> for WithConfigDialog {
    const PRESENT: bool = true;

    fn configure(plugin: &P, context: ConfigureContext) -> bool {
        plugin.configure(context)
    }
}

impl<P> ConfigDialogKind<P> for NoConfigDialog {
    const PRESENT: bool = false;
}

/// Config text composition of an output plugin.
pub trait ConfigTextKind<P> {
    /// Whether the table's `func_get_config_text` slot is filled.
    const PRESENT: bool;

    /// Current settings text; empty unless overridden.
    fn config_text(_plugin: &P) -> String {
        String::new()
    }
}

/// Plugin describes its settings as text.
#[derive(Debug)]
pub enum WithConfigText {}

/// Plugin has no settings text; `func_get_config_text` is null.
#[derive(Debug)]
pub enum NoConfigText {}

impl<P: HasConfigText> ConfigTextKind<P> for WithConfigText {
    const PRESENT: bool = true;

    fn config_text(plugin: &P) -> String {
        plugin.config_text()
    }
}

impl<P> ConfigTextKind<P> for NoConfigText {
    const PRESENT: bool = false;
}

/// A file writer exposed to the host through an output table.
pub trait OutputPlugin: Sized + Send + Sync + 'static {
    /// Settings dialog composition.
    type Config: ConfigDialogKind<Self>;
    /// Settings text composition.
    type ConfigText: ConfigTextKind<Self>;

    /// Display name
    const NAME: &'static str;
    /// File dialog filter
    const FILE_FILTER: &'static [FilterEntry];
    /// Free-form information text
    const INFORMATION: &'static str;
    /// Media this plugin consumes. Must not be empty.
    const MEDIA: OutputPluginFlags;

    /// Boundary settings for this plugin.
    fn adapter_config() -> AdapterConfig {
        AdapterConfig::default()
    }

    /// Runs one export.
    ///
    /// # Errors
    ///
    /// Reported to the host as `false`.
    fn output(&self, job: &mut OutputJob<'_>) -> PluginResult<()>;
}

/// Video stream description returned from [`InputPlugin::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoStreamInfo {
    /// Frame rate numerator
    pub rate: i32,
    /// Frame rate denominator
    pub scale: i32,
    /// Number of frames
    pub frame_count: i32,
    /// Layout of decoded frames
    pub format: BitmapInfoHeader,
}

/// Audio stream description returned from [`InputPlugin::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamInfo {
    /// Number of sample frames
    pub sample_count: i32,
    /// Layout of decoded samples
    pub format: WaveFormatEx,
}

/// Streams present in an opened file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaInfo {
    /// Video stream, if any
    pub video: Option<VideoStreamInfo>,
    /// Audio stream, if any
    pub audio: Option<AudioStreamInfo>,
}

impl MediaInfo {
    /// A file with only a video stream.
    #[must_use]
    pub fn video(video: VideoStreamInfo) -> Self {
        Self {
            video: Some(video),
            audio: None,
        }
    }

    /// A file with only an audio stream.
    #[must_use]
    pub fn audio(audio: AudioStreamInfo) -> Self {
        Self {
            video: None,
            audio: Some(audio),
        }
    }

    /// Adds an audio stream.
    #[must_use]
    pub fn with_audio(mut self, audio: AudioStreamInfo) -> Self {
        self.audio = Some(audio);
        self
    }
}
