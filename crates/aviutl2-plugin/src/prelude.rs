//! Everything a plugin implementation usually needs.
//!
//! ```
//! use aviutl2_plugin::prelude::*;
//!
//! let filter = [FilterEntry::ALL_FILES];
//! assert_eq!(filter.len(), 1);
//! ```

pub use crate::capability::{
    AudioOnly, AudioStreamInfo, ConfigureContext, HasConfigDialog, HasConfigText, InputPlugin,
    MediaInfo, NoConfigDialog, NoConfigText, OutputPlugin, SupportsAudio, SupportsVideo,
    VideoAndAudio, VideoOnly, VideoStreamInfo, WithConfigDialog, WithConfigText,
};
pub use crate::config::AdapterConfig;
pub use crate::error::{PluginError, PluginResult};
pub use crate::job::{AudioSampleFormat, OutputJob, VideoFrameFormat};
pub use crate::wide::FilterEntry;

pub use aviutl2_plugin_abi::{
    BitmapInfoHeader, DEFAULT_BUFFER_FRAMES, OutputInfoFlags, OutputPluginFlags, WaveFormatEx,
};
