//! Convenience re-exports for common ABI types.
//!
//! # Example
//!
//! ```
//! use aviutl2_plugin_abi::prelude::*;
//!
//! let header = BitmapInfoHeader::rgb24(200, 150);
//! assert_eq!(header.frame_bytes(), 90_000);
//! ```

pub use crate::constants::{
    BI_RGB, DEFAULT_BUFFER_FRAMES, FOURCC_YUY2, INPUT_TABLE_SYMBOL, OUTPUT_TABLE_SYMBOL,
    WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM,
};

pub use crate::format::{
    BITMAP_INFO_HEADER_SIZE, BitmapInfoHeader, WAVE_FORMAT_EX_SIZE, WaveFormatEx,
};

pub use crate::input::{InputHandle, InputInfo, InputPluginTable};

pub use crate::output::{OutputInfo, OutputPluginTable};

pub use crate::types::{InputInfoFlags, InputPluginFlags, OutputInfoFlags, OutputPluginFlags};
