//! Host constants: entry symbols, format tags and defaults.

/// Symbol exported by input plugins, NUL-terminated for dynamic lookup.
///
/// The exported function takes no arguments and returns a pointer to the
/// plugin's [`InputPluginTable`](crate::InputPluginTable).
pub const INPUT_TABLE_SYMBOL: &[u8] = b"GetInputPluginTable\0";

/// Symbol exported by output plugins, NUL-terminated for dynamic lookup.
pub const OUTPUT_TABLE_SYMBOL: &[u8] = b"GetOutputPluginTable\0";

/// Uncompressed RGB DIB (`biCompression`), 24-bit BGR rows, bottom-up.
pub const BI_RGB: u32 = 0;

/// `'Y' 'U' 'Y' '2'` FOURCC, packed little-endian.
pub const FOURCC_YUY2: u32 = u32::from_le_bytes(*b"YUY2");

/// 16-bit integer PCM (`wFormatTag`).
pub const WAVE_FORMAT_PCM: u16 = 1;

/// 32-bit IEEE float PCM (`wFormatTag`).
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// Buffer depth, in frames, the host uses until an output plugin asks otherwise.
///
/// The host pre-fetches half of the configured depth.
pub const DEFAULT_BUFFER_FRAMES: i32 = 4;
