//! Capability flag types shared by the table and info structures.
//!
//! Each flag set is `#[repr(transparent)]` over the host's `int` so it can sit
//! directly inside the `#[repr(C)]` structs.

use bitflags::bitflags;

bitflags! {
    /// `INPUT_PLUGIN_TABLE::flag`: what the plugin can produce.
    ///
    /// # ABI Stability
    ///
    /// Bit values are fixed by the host. Unknown bits are preserved by
    /// [`from_bits_retain`](Self::from_bits_retain) but never set by this crate.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct InputPluginFlags: i32 {
        /// Plugin produces video frames
        const VIDEO      = 1;
        /// Plugin produces audio samples
        const AUDIO      = 2;
        /// Video and audio reads on one handle may be issued concurrently
        const CONCURRENT = 16;
    }
}

bitflags! {
    /// `INPUT_INFO::flag`: which streams an opened file carries.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct InputInfoFlags: i32 {
        /// File has video data
        const VIDEO      = 1;
        /// File has audio data
        const AUDIO      = 2;
        /// Video and audio may be fetched at the same time
        const CONCURRENT = 16;
    }
}

bitflags! {
    /// `OUTPUT_PLUGIN_TABLE::flag`: media the plugin writes.
    ///
    /// The host currently ignores this field; it is filled in for forward
    /// compatibility.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct OutputPluginFlags: i32 {
        /// Plugin consumes video
        const VIDEO = 1;
        /// Plugin consumes audio
        const AUDIO = 2;
    }
}

bitflags! {
    /// `OUTPUT_INFO::flag`: which streams the host is about to deliver.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct OutputInfoFlags: i32 {
        /// Video data is available
        const VIDEO = 1;
        /// Audio data is available
        const AUDIO = 2;
    }
}

static_assertions::const_assert_eq!(std::mem::size_of::<InputPluginFlags>(), 4);
static_assertions::const_assert_eq!(std::mem::size_of::<InputInfoFlags>(), 4);
static_assertions::const_assert_eq!(std::mem::size_of::<OutputPluginFlags>(), 4);
static_assertions::const_assert_eq!(std::mem::size_of::<OutputInfoFlags>(), 4);

impl InputPluginFlags {
    /// Media bits only, without scheduling hints.
    #[must_use]
    pub const fn media(self) -> Self {
        self.intersection(Self::VIDEO.union(Self::AUDIO))
    }
}

impl From<InputPluginFlags> for InputInfoFlags {
    fn from(flags: InputPluginFlags) -> Self {
        InputInfoFlags::from_bits_truncate(flags.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_plugin_flag_values() {
        assert_eq!(InputPluginFlags::VIDEO.bits(), 1);
        assert_eq!(InputPluginFlags::AUDIO.bits(), 2);
        assert_eq!(InputPluginFlags::CONCURRENT.bits(), 16);
    }

    #[test]
    fn test_media_strips_concurrent() {
        let flags = InputPluginFlags::VIDEO | InputPluginFlags::CONCURRENT;
        assert_eq!(flags.media(), InputPluginFlags::VIDEO);
        assert!(InputPluginFlags::CONCURRENT.media().is_empty());
    }

    #[test]
    fn test_table_flags_convert_to_info_flags() {
        let table = InputPluginFlags::VIDEO | InputPluginFlags::AUDIO | InputPluginFlags::CONCURRENT;
        let info = InputInfoFlags::from(table);
        assert_eq!(info.bits(), table.bits());
    }

    #[test]
    fn test_output_flag_values() {
        let both = OutputPluginFlags::VIDEO | OutputPluginFlags::AUDIO;
        assert_eq!(both.bits(), 3);
        assert_eq!(OutputInfoFlags::AUDIO.bits(), 2);
    }

    #[test]
    fn test_unknown_bits_retained() {
        let flags = InputPluginFlags::from_bits_retain(0x100 | 1);
        assert!(flags.contains(InputPluginFlags::VIDEO));
        assert_eq!(flags.bits(), 0x101);
        assert_eq!(InputPluginFlags::from_bits_truncate(0x101), InputPluginFlags::VIDEO);
    }
}
