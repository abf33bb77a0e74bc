//! Unit tests for ABI types.
//!
//! These tests verify the layout, size, and alignment of ABI types so the
//! structures stay bit-compatible with the host's headers.

use aviutl2_plugin_abi::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[cfg(target_pointer_width = "64")]
mod size_and_alignment {
    use super::*;

    #[test]
    fn test_input_plugin_table_size() {
        assert_eq!(std::mem::size_of::<InputPluginTable>(), 80);
        assert_eq!(std::mem::align_of::<InputPluginTable>(), 8);
    }

    #[test]
    fn test_input_info_size() {
        assert_eq!(std::mem::size_of::<InputInfo>(), 48);
    }

    #[test]
    fn test_output_plugin_table_size() {
        assert_eq!(std::mem::size_of::<OutputPluginTable>(), 56);
    }

    #[test]
    fn test_output_info_size() {
        assert_eq!(std::mem::size_of::<OutputInfo>(), 88);
    }

    #[test]
    fn test_input_plugin_table_field_offsets() {
        let table = InputPluginTable::default();
        let base = &table as *const _ as usize;

        let name_offset = &table.name as *const _ as usize - base;
        let filter_offset = &table.filefilter as *const _ as usize - base;
        let info_offset = &table.information as *const _ as usize - base;
        let open_offset = &table.func_open as *const _ as usize - base;
        let close_offset = &table.func_close as *const _ as usize - base;
        let info_get_offset = &table.func_info_get as *const _ as usize - base;
        let video_offset = &table.func_read_video as *const _ as usize - base;
        let audio_offset = &table.func_read_audio as *const _ as usize - base;
        let config_offset = &table.func_config as *const _ as usize - base;

        assert_eq!(name_offset, 8);
        assert_eq!(filter_offset, 16);
        assert_eq!(info_offset, 24);
        assert_eq!(open_offset, 32);
        assert_eq!(close_offset, 40);
        assert_eq!(info_get_offset, 48);
        assert_eq!(video_offset, 56);
        assert_eq!(audio_offset, 64);
        assert_eq!(config_offset, 72);
    }

    #[test]
    fn test_input_info_field_offsets() {
        use std::mem::offset_of;

        assert_eq!(offset_of!(InputInfo, flag), 0);
        assert_eq!(offset_of!(InputInfo, rate), 4);
        assert_eq!(offset_of!(InputInfo, scale), 8);
        assert_eq!(offset_of!(InputInfo, n), 12);
        assert_eq!(offset_of!(InputInfo, format), 16);
        assert_eq!(offset_of!(InputInfo, format_size), 24);
        assert_eq!(offset_of!(InputInfo, audio_n), 28);
        assert_eq!(offset_of!(InputInfo, audio_format), 32);
        assert_eq!(offset_of!(InputInfo, audio_format_size), 40);
    }

    #[test]
    fn test_output_info_field_offsets() {
        use std::mem::offset_of;

        assert_eq!(offset_of!(OutputInfo, w), 4);
        assert_eq!(offset_of!(OutputInfo, n), 20);
        assert_eq!(offset_of!(OutputInfo, audio_ch), 28);
        assert_eq!(offset_of!(OutputInfo, savefile), 40);
        assert_eq!(offset_of!(OutputInfo, func_get_video), 48);
        assert_eq!(offset_of!(OutputInfo, func_get_audio), 56);
        assert_eq!(offset_of!(OutputInfo, func_is_abort), 64);
        assert_eq!(offset_of!(OutputInfo, func_rest_time_disp), 72);
        assert_eq!(offset_of!(OutputInfo, func_set_buffer_size), 80);
    }

    #[test]
    fn test_output_plugin_table_field_offsets() {
        use std::mem::offset_of;

        assert_eq!(offset_of!(OutputPluginTable, name), 8);
        assert_eq!(offset_of!(OutputPluginTable, func_output), 32);
        assert_eq!(offset_of!(OutputPluginTable, func_config), 40);
        assert_eq!(offset_of!(OutputPluginTable, func_get_config_text), 48);
    }
}

mod format_descriptors {
    use super::*;

    #[test]
    fn test_bitmap_info_header_size() {
        assert_eq!(std::mem::size_of::<BitmapInfoHeader>(), 40);
        assert_eq!(BITMAP_INFO_HEADER_SIZE, 40);
    }

    #[test]
    fn test_wave_format_is_packed() {
        assert_eq!(std::mem::size_of::<WaveFormatEx>(), 18);
        assert_eq!(std::mem::align_of::<WaveFormatEx>(), 1);
        assert_eq!(WAVE_FORMAT_EX_SIZE, 18);
    }

    #[test]
    fn test_wave_format_field_offsets() {
        use std::mem::offset_of;

        assert_eq!(offset_of!(WaveFormatEx, n_channels), 2);
        assert_eq!(offset_of!(WaveFormatEx, n_samples_per_sec), 4);
        assert_eq!(offset_of!(WaveFormatEx, n_avg_bytes_per_sec), 8);
        assert_eq!(offset_of!(WaveFormatEx, n_block_align), 12);
        assert_eq!(offset_of!(WaveFormatEx, w_bits_per_sample), 14);
        assert_eq!(offset_of!(WaveFormatEx, cb_size), 16);
    }

    #[test]
    fn test_rgb24_frame_matches_host_expectation() -> TestResult {
        let header = BitmapInfoHeader::rgb24(200, 150);
        let bytes = usize::try_from(header.frame_bytes())?;
        assert_eq!(bytes, 200 * 3 * 150);
        assert_eq!(header.bi_planes, 1);
        Ok(())
    }

    #[test]
    fn test_odd_width_rows_round_up() -> TestResult {
        let header = BitmapInfoHeader::rgb24(201, 1);
        // 603 bytes per row rounds to 604.
        assert_eq!(u32::try_from(BitmapInfoHeader::stride_for(201, 24))?, 604);
        assert_eq!(header.bi_size_image, 604);
        Ok(())
    }
}

mod flags {
    use super::*;

    #[test]
    fn test_input_flags_match_host_bits() {
        assert_eq!(InputPluginFlags::VIDEO.bits(), 1);
        assert_eq!(InputPluginFlags::AUDIO.bits(), 2);
        assert_eq!(InputPluginFlags::CONCURRENT.bits(), 16);
        assert_eq!(InputInfoFlags::CONCURRENT.bits(), 16);
    }

    #[test]
    fn test_output_flags_match_host_bits() {
        assert_eq!(OutputPluginFlags::VIDEO.bits(), 1);
        assert_eq!(OutputInfoFlags::VIDEO.bits(), 1);
        assert_eq!(OutputInfoFlags::AUDIO.bits(), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_flags_serde_roundtrip() -> TestResult {
        let flags = InputPluginFlags::VIDEO | InputPluginFlags::AUDIO;
        let json = serde_json::to_string(&flags)?;
        let restored: InputPluginFlags = serde_json::from_str(&json)?;
        assert_eq!(flags, restored);
        Ok(())
    }
}

mod constants {
    use super::*;

    #[test]
    fn test_symbols() -> TestResult {
        let input = std::ffi::CStr::from_bytes_with_nul(INPUT_TABLE_SYMBOL)?;
        let output = std::ffi::CStr::from_bytes_with_nul(OUTPUT_TABLE_SYMBOL)?;
        assert_eq!(input.to_str()?, "GetInputPluginTable");
        assert_eq!(output.to_str()?, "GetOutputPluginTable");
        Ok(())
    }

    #[test]
    fn test_yuy2_fourcc_bytes() {
        assert_eq!(FOURCC_YUY2.to_le_bytes(), *b"YUY2");
    }
}
