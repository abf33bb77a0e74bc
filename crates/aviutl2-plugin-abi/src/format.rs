//! Media format descriptors handed to the host by pointer.
//!
//! These mirror the Windows SDK's `BITMAPINFOHEADER` and `WAVEFORMATEX`.
//! The host reads them through the pointers in [`InputInfo`](crate::InputInfo),
//! so their layout must match the SDK exactly.

use crate::constants::{BI_RGB, FOURCC_YUY2, WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM};

/// `BITMAPINFOHEADER`: describes one decoded video frame.
///
/// # Memory Layout
///
/// | Offset | Size | Field             |
/// |--------|------|-------------------|
/// | 0      | 4    | bi_size           |
/// | 4      | 4    | bi_width          |
/// | 8      | 4    | bi_height         |
/// | 12     | 2    | bi_planes         |
/// | 14     | 2    | bi_bit_count      |
/// | 16     | 4    | bi_compression    |
/// | 20     | 4    | bi_size_image     |
/// | 24     | 4    | bi_x_pels_per_meter |
/// | 28     | 4    | bi_y_pels_per_meter |
/// | 32     | 4    | bi_clr_used       |
/// | 36     | 4    | bi_clr_important  |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitmapInfoHeader {
    /// Size of this struct in bytes (40)
    pub bi_size: u32,
    /// Frame width in pixels
    pub bi_width: i32,
    /// Frame height in pixels; positive means bottom-up rows
    pub bi_height: i32,
    /// Always 1
    pub bi_planes: u16,
    /// Bits per pixel
    pub bi_bit_count: u16,
    /// [`BI_RGB`] or a FOURCC such as [`FOURCC_YUY2`]
    pub bi_compression: u32,
    /// Bytes in one frame, including row padding
    pub bi_size_image: u32,
    /// Horizontal resolution, unused by the host
    pub bi_x_pels_per_meter: i32,
    /// Vertical resolution, unused by the host
    pub bi_y_pels_per_meter: i32,
    /// Palette entries, 0 for true colour
    pub bi_clr_used: u32,
    /// Important palette entries, 0 for all
    pub bi_clr_important: u32,
}

/// Size of [`BitmapInfoHeader`] as the host expects it in `format_size`.
pub const BITMAP_INFO_HEADER_SIZE: u32 = 40;

static_assertions::const_assert_eq!(std::mem::size_of::<BitmapInfoHeader>(), 40);
static_assertions::const_assert_eq!(std::mem::align_of::<BitmapInfoHeader>(), 4);

impl BitmapInfoHeader {
    /// Header for an uncompressed 24-bit BGR frame, rows padded to 4 bytes.
    #[must_use]
    pub fn rgb24(width: i32, height: i32) -> Self {
        let stride = Self::stride_for(width, 24);
        Self {
            bi_size: BITMAP_INFO_HEADER_SIZE,
            bi_width: width,
            bi_height: height,
            bi_planes: 1,
            bi_bit_count: 24,
            bi_compression: BI_RGB,
            bi_size_image: saturating_frame_size(stride, height),
            ..Self::default()
        }
    }

    /// Header for a packed YUY2 frame (2 bytes per pixel, no row padding).
    #[must_use]
    pub fn yuy2(width: i32, height: i32) -> Self {
        let stride = u64::from(width.unsigned_abs()).saturating_mul(2);
        Self {
            bi_size: BITMAP_INFO_HEADER_SIZE,
            bi_width: width,
            bi_height: height,
            bi_planes: 1,
            bi_bit_count: 16,
            bi_compression: FOURCC_YUY2,
            bi_size_image: saturating_frame_size(stride, height),
            ..Self::default()
        }
    }

    /// Row stride in bytes for a DIB of the given width and bit depth.
    #[must_use]
    pub fn stride_for(width: i32, bit_count: u16) -> u64 {
        let bits = u64::from(width.unsigned_abs()).saturating_mul(u64::from(bit_count));
        bits.saturating_add(31) / 32 * 4
    }

    /// Bytes one frame occupies in the host's buffer.
    ///
    /// Uses `bi_size_image` when set, otherwise derives it from the geometry
    /// as the host does for `BI_RGB` frames.
    #[must_use]
    pub fn frame_bytes(&self) -> u64 {
        if self.bi_size_image != 0 {
            return u64::from(self.bi_size_image);
        }
        Self::stride_for(self.bi_width, self.bi_bit_count)
            .saturating_mul(u64::from(self.bi_height.unsigned_abs()))
    }
}

fn saturating_frame_size(stride: u64, height: i32) -> u32 {
    let bytes = stride.saturating_mul(u64::from(height.unsigned_abs()));
    u32::try_from(bytes).unwrap_or(u32::MAX)
}

/// `WAVEFORMATEX`: describes the PCM sample layout of an audio stream.
///
/// The SDK declares this struct with 1-byte packing, so it is 18 bytes and
/// unaligned fields must be read by value.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaveFormatEx {
    /// [`WAVE_FORMAT_PCM`] or [`WAVE_FORMAT_IEEE_FLOAT`]
    pub w_format_tag: u16,
    /// Channel count
    pub n_channels: u16,
    /// Samples per second per channel
    pub n_samples_per_sec: u32,
    /// `n_samples_per_sec * n_block_align`
    pub n_avg_bytes_per_sec: u32,
    /// Bytes per sample frame (all channels)
    pub n_block_align: u16,
    /// Bits per single-channel sample
    pub w_bits_per_sample: u16,
    /// Extra format bytes following the struct, 0 for plain PCM
    pub cb_size: u16,
}

/// Size of [`WaveFormatEx`] as the host expects it in `audio_format_size`.
pub const WAVE_FORMAT_EX_SIZE: u32 = 18;

static_assertions::const_assert_eq!(std::mem::size_of::<WaveFormatEx>(), 18);
static_assertions::const_assert_eq!(std::mem::align_of::<WaveFormatEx>(), 1);

impl WaveFormatEx {
    /// Interleaved 16-bit integer PCM.
    #[must_use]
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self::interleaved(WAVE_FORMAT_PCM, 16, sample_rate, channels)
    }

    /// Interleaved 32-bit float PCM.
    #[must_use]
    pub fn ieee_float32(sample_rate: u32, channels: u16) -> Self {
        Self::interleaved(WAVE_FORMAT_IEEE_FLOAT, 32, sample_rate, channels)
    }

    fn interleaved(tag: u16, bits: u16, sample_rate: u32, channels: u16) -> Self {
        let block_align = channels.saturating_mul(bits / 8);
        Self {
            w_format_tag: tag,
            n_channels: channels,
            n_samples_per_sec: sample_rate,
            n_avg_bytes_per_sec: sample_rate.saturating_mul(u32::from(block_align)),
            n_block_align: block_align,
            w_bits_per_sample: bits,
            cb_size: 0,
        }
    }

    /// Bytes per sample frame, read out of the packed struct by value.
    #[must_use]
    pub fn block_align(&self) -> u16 {
        self.n_block_align
    }
}
