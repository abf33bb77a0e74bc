//! Safe view over the host's `OUTPUT_INFO` for the duration of one export.

use std::ops::Range;
use std::path::{Path, PathBuf};

use aviutl2_plugin_abi::{
    BI_RGB, BitmapInfoHeader, FOURCC_YUY2, OutputInfo, OutputInfoFlags, WAVE_FORMAT_IEEE_FLOAT,
    WAVE_FORMAT_PCM,
};

use crate::error::PluginResult;
use crate::wide::read_wide_path;

/// Pixel layout requested from the host's `func_get_video`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFrameFormat {
    /// Bottom-up BGR24 with rows padded to 4 bytes
    Rgb24,
    /// Packed YUY2
    Yuy2,
}

impl VideoFrameFormat {
    /// Value passed as the `format` argument.
    #[must_use]
    pub const fn fourcc(self) -> u32 {
        match self {
            Self::Rgb24 => BI_RGB,
            Self::Yuy2 => FOURCC_YUY2,
        }
    }

    /// Header describing one frame of `width` x `height` in this format.
    #[must_use]
    pub fn header(self, width: i32, height: i32) -> BitmapInfoHeader {
        match self {
            Self::Rgb24 => BitmapInfoHeader::rgb24(width, height),
            Self::Yuy2 => BitmapInfoHeader::yuy2(width, height),
        }
    }
}

/// Sample layout requested from the host's `func_get_audio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioSampleFormat {
    /// Interleaved signed 16-bit
    Pcm16,
    /// Interleaved 32-bit float
    Float32,
}

impl AudioSampleFormat {
    /// Value passed as the `format` argument.
    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Self::Pcm16 => WAVE_FORMAT_PCM as u32,
            Self::Float32 => WAVE_FORMAT_IEEE_FLOAT as u32,
        }
    }

    /// Bytes per single-channel sample.
    #[must_use]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::Pcm16 => 2,
            Self::Float32 => 4,
        }
    }
}

/// One export in progress.
///
/// Data returned by [`video_frame`](Self::video_frame) and
/// [`audio_samples`](Self::audio_samples) is owned by the host and only
/// valid until its next callback, so both borrow the job mutably.
#[derive(Debug)]
pub struct OutputJob<'a> {
    info: &'a OutputInfo,
    save_path: PathBuf,
}

impl<'a> OutputJob<'a> {
    /// Wraps the host's job description.
    ///
    /// # Errors
    ///
    /// [`PluginError::InvalidInput`](crate::PluginError::InvalidInput) when
    /// the save path is null, empty or malformed.
    ///
    /// # Safety
    ///
    /// Every non-null callback in `info` must be callable with the host's
    /// documented contract for `'a`, and `savefile` must satisfy
    /// [`read_wide`](crate::wide::read_wide).
    pub unsafe fn from_raw(info: &'a OutputInfo, max_path_units: usize) -> PluginResult<Self> {
        // SAFETY: forwarded from the caller.
        let save_path = unsafe { read_wide_path(info.savefile, max_path_units) }?;
        Ok(Self { info, save_path })
    }

    /// Streams the host is delivering.
    #[must_use]
    pub fn flags(&self) -> OutputInfoFlags {
        self.info.flag
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.info.w
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.info.h
    }

    /// Frame rate as `(rate, scale)`.
    #[must_use]
    pub fn frame_rate(&self) -> (i32, i32) {
        (self.info.rate, self.info.scale)
    }

    /// Number of frames to export.
    #[must_use]
    pub fn frame_count(&self) -> i32 {
        self.info.n
    }

    /// Frame indices to export.
    #[must_use]
    pub fn frames(&self) -> Range<i32> {
        0..self.info.n.max(0)
    }

    /// Audio sample rate.
    #[must_use]
    pub fn audio_rate(&self) -> i32 {
        self.info.audio_rate
    }

    /// Audio channel count.
    #[must_use]
    pub fn audio_channels(&self) -> i32 {
        self.info.audio_ch
    }

    /// Number of audio sample frames to export.
    #[must_use]
    pub fn audio_sample_count(&self) -> i32 {
        self.info.audio_n
    }

    /// Destination chosen by the user.
    #[must_use]
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Fetches frame `frame` from the host.
    ///
    /// `None` when the frame is out of range, the job carries no video, the
    /// host has no video callback, or the host returned null.
    pub fn video_frame(&mut self, frame: i32, format: VideoFrameFormat) -> Option<&[u8]> {
        if !self.info.flag.contains(OutputInfoFlags::VIDEO) || !self.frames().contains(&frame) {
            return None;
        }
        let get_video = self.info.func_get_video?;
        let len = usize::try_from(format.header(self.info.w, self.info.h).frame_bytes()).ok()?;
        // SAFETY: `from_raw` requires host callbacks to be callable.
        let data = unsafe { get_video(frame, format.fourcc()) };
        if data.is_null() {
            return None;
        }
        // SAFETY: the host returns a frame of the requested format, valid
        // until its next callback; `&mut self` prevents that call while the
        // slice lives.
        Some(unsafe { std::slice::from_raw_parts(data.cast::<u8>().cast_const(), len) })
    }

    /// Fetches up to `length` sample frames starting at `start`.
    ///
    /// The returned bytes hold however many sample frames the host actually
    /// delivered.
    pub fn audio_samples(
        &mut self,
        start: i32,
        length: i32,
        format: AudioSampleFormat,
    ) -> Option<&[u8]> {
        if !self.info.flag.contains(OutputInfoFlags::AUDIO) || length <= 0 {
            return None;
        }
        let get_audio = self.info.func_get_audio?;
        let mut delivered = 0i32;
        // SAFETY: `from_raw` requires host callbacks to be callable; `delivered`
        // outlives the call.
        let data = unsafe { get_audio(start, length, &raw mut delivered, format.tag()) };
        if data.is_null() || delivered <= 0 {
            return None;
        }
        let channels = usize::try_from(self.info.audio_ch).ok()?;
        let len = usize::try_from(delivered.min(length))
            .ok()?
            .checked_mul(channels)?
            .checked_mul(format.bytes_per_sample())?;
        // SAFETY: the host returns `delivered` interleaved sample frames,
        // valid until its next callback.
        Some(unsafe { std::slice::from_raw_parts(data.cast::<u8>().cast_const(), len) })
    }

    /// Whether the user cancelled. `false` when the host offers no callback.
    pub fn is_aborted(&mut self) -> bool {
        self.info.func_is_abort.is_some_and(|is_abort| {
            // SAFETY: `from_raw` requires host callbacks to be callable.
            unsafe { is_abort() }
        })
    }

    /// Reports progress as `now` of `total`.
    pub fn report_progress(&mut self, now: i32, total: i32) {
        if let Some(rest_time_disp) = self.info.func_rest_time_disp {
            // SAFETY: `from_raw` requires host callbacks to be callable.
            unsafe { rest_time_disp(now, total) };
        }
    }

    /// Asks the host to prefetch `video` frames and `audio` blocks.
    pub fn set_buffer_size(&mut self, video: i32, audio: i32) {
        if let Some(set_buffer_size) = self.info.func_set_buffer_size {
            // SAFETY: `from_raw` requires host callbacks to be callable.
            unsafe { set_buffer_size(video, audio) };
        }
    }
}
