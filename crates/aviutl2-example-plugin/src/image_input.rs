//! Still-image input: one second of video spinning the image a full turn.

use std::path::Path;

use aviutl2_plugin::prelude::*;
use image::{ImageError, RgbaImage};
use tracing::debug;

/// Frames per second reported to the host.
pub const FRAME_RATE: i32 = 30;
/// Frames in one clip; one full rotation.
pub const FRAME_COUNT: i32 = 30;

/// Image input plugin.
#[derive(Debug, Default)]
pub struct ImageInput;

/// A decoded image, kept as straight-alpha RGBA.
#[derive(Debug)]
pub struct ImageHandle {
    image: RgbaImage,
    width: i32,
    height: i32,
}

impl ImageHandle {
    /// Wraps a decoded image.
    ///
    /// # Errors
    ///
    /// [`PluginError::Decode`] when a dimension does not fit the host's `i32`.
    pub fn new(image: RgbaImage) -> PluginResult<Self> {
        let width = i32::try_from(image.width()).map_err(PluginError::decode)?;
        let height = i32::try_from(image.height()).map_err(PluginError::decode)?;
        Ok(Self {
            image,
            width,
            height,
        })
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Format the host receives frames in.
    #[must_use]
    pub fn format(&self) -> BitmapInfoHeader {
        BitmapInfoHeader::rgb24(self.width, self.height)
    }
}

impl InputPlugin for ImageInput {
    type Handle = ImageHandle;
    type Media = VideoOnly;
    type Config = NoConfigDialog;

    const NAME: &'static str = "Rust Example Input Plugin";
    const FILE_FILTER: &'static [FilterEntry] = &[FilterEntry::ALL_FILES];
    const INFORMATION: &'static str = "Rust AviUtl2 input plugin example (rotating still image)";

    fn open(&self, path: &Path) -> PluginResult<ImageHandle> {
        let image = image::open(path).map_err(|err| match err {
            ImageError::IoError(io) => PluginError::Io(io),
            other => PluginError::decode(other),
        })?;
        let handle = ImageHandle::new(image.into_rgba8())?;
        debug!(
            path = %path.display(),
            width = handle.width,
            height = handle.height,
            "decoded image"
        );
        Ok(handle)
    }

    fn info(&self, handle: &ImageHandle) -> PluginResult<MediaInfo> {
        Ok(MediaInfo::video(VideoStreamInfo {
            rate: FRAME_RATE,
            scale: 1,
            frame_count: FRAME_COUNT,
            format: handle.format(),
        }))
    }
}

impl SupportsVideo for ImageInput {
    fn read_video(&self, handle: &ImageHandle, frame: i32) -> PluginResult<Vec<u8>> {
        render_frame(handle, frame)
    }
}

/// Rotation of `frame` in degrees, clockwise.
#[must_use]
pub fn rotation_degrees(frame: i32) -> f64 {
    f64::from(frame.rem_euclid(FRAME_COUNT)) / f64::from(FRAME_COUNT) * 360.0
}

/// Renders `frame` as bottom-up BGR24 rows padded to four bytes.
///
/// The image turns around its centre; pixels uncovered by the turn are
/// black, and alpha is composited over black.
///
/// # Errors
///
/// [`PluginError::Allocation`] when the frame buffer cannot be reserved.
pub fn render_frame(handle: &ImageHandle, frame: i32) -> PluginResult<Vec<u8>> {
    let header = handle.format();
    let stride = usize::try_from(BitmapInfoHeader::stride_for(handle.width, 24))
        .map_err(PluginError::other)?;
    let len = usize::try_from(header.frame_bytes()).map_err(PluginError::other)?;
    if stride == 0 || len == 0 {
        return Ok(Vec::new());
    }
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|err| PluginError::Allocation(err.to_string()))?;
    pixels.resize(len, 0);

    let sampler = Rotation::new(handle, rotation_degrees(frame));
    let width = handle.image.width();
    let height = handle.image.height();
    // Row 0 of the output is the bottom row of the picture.
    for (row, out) in pixels.chunks_exact_mut(stride).enumerate() {
        let Some(y) = u32::try_from(row)
            .ok()
            .and_then(|row| height.checked_sub(row)?.checked_sub(1))
        else {
            break;
        };
        for (x, bgr) in (0..width).zip(out.chunks_exact_mut(3)) {
            let [r, g, b, a] = sampler.sample(&handle.image, x, y);
            bgr.copy_from_slice(&[over_black(b, a), over_black(g, a), over_black(r, a)]);
        }
    }
    Ok(pixels)
}

/// Inverse rotation about the image centre, sampled nearest-neighbour.
struct Rotation {
    cos: f64,
    sin: f64,
    cx: f64,
    cy: f64,
}

impl Rotation {
    fn new(handle: &ImageHandle, degrees: f64) -> Self {
        let radians = degrees.to_radians();
        Self {
            cos: radians.cos(),
            sin: radians.sin(),
            cx: f64::from(handle.width) / 2.0,
            cy: f64::from(handle.height) / 2.0,
        }
    }

    /// Source pixel landing on destination `(x, y)`; transparent when it
    /// falls outside the image.
    fn sample(&self, image: &RgbaImage, x: u32, y: u32) -> [u8; 4] {
        let dx = f64::from(x) + 0.5 - self.cx;
        let dy = f64::from(y) + 0.5 - self.cy;
        let sx = self.cos.mul_add(dx, self.sin * dy) + self.cx;
        let sy = (-self.sin).mul_add(dx, self.cos * dy) + self.cy;
        match (to_index(sx), to_index(sy)) {
            (Some(sx), Some(sy)) => image
                .get_pixel_checked(sx, sy)
                .map_or([0; 4], |pixel| pixel.0),
            _ => [0; 4],
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "floored and range-checked before the cast"
)]
fn to_index(coord: f64) -> Option<u32> {
    let floored = coord.floor();
    if !(0.0..f64::from(u32::MAX)).contains(&floored) {
        return None;
    }
    u32::try_from(floored as i64).ok()
}

fn over_black(channel: u8, alpha: u8) -> u8 {
    let scaled = (u16::from(channel) * u16::from(alpha) + 127) / 255;
    u8::try_from(scaled).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn quadrants(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| match (x < width / 2, y < height / 2) {
            (true, true) => Rgba([255, 0, 0, 255]),
            (false, true) => Rgba([0, 255, 0, 255]),
            (true, false) => Rgba([0, 0, 255, 255]),
            (false, false) => Rgba([255, 255, 255, 255]),
        })
    }

    fn bgr_at(frame: &[u8], stride: usize, height: usize, x: usize, y: usize) -> Option<&[u8]> {
        let row = height.checked_sub(y)?.checked_sub(1)?;
        let start = row * stride + x * 3;
        frame.get(start..start + 3)
    }

    #[test]
    fn test_rotation_cycles_every_clip() {
        assert!(rotation_degrees(0).abs() < f64::EPSILON);
        assert!((rotation_degrees(15) - 180.0).abs() < 1e-9);
        assert!(rotation_degrees(30).abs() < f64::EPSILON);
        assert!((rotation_degrees(-1) - 348.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_zero_is_unrotated_bottom_up_bgr() -> TestResult {
        let handle = ImageHandle::new(quadrants(4, 4))?;
        let frame = render_frame(&handle, 0)?;
        assert_eq!(frame.len(), 48);
        // Top-left is red, stored in the last row as BGR.
        assert_eq!(bgr_at(&frame, 12, 4, 0, 0), Some(&[0u8, 0, 255][..]));
        assert_eq!(bgr_at(&frame, 12, 4, 3, 0), Some(&[0u8, 255, 0][..]));
        assert_eq!(bgr_at(&frame, 12, 4, 0, 3), Some(&[255u8, 0, 0][..]));
        assert_eq!(frame.get(0..3), Some(&[255u8, 0, 0][..]));
        Ok(())
    }

    #[test]
    fn test_half_turn_swaps_corners() -> TestResult {
        let handle = ImageHandle::new(quadrants(4, 4))?;
        let frame = render_frame(&handle, 15)?;
        // Top-left now shows the white bottom-right quadrant.
        assert_eq!(bgr_at(&frame, 12, 4, 0, 0), Some(&[255u8, 255, 255][..]));
        assert_eq!(bgr_at(&frame, 12, 4, 3, 3), Some(&[0u8, 0, 255][..]));
        Ok(())
    }

    #[test]
    fn test_rows_are_padded_and_uncovered_pixels_black() -> TestResult {
        let handle = ImageHandle::new(RgbaImage::from_pixel(5, 2, Rgba([10, 20, 30, 255])))?;
        let frame = render_frame(&handle, 7)?;
        // 5 px * 3 = 15 bytes, padded to 16.
        assert_eq!(frame.len(), 32);
        assert_eq!(frame.get(15), Some(&0));
        // A quarter-ish turn of a wide strip leaves its corners uncovered.
        assert_eq!(bgr_at(&frame, 16, 2, 0, 0), Some(&[0u8, 0, 0][..]));
        Ok(())
    }

    #[test]
    fn test_alpha_composites_over_black() {
        assert_eq!(over_black(255, 0), 0);
        assert_eq!(over_black(255, 255), 255);
        assert_eq!(over_black(200, 128), 100);
    }

    #[test]
    fn test_info_reports_one_second_clip() -> TestResult {
        let handle = ImageHandle::new(quadrants(200, 150))?;
        let info = ImageInput.info(&handle)?;
        let video = info.video.ok_or("missing video stream")?;
        assert_eq!((video.rate, video.scale, video.frame_count), (30, 1, 30));
        assert_eq!(video.format.frame_bytes(), 90_000);
        assert!(info.audio.is_none());
        Ok(())
    }
}
