//! Drives the exported image input table the way the host does.

#![expect(unsafe_code, reason = "calls the exported table like the host")]

use std::ffi::c_void;
use std::path::Path;

use aviutl2_example_plugin::GetInputPluginTable;
use aviutl2_plugin::abi::{
    BitmapInfoHeader, InputHandle, InputInfo, InputInfoFlags, InputPluginFlags, InputPluginTable,
};
use aviutl2_plugin::wide::{read_filter, read_wide};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const WIDTH: u32 = 200;
const HEIGHT: u32 = 150;
const FRAME_BYTES: usize = 90_000;

fn input_table() -> Result<&'static InputPluginTable, Box<dyn std::error::Error>> {
    let raw = GetInputPluginTable();
    // SAFETY: a non-null table stays published for the rest of the process.
    unsafe { raw.as_ref() }.ok_or_else(|| "GetInputPluginTable returned null".into())
}

fn wide_path(path: &Path) -> Vec<u16> {
    path.to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect()
}

/// Writes an asymmetric gradient image.
fn write_gradient(dir: &TempDir) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let image = RgbaImage::from_fn(WIDTH, HEIGHT, |x, y| {
        Rgba([
            u8::try_from(x).unwrap_or(u8::MAX),
            u8::try_from(y).unwrap_or(u8::MAX),
            0x40,
            0xff,
        ])
    });
    let path = dir.path().join("gradient.png");
    image.save(&path)?;
    Ok(path)
}

fn open(table: &InputPluginTable, path: &Path) -> Result<InputHandle, Box<dyn std::error::Error>> {
    let func_open = table.func_open.ok_or("func_open missing")?;
    let path = wide_path(path);
    // SAFETY: NUL-terminated path that outlives the call.
    Ok(unsafe { func_open(path.as_ptr()) })
}

fn info_get(table: &InputPluginTable, handle: InputHandle) -> Result<Option<InputInfo>, Box<dyn std::error::Error>> {
    let func_info_get = table.func_info_get.ok_or("func_info_get missing")?;
    let mut info = InputInfo::default();
    // SAFETY: `info` is a writable INPUT_INFO.
    let ok = unsafe { func_info_get(handle, &raw mut info) };
    Ok(ok.then_some(info))
}

fn read_video(table: &InputPluginTable, handle: InputHandle, frame: i32, buf: &mut [u8]) -> Result<i32, Box<dyn std::error::Error>> {
    let func_read_video = table.func_read_video.ok_or("func_read_video missing")?;
    // SAFETY: `buf` is sized from the format descriptor.
    Ok(unsafe { func_read_video(handle, frame, buf.as_mut_ptr().cast::<c_void>()) })
}

fn close(table: &InputPluginTable, handle: InputHandle) -> Result<bool, Box<dyn std::error::Error>> {
    let func_close = table.func_close.ok_or("func_close missing")?;
    // SAFETY: the adapter validates the token.
    Ok(unsafe { func_close(handle) })
}

#[test]
fn test_table_describes_video_only_plugin() -> TestResult {
    let table = input_table()?;
    assert_eq!(table.flag, InputPluginFlags::VIDEO);
    assert!(table.func_config.is_none());
    // SAFETY: table strings are NUL-terminated.
    assert_eq!(unsafe { read_wide(table.name, 256) }?, "Rust Example Input Plugin");
    // SAFETY: the filter is a double-NUL-terminated list.
    let filter = unsafe { read_filter(table.filefilter, 256) }?;
    assert_eq!(filter, vec!["All Files (*.*)".to_string(), "*.*".to_string()]);
    Ok(())
}

#[test]
fn test_rotating_image_scenario() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_gradient(&dir)?;
    let table = input_table()?;

    let handle = open(table, &path)?;
    assert!(!handle.is_null());

    let info = info_get(table, handle)?.ok_or("info_get failed")?;
    assert!(info.n > 0);
    assert_eq!((info.rate, info.scale), (30, 1));
    assert_eq!(info.flag, InputInfoFlags::VIDEO);
    assert_eq!(usize::try_from(info.format_size)?, size_of::<BitmapInfoHeader>());
    assert!(!info.format.is_null());
    // SAFETY: the descriptor lives until the next info call or close.
    let header = unsafe { &*info.format.cast::<BitmapInfoHeader>() };
    assert_eq!((header.bi_width, header.bi_height, header.bi_bit_count), (200, 150, 24));
    assert_eq!(header.frame_bytes(), 90_000);

    let mut first = vec![0u8; FRAME_BYTES];
    assert_eq!(read_video(table, handle, 0, &mut first)?, 90_000);
    let mut fifth = vec![0u8; FRAME_BYTES];
    assert_eq!(read_video(table, handle, 5, &mut fifth)?, 90_000);
    assert_ne!(first, fifth);

    // Frame 0 is unrotated: bottom-left pixel of the picture, stored first as BGR.
    assert_eq!(first.get(0..3), Some(&[0x40u8, 149, 0][..]));

    assert!(close(table, handle)?);
    assert!(info_get(table, handle)?.is_none());
    assert!(!close(table, handle)?);
    Ok(())
}

#[test]
fn test_null_handle_is_refused() -> TestResult {
    let table = input_table()?;
    let null = std::ptr::null_mut();
    assert!(info_get(table, null)?.is_none());
    let mut buf = vec![0u8; 16];
    assert_eq!(read_video(table, null, 0, &mut buf)?, 0);
    assert!(!close(table, null)?);
    Ok(())
}

#[test]
fn test_audio_reads_return_nothing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_gradient(&dir)?;
    let table = input_table()?;
    let handle = open(table, &path)?;
    assert!(info_get(table, handle)?.is_some());

    let mut buf = vec![0u8; 4096];
    let read = if let Some(func_read_audio) = table.func_read_audio {
        // SAFETY: `buf` is larger than any audio request made here.
        unsafe { func_read_audio(handle, 0, 100, buf.as_mut_ptr().cast::<c_void>()) }
    } else {
        0
    };
    assert_eq!(read, 0);
    assert!(close(table, handle)?);
    Ok(())
}

#[test]
fn test_repeated_open_close_cycles() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_gradient(&dir)?;
    let table = input_table()?;
    let mut buf = vec![0u8; FRAME_BYTES];
    let mut seen = Vec::new();

    for frame in 0..10 {
        let handle = open(table, &path)?;
        assert!(!handle.is_null());
        assert!(!seen.contains(&handle.addr()));
        seen.push(handle.addr());
        assert!(info_get(table, handle)?.is_some());
        assert_eq!(read_video(table, handle, frame, &mut buf)?, 90_000);
        assert!(close(table, handle)?);
    }
    Ok(())
}
