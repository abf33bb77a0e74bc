//! Output plugins driven through their table with test host callbacks.

#![expect(unsafe_code, reason = "calls table function pointers like the host")]

use std::ffi::c_void;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use aviutl2_plugin::abi::{OutputInfo, OutputPluginTable};
use aviutl2_plugin::prelude::*;
use aviutl2_plugin::wide::read_wide;
use aviutl2_plugin::{OutputPluginExport, declare_output_plugin, output_table};
use parking_lot::Mutex;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const WIDTH: i32 = 3;
const HEIGHT: i32 = 2;
// 3 px * 3 bytes = 9, padded to 12 per row.
const FRAME_BYTES: usize = 24;
const FRAMES: i32 = 5;

/// What one export saw from the host.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ExportRecord {
    path: String,
    first_bytes: Vec<u8>,
    audio_bytes: usize,
    aborted: bool,
}

struct Recorder {
    records: Mutex<Vec<ExportRecord>>,
}

impl Recorder {
    fn record_for(&self, path: &str) -> Option<ExportRecord> {
        self.records
            .lock()
            .iter()
            .find(|record| record.path == path)
            .cloned()
    }
}

impl OutputPlugin for Recorder {
    type Config = NoConfigDialog;
    type ConfigText = WithConfigText;

    const NAME: &'static str = "Recorder";
    const FILE_FILTER: &'static [FilterEntry] = &[FilterEntry::new("Raw (*.raw)", "*.raw")];
    const INFORMATION: &'static str = "Recorder for tests";
    const MEDIA: OutputPluginFlags = OutputPluginFlags::VIDEO.union(OutputPluginFlags::AUDIO);

    fn output(&self, job: &mut OutputJob<'_>) -> PluginResult<()> {
        let mut record = ExportRecord {
            path: job.save_path().display().to_string(),
            ..ExportRecord::default()
        };
        job.set_buffer_size(DEFAULT_BUFFER_FRAMES, DEFAULT_BUFFER_FRAMES);
        let total = job.frame_count();
        for frame in job.frames() {
            if job.is_aborted() {
                record.aborted = true;
                break;
            }
            let data = job
                .video_frame(frame, VideoFrameFormat::Rgb24)
                .ok_or_else(|| PluginError::Other(format!("no frame {frame}")))?;
            if data.len() != FRAME_BYTES {
                return Err(PluginError::Other(format!("frame is {} bytes", data.len())));
            }
            record.first_bytes.push(data.first().copied().unwrap_or_default());
            job.report_progress(frame + 1, total);
        }
        if let Some(samples) = job.audio_samples(0, 100, AudioSampleFormat::Pcm16) {
            record.audio_bytes = samples.len();
        }
        self.records.lock().push(record);
        Ok(())
    }
}

impl HasConfigText for Recorder {
    fn config_text(&self) -> String {
        format!("{} exports", self.records.lock().len())
    }
}

declare_output_plugin!(
    Recorder,
    Recorder {
        records: Mutex::new(Vec::new())
    }
);

static HOST_FRAMES: LazyLock<Vec<Vec<u8>>> = LazyLock::new(|| {
    (0..FRAMES)
        .map(|frame| vec![u8::try_from(frame).unwrap_or(0) + 10; FRAME_BYTES])
        .collect()
});
static HOST_AUDIO: LazyLock<Vec<u8>> = LazyLock::new(|| vec![0x11; 40 * 2 * 2]);
static LAST_PROGRESS: AtomicI32 = AtomicI32::new(0);
static BUFFER_REQUEST: AtomicI32 = AtomicI32::new(0);
static ABORT_SEEN: AtomicBool = AtomicBool::new(false);

extern "system" fn host_get_video(frame: i32, format: u32) -> *mut c_void {
    if format != VideoFrameFormat::Rgb24.fourcc() {
        return std::ptr::null_mut();
    }
    usize::try_from(frame)
        .ok()
        .and_then(|index| HOST_FRAMES.get(index))
        .map_or(std::ptr::null_mut(), |data| data.as_ptr().cast_mut().cast())
}

extern "system" fn host_get_audio(_start: i32, length: i32, readed: *mut i32, _format: u32) -> *mut c_void {
    // The host only has 40 sample frames.
    let delivered = length.min(40);
    if let Some(readed) = std::ptr::NonNull::new(readed) {
        // SAFETY: the adapter passes a pointer to a live i32.
        unsafe { readed.write(delivered) };
    }
    HOST_AUDIO.as_ptr().cast_mut().cast()
}

extern "system" fn host_is_abort() -> bool {
    false
}

extern "system" fn host_abort_after_first() -> bool {
    let now = ABORT_SEEN.load(Ordering::Relaxed);
    ABORT_SEEN.store(true, Ordering::Relaxed);
    now
}

extern "system" fn host_rest_time_disp(now: i32, _total: i32) {
    LAST_PROGRESS.fetch_max(now, Ordering::Relaxed);
}

extern "system" fn host_set_buffer_size(video: i32, _audio: i32) {
    BUFFER_REQUEST.store(video, Ordering::Relaxed);
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn recorder_table() -> Result<&'static OutputPluginTable, Box<dyn std::error::Error>> {
    let table = output_table::<Recorder>()?;
    // SAFETY: the table stays published for the rest of the process.
    Ok(unsafe { table.as_ref() })
}

fn job_info(savefile: &[u16]) -> OutputInfo {
    OutputInfo {
        flag: OutputInfoFlags::VIDEO | OutputInfoFlags::AUDIO,
        w: WIDTH,
        h: HEIGHT,
        rate: 30,
        scale: 1,
        n: FRAMES,
        audio_rate: 44_100,
        audio_ch: 2,
        audio_n: 40,
        savefile: savefile.as_ptr(),
        func_get_video: Some(host_get_video),
        func_get_audio: Some(host_get_audio),
        func_is_abort: Some(host_is_abort),
        func_rest_time_disp: Some(host_rest_time_disp),
        func_set_buffer_size: Some(host_set_buffer_size),
    }
}

fn recorded(path: &str) -> Result<ExportRecord, Box<dyn std::error::Error>> {
    Recorder::runtime()
        .plugin()
        .record_for(path)
        .ok_or_else(|| format!("no export recorded for {path}").into())
}

fn run(table: &OutputPluginTable, info: &mut OutputInfo) -> Result<bool, Box<dyn std::error::Error>> {
    let func_output = table.func_output.ok_or("func_output missing")?;
    // SAFETY: `info` is a complete OUTPUT_INFO with live callbacks.
    Ok(unsafe { func_output(info) })
}

#[test]
fn test_table_shape() -> TestResult {
    let table = recorder_table()?;
    assert_eq!(table.flag, OutputPluginFlags::VIDEO | OutputPluginFlags::AUDIO);
    assert!(table.func_output.is_some());
    assert!(table.func_config.is_none());
    assert!(table.func_get_config_text.is_some());
    // SAFETY: table strings are NUL-terminated.
    assert_eq!(unsafe { read_wide(table.name, 64) }?, "Recorder");
    Ok(())
}

#[test]
fn test_full_export() -> TestResult {
    let table = recorder_table()?;
    let path = wide("C:\\exports\\full.raw");
    let mut info = job_info(&path);
    assert!(run(table, &mut info)?);

    let record = recorded("C:\\exports\\full.raw")?;
    assert_eq!(record.first_bytes, vec![10, 11, 12, 13, 14]);
    // 40 delivered sample frames * 2 channels * 2 bytes.
    assert_eq!(record.audio_bytes, 160);
    assert!(!record.aborted);
    assert_eq!(LAST_PROGRESS.load(Ordering::Relaxed), FRAMES);
    assert_eq!(BUFFER_REQUEST.load(Ordering::Relaxed), DEFAULT_BUFFER_FRAMES);
    Ok(())
}

#[test]
fn test_abort_stops_export() -> TestResult {
    let table = recorder_table()?;
    let path = wide("C:\\exports\\aborted.raw");
    let mut info = job_info(&path);
    info.func_is_abort = Some(host_abort_after_first);
    assert!(run(table, &mut info)?);

    let record = recorded("C:\\exports\\aborted.raw")?;
    assert!(record.aborted);
    assert_eq!(record.first_bytes, vec![10]);
    Ok(())
}

#[test]
fn test_missing_callbacks_fail_cleanly() -> TestResult {
    let table = recorder_table()?;
    let path = wide("C:\\exports\\bare.raw");
    let mut info = job_info(&path);
    info.func_get_video = None;
    info.func_get_audio = None;
    info.func_is_abort = None;
    info.func_rest_time_disp = None;
    info.func_set_buffer_size = None;
    // The plugin needs frames, so the export fails rather than faulting.
    assert!(!run(table, &mut info)?);
    assert!(
        Recorder::runtime()
            .plugin()
            .record_for("C:\\exports\\bare.raw")
            .is_none()
    );
    Ok(())
}

#[test]
fn test_null_info_and_path_are_refused() -> TestResult {
    let table = recorder_table()?;
    let func_output = table.func_output.ok_or("func_output missing")?;
    // SAFETY: null is a failure input, never dereferenced.
    assert!(!unsafe { func_output(std::ptr::null_mut()) });

    let mut info = job_info(&[0]);
    info.savefile = std::ptr::null();
    assert!(!run(table, &mut info)?);
    Ok(())
}

#[test]
fn test_config_text_follows_state() -> TestResult {
    let table = recorder_table()?;
    let func_get_config_text = table.func_get_config_text.ok_or("func_get_config_text missing")?;
    // SAFETY: takes no arguments.
    let raw = unsafe { func_get_config_text() };
    // SAFETY: the returned text lives until the next call.
    let text = unsafe { read_wide(raw, 64) }?;
    assert!(text.ends_with(" exports"));
    Ok(())
}
