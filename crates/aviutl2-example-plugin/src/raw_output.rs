//! Raw video output: every rendered frame appended to the save file as-is.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicI32, Ordering};

use aviutl2_plugin::prelude::*;
use tracing::{info, warn};

/// Raw BGR24 dump output plugin.
#[derive(Debug)]
pub struct RawVideoOutput {
    last_written: AtomicI32,
}

impl RawVideoOutput {
    /// Creates the plugin with no export recorded yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_written: AtomicI32::new(-1),
        }
    }

    /// Frames written by the most recent export, if any ran.
    #[must_use]
    pub fn last_written(&self) -> Option<i32> {
        let frames = self.last_written.load(Ordering::Acquire);
        (frames >= 0).then_some(frames)
    }
}

impl Default for RawVideoOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputPlugin for RawVideoOutput {
    type Config = NoConfigDialog;
    type ConfigText = WithConfigText;

    const NAME: &'static str = "Raw BGR24 Output";
    const FILE_FILTER: &'static [FilterEntry] = &[
        FilterEntry::new("Raw video (*.raw)", "*.raw"),
        FilterEntry::ALL_FILES,
    ];
    const INFORMATION: &'static str = "Rust AviUtl2 output plugin example (raw bottom-up BGR24)";
    const MEDIA: OutputPluginFlags = OutputPluginFlags::VIDEO;

    fn output(&self, job: &mut OutputJob<'_>) -> PluginResult<()> {
        if !job.flags().contains(OutputInfoFlags::VIDEO) {
            return Err(PluginError::InvalidInput(
                "export carries no video".to_string(),
            ));
        }
        job.set_buffer_size(DEFAULT_BUFFER_FRAMES, DEFAULT_BUFFER_FRAMES);

        let mut writer = BufWriter::new(File::create(job.save_path())?);
        let total = job.frame_count();
        let mut written = 0;
        for frame in job.frames() {
            if job.is_aborted() {
                warn!(frame, total, "export aborted");
                break;
            }
            let data = job.video_frame(frame, VideoFrameFormat::Rgb24).ok_or_else(|| {
                PluginError::InvalidInput(format!("host returned no data for frame {frame}"))
            })?;
            writer.write_all(data)?;
            written = frame + 1;
            job.report_progress(written, total);
        }
        writer.flush()?;

        self.last_written.store(written, Ordering::Release);
        info!(
            path = %job.save_path().display(),
            frames = written,
            width = job.width(),
            height = job.height(),
            "raw export finished"
        );
        Ok(())
    }
}

impl HasConfigText for RawVideoOutput {
    fn config_text(&self) -> String {
        match self.last_written() {
            Some(frames) => format!("BGR24, bottom-up rows; last export {frames} frames"),
            None => "BGR24, bottom-up rows".to_string(),
        }
    }
}
