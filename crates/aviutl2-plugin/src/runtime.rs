//! Per-plugin-type state behind the exported tables.
//!
//! [`InputRuntime`] and [`OutputRuntime`] own the plugin instance and
//! everything the host can reach through it. Their typed operations return
//! [`PluginResult`]; the trampolines in `dispatch` turn those into the host's
//! failure values.

use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use aviutl2_plugin_abi::{
    BITMAP_INFO_HEADER_SIZE, BitmapInfoHeader, InputInfo, InputInfoFlags, InputPluginFlags,
    InputPluginTable, OutputPluginTable, WAVE_FORMAT_EX_SIZE, WaveFormatEx,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::accounting::{AllocationCounters, AllocationSnapshot};
use crate::capability::{
    ConfigDialogKind, ConfigTextKind, ConfigureContext, InputPlugin, MediaInfo, MediaKind,
    OutputPlugin,
};
use crate::config::AdapterConfig;
use crate::error::{BuildError, PluginError, PluginResult};
use crate::job::OutputJob;
use crate::registry::{HandleRegistry, HandleToken};
use crate::table::{InputTableSpec, OutputTableSpec, TableSlot, TableStats};
use crate::wide::WideString;

/// Binds an [`InputPlugin`] to its process-wide runtime.
///
/// Implemented by [`declare_input_plugin!`](crate::declare_input_plugin).
pub trait InputPluginExport: InputPlugin {
    /// The runtime serving this plugin type.
    fn runtime() -> &'static InputRuntime<Self>;
}

/// Binds an [`OutputPlugin`] to its process-wide runtime.
///
/// Implemented by [`declare_output_plugin!`](crate::declare_output_plugin).
pub trait OutputPluginExport: OutputPlugin {
    /// The runtime serving this plugin type.
    fn runtime() -> &'static OutputRuntime<Self>;
}

/// Heap copy of a format descriptor whose address is handed to the host.
struct Descriptor<T> {
    // Length one; never grows, so the address is stable.
    storage: Vec<T>,
    counters: Arc<AllocationCounters>,
}

impl<T> Descriptor<T> {
    fn try_new(value: T, counters: &Arc<AllocationCounters>) -> PluginResult<Self> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(1)
            .map_err(|err| PluginError::Allocation(format!("format descriptor: {err}")))?;
        storage.push(value);
        counters.record_alloc(size_of::<T>());
        Ok(Self {
            storage,
            counters: Arc::clone(counters),
        })
    }

    fn get(&self) -> Option<&T> {
        self.storage.first()
    }

    fn host_ptr(&mut self) -> *mut std::ffi::c_void {
        self.storage.as_mut_ptr().cast()
    }
}

impl<T> Drop for Descriptor<T> {
    fn drop(&mut self) {
        self.counters.record_free(size_of::<T>());
    }
}

#[derive(Default)]
struct FormatSlots {
    video: Option<Descriptor<BitmapInfoHeader>>,
    audio: Option<Descriptor<WaveFormatEx>>,
}

/// What the registry stores for each open file.
struct HandleEntry<H> {
    handle: H,
    formats: Mutex<FormatSlots>,
    // Set when the token is retired; the last reference then runs `close`.
    closing: AtomicBool,
}

/// Audio bytes together with the number of sample frames they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Interleaved sample bytes
    pub bytes: Vec<u8>,
    /// Whole sample frames in `bytes`
    pub samples: i32,
}

/// Process-wide state for one input plugin type.
pub struct InputRuntime<P: InputPlugin> {
    plugin: P,
    config: AdapterConfig,
    registry: HandleRegistry,
    table: TableSlot<InputPluginTable>,
    formats: Arc<AllocationCounters>,
}

impl<P: InputPlugin> InputRuntime<P> {
    /// Wraps `plugin` with the configuration from [`InputPlugin::adapter_config`].
    pub fn new(plugin: P) -> Self {
        Self::with_config(plugin, P::adapter_config())
    }

    /// Wraps `plugin` with an explicit configuration.
    pub fn with_config(plugin: P, config: AdapterConfig) -> Self {
        Self {
            plugin,
            config,
            registry: HandleRegistry::new(),
            table: TableSlot::new(),
            formats: Arc::new(AllocationCounters::new()),
        }
    }

    /// The wrapped plugin.
    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    /// Boundary settings in force.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Number of open handles.
    pub fn open_handles(&self) -> usize {
        self.registry.len()
    }

    /// Allocation counters for the table slot.
    pub fn table_stats(&self) -> TableStats {
        self.table.stats()
    }

    /// Allocation counters for per-handle format descriptors.
    pub fn format_stats(&self) -> AllocationSnapshot {
        self.formats.snapshot()
    }

    /// Opens `path` and registers the handle.
    ///
    /// # Errors
    ///
    /// Whatever [`InputPlugin::open`] reports.
    pub fn open_path(&self, path: &Path) -> PluginResult<HandleToken> {
        let handle = self.plugin.open(path)?;
        let token = self.registry.register(HandleEntry {
            handle,
            formats: Mutex::new(FormatSlots::default()),
            closing: AtomicBool::new(false),
        });
        debug!(plugin = P::NAME, token = %token, path = %path.display(), "Opened input handle");
        Ok(token)
    }

    /// Retires `token` and passes its handle to [`InputPlugin::close`].
    ///
    /// The handle's format descriptors are released here. When another call
    /// on the same handle is still running, the token is retired at once and
    /// `close` runs as that call returns.
    ///
    /// # Errors
    ///
    /// [`PluginError::Handle`] for a stale or foreign token, otherwise
    /// whatever the plugin reports.
    pub fn close(&self, token: HandleToken) -> PluginResult<()> {
        let entry = self.registry.retire_as::<HandleEntry<P::Handle>>(token)?;
        entry.closing.store(true, Ordering::Release);
        debug!(plugin = P::NAME, token = %token, "Closing input handle");
        match Arc::into_inner(entry) {
            Some(last) => self.finish_close(last),
            None => {
                debug!(
                    plugin = P::NAME,
                    token = %token,
                    "Close deferred until in-flight calls return"
                );
                Ok(())
            }
        }
    }

    /// Describes the streams behind `token`.
    ///
    /// Replaces the handle's format descriptors; the pointers in the
    /// returned [`InputInfo`] stay valid until the next `info` on the same
    /// handle or until it is closed. Streams outside the plugin's media
    /// composition are dropped.
    ///
    /// # Errors
    ///
    /// [`PluginError::Handle`], [`PluginError::Allocation`], or whatever
    /// [`InputPlugin::info`] reports.
    pub fn info(&self, token: HandleToken) -> PluginResult<InputInfo> {
        let entry = self.entry(token)?;
        let info = self.describe(&entry);
        self.release(token, entry);
        info
    }

    /// Decodes `frame` through the media composition.
    ///
    /// The result never exceeds the frame size declared by the handle's
    /// current video descriptor.
    ///
    /// # Errors
    ///
    /// [`PluginError::Handle`], [`PluginError::CapabilityMismatch`],
    /// [`PluginError::FormatOverflow`], [`PluginError::InvalidInput`] when
    /// no format has been described, or whatever the plugin reports.
    pub fn read_video(&self, token: HandleToken, frame: i32) -> PluginResult<Vec<u8>> {
        let entry = self.entry(token)?;
        let bytes = self.decode_video(&entry, frame);
        self.release(token, entry);
        bytes
    }

    /// Decodes up to `length` sample frames from `start`.
    ///
    /// Audio needs a described format to count samples, so reads before
    /// `info` are always refused.
    ///
    /// # Errors
    ///
    /// As [`read_video`](Self::read_video).
    pub fn read_audio(&self, token: HandleToken, start: i32, length: i32) -> PluginResult<AudioChunk> {
        let entry = self.entry(token)?;
        let chunk = self.decode_audio(&entry, start, length);
        self.release(token, entry);
        chunk
    }

    /// Shows the settings dialog, if the composition has one.
    pub fn configure(&self, context: ConfigureContext) -> bool {
        <P::Config as ConfigDialogKind<P>>::configure(&self.plugin, context)
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    fn entry(&self, token: HandleToken) -> PluginResult<Arc<HandleEntry<P::Handle>>> {
        Ok(self.registry.resolve::<HandleEntry<P::Handle>>(token)?)
    }

    /// Drops a resolved reference; the last one of a closed handle runs the
    /// plugin's `close`.
    fn release(&self, token: HandleToken, entry: Arc<HandleEntry<P::Handle>>) {
        let Some(last) = Arc::into_inner(entry) else {
            return;
        };
        if !last.closing.load(Ordering::Acquire) {
            return;
        }
        match self.finish_close(last) {
            Ok(()) => debug!(
                plugin = P::NAME,
                token = %token,
                "Closed input handle after in-flight call"
            ),
            Err(err) => warn!(
                plugin = P::NAME,
                token = %token,
                error = %err,
                "Deferred close failed"
            ),
        }
    }

    fn finish_close(&self, entry: HandleEntry<P::Handle>) -> PluginResult<()> {
        let HandleEntry { handle, formats, .. } = entry;
        drop(formats);
        self.plugin.close(handle)
    }

    fn describe(&self, entry: &HandleEntry<P::Handle>) -> PluginResult<InputInfo> {
        let media = self.plugin.info(&entry.handle)?;
        let composed = <P::Media as MediaKind<P>>::FLAGS;
        let MediaInfo { video, audio } = media;
        let video = video.filter(|_| composed.contains(InputPluginFlags::VIDEO));
        let audio = audio.filter(|_| composed.contains(InputPluginFlags::AUDIO));

        // Both descriptors exist before either slot is replaced.
        let mut video_format = video
            .map(|stream| Descriptor::try_new(stream.format, &self.formats))
            .transpose()?;
        let mut audio_format = audio
            .map(|stream| Descriptor::try_new(stream.format, &self.formats))
            .transpose()?;

        let mut info = InputInfo::default();
        if let (Some(stream), Some(descriptor)) = (video, video_format.as_mut()) {
            info.flag.insert(InputInfoFlags::VIDEO);
            info.rate = stream.rate;
            info.scale = stream.scale;
            info.n = stream.frame_count;
            info.format = descriptor.host_ptr();
            info.format_size = BITMAP_INFO_HEADER_SIZE.cast_signed();
        }
        if let (Some(stream), Some(descriptor)) = (audio, audio_format.as_mut()) {
            info.flag.insert(InputInfoFlags::AUDIO);
            info.audio_n = stream.sample_count;
            info.audio_format = descriptor.host_ptr();
            info.audio_format_size = WAVE_FORMAT_EX_SIZE.cast_signed();
        }
        if P::CONCURRENT && !info.flag.is_empty() {
            info.flag.insert(InputInfoFlags::CONCURRENT);
        }

        let mut formats = entry.formats.lock();
        formats.video = video_format;
        formats.audio = audio_format;
        Ok(info)
    }

    fn decode_video(&self, entry: &HandleEntry<P::Handle>, frame: i32) -> PluginResult<Vec<u8>> {
        if !<P::Media as MediaKind<P>>::FLAGS.contains(InputPluginFlags::VIDEO) {
            return Err(PluginError::CapabilityMismatch {
                operation: "read_video",
            });
        }
        let capacity = entry
            .formats
            .lock()
            .video
            .as_ref()
            .and_then(Descriptor::get)
            .map(|header| usize::try_from(header.frame_bytes()).unwrap_or(usize::MAX));
        if capacity.is_none() && self.config.enforce_format_capacity {
            return Err(PluginError::InvalidInput(
                "video read before the format was described".to_string(),
            ));
        }

        let bytes = <P::Media as MediaKind<P>>::read_video(&self.plugin, &entry.handle, frame)?;
        if let Some(capacity) = capacity
            && bytes.len() > capacity
        {
            return Err(PluginError::FormatOverflow {
                produced: bytes.len(),
                capacity,
            });
        }
        Ok(bytes)
    }

    fn decode_audio(
        &self,
        entry: &HandleEntry<P::Handle>,
        start: i32,
        length: i32,
    ) -> PluginResult<AudioChunk> {
        if !<P::Media as MediaKind<P>>::FLAGS.contains(InputPluginFlags::AUDIO) {
            return Err(PluginError::CapabilityMismatch {
                operation: "read_audio",
            });
        }
        let block_align = entry
            .formats
            .lock()
            .audio
            .as_ref()
            .and_then(Descriptor::get)
            .map(WaveFormatEx::block_align);
        let Some(block_align) = block_align.filter(|align| *align > 0).map(usize::from) else {
            return Err(PluginError::InvalidInput(
                "audio read before the format was described".to_string(),
            ));
        };
        let length = usize::try_from(length)
            .map_err(|_negative| PluginError::InvalidInput(format!("negative length {length}")))?;
        let capacity = length.saturating_mul(block_align);

        let bytes = <P::Media as MediaKind<P>>::read_audio(
            &self.plugin,
            &entry.handle,
            start,
            i32::try_from(length).unwrap_or(i32::MAX),
        )?;
        if bytes.len() > capacity {
            return Err(PluginError::FormatOverflow {
                produced: bytes.len(),
                capacity,
            });
        }
        let samples = i32::try_from(bytes.len() / block_align).unwrap_or(i32::MAX);
        Ok(AudioChunk { bytes, samples })
    }
}

impl<P: InputPluginExport> InputRuntime<P> {
    /// The published table, built on first use.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`].
    pub fn table(&self) -> Result<NonNull<InputPluginTable>, BuildError> {
        self.table
            .get_or_build(&InputTableSpec::for_plugin::<P>(), self.config.max_text_units)
    }

    /// Frees and rebuilds the table.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`].
    pub fn rebuild_table(&self) -> Result<NonNull<InputPluginTable>, BuildError> {
        self.table
            .rebuild(&InputTableSpec::for_plugin::<P>(), self.config.max_text_units)
    }
}

impl<P: InputPlugin> std::fmt::Debug for InputRuntime<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputRuntime")
            .field("plugin", &P::NAME)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Process-wide state for one output plugin type.
pub struct OutputRuntime<P: OutputPlugin> {
    plugin: P,
    config: AdapterConfig,
    table: TableSlot<OutputPluginTable>,
    config_text: Mutex<Option<WideString>>,
}

impl<P: OutputPlugin> OutputRuntime<P> {
    /// Wraps `plugin` with the configuration from [`OutputPlugin::adapter_config`].
    pub fn new(plugin: P) -> Self {
        Self::with_config(plugin, P::adapter_config())
    }

    /// Wraps `plugin` with an explicit configuration.
    pub fn with_config(plugin: P, config: AdapterConfig) -> Self {
        Self {
            plugin,
            config,
            table: TableSlot::new(),
            config_text: Mutex::new(None),
        }
    }

    /// The wrapped plugin.
    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    /// Boundary settings in force.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Allocation counters for the table slot.
    pub fn table_stats(&self) -> TableStats {
        self.table.stats()
    }

    /// Runs one export.
    ///
    /// # Errors
    ///
    /// Whatever [`OutputPlugin::output`] reports.
    pub fn output(&self, job: &mut OutputJob<'_>) -> PluginResult<()> {
        debug!(
            plugin = P::NAME,
            path = %job.save_path().display(),
            frames = job.frame_count(),
            "Starting export"
        );
        self.plugin.output(job)
    }

    /// Shows the settings dialog, if the composition has one.
    pub fn configure(&self, context: ConfigureContext) -> bool {
        <P::Config as ConfigDialogKind<P>>::configure(&self.plugin, context)
    }

    /// Encodes the current settings text and returns a pointer to it.
    ///
    /// The pointer stays valid until the next call.
    ///
    /// # Errors
    ///
    /// [`PluginError::InvalidInput`] for unencodable text,
    /// [`PluginError::Allocation`] when the buffer cannot be reserved.
    pub fn refresh_config_text(&self) -> PluginResult<*const u16> {
        let text = <P::ConfigText as ConfigTextKind<P>>::config_text(&self.plugin);
        let wide = WideString::new("config_text", &text, self.config.max_text_units)?;
        let mut slot = self.config_text.lock();
        Ok(slot.insert(wide).as_ptr())
    }
}

impl<P: OutputPluginExport> OutputRuntime<P> {
    /// The published table, built on first use.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`].
    pub fn table(&self) -> Result<NonNull<OutputPluginTable>, BuildError> {
        self.table
            .get_or_build(&OutputTableSpec::for_plugin::<P>(), self.config.max_text_units)
    }

    /// Frees and rebuilds the table.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`].
    pub fn rebuild_table(&self) -> Result<NonNull<OutputPluginTable>, BuildError> {
        self.table
            .rebuild(&OutputTableSpec::for_plugin::<P>(), self.config.max_text_units)
    }
}

impl<P: OutputPlugin> std::fmt::Debug for OutputRuntime<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRuntime")
            .field("plugin", &P::NAME)
            .field("config", &self.config)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
