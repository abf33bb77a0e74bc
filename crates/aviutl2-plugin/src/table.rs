//! Typed table descriptions and the singleton slot that publishes them.
//!
//! A table is described by an [`InputTableSpec`] or [`OutputTableSpec`]
//! whose optional slots are explicit (`MediaSlot::Unsupported`, `None`).
//! Only [`TableSlot`] turns that description into the native struct, and
//! only there does "absent" become a null pointer or a no-op trampoline.
//!
//! # Rebuild order
//!
//! 1. Unpublish (the slot's pointer reads null).
//! 2. Free the old strings, then the old struct.
//! 3. Allocate the new struct, then its strings.
//! 4. Publish the new pointer with `Release` ordering.
//!
//! A build that fails at any step leaves the slot empty.

use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use aviutl2_plugin_abi::{
    FuncClose, FuncConfig, FuncGetConfigText, FuncInfoGet, FuncOpen, FuncOutput, FuncReadAudio,
    FuncReadVideo, InputPluginFlags, InputPluginTable, OutputPluginFlags, OutputPluginTable,
};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::accounting::{AllocationCounters, AllocationSnapshot};
use crate::capability::{ConfigDialogKind, ConfigTextKind, MediaKind};
use crate::dispatch;
use crate::error::BuildError;
use crate::runtime::{InputPluginExport, OutputPluginExport};
use crate::wide::{FilterEntry, WideString};

/// Strings shown by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Display name
    pub name: &'static str,
    /// File dialog filter entries
    pub file_filter: &'static [FilterEntry],
    /// Information text
    pub information: &'static str,
}

/// A media read slot: dispatched to the plugin, or answered with 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSlot<F> {
    /// Routed to the plugin
    Dispatch(F),
    /// Constant no-op returning 0
    Unsupported,
}

impl<F: Copy> MediaSlot<F> {
    /// Whether the slot routes to the plugin.
    #[must_use]
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    fn resolve(self, unsupported: F) -> F {
        match self {
            Self::Dispatch(f) => f,
            Self::Unsupported => unsupported,
        }
    }
}

/// Typed description of an input table.
#[derive(Debug, Clone, Copy)]
pub struct InputTableSpec {
    /// Host-visible strings
    pub metadata: PluginMetadata,
    /// `func_open`
    pub open: FuncOpen,
    /// `func_close`
    pub close: FuncClose,
    /// `func_info_get`
    pub info_get: FuncInfoGet,
    /// `func_read_video`
    pub read_video: MediaSlot<FuncReadVideo>,
    /// `func_read_audio`
    pub read_audio: MediaSlot<FuncReadAudio>,
    /// `func_config`, null when absent
    pub configure: Option<FuncConfig>,
    /// Advertise concurrent video/audio reads
    pub concurrent: bool,
}

impl InputTableSpec {
    /// Derives the table from `P`'s capability composition.
    #[must_use]
    pub fn for_plugin<P: InputPluginExport>() -> Self {
        let media = <P::Media as MediaKind<P>>::FLAGS;
        Self {
            metadata: PluginMetadata {
                name: P::NAME,
                file_filter: P::FILE_FILTER,
                information: P::INFORMATION,
            },
            open: dispatch::input_open::<P>,
            close: dispatch::input_close::<P>,
            info_get: dispatch::input_info_get::<P>,
            read_video: if media.contains(InputPluginFlags::VIDEO) {
                MediaSlot::Dispatch(dispatch::input_read_video::<P>)
            } else {
                MediaSlot::Unsupported
            },
            read_audio: if media.contains(InputPluginFlags::AUDIO) {
                MediaSlot::Dispatch(dispatch::input_read_audio::<P>)
            } else {
                MediaSlot::Unsupported
            },
            configure: if <P::Config as ConfigDialogKind<P>>::PRESENT {
                Some(dispatch::input_config::<P>)
            } else {
                None
            },
            concurrent: P::CONCURRENT,
        }
    }

    /// Table flags implied by the filled slots.
    #[must_use]
    pub fn flags(&self) -> InputPluginFlags {
        let mut flags = InputPluginFlags::empty();
        flags.set(InputPluginFlags::VIDEO, self.read_video.is_dispatch());
        flags.set(InputPluginFlags::AUDIO, self.read_audio.is_dispatch());
        if self.concurrent && !flags.is_empty() {
            flags.insert(InputPluginFlags::CONCURRENT);
        }
        flags
    }
}

/// Typed description of an output table.
#[derive(Debug, Clone, Copy)]
pub struct OutputTableSpec {
    /// Host-visible strings
    pub metadata: PluginMetadata,
    /// Media consumed
    pub media: OutputPluginFlags,
    /// `func_output`
    pub output: FuncOutput,
    /// `func_config`, null when absent
    pub configure: Option<FuncConfig>,
    /// `func_get_config_text`, null when absent
    pub config_text: Option<FuncGetConfigText>,
}

impl OutputTableSpec {
    /// Derives the table from `P`'s capability composition.
    #[must_use]
    pub fn for_plugin<P: OutputPluginExport>() -> Self {
        Self {
            metadata: PluginMetadata {
                name: P::NAME,
                file_filter: P::FILE_FILTER,
                information: P::INFORMATION,
            },
            media: P::MEDIA,
            output: dispatch::output_run::<P>,
            configure: if <P::Config as ConfigDialogKind<P>>::PRESENT {
                Some(dispatch::output_config::<P>)
            } else {
                None
            },
            config_text: if <P::ConfigText as ConfigTextKind<P>>::PRESENT {
                Some(dispatch::output_config_text::<P>)
            } else {
                None
            },
        }
    }

    /// Table flags, limited to the media bits.
    #[must_use]
    pub fn flags(&self) -> OutputPluginFlags {
        self.media & OutputPluginFlags::all()
    }
}

/// A typed description that can be turned into a native table.
pub trait TableSpec {
    /// Native struct produced.
    type Table: NativeTable;

    /// Host-visible strings.
    fn metadata(&self) -> &PluginMetadata;

    /// Rejects descriptions the host cannot use.
    ///
    /// # Errors
    ///
    /// [`BuildError::NoMediaKind`] / [`BuildError::NoOutputMedia`].
    fn validate(&self) -> Result<(), BuildError>;

    /// Native struct with flags and function slots filled and string
    /// pointers null.
    fn layout(&self) -> Self::Table;
}

impl TableSpec for InputTableSpec {
    type Table = InputPluginTable;

    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.flags().media().is_empty() {
            return Err(BuildError::NoMediaKind);
        }
        Ok(())
    }

    fn layout(&self) -> InputPluginTable {
        InputPluginTable {
            flag: self.flags(),
            name: ptr::null(),
            filefilter: ptr::null(),
            information: ptr::null(),
            func_open: Some(self.open),
            func_close: Some(self.close),
            func_info_get: Some(self.info_get),
            func_read_video: Some(self.read_video.resolve(dispatch::unsupported_read_video)),
            func_read_audio: Some(self.read_audio.resolve(dispatch::unsupported_read_audio)),
            func_config: self.configure,
        }
    }
}

impl TableSpec for OutputTableSpec {
    type Table = OutputPluginTable;

    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.flags().is_empty() {
            return Err(BuildError::NoOutputMedia);
        }
        Ok(())
    }

    fn layout(&self) -> OutputPluginTable {
        OutputPluginTable {
            flag: self.flags(),
            name: ptr::null(),
            filefilter: ptr::null(),
            information: ptr::null(),
            func_output: Some(self.output),
            func_config: self.configure,
            func_get_config_text: self.config_text,
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for aviutl2_plugin_abi::InputPluginTable {}
    impl Sealed for aviutl2_plugin_abi::OutputPluginTable {}
}

/// Native table structs the slot can publish.
pub trait NativeTable: sealed::Sealed + Sized + 'static {
    /// Points the table's string fields at `strings`.
    fn attach_strings(&mut self, strings: &TableStrings);
}

impl NativeTable for InputPluginTable {
    fn attach_strings(&mut self, strings: &TableStrings) {
        self.name = strings.name.as_ptr();
        self.filefilter = strings.filefilter.as_ptr();
        self.information = strings.information.as_ptr();
    }
}

impl NativeTable for OutputPluginTable {
    fn attach_strings(&mut self, strings: &TableStrings) {
        self.name = strings.name.as_ptr();
        self.filefilter = strings.filefilter.as_ptr();
        self.information = strings.information.as_ptr();
    }
}

/// Encoded metadata strings owned by a published table.
#[derive(Debug)]
pub struct TableStrings {
    name: WideString,
    filefilter: WideString,
    information: WideString,
}

impl TableStrings {
    /// Encodes `metadata`.
    ///
    /// # Errors
    ///
    /// See [`WideString::new`] and [`WideString::file_filter`].
    pub fn encode(metadata: &PluginMetadata, max_units: usize) -> Result<Self, BuildError> {
        Ok(Self {
            name: WideString::new("name", metadata.name, max_units)?,
            filefilter: WideString::file_filter("filefilter", metadata.file_filter, max_units)?,
            information: WideString::new("information", metadata.information, max_units)?,
        })
    }

    /// The three strings in table order.
    #[must_use]
    pub fn parts(&self) -> [&WideString; 3] {
        [&self.name, &self.filefilter, &self.information]
    }
}

/// Allocation counters of one [`TableSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableStats {
    /// Table structs
    pub tables: AllocationSnapshot,
    /// Metadata strings
    pub strings: AllocationSnapshot,
}

struct Published<T> {
    // Length one; the heap buffer is what the host points at.
    table: Vec<T>,
    strings: TableStrings,
}

// SAFETY: the table's raw pointers refer to `strings`, which moves with it,
// and the struct is only touched under the slot's mutex.
unsafe impl<T> Send for Published<T> {}

/// Singleton storage for one native table.
///
/// Readers take the lock-free fast path through [`current`](Self::current).
/// Building and rebuilding are serialised by a mutex.
pub struct TableSlot<T: NativeTable> {
    published: Mutex<Option<Published<T>>>,
    current: AtomicPtr<T>,
    tables: AllocationCounters,
    strings: AllocationCounters,
}

impl<T: NativeTable> Default for TableSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NativeTable> TableSlot<T> {
    /// An empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            published: Mutex::new(None),
            current: AtomicPtr::new(ptr::null_mut()),
            tables: AllocationCounters::new(),
            strings: AllocationCounters::new(),
        }
    }

    /// The published table, if any.
    #[must_use]
    pub fn current(&self) -> Option<NonNull<T>> {
        NonNull::new(self.current.load(Ordering::Acquire))
    }

    /// Returns the published table, building it from `spec` on first use.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`]; nothing is published on failure.
    pub fn get_or_build<S>(&self, spec: &S, max_text_units: usize) -> Result<NonNull<T>, BuildError>
    where
        S: TableSpec<Table = T>,
    {
        if let Some(table) = self.current() {
            return Ok(table);
        }
        let mut published = self.published.lock();
        if let Some(table) = self.current() {
            return Ok(table);
        }
        self.build_locked(&mut published, spec, max_text_units)
    }

    /// Replaces the published table with one built from `spec`.
    ///
    /// An invalid `spec` is rejected before the current table is touched.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`]. After an allocation or encoding failure the slot
    /// is empty.
    pub fn rebuild<S>(&self, spec: &S, max_text_units: usize) -> Result<NonNull<T>, BuildError>
    where
        S: TableSpec<Table = T>,
    {
        spec.validate()?;
        let mut published = self.published.lock();
        self.release_locked(&mut published);
        self.build_locked(&mut published, spec, max_text_units)
    }

    /// Allocation counters for this slot.
    #[must_use]
    pub fn stats(&self) -> TableStats {
        TableStats {
            tables: self.tables.snapshot(),
            strings: self.strings.snapshot(),
        }
    }

    fn release_locked(&self, published: &mut Option<Published<T>>) {
        self.current.store(ptr::null_mut(), Ordering::Release);
        let Some(Published { table, strings }) = published.take() else {
            return;
        };
        for part in strings.parts() {
            self.strings.record_free(part.allocation_bytes());
        }
        drop(strings);
        drop(table);
        self.tables.record_free(size_of::<T>());
        debug!(table = std::any::type_name::<T>(), "Released plugin table");
    }

    fn build_locked<S>(
        &self,
        published: &mut Option<Published<T>>,
        spec: &S,
        max_text_units: usize,
    ) -> Result<NonNull<T>, BuildError>
    where
        S: TableSpec<Table = T>,
    {
        spec.validate()?;

        let mut table = Vec::new();
        if table.try_reserve_exact(1).is_err() {
            error!(plugin = spec.metadata().name, "Failed to allocate plugin table");
            return Err(BuildError::Allocation { field: "table" });
        }
        table.push(spec.layout());
        self.tables.record_alloc(size_of::<T>());

        let strings = match TableStrings::encode(spec.metadata(), max_text_units) {
            Ok(strings) => strings,
            Err(err) => {
                drop(table);
                self.tables.record_free(size_of::<T>());
                error!(plugin = spec.metadata().name, error = %err, "Failed to encode table strings");
                return Err(err);
            }
        };
        for part in strings.parts() {
            self.strings.record_alloc(part.allocation_bytes());
        }

        let Some(native) = table.first_mut() else {
            return Err(BuildError::Allocation { field: "table" });
        };
        native.attach_strings(&strings);
        let raw = NonNull::from(native);

        *published = Some(Published { table, strings });
        self.current.store(raw.as_ptr(), Ordering::Release);
        info!(
            plugin = spec.metadata().name,
            table = std::any::type_name::<T>(),
            "Published plugin table"
        );
        Ok(raw)
    }
}

impl<T: NativeTable> Drop for TableSlot<T> {
    fn drop(&mut self) {
        let mut published = self.published.lock();
        self.release_locked(&mut published);
    }
}

impl<T: NativeTable> std::fmt::Debug for TableSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSlot")
            .field("published", &self.current().is_some())
            .field("stats", &self.stats())
            .finish()
    }
}
