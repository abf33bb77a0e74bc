//! Typed AviUtl2 input and output plugins behind the host's C ABI.
//!
//! A plugin implements [`InputPlugin`] or [`OutputPlugin`] plus the
//! capability traits its composition names ([`SupportsVideo`],
//! [`SupportsAudio`], [`HasConfigDialog`], [`HasConfigText`]). The adapter
//! derives the native table from that composition and routes every host
//! call through panic-safe trampolines:
//!
//! - Handles cross the boundary as opaque tokens resolved through a
//!   [`HandleRegistry`]; stale or foreign tokens are rejected, never
//!   dereferenced.
//! - Absent capabilities become null slots or constant no-op functions at
//!   build time, decided once from the composition.
//! - Tables are process-wide singletons in a [`TableSlot`]; rebuilding
//!   unpublishes, frees, and republishes, with allocation counters to prove
//!   nothing leaks.
//! - Failures never cross the boundary: they become null, `false` or `0`,
//!   and are logged with [`tracing`].
//!
//! # Example
//!
//! ```ignore
//! use aviutl2_plugin::prelude::*;
//!
//! struct Reader;
//!
//! impl InputPlugin for Reader {
//!     type Handle = std::fs::File;
//!     type Media = VideoOnly;
//!     type Config = NoConfigDialog;
//!     const NAME: &'static str = "Reader";
//!     const FILE_FILTER: &'static [FilterEntry] = &[FilterEntry::ALL_FILES];
//!     const INFORMATION: &'static str = "Reader 0.1";
//!     // open / info ...
//! }
//!
//! impl SupportsVideo for Reader { /* read_video ... */ }
//!
//! aviutl2_plugin::export_input_plugin!(Reader, Reader);
//! ```
//!
//! # Unwinding
//!
//! Panic containment needs `panic = "unwind"` in the final library's profile.

#![expect(unsafe_code, reason = "C ABI trampolines and host buffer access")]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod accounting;
pub mod capability;
pub mod config;
mod dispatch;
pub mod error;
pub mod ffi_guard;
pub mod job;
mod macros;
pub mod prelude;
pub mod registry;
pub mod runtime;
pub mod table;
pub mod wide;

/// Raw ABI types, re-exported for macro expansions and host-side tests.
pub use aviutl2_plugin_abi as abi;

pub use accounting::{AllocationCounters, AllocationSnapshot};
pub use capability::{
    AudioOnly, AudioStreamInfo, ConfigDialogKind, ConfigTextKind, ConfigureContext,
    HasConfigDialog, HasConfigText, InputPlugin, MediaInfo, MediaKind, NoConfigDialog,
    NoConfigText, OutputPlugin, SupportsAudio, SupportsVideo, VideoAndAudio, VideoOnly,
    VideoStreamInfo, WithConfigDialog, WithConfigText,
};
pub use config::AdapterConfig;
pub use dispatch::{
    export_input_table, export_output_table, input_table, output_table, rebuild_input_table,
    rebuild_output_table,
};
pub use error::{BuildError, ErrorCategory, PluginError, PluginResult, RegistryError};
pub use job::{AudioSampleFormat, OutputJob, VideoFrameFormat};
pub use registry::{HandleRegistry, HandleToken};
pub use runtime::{AudioChunk, InputPluginExport, InputRuntime, OutputPluginExport, OutputRuntime};
pub use table::{
    InputTableSpec, MediaSlot, OutputTableSpec, PluginMetadata, TableSlot, TableSpec, TableStats,
};
pub use wide::{FilterEntry, WideString};
