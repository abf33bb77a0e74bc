//! Example AviUtl2 plugins built on `aviutl2-plugin`.
//!
//! The shared library exports both entry points:
//!
//! - `GetInputPluginTable`: [`ImageInput`] decodes a still image and plays
//!   it back as one second of video, rotating a full turn.
//! - `GetOutputPluginTable`: [`RawVideoOutput`] dumps every frame the host
//!   renders as raw bottom-up BGR24 rows.
//!
//! Build with `--features stderr-log` to see adapter diagnostics on stderr
//! (filtered by `RUST_LOG`).

#![expect(unsafe_code, reason = "exports the unmangled host entry points")]

pub mod image_input;
#[cfg(feature = "stderr-log")]
mod logging;
pub mod raw_output;

use aviutl2_plugin::abi::{InputPluginTable, OutputPluginTable};
use aviutl2_plugin::{declare_input_plugin, declare_output_plugin};

pub use image_input::{ImageHandle, ImageInput};
pub use raw_output::RawVideoOutput;

declare_input_plugin!(ImageInput, ImageInput);
declare_output_plugin!(RawVideoOutput, RawVideoOutput::new());

/// Host entry point for the image input plugin.
#[unsafe(no_mangle)]
pub extern "system" fn GetInputPluginTable() -> *mut InputPluginTable {
    #[cfg(feature = "stderr-log")]
    logging::init();
    aviutl2_plugin::export_input_table::<ImageInput>()
}

/// Host entry point for the raw output plugin.
#[unsafe(no_mangle)]
pub extern "system" fn GetOutputPluginTable() -> *mut OutputPluginTable {
    #[cfg(feature = "stderr-log")]
    logging::init();
    aviutl2_plugin::export_output_table::<RawVideoOutput>()
}
