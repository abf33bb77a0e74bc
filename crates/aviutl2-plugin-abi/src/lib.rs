//! C ABI definitions for AviUtl2 input and output plugins.
//!
//! This crate mirrors the host's plugin structures bit-for-bit:
//! - [`InputPluginTable`] and [`InputInfo`] for input plugins
//! - [`OutputPluginTable`] and [`OutputInfo`] for output plugins
//! - [`BitmapInfoHeader`] and [`WaveFormatEx`] format descriptors
//! - Capability bitflags for tables and info structs
//!
//! # ABI Stability Guarantees
//!
//! All structures are `#[repr(C)]` with fields in host declaration order and
//! no padding beyond what the C layout mandates. Sizes and field offsets are
//! asserted at compile time for 64-bit targets, which is the only pointer
//! width the host ships for.
//!
//! The input and output layouts are deliberately unrelated types: the host
//! treats them as distinct C structs and so does this crate.
//!
//! # Strings
//!
//! Every string pointer is a NUL-terminated UTF-16 (`LPCWSTR`) pointer. The
//! file filter of a table is a list of `description\0pattern\0` pairs closed
//! by an extra NUL.
//!
//! # Calling Convention
//!
//! All function pointers use `extern "system"`: `stdcall` on 32-bit Windows,
//! the platform C convention everywhere else.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod constants;
pub mod format;
pub mod input;
pub mod output;
pub mod prelude;
pub mod types;

pub use constants::{
    BI_RGB, DEFAULT_BUFFER_FRAMES, FOURCC_YUY2, INPUT_TABLE_SYMBOL, OUTPUT_TABLE_SYMBOL,
    WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM,
};
pub use format::{BITMAP_INFO_HEADER_SIZE, BitmapInfoHeader, WAVE_FORMAT_EX_SIZE, WaveFormatEx};
pub use input::{
    FuncClose, FuncConfig, FuncInfoGet, FuncOpen, FuncReadAudio, FuncReadVideo,
    GetInputPluginTableFn, InputHandle, InputInfo, InputPluginTable,
};
pub use output::{
    FuncGetAudio, FuncGetConfigText, FuncGetVideo, FuncIsAbort, FuncOutput, FuncRestTimeDisp,
    FuncSetBufferSize, GetOutputPluginTableFn, OutputInfo, OutputPluginTable,
};
pub use types::{InputInfoFlags, InputPluginFlags, OutputInfoFlags, OutputPluginFlags};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_re_exports() {
        let _ = INPUT_TABLE_SYMBOL;
        let _ = OUTPUT_TABLE_SYMBOL;
        let _ = BI_RGB;
        let _ = FOURCC_YUY2;
        let _ = WAVE_FORMAT_PCM;
        let _ = WAVE_FORMAT_IEEE_FLOAT;
        let _ = DEFAULT_BUFFER_FRAMES;
    }

    #[test]
    fn test_entry_symbols_are_nul_terminated() {
        assert_eq!(INPUT_TABLE_SYMBOL.last(), Some(&0));
        assert_eq!(OUTPUT_TABLE_SYMBOL.last(), Some(&0));
    }
}
