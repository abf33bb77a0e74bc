//! NUL-terminated UTF-16 strings shared with the host.

use std::path::PathBuf;

use crate::error::{BuildError, PluginError, PluginResult};

/// One `description\0pattern\0` pair of a file filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterEntry {
    /// Text shown in the host's file dialog
    pub description: &'static str,
    /// Semicolon-separated glob list, e.g. `*.png;*.bmp`
    pub pattern: &'static str,
}

impl FilterEntry {
    /// `All Files (*.*)` / `*.*`
    pub const ALL_FILES: Self = Self::new("All Files (*.*)", "*.*");

    /// Creates a filter entry.
    #[must_use]
    pub const fn new(description: &'static str, pattern: &'static str) -> Self {
        Self {
            description,
            pattern,
        }
    }
}

/// Owned, NUL-terminated UTF-16 buffer.
///
/// The heap storage is allocated once and never grows, so [`as_ptr`](Self::as_ptr)
/// stays valid for as long as the value lives, even if the `WideString`
/// itself is moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideString {
    units: Vec<u16>,
}

impl WideString {
    /// Encodes `text`, rejecting interior NULs and text longer than `max_units`.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidString`] for unencodable text,
    /// [`BuildError::Allocation`] when the buffer cannot be reserved.
    pub fn new(field: &'static str, text: &str, max_units: usize) -> Result<Self, BuildError> {
        check_segment(field, text)?;
        let len = text.encode_utf16().count();
        check_length(field, len, max_units)?;
        let mut units = reserve(field, len.saturating_add(1))?;
        units.extend(text.encode_utf16());
        units.push(0);
        Ok(Self { units })
    }

    /// Encodes a file filter as `desc\0pattern\0...\0`.
    ///
    /// An empty list encodes as two NULs so the host still sees a terminated list.
    ///
    /// # Errors
    ///
    /// Rejects empty descriptions or patterns, which would end the list early.
    pub fn file_filter(
        field: &'static str,
        entries: &[FilterEntry],
        max_units: usize,
    ) -> Result<Self, BuildError> {
        let mut len = 1usize;
        for entry in entries {
            for segment in [entry.description, entry.pattern] {
                if segment.is_empty() {
                    return Err(BuildError::InvalidString {
                        field,
                        reason: "filter segments must not be empty".to_string(),
                    });
                }
                check_segment(field, segment)?;
                len = len
                    .saturating_add(segment.encode_utf16().count())
                    .saturating_add(1);
            }
        }
        if entries.is_empty() {
            len = 2;
        }
        check_length(field, len, max_units)?;

        let mut units = reserve(field, len)?;
        for entry in entries {
            units.extend(entry.description.encode_utf16());
            units.push(0);
            units.extend(entry.pattern.encode_utf16());
            units.push(0);
        }
        if entries.is_empty() {
            units.push(0);
        }
        units.push(0);
        Ok(Self { units })
    }

    /// Pointer to the first unit, valid while `self` lives.
    #[must_use]
    pub fn as_ptr(&self) -> *const u16 {
        self.units.as_ptr()
    }

    /// Units without the final terminator.
    #[must_use]
    pub fn as_units(&self) -> &[u16] {
        self.units.split_last().map_or(&[], |(_, rest)| rest)
    }

    /// Bytes of heap storage held, terminator included.
    #[must_use]
    pub fn allocation_bytes(&self) -> usize {
        self.units.len().saturating_mul(size_of::<u16>())
    }
}

fn check_segment(field: &'static str, text: &str) -> Result<(), BuildError> {
    if text.contains('\0') {
        return Err(BuildError::InvalidString {
            field,
            reason: "contains an interior NUL".to_string(),
        });
    }
    Ok(())
}

fn check_length(field: &'static str, len: usize, max_units: usize) -> Result<(), BuildError> {
    if len > max_units {
        return Err(BuildError::InvalidString {
            field,
            reason: format!("{len} UTF-16 units exceeds the limit of {max_units}"),
        });
    }
    Ok(())
}

fn reserve(field: &'static str, units: usize) -> Result<Vec<u16>, BuildError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(units)
        .map_err(|_reserve_error| BuildError::Allocation { field })?;
    Ok(buffer)
}

/// Reads a host string.
///
/// # Errors
///
/// [`PluginError::InvalidInput`] for a null pointer, a string not terminated
/// within `max_units`, or invalid UTF-16.
///
/// # Safety
///
/// `ptr` must be null or readable up to its first NUL or `max_units` units,
/// whichever comes first.
pub unsafe fn read_wide(ptr: *const u16, max_units: usize) -> PluginResult<String> {
    // SAFETY: forwarded from the caller.
    let units = unsafe { terminated_units(ptr, max_units, false) }?;
    String::from_utf16(units)
        .map_err(|err| PluginError::InvalidInput(format!("invalid UTF-16: {err}")))
}

/// Reads a host path. Empty paths are rejected.
///
/// # Errors
///
/// As [`read_wide`], plus [`PluginError::InvalidInput`] for an empty path.
///
/// # Safety
///
/// Same contract as [`read_wide`].
pub unsafe fn read_wide_path(ptr: *const u16, max_units: usize) -> PluginResult<PathBuf> {
    // SAFETY: forwarded from the caller.
    let text = unsafe { read_wide(ptr, max_units) }?;
    if text.is_empty() {
        return Err(PluginError::InvalidInput("empty path".to_string()));
    }
    Ok(PathBuf::from(text))
}

/// Reads a double-NUL-terminated filter list into its segments.
///
/// # Errors
///
/// As [`read_wide`].
///
/// # Safety
///
/// `ptr` must be null or readable up to its closing double NUL or
/// `max_units` units, whichever comes first.
pub unsafe fn read_filter(ptr: *const u16, max_units: usize) -> PluginResult<Vec<String>> {
    // SAFETY: forwarded from the caller.
    let units = unsafe { terminated_units(ptr, max_units, true) }?;
    decode_filter(units)
}

/// Splits encoded filter units into `description, pattern, ...` segments.
///
/// Decoding stops at the first empty segment, so both [`WideString::as_units`]
/// and a buffer including the closing NULs are accepted.
///
/// # Errors
///
/// [`PluginError::InvalidInput`] when a segment is not valid UTF-16.
pub fn decode_filter(units: &[u16]) -> PluginResult<Vec<String>> {
    units
        .split(|unit| *unit == 0)
        .take_while(|segment| !segment.is_empty())
        .map(|segment| {
            String::from_utf16(segment)
                .map_err(|err| PluginError::InvalidInput(format!("invalid UTF-16: {err}")))
        })
        .collect()
}

/// Units before the terminator; for lists the terminator is the NUL that
/// closes an empty segment.
///
/// # Safety
///
/// See [`read_wide`] / [`read_filter`].
unsafe fn terminated_units<'a>(
    ptr: *const u16,
    max_units: usize,
    list: bool,
) -> PluginResult<&'a [u16]> {
    if ptr.is_null() {
        return Err(PluginError::InvalidInput("null string pointer".to_string()));
    }
    let mut previous = 0u16;
    let mut len = 0usize;
    loop {
        if len >= max_units {
            return Err(PluginError::InvalidInput(format!(
                "string is not terminated within {max_units} units"
            )));
        }
        // SAFETY: `len < max_units` and every unit before it was non-terminal,
        // so the caller guarantees this unit is readable.
        let cursor = unsafe { ptr.add(len) };
        // SAFETY: as above.
        let unit = unsafe { cursor.read_unaligned() };
        if unit == 0 && (!list || len == 0 || previous == 0) {
            break;
        }
        previous = unit;
        len += 1;
    }
    // SAFETY: the `len` units before the terminator were read above.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_new_appends_terminator() -> TestResult {
        let wide = WideString::new("name", "AB", 16)?;
        assert_eq!(wide.as_units(), &[0x41, 0x42]);
        assert_eq!(wide.allocation_bytes(), 6);
        // SAFETY: `wide` owns a terminated buffer.
        let back = unsafe { read_wide(wide.as_ptr(), 16) }?;
        assert_eq!(back, "AB");
        Ok(())
    }

    #[test]
    fn test_rejects_interior_nul() {
        let err = WideString::new("name", "a\0b", 16);
        assert!(matches!(
            err,
            Err(BuildError::InvalidString { field: "name", .. })
        ));
    }

    #[test]
    fn test_rejects_overlong_text() {
        assert!(WideString::new("information", "abcdef", 3).is_err());
    }

    #[test]
    fn test_filter_encoding() -> TestResult {
        let filter = WideString::file_filter("filefilter", &[FilterEntry::ALL_FILES], 64)?;
        let expected: Vec<u16> = "All Files (*.*)\0*.*\0".encode_utf16().collect();
        assert_eq!(filter.as_units(), expected.as_slice());
        // SAFETY: `filter` owns a double-NUL-terminated buffer.
        let segments = unsafe { read_filter(filter.as_ptr(), 64) }?;
        insta::assert_debug_snapshot!(segments, @r#"
        [
            "All Files (*.*)",
            "*.*",
        ]
        "#);
        Ok(())
    }

    #[test]
    fn test_empty_filter_is_double_nul() -> TestResult {
        let filter = WideString::file_filter("filefilter", &[], 8)?;
        assert_eq!(filter.as_units(), &[0]);
        assert!(decode_filter(filter.as_units())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_filter_rejects_empty_pattern() {
        let entries = [FilterEntry::new("Images", "")];
        assert!(WideString::file_filter("filefilter", &entries, 64).is_err());
    }

    #[test]
    fn test_read_wide_null_and_unterminated() {
        // SAFETY: null is explicitly allowed.
        assert!(unsafe { read_wide(std::ptr::null(), 8) }.is_err());
        let units = [0x61u16, 0x62, 0x63];
        // SAFETY: three readable units and max_units == 3.
        assert!(unsafe { read_wide(units.as_ptr(), 3) }.is_err());
    }

    #[test]
    fn test_read_wide_rejects_lone_surrogate() {
        let units = [0xD800u16, 0];
        // SAFETY: terminated buffer.
        let result = unsafe { read_wide(units.as_ptr(), 8) };
        assert!(matches!(result, Err(PluginError::InvalidInput(_))));
    }

    #[test]
    fn test_read_wide_path_rejects_empty() {
        let units = [0u16];
        // SAFETY: terminated buffer.
        assert!(unsafe { read_wide_path(units.as_ptr(), 8) }.is_err());
    }
}
