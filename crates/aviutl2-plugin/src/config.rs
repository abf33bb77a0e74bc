//! Per-plugin adapter settings.
//!
//! Nothing here is read from the environment or from disk: each plugin type
//! supplies its configuration through `adapter_config()`.

/// Longest path the adapter accepts, in UTF-16 units (the Windows long-path limit).
pub const DEFAULT_MAX_PATH_UNITS: usize = 32_768;

/// Longest metadata or config text the adapter encodes, in UTF-16 units.
pub const DEFAULT_MAX_TEXT_UNITS: usize = 65_536;

/// Tunables for the boundary layer.
///
/// ## Presets
///
/// | Preset         | `enforce_format_capacity` | `trace_calls` | limits  |
/// |----------------|---------------------------|---------------|---------|
/// | `default()`    | `true`                    | `false`       | default |
/// | `strict()`     | `true`                    | `false`       | tighter |
/// | `permissive()` | `false`                   | `true`        | wider   |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct AdapterConfig {
    /// Host paths longer than this are rejected before `open` runs.
    pub max_path_units: usize,
    /// Name, information, filter and config text are capped at this length.
    pub max_text_units: usize,
    /// Refuse video reads on a handle whose format has not been described by
    /// `info`. Audio reads always need a described format.
    ///
    /// Reads on described handles are always bounded by the declared size.
    pub enforce_format_capacity: bool,
    /// Emit a `trace` event for every call crossing the boundary.
    pub trace_calls: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_path_units: DEFAULT_MAX_PATH_UNITS,
            max_text_units: DEFAULT_MAX_TEXT_UNITS,
            enforce_format_capacity: true,
            trace_calls: false,
        }
    }
}

impl AdapterConfig {
    /// Tighter limits for plugins shipped to end users.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_path_units: DEFAULT_MAX_PATH_UNITS,
            max_text_units: 4_096,
            enforce_format_capacity: true,
            trace_calls: false,
        }
    }

    /// Development settings: wide limits and per-call tracing.
    ///
    /// Reads before `info` are copied without a capacity bound, so only use
    /// this against a host known to describe formats first.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_path_units: DEFAULT_MAX_PATH_UNITS.saturating_mul(4),
            max_text_units: DEFAULT_MAX_TEXT_UNITS.saturating_mul(4),
            enforce_format_capacity: false,
            trace_calls: true,
        }
    }

    /// Sets [`trace_calls`](Self::trace_calls).
    #[must_use]
    pub fn with_trace_calls(mut self, enabled: bool) -> Self {
        self.trace_calls = enabled;
        self
    }
}
