//! Export macros binding a plugin type to its runtime and entry point.

/// Implements [`InputPluginExport`](crate::InputPluginExport) for `$plugin`.
///
/// The runtime is created from `$ctor` on first use and lives for the rest
/// of the process.
///
/// ```ignore
/// aviutl2_plugin::declare_input_plugin!(ImageInput, ImageInput::new());
/// ```
#[macro_export]
macro_rules! declare_input_plugin {
    ($plugin:ty, $ctor:expr $(,)?) => {
        impl $crate::InputPluginExport for $plugin {
            fn runtime() -> &'static $crate::InputRuntime<$plugin> {
                static RUNTIME: ::std::sync::OnceLock<$crate::InputRuntime<$plugin>> =
                    ::std::sync::OnceLock::new();
                RUNTIME.get_or_init(|| $crate::InputRuntime::new($ctor))
            }
        }
    };
}

/// Implements [`OutputPluginExport`](crate::OutputPluginExport) for `$plugin`.
#[macro_export]
macro_rules! declare_output_plugin {
    ($plugin:ty, $ctor:expr $(,)?) => {
        impl $crate::OutputPluginExport for $plugin {
            fn runtime() -> &'static $crate::OutputRuntime<$plugin> {
                static RUNTIME: ::std::sync::OnceLock<$crate::OutputRuntime<$plugin>> =
                    ::std::sync::OnceLock::new();
                RUNTIME.get_or_init(|| $crate::OutputRuntime::new($ctor))
            }
        }
    };
}

/// [`declare_input_plugin!`] plus the `GetInputPluginTable` export.
///
/// Use at most once per shared library.
#[macro_export]
macro_rules! export_input_plugin {
    ($plugin:ty, $ctor:expr $(,)?) => {
        $crate::declare_input_plugin!($plugin, $ctor);

        /// Host entry point returning the input plugin table.
        #[unsafe(no_mangle)]
        pub extern "system" fn GetInputPluginTable() -> *mut $crate::abi::InputPluginTable {
            $crate::export_input_table::<$plugin>()
        }
    };
}

/// [`declare_output_plugin!`] plus the `GetOutputPluginTable` export.
///
/// Use at most once per shared library.
#[macro_export]
macro_rules! export_output_plugin {
    ($plugin:ty, $ctor:expr $(,)?) => {
        $crate::declare_output_plugin!($plugin, $ctor);

        /// Host entry point returning the output plugin table.
        #[unsafe(no_mangle)]
        pub extern "system" fn GetOutputPluginTable() -> *mut $crate::abi::OutputPluginTable {
            $crate::export_output_table::<$plugin>()
        }
    };
}
