//! Panic containment for functions called by the host.
//!
//! Every trampoline runs its body through [`guard`] so a panic in plugin code
//! becomes the operation's failure value instead of unwinding into the host.
//! This relies on `panic = "unwind"`; with `abort` the process still dies.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::error;

/// Extracts a readable message from a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Runs `f`, returning `default` if it panics.
pub fn guard<T>(operation: &'static str, plugin: &'static str, default: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(plugin, operation, panic = %message, "Caught panic at the plugin boundary");
            default
        }
    }
}
