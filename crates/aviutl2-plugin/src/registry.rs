//! Token-keyed storage for open plugin handles.
//!
//! The host only ever sees a [`HandleToken`] disguised as a pointer. Every
//! call resolves it back through a [`HandleRegistry`], so a stale, foreign
//! or mistyped token is rejected instead of dereferenced.
//!
//! Tokens come from one process-wide counter and are never reused. A token
//! issued by one registry therefore never resolves in another, and a token
//! that has been retired stays dead.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::RegistryError;

static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);

/// Opaque identifier of a registered handle. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleToken(NonZeroUsize);

impl HandleToken {
    fn next() -> Self {
        loop {
            let raw = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
            if let Some(token) = NonZeroUsize::new(raw) {
                return Self(token);
            }
        }
    }

    /// Rebuilds a token from its integer form; `None` for zero.
    #[must_use]
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// Integer form of the token.
    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Pointer-shaped form handed to the host. Carries no provenance and
    /// must never be dereferenced.
    #[must_use]
    pub fn into_raw_handle(self) -> *mut c_void {
        ptr::without_provenance_mut(self.get())
    }

    /// Reads a token back from the host's opaque handle; `None` for null.
    #[must_use]
    pub fn from_raw_handle(handle: *mut c_void) -> Option<Self> {
        Self::from_raw(handle.addr())
    }
}

impl fmt::Display for HandleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.get())
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Thread-safe map from [`HandleToken`] to a typed handle object.
#[derive(Default)]
pub struct HandleRegistry {
    entries: RwLock<HashMap<usize, Entry>>,
}

impl HandleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` and returns a fresh token for it.
    pub fn register<T: Any + Send + Sync>(&self, value: T) -> HandleToken {
        let token = HandleToken::next();
        self.entries.write().insert(token.get(), Arc::new(value));
        token
    }

    /// Looks up the handle behind `token`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] for unknown or retired tokens,
    /// [`RegistryError::KindMismatch`] when the entry is not a `T`.
    pub fn resolve<T: Any + Send + Sync>(&self, token: HandleToken) -> Result<Arc<T>, RegistryError> {
        let entry = self
            .entries
            .read()
            .get(&token.get())
            .cloned()
            .ok_or(RegistryError::NotFound(token.get()))?;
        downcast(token, entry)
    }

    /// Removes `token` whatever it holds. Returns whether it was present.
    ///
    /// Retiring twice is harmless.
    pub fn retire(&self, token: HandleToken) -> bool {
        self.entries.write().remove(&token.get()).is_some()
    }

    /// Removes `token` only if it holds a `T`, returning the entry.
    ///
    /// A mistyped token is left registered.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn retire_as<T: Any + Send + Sync>(
        &self,
        token: HandleToken,
    ) -> Result<Arc<T>, RegistryError> {
        let mut entries = self.entries.write();
        match entries.get(&token.get()) {
            None => return Err(RegistryError::NotFound(token.get())),
            Some(entry) if !entry.is::<T>() => return Err(mismatch::<T>(token)),
            Some(_) => {}
        }
        let entry = entries
            .remove(&token.get())
            .ok_or(RegistryError::NotFound(token.get()))?;
        drop(entries);
        downcast(token, entry)
    }

    /// Whether `token` is currently registered.
    #[must_use]
    pub fn contains(&self, token: HandleToken) -> bool {
        self.entries.read().contains_key(&token.get())
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no handles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.len())
            .finish()
    }
}

fn downcast<T: Any + Send + Sync>(token: HandleToken, entry: Entry) -> Result<Arc<T>, RegistryError> {
    match entry.downcast::<T>() {
        Ok(handle) => Ok(handle),
        Err(_entry) => Err(mismatch::<T>(token)),
    }
}

fn mismatch<T>(token: HandleToken) -> RegistryError {
    RegistryError::KindMismatch {
        token: token.get(),
        expected: type_name::<T>(),
    }
}
