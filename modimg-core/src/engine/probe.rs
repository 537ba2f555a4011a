//! Lazily probed optional backends.
//!
//! Engines wrapping an optional model runtime probe for it on first use and
//! remember the outcome for the lifetime of the engine instance. The cached
//! value is owned by the engine, so two engines never share a probe and tests
//! can inject fakes through the loader.

use std::fmt;
use std::sync::{Arc, OnceLock};

/// Loaded backend, or the reason it could not be loaded.
pub type ProbeOutcome<T: ?Sized> = std::result::Result<Arc<T>, String>;

/// Runs a backend loader at most once and caches the outcome.
pub struct BackendProbe<T: ?Sized> {
    loader: Box<dyn Fn() -> ProbeOutcome<T> + Send + Sync>,
    outcome: OnceLock<ProbeOutcome<T>>,
}

impl<T: ?Sized + 'static> BackendProbe<T> {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> ProbeOutcome<T> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            outcome: OnceLock::new(),
        }
    }

    /// A probe that always yields `backend`.
    pub fn ready(backend: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::new(move || Ok(Arc::clone(&backend)))
    }

    /// A probe that always reports `reason`.
    pub fn missing(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(move || Err(reason.clone()))
    }

    /// Run the loader on first call; later calls return the cached outcome.
    pub fn get(&self) -> &ProbeOutcome<T> {
        self.outcome.get_or_init(|| (self.loader)())
    }

    pub fn is_probed(&self) -> bool {
        self.outcome.get().is_some()
    }
}

impl<T: ?Sized> fmt::Debug for BackendProbe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.outcome.get() {
            None => "unprobed",
            Some(Ok(_)) => "loaded",
            Some(Err(_)) => "missing",
        };
        f.debug_struct("BackendProbe").field("state", &state).finish()
    }
}
