//! Named-event dispatch table.
//!
//! Listeners are registered during startup, then the set is frozen and handed
//! to a [`crate::WebhookEndpoint`], which shares it across request tasks.
//! Freezing replaces every listener list with an immutable slice; after that
//! the set is only ever read, so concurrent dispatch needs no lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Error type returned by listeners.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// One decoded delivery as seen by listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Event name from the provider's event header.
    pub name: String,
    /// Decoded JSON payload.
    pub body: serde_json::Value,
}

/// Receives dispatched signals.
#[async_trait]
pub trait SignalListener: Send + Sync {
    async fn on_signal(&self, signal: &Signal) -> Result<(), ListenerError>;
}

/// Adapts an async closure into a [`SignalListener`]. See [`listener_fn`].
pub struct FnListener<F>(F);

/// Wraps `f` as a listener; `f` receives an owned copy of each signal.
pub fn listener_fn<F, Fut>(f: F) -> FnListener<F>
where
    F: Fn(Signal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    FnListener(f)
}

#[async_trait]
impl<F, Fut> SignalListener for FnListener<F>
where
    F: Fn(Signal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    async fn on_signal(&self, signal: &Signal) -> Result<(), ListenerError> {
        (self.0)(signal.clone()).await
    }
}

/// Signal set errors.
#[derive(Debug, Error)]
pub enum SignalError {
    /// `register` was called after `freeze`. Startup ordering bug.
    #[error("cannot register a listener for '{name}' on a frozen signal set")]
    RegistryFrozen { name: String },

    /// One or more listeners returned an error. Every listener still ran.
    #[error("{failed} of {invoked} listeners for '{name}' failed")]
    ListenerFailed {
        name: String,
        invoked: usize,
        failed: usize,
    },
}

type ListenerRef = Arc<dyn SignalListener>;

enum Listeners {
    Open(HashMap<String, Vec<ListenerRef>>),
    Frozen(HashMap<String, Box<[ListenerRef]>>),
}

/// Event name → ordered listeners.
pub struct SignalSet {
    listeners: Listeners,
}

impl Default for SignalSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSet {
    pub fn new() -> Self {
        Self {
            listeners: Listeners::Open(HashMap::new()),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.listeners, Listeners::Frozen(_))
    }

    /// Appends `listener` to the list for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::RegistryFrozen`] once the set is frozen.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        listener: Arc<dyn SignalListener>,
    ) -> Result<(), SignalError> {
        let name = name.into();
        match &mut self.listeners {
            Listeners::Open(map) => {
                tracing::debug!(signal = %name, "Registering listener");
                map.entry(name).or_default().push(listener);
                Ok(())
            }
            Listeners::Frozen(_) => Err(SignalError::RegistryFrozen { name }),
        }
    }

    /// Makes every listener list immutable and rejects further registration.
    ///
    /// Freezing an already frozen set does nothing.
    pub fn freeze(&mut self) {
        if let Listeners::Open(map) = &mut self.listeners {
            let frozen = std::mem::take(map)
                .into_iter()
                .map(|(name, list)| (name, list.into_boxed_slice()))
                .collect();
            self.listeners = Listeners::Frozen(frozen);
        }
    }

    /// Number of listeners registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners_for(name).len()
    }

    /// Runs every listener for `signal.name` in registration order.
    ///
    /// An unknown name is not an error: providers send many event types and
    /// only a few have listeners. Returns the number of listeners invoked.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::ListenerFailed`] if any listener failed; later
    /// listeners still run.
    pub async fn dispatch(&self, signal: &Signal) -> Result<usize, SignalError> {
        let listeners = self.listeners_for(&signal.name);
        if listeners.is_empty() {
            tracing::debug!(signal = %signal.name, "No listeners registered");
            return Ok(0);
        }

        let mut failed = 0;
        for (index, listener) in listeners.iter().enumerate() {
            if let Err(e) = listener.on_signal(signal).await {
                failed += 1;
                tracing::error!(signal = %signal.name, listener = index, error = %e, "Listener failed");
            }
        }

        if failed > 0 {
            return Err(SignalError::ListenerFailed {
                name: signal.name.clone(),
                invoked: listeners.len(),
                failed,
            });
        }
        Ok(listeners.len())
    }

    fn listeners_for(&self, name: &str) -> &[ListenerRef] {
        let listeners = match &self.listeners {
            Listeners::Open(map) => map.get(name).map(Vec::as_slice),
            Listeners::Frozen(map) => map.get(name).map(|list| &list[..]),
        };
        listeners.unwrap_or(&[])
    }
}
