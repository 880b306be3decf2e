//! Checkbridge webhook infrastructure.
//!
//! Receives deliveries from GitHub and Buildkite over HTTP, authenticates them
//! against a per-provider secret, decodes the body, and fans the named event
//! out to the listeners registered for it.
//!
//! ## Request Flow
//!
//! | Step | Component | Failure |
//! |------|-----------|---------|
//! | Route `/webhooks/{provider}` | [`router`] | 404 |
//! | Authenticate raw body | [`Verifier`] | 401, plaintext diagnostic |
//! | Read event-name header | [`WebhookEndpoint`] | 400 |
//! | Decode JSON or form `payload` | [`WebhookEndpoint`] | 415 / 400 |
//! | Dispatch to listeners | [`SignalSet`] | 500 if a listener failed |
//!
//! An event with no listeners is accepted with 200; most provider events are
//! of no interest.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport, authentication, and payload decoding live
//! here. What a listener does with a [`Signal`] is the binary's concern; this
//! crate knows nothing about check runs.

mod endpoint;
mod error;
mod secret;
mod server;
mod signals;
mod verify;
mod zen;

pub use endpoint::{Delivered, WebhookEndpoint};
pub use error::WebhookError;
pub use secret::{resolve_secret, resolve_secret_with, ProviderSecret, SecretError};
pub use server::{router, AppState};
pub use signals::{listener_fn, FnListener, ListenerError, Signal, SignalError, SignalListener, SignalSet};
pub use verify::{signature_for, AuthError, Provider, Verifier};
pub use zen::{Mind, PingListener};
