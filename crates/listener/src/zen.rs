//! GitHub `ping` handling.
//!
//! GitHub sends a `ping` with a line of zen when a hook is created. The most
//! recent one is kept in memory and served from `GET /zen`, which makes it a
//! quick end-to-end check of secret configuration.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::{ListenerError, Signal, SignalListener};

const BLANK_CANVAS: &str = "The mind is a blank canvas.";

/// Latest zen received from GitHub.
#[derive(Debug)]
pub struct Mind {
    zen: RwLock<String>,
}

impl Default for Mind {
    fn default() -> Self {
        Self {
            zen: RwLock::new(BLANK_CANVAS.to_string()),
        }
    }
}

impl Mind {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn zen(&self) -> String {
        self.zen.read().await.clone()
    }

    pub async fn remember(&self, zen: impl Into<String>) {
        *self.zen.write().await = zen.into();
    }
}

#[derive(Debug, Deserialize)]
struct Ping {
    zen: String,
}

/// Stores the zen of every `ping` in a shared [`Mind`].
pub struct PingListener {
    mind: Arc<Mind>,
}

impl PingListener {
    pub fn new(mind: Arc<Mind>) -> Self {
        Self { mind }
    }
}

#[async_trait]
impl SignalListener for PingListener {
    async fn on_signal(&self, signal: &Signal) -> Result<(), ListenerError> {
        let ping = Ping::deserialize(&signal.body)?;
        tracing::info!(zen = %ping.zen, "Received ping");
        self.mind.remember(ping.zen).await;
        Ok(())
    }
}
