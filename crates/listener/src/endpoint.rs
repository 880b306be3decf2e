//! Per-provider ingestion: verify, decode, dispatch.

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::{Provider, ProviderSecret, Signal, SignalSet, WebhookError};

/// Outcome of an accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub event: String,
    /// Listeners invoked; zero when nothing is registered for the event.
    pub listeners: usize,
}

/// Handles deliveries for one provider.
///
/// Owns that provider's secret and a frozen [`SignalSet`]. Shared read-only
/// between request tasks.
pub struct WebhookEndpoint {
    provider: Provider,
    secret: ProviderSecret,
    signals: SignalSet,
}

#[derive(Deserialize)]
struct FormBody {
    payload: String,
}

impl WebhookEndpoint {
    /// Freezes `signals` and binds it to `provider`.
    pub fn new(provider: Provider, secret: ProviderSecret, mut signals: SignalSet) -> Self {
        signals.freeze();
        Self {
            provider,
            secret,
            signals,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    /// Processes one delivery.
    ///
    /// Authentication runs on the raw bytes first; nothing is decoded or
    /// dispatched for a delivery that fails it.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::Unauthorized`] on a signature or token mismatch.
    /// - [`WebhookError::MissingEventName`] without a usable event header.
    /// - [`WebhookError::UnsupportedContentType`] / [`WebhookError::InvalidPayload`]
    ///   when the body cannot be decoded.
    /// - [`WebhookError::Dispatch`] if a listener failed.
    pub async fn handle(
        &self,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<Delivered, WebhookError> {
        let delivery = header_str(headers, self.provider.delivery_header())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = tracing::info_span!(
            "webhook",
            provider = %self.provider,
            event = header_str(headers, self.provider.event_header()).unwrap_or_default(),
            delivery = %delivery,
        );
        self.process(headers, raw_body).instrument(span).await
    }

    async fn process(
        &self,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<Delivered, WebhookError> {
        if let Err(e) = self
            .provider
            .verifier()
            .verify(&self.secret, headers, raw_body)
        {
            tracing::warn!(error = %e, "Rejecting delivery");
            return Err(e.into());
        }

        let event_header = self.provider.event_header();
        let name = header_str(headers, event_header)
            .ok_or(WebhookError::MissingEventName(event_header))?;
        let body = decode_body(headers, raw_body).inspect_err(|e| {
            tracing::warn!(error = %e, "Undecodable delivery");
        })?;

        let signal = Signal {
            name: name.to_string(),
            body,
        };
        let listeners = self.signals.dispatch(&signal).await?;
        tracing::info!(listeners, "Delivery processed");

        Ok(Delivered {
            event: signal.name,
            listeners,
        })
    }
}

/// Non-empty UTF-8 header value.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// Decodes a delivery body according to its content type.
///
/// No content type is treated as JSON. Form bodies carry the JSON document in
/// their `payload` field.
fn decode_body(headers: &HeaderMap, raw_body: &[u8]) -> Result<serde_json::Value, WebhookError> {
    let content_type = match headers.get(CONTENT_TYPE) {
        Some(value) => Some(value.to_str().map_err(|_| {
            WebhookError::UnsupportedContentType(String::from_utf8_lossy(value.as_bytes()).into())
        })?),
        None => None,
    };
    let essence = content_type.map(|value| {
        value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    });

    match essence.as_deref() {
        None | Some("application/json") => serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string())),
        Some("application/x-www-form-urlencoded") => {
            let form: FormBody = serde_urlencoded::from_bytes(raw_body)
                .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
            serde_json::from_str(&form.payload)
                .map_err(|e| WebhookError::InvalidPayload(e.to_string()))
        }
        Some(_) => Err(WebhookError::UnsupportedContentType(
            content_type.unwrap_or_default().to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::{listener_fn, signature_for, AuthError};

    const SECRET: &str = "github";

    fn recording_endpoint(seen: &Arc<Mutex<Vec<Signal>>>) -> WebhookEndpoint {
        let seen = Arc::clone(seen);
        let mut signals = SignalSet::new();
        signals
            .register(
                "push",
                Arc::new(listener_fn(move |signal: Signal| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock().unwrap().push(signal);
                        Ok(())
                    }
                })),
            )
            .unwrap();
        WebhookEndpoint::new(Provider::GitHub, ProviderSecret::new(SECRET), signals)
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[tokio::test]
    async fn test_signed_json_delivery_is_dispatched() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let endpoint = recording_endpoint(&seen);
        let body = br#"{"ref":"refs/heads/main"}"#;
        let signature = signature_for(SECRET.as_bytes(), body).unwrap();
        let map = headers(&[
            ("x-github-event", "push"),
            ("x-hub-signature", signature.as_str()),
            ("content-type", "application/json; charset=utf-8"),
        ]);

        let delivered = endpoint.handle(&map, body).await.unwrap();
        assert_eq!(
            delivered,
            Delivered {
                event: "push".into(),
                listeners: 1
            }
        );
        assert_eq!(seen.lock().unwrap()[0].body, json!({"ref": "refs/heads/main"}));
    }

    #[tokio::test]
    async fn test_bad_signature_is_not_dispatched() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let endpoint = recording_endpoint(&seen);
        let map = headers(&[("x-github-event", "push"), ("x-hub-signature", "sha1=00")]);

        let err = endpoint.handle(&map, b"{}").await.unwrap_err();
        assert!(matches!(
            err,
            WebhookError::Unauthorized(AuthError::InvalidSignature)
        ));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_form_encoded_payload_field() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let endpoint = recording_endpoint(&seen);
        let body = b"payload=%7B%22ref%22%3A%22refs%2Fheads%2Fmain%22%7D";
        let map = headers(&[
            ("x-github-event", "push"),
            ("content-type", "application/x-www-form-urlencoded"),
        ]);

        endpoint.handle(&map, body).await.unwrap();
        assert_eq!(seen.lock().unwrap()[0].body["ref"], "refs/heads/main");
    }

    #[tokio::test]
    async fn test_form_without_payload_field_is_invalid() {
        let endpoint = recording_endpoint(&Arc::new(Mutex::new(Vec::new())));
        let map = headers(&[
            ("x-github-event", "push"),
            ("content-type", "application/x-www-form-urlencoded"),
        ]);
        assert!(matches!(
            endpoint.handle(&map, b"other=1").await,
            Err(WebhookError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_or_empty_event_header() {
        let endpoint = recording_endpoint(&Arc::new(Mutex::new(Vec::new())));
        for map in [HeaderMap::new(), headers(&[("x-github-event", "")])] {
            assert!(matches!(
                endpoint.handle(&map, b"{}").await,
                Err(WebhookError::MissingEventName("x-github-event"))
            ));
        }
    }

    #[tokio::test]
    async fn test_unsupported_content_type() {
        let endpoint = recording_endpoint(&Arc::new(Mutex::new(Vec::new())));
        let map = headers(&[("x-github-event", "push"), ("content-type", "text/plain")]);
        assert!(matches!(
            endpoint.handle(&map, b"{}").await,
            Err(WebhookError::UnsupportedContentType(ct)) if ct == "text/plain"
        ));
    }

    #[tokio::test]
    async fn test_event_without_listeners_succeeds() {
        let endpoint = recording_endpoint(&Arc::new(Mutex::new(Vec::new())));
        let map = headers(&[("x-github-event", "deployment_status")]);
        let delivered = endpoint.handle(&map, b"{}").await.unwrap();
        assert_eq!(delivered.listeners, 0);
    }

    #[test]
    fn test_endpoint_freezes_its_signals() {
        let endpoint = WebhookEndpoint::new(
            Provider::Buildkite,
            ProviderSecret::new("buildkite"),
            SignalSet::new(),
        );
        assert!(endpoint.signals().is_frozen());
        assert_eq!(endpoint.provider(), Provider::Buildkite);
    }
}
