//! Outbound HTTP client to the local connector, grounded on the teacher's
//! `SettlementClient` (same two endpoints, same idempotency-key-per-request
//! convention) but retried with the `backoff` crate's `ExponentialBackoff`
//! instead of `futures_retry`, so the policy can expose the named knobs
//! this spec's connector-notification retry requires.

use crate::types::{PaymentDetailsMessage, SettlementQuantity};
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use std::time::Duration;
use tracing::trace;
use url::Url;
use uuid::Uuid;

/// Policy used when notifying the connector of an incoming settlement:
/// initial 500ms, max 6s between attempts, multiplier 1.5, full jitter,
/// give up after 15 minutes total.
fn connector_notify_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(500),
        max_interval: Duration::from_secs(6),
        multiplier: 1.5,
        randomization_factor: 0.5,
        max_elapsed_time: Some(Duration::from_secs(15 * 60)),
        ..ExponentialBackoff::default()
    }
}

#[derive(Clone)]
pub struct ConnectorClient {
    client: Client,
    base_url: Url,
}

impl ConnectorClient {
    pub fn new(base_url: Url) -> Self {
        ConnectorClient {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client config is valid"),
            base_url,
        }
    }

    /// `POST {connector_url}/accounts/{sid}/messages` carrying our own
    /// `PaymentDetailsMessage`, used during account setup. Retried with the
    /// connector-notification backoff policy.
    pub async fn send_peer_handshake(
        &self,
        sid: &str,
        message: &PaymentDetailsMessage,
    ) -> Result<PaymentDetailsMessage, reqwest::Error> {
        let url = self.accounts_url(sid, "messages");
        retry(connector_notify_backoff(), || async {
            trace!(sid = %sid, "sending peer handshake to connector");
            let body = serde_json::to_vec(message).expect("PaymentDetailsMessage always serializes");
            let response = self
                .client
                .post(url.as_str())
                .header("Content-Type", "application/octet-stream")
                .header("Idempotency-Key", Uuid::new_v4().to_string())
                .body(body)
                .send()
                .await
                .map_err(backoff::Error::transient)?
                .error_for_status()
                .map_err(backoff::Error::transient)?;
            response
                .json::<PaymentDetailsMessage>()
                .await
                .map_err(backoff::Error::transient)
        })
        .await
    }

    /// `POST {connector_url}/accounts/{sid}/settlements` with a fresh
    /// `Idempotency-Key`, used by the Incoming Observer to report a
    /// classified incoming transfer.
    pub async fn notify_incoming_settlement(
        &self,
        sid: &str,
        quantity: &SettlementQuantity,
    ) -> Result<(), reqwest::Error> {
        let url = self.accounts_url(sid, "settlements");
        retry(connector_notify_backoff(), || async {
            trace!(sid = %sid, amount = %quantity.amount, "notifying connector of incoming settlement");
            self.client
                .post(url.as_str())
                .header("Idempotency-Key", Uuid::new_v4().to_string())
                .json(quantity)
                .send()
                .await
                .map_err(backoff::Error::transient)?
                .error_for_status()
                .map_err(backoff::Error::transient)?;
            Ok(())
        })
        .await
    }

    fn accounts_url(&self, sid: &str, suffix: &str) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("connector base URL is not a cannot-be-a-base URL")
            .push("accounts")
            .push(sid)
            .push(suffix);
        url
    }
}
