// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Best-effort completion notification

use std::time::Duration;

/// Notification sink contract.
///
/// Delivery is fire-and-forget: implementations swallow every failure, so a
/// dead webhook endpoint can never change job status.
pub trait NotificationSink: Send + Sync {
    fn post(&self, url: &str, payload: &serde_json::Value);
}

/// Webhook notifier over a blocking HTTP client with a short timeout.
pub struct WebhookNotifier {
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl NotificationSink for WebhookNotifier {
    fn post(&self, url: &str, payload: &serde_json::Value) {
        match self.client.post(url).json(payload).send() {
            Ok(response) => {
                tracing::info!(url, status = %response.status(), "webhook delivered");
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "webhook delivery failed");
            }
        }
    }
}
