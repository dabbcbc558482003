use kernel::{
    model::id::ResidentId,
    notification::{NotificationKind, NotificationService},
};
use serde_json::json;

/// Logs every notification and, when a webhook is configured, forwards it
/// as JSON from a detached task.
pub struct WebhookNotificationService {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookNotificationService {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

impl NotificationService for WebhookNotificationService {
    fn notify(&self, recipient: ResidentId, kind: NotificationKind, payload: serde_json::Value) {
        tracing::info!(recipient = %recipient, kind = %kind, %payload, "通知を送信します");

        let Some(url) = self.webhook_url.clone() else {
            return;
        };
        let client = self.client.clone();
        let body = json!({
            "recipient": recipient,
            "kind": kind,
            "payload": payload,
        });
        // 送信失敗は記録するだけで呼び出し元には返さない
        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&body)
                .send()
                .await
                .and_then(|res| res.error_for_status());
            if let Err(e) = result {
                tracing::warn!(error = %e, kind = %kind, recipient = %recipient, "通知の送信に失敗しました");
            }
        });
    }
}
