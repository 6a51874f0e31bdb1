//! Best-effort push delivery through an Expo-compatible gateway.
//!
//! Device tokens live in a process-local map and are lost on restart. Sends
//! are spawned after the triggering transaction commits; a failed send is
//! logged and dropped, never retried.

use std::collections::HashMap;
use std::sync::Arc;

use derive_more::Display;
use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::PushConfig;

#[derive(Debug, Display)]
pub enum PushError {
    #[display(fmt = "push request failed: {}", _0)]
    Request(reqwest::Error),

    #[display(fmt = "push gateway returned HTTP {}", _0)]
    HttpStatus(u16),

    #[display(fmt = "push gateway rejected message: {}", _0)]
    Rejected(String),
}

impl std::error::Error for PushError {}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        PushError::Request(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    sound: &'static str,
    badge: u32,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    data: &'a serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceToken {
    pub token: String,
    pub platform: String,
}

#[derive(Clone)]
pub struct PushService {
    client: reqwest::Client,
    config: PushConfig,
    tokens: Arc<RwLock<HashMap<Uuid, DeviceToken>>>,
}

impl PushService {
    pub fn new(config: PushConfig) -> Result<Self, PushError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            tokens: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Remembers the user's device. Returns `false` if the same token was
    /// already registered for that user.
    pub async fn register_token(&self, user_id: Uuid, token: String, platform: String) -> bool {
        let mut tokens = self.tokens.write().await;
        if tokens.get(&user_id).map(|t| t.token == token).unwrap_or(false) {
            return false;
        }
        info!("registered push token for user {} ({})", user_id, platform);
        tokens.insert(user_id, DeviceToken { token, platform });
        true
    }

    pub async fn token_for(&self, user_id: &Uuid) -> Option<String> {
        self.tokens.read().await.get(user_id).map(|t| t.token.clone())
    }

    /// Sends `message` to every recipient with a registered device, in the
    /// background. Returns immediately.
    pub fn dispatch(&self, recipients: Vec<Uuid>, message: PushMessage) {
        if !self.config.enabled || recipients.is_empty() {
            debug!(
                "push disabled or no recipients, skipping '{}' ({} recipients)",
                message.title,
                recipients.len()
            );
            return;
        }
        let service = self.clone();
        tokio::spawn(async move {
            let sent = service.deliver_all(&recipients, &message).await;
            info!("push '{}' sent: {}/{}", message.title, sent, recipients.len());
        });
    }

    /// Sends to all recipients concurrently; returns the number accepted.
    pub async fn deliver_all(&self, recipients: &[Uuid], message: &PushMessage) -> usize {
        let deliveries = recipients.iter().map(|user_id| async move {
            let token = self.token_for(user_id).await?;
            match self.send(&token, message).await {
                Ok(()) => Some(()),
                Err(err) => {
                    warn!("push to user {} failed: {}", user_id, err);
                    None
                }
            }
        });
        join_all(deliveries).await.into_iter().flatten().count()
    }

    pub async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        let payload = GatewayRequest {
            to: token,
            title: &message.title,
            body: &message.body,
            sound: "default",
            badge: 1,
            data: &message.data,
        };
        let response = self
            .client
            .post(&self.config.gateway_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PushError::HttpStatus(response.status().as_u16()));
        }
        let body: serde_json::Value = response.json().await?;
        delivery_status(&body)
    }
}

/// Reads the per-message ticket from a gateway reply. The ticket is either
/// `data` itself or the first element when `data` is a list.
pub fn delivery_status(body: &serde_json::Value) -> Result<(), PushError> {
    let ticket = match &body["data"] {
        serde_json::Value::Array(items) => items.first().cloned().unwrap_or_default(),
        other => other.clone(),
    };
    match ticket["status"].as_str() {
        Some("ok") => Ok(()),
        _ => Err(PushError::Rejected(
            ticket["message"].as_str().unwrap_or("unknown status").to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> PushService {
        PushService::new(PushConfig::default()).unwrap()
    }

    #[test]
    fn ok_ticket_in_list_or_object() {
        assert!(delivery_status(&json!({"data": [{"status": "ok", "id": "x"}]})).is_ok());
        assert!(delivery_status(&json!({"data": {"status": "ok"}})).is_ok());
    }

    #[test]
    fn error_ticket_carries_gateway_message() {
        let err = delivery_status(&json!({
            "data": [{"status": "error", "message": "DeviceNotRegistered"}]
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "push gateway rejected message: DeviceNotRegistered"
        );
        assert!(delivery_status(&json!({"errors": []})).is_err());
    }

    #[test]
    fn gateway_body_shape() {
        let data = json!({"type": "event_edited"});
        let req = GatewayRequest {
            to: "ExponentPushToken[abc]",
            title: "Event Updated",
            body: "changed",
            sound: "default",
            badge: 1,
            data: &data,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["to"], "ExponentPushToken[abc]");
        assert_eq!(v["badge"], 1);
        assert_eq!(v["data"]["type"], "event_edited");
    }

    #[tokio::test]
    async fn registering_same_token_twice_is_a_no_op() {
        let push = service();
        let user = Uuid::new_v4();
        assert!(push.register_token(user, "tok-1".into(), "ios".into()).await);
        assert!(!push.register_token(user, "tok-1".into(), "ios".into()).await);
        assert!(push.register_token(user, "tok-2".into(), "android".into()).await);
        assert_eq!(push.token_for(&user).await.as_deref(), Some("tok-2"));
    }

    #[tokio::test]
    async fn users_without_tokens_are_skipped() {
        let push = service();
        let message = PushMessage {
            title: "t".into(),
            body: "b".into(),
            data: serde_json::Value::Null,
        };
        assert_eq!(push.deliver_all(&[Uuid::new_v4(), Uuid::new_v4()], &message).await, 0);
    }
}
