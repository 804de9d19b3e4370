//! Decoding of raw change notifications
//!
//! Wire shape delivered by the transport:
//!
//! ```text
//! { "eventType": "INSERT" | "UPDATE" | "DELETE", "new": {...}, "old": { "id": ... } }
//! ```
//!
//! Anything that cannot be turned into a well-formed [`ChangeEvent`] becomes
//! a [`NotificationError`]; callers log it and drop the message so a single
//! bad notification never reaches the store.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Entity;
use crate::types::{id_from_value, ChangeEvent, ChangeType};

/// Raw notification envelope as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNotification {
    #[serde(rename = "eventType", alias = "event_type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
}

impl RawNotification {
    pub fn insert<T: Serialize>(entity: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: ChangeType::Insert.to_string(),
            new: Some(serde_json::to_value(entity)?),
            old: None,
        })
    }

    pub fn update<T: Serialize>(entity: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: ChangeType::Update.to_string(),
            new: Some(serde_json::to_value(entity)?),
            old: None,
        })
    }

    pub fn delete(id: &str) -> Self {
        Self {
            event_type: ChangeType::Delete.to_string(),
            new: None,
            old: Some(serde_json::json!({ "id": id })),
        }
    }
}

/// Notification decoding errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("malformed notification envelope: {0}")]
    Malformed(String),
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),
    #[error("{0} notification has no entity payload")]
    MissingPayload(ChangeType),
    #[error("{0} notification has no entity id")]
    MissingId(ChangeType),
    #[error("invalid entity payload: {0}")]
    InvalidEntity(#[from] serde_json::Error),
}

/// Decode a JSON value into a typed change.
pub fn decode_change<T>(value: Value) -> Result<ChangeEvent<T>, NotificationError>
where
    T: Entity + DeserializeOwned,
{
    let raw: RawNotification = serde_json::from_value(value)
        .map_err(|e| NotificationError::Malformed(e.to_string()))?;
    decode_raw(raw)
}

/// Decode an already-parsed envelope into a typed change.
pub fn decode_raw<T>(raw: RawNotification) -> Result<ChangeEvent<T>, NotificationError>
where
    T: Entity + DeserializeOwned,
{
    let change_type = ChangeType::parse(&raw.event_type)
        .ok_or_else(|| NotificationError::UnknownEventType(raw.event_type.clone()))?;

    match change_type {
        ChangeType::Insert | ChangeType::Update => {
            let payload = raw
                .new
                .filter(|v| !v.is_null())
                .ok_or(NotificationError::MissingPayload(change_type))?;
            let entity: T = serde_json::from_value(payload)?;
            if !entity.has_id() {
                return Err(NotificationError::MissingId(change_type));
            }
            Ok(if change_type == ChangeType::Insert {
                ChangeEvent::Insert(entity)
            } else {
                ChangeEvent::Update(entity)
            })
        }
        ChangeType::Delete => {
            let id = raw
                .old
                .as_ref()
                .and_then(|old| old.get("id"))
                .and_then(id_from_value)
                .filter(|id| !id.trim().is_empty())
                .ok_or(NotificationError::MissingId(change_type))?;
            Ok(ChangeEvent::Delete { id })
        }
    }
}
