//! Durable slices of the model and their key/value encoding.
//!
//! Each slice lives under its own key as JSON. Restoring is tolerant: a
//! value that fails to decode is logged and dropped and the in-memory
//! default stays in place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::api_tokens::ApiTokenRegistry;
use crate::mapbox::AccessToken;
use crate::model::{Model, Vehicle};
use crate::notifications::NotificationLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    SelectedVehicle,
    Notifications,
    MapboxToken,
    ApiTokens,
}

impl StorageKey {
    pub const ALL: [Self; 4] = [
        Self::SelectedVehicle,
        Self::Notifications,
        Self::MapboxToken,
        Self::ApiTokens,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectedVehicle => "selectedVehicle",
            Self::Notifications => "evChargingAppNotifications",
            Self::MapboxToken => "mapboxToken",
            Self::ApiTokens => "apiTokens",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("failed to encode '{key}': {message}")]
    Encode { key: &'static str, message: String },
    #[error("failed to decode '{key}': {message}")]
    Decode { key: &'static str, message: String },
}

pub fn encode<T: Serialize + ?Sized>(key: StorageKey, value: &T) -> Result<Vec<u8>, PersistenceError> {
    serde_json::to_vec(value).map_err(|e| PersistenceError::Encode {
        key: key.as_str(),
        message: e.to_string(),
    })
}

pub fn decode<T: DeserializeOwned>(key: StorageKey, bytes: &[u8]) -> Result<T, PersistenceError> {
    serde_json::from_slice(bytes).map_err(|e| PersistenceError::Decode {
        key: key.as_str(),
        message: e.to_string(),
    })
}

/// Bytes to write for `key`, or `None` when the key should be deleted.
pub fn snapshot(model: &Model, key: StorageKey) -> Result<Option<Vec<u8>>, PersistenceError> {
    match key {
        StorageKey::SelectedVehicle => model
            .session
            .selected_vehicle()
            .map(|v| encode(key, v))
            .transpose(),
        StorageKey::Notifications => encode(key, model.session.notifications()).map(Some),
        StorageKey::MapboxToken => model
            .credentials
            .access_token()
            .map(|t| encode(key, t))
            .transpose(),
        StorageKey::ApiTokens => encode(key, model.credentials.api_tokens()).map(Some),
    }
}

/// Applies a stored value to the model. Returns whether anything was
/// restored. A stored ledger is merged behind entries raised since start.
pub fn restore(model: &mut Model, key: StorageKey, bytes: Option<&[u8]>) -> bool {
    let Some(bytes) = bytes.filter(|b| !b.is_empty()) else {
        tracing::debug!(key = key.as_str(), "nothing stored");
        return false;
    };

    let applied = match key {
        StorageKey::SelectedVehicle => {
            decode::<Vehicle>(key, bytes).map(|v| model.session.set_selected_vehicle(Some(v)))
        }
        StorageKey::Notifications => decode::<NotificationLedger>(key, bytes).map(|stored| {
            let merged = model.session.notifications_mut().merge_stored(stored);
            tracing::debug!(merged, "stored notifications merged");
        }),
        StorageKey::MapboxToken => {
            decode::<AccessToken>(key, bytes).map(|t| model.credentials.set_access_token(Some(t)))
        }
        StorageKey::ApiTokens => decode::<ApiTokenRegistry>(key, bytes)
            .map(|tokens| *model.credentials.api_tokens_mut() = tokens),
    };

    match applied {
        Ok(()) => {
            tracing::info!(key = key.as_str(), "restored from storage");
            true
        }
        Err(e) => {
            tracing::warn!(key = key.as_str(), error = %e, "discarding malformed stored value");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::model::{NotificationId, TokenStatus, UnixTimeMs, VehicleId};
    use crate::notifications::{NotificationDraft, Severity};
    use crate::vehicles;

    fn persist_all(model: &Model) -> Vec<(StorageKey, Option<Vec<u8>>)> {
        StorageKey::ALL
            .into_iter()
            .map(|key| (key, snapshot(model, key).unwrap()))
            .collect()
    }

    fn reload(stored: &[(StorageKey, Option<Vec<u8>>)]) -> Model {
        let mut model = Model::default();
        for (key, bytes) in stored {
            restore(&mut model, *key, bytes.as_deref());
        }
        model
    }

    #[test]
    fn test_restart_keeps_vehicle_and_ledger_only() {
        let mut model = Model::default();
        let nexon = vehicles::find(&VehicleId::new("tata-nexon-ev")).unwrap();
        model.session.set_selected_vehicle(Some(nexon.clone()));
        model.session.set_battery_percentage(30);
        model.session.set_user_location(Coordinate::new(80.27, 13.08));
        model.session.notifications_mut().add_at(
            NotificationDraft::new("Hello", "World", Severity::Info),
            NotificationId::new("n1"),
            UnixTimeMs(42),
        );

        let restarted = reload(&persist_all(&model));

        assert_eq!(restarted.session.selected_vehicle(), Some(&nexon));
        assert_eq!(restarted.session.notifications(), model.session.notifications());
        assert_eq!(restarted.session.battery().percentage(), 75);
        assert_eq!(restarted.session.user_location(), crate::config::DEFAULT_LOCATION);
        assert!(restarted.session.stations().is_empty());
    }

    #[test]
    fn test_cleared_vehicle_is_deleted() {
        let model = Model::default();
        assert_eq!(snapshot(&model, StorageKey::SelectedVehicle).unwrap(), None);
    }

    #[test]
    fn test_cleared_ledger_reloads_empty() {
        let mut model = Model::default();
        model
            .session
            .notifications_mut()
            .add(NotificationDraft::new("a", "b", Severity::Success));
        model.session.notifications_mut().clear();

        let restarted = reload(&persist_all(&model));
        assert!(restarted.session.notifications().is_empty());
    }

    #[test]
    fn test_malformed_value_keeps_defaults() {
        let mut model = Model::default();
        assert!(!restore(&mut model, StorageKey::Notifications, Some(b"{not json")));
        assert!(!restore(&mut model, StorageKey::SelectedVehicle, Some(b"[1,2,3]")));
        assert!(!restore(&mut model, StorageKey::MapboxToken, Some(b"\"sk.secret\"")));
        assert!(!restore(&mut model, StorageKey::ApiTokens, None));

        assert!(model.session.notifications().is_empty());
        assert!(model.session.selected_vehicle().is_none());
        assert!(model.credentials.access_token().is_none());
    }

    #[test]
    fn test_restored_token_awaits_validation() {
        let mut model = Model::default();
        assert!(restore(&mut model, StorageKey::MapboxToken, Some(b"\"pk.stored\"")));
        assert_eq!(model.credentials.token_status(), TokenStatus::Validating);
        assert_eq!(model.credentials.access_token().unwrap().expose_secret(), "pk.stored");
    }

    #[test]
    fn test_restores_ledger_written_by_web_dashboard() {
        let stored = br#"[{"id":"1712345678901","title":"Low Battery Warning","message":"Your battery is at 20%. Consider charging soon.","type":"warning","timestamp":"2024-04-05T19:34:38.901Z","read":false}]"#;
        let mut model = Model::default();

        assert!(restore(&mut model, StorageKey::Notifications, Some(stored)));

        let restored: Vec<_> = model.session.notifications().iter().collect();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].severity, Severity::Warning);
        assert_eq!(restored[0].timestamp, UnixTimeMs(1_712_345_678_901));
    }

    #[test]
    fn test_restores_api_tokens_written_by_web_dashboard() {
        let stored = br#"[{"id":"1","name":"ci","token":"tk_abc","createdAt":"2024-04-05T19:34:38.901Z","lastUsed":null}]"#;
        let mut model = Model::default();

        assert!(restore(&mut model, StorageKey::ApiTokens, Some(stored)));

        let token = model.credentials.api_tokens().iter().next().unwrap();
        assert_eq!(token.created_at, UnixTimeMs(1_712_345_678_901));
        assert_eq!(token.token.expose_secret(), "tk_abc");
    }

    #[test]
    fn test_restored_ledger_keeps_alerts_raised_since_start() {
        let mut before = Model::default();
        before.session.notifications_mut().add_at(
            NotificationDraft::new("Stored", "from last run", Severity::Info),
            NotificationId::new("stored"),
            UnixTimeMs(1),
        );
        let stored = snapshot(&before, StorageKey::Notifications).unwrap();

        let mut model = Model::default();
        let alert = model.session.set_battery_percentage(15).unwrap();
        model.session.notifications_mut().add(alert);
        assert!(restore(&mut model, StorageKey::Notifications, stored.as_deref()));

        let titles: Vec<_> = model
            .session
            .notifications()
            .iter()
            .map(|n| n.title.as_str())
            .collect();
        assert_eq!(titles, ["Low Battery Warning", "Stored"]);
    }
}
