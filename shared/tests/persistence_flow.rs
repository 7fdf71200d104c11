use assert_matches::assert_matches;
use crux_core::testing::AppTester;
use crux_kv::KeyValueOperation;
use ev_dashboard::capabilities::Position;
use ev_dashboard::config::DEFAULT_LOCATION;
use ev_dashboard::model::{TokenStatus, VehicleCategory, VehicleId};
use ev_dashboard::persistence::{self, StorageKey};
use ev_dashboard::vehicles::VehicleFilter;
use ev_dashboard::{App, Effect, Event, Model};

fn kv_operations(effects: Vec<Effect>) -> Vec<KeyValueOperation> {
    effects
        .into_iter()
        .filter_map(|e| match e {
            Effect::KeyValue(request) => Some(request.operation),
            _ => None,
        })
        .collect()
}

#[test]
fn startup_reads_every_durable_key() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(Event::AppStarted, &mut model);
    let mut keys: Vec<String> = kv_operations(update.effects)
        .into_iter()
        .filter_map(|op| match op {
            KeyValueOperation::Get { key } => Some(key),
            _ => None,
        })
        .collect();
    keys.sort();

    assert_eq!(
        keys,
        ["apiTokens", "evChargingAppNotifications", "mapboxToken", "selectedVehicle"]
    );
}

#[test]
fn saving_and_clearing_vehicle_writes_and_deletes() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(
        Event::VehicleSaved(Some(VehicleId::new("ather-450x"))),
        &mut model,
    );
    let ops = kv_operations(update.effects);
    assert_matches!(&ops[..], [KeyValueOperation::Set { key, value }] if key == "selectedVehicle" && !value.is_empty());
    assert_eq!(
        model.session.selected_vehicle().map(|v| v.display_name()),
        Some("Ather 450X".to_string())
    );

    let update = app.update(Event::VehicleSaved(None), &mut model);
    let ops = kv_operations(update.effects);
    assert_matches!(&ops[..], [KeyValueOperation::Delete { key }] if key == "selectedVehicle");
    assert!(model.session.selected_vehicle().is_none());
    assert_eq!(
        model.active_toast.as_ref().and_then(|t| t.description.clone()),
        Some("Your vehicle selection has been cleared.".to_string())
    );
}

#[test]
fn unknown_vehicle_is_not_saved() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(Event::VehicleSaved(Some(VehicleId::new("nope"))), &mut model);

    assert!(kv_operations(update.effects).is_empty());
    assert!(model.session.selected_vehicle().is_none());
}

#[test]
fn restart_restores_vehicle_but_not_session_state() {
    let app = AppTester::<App, Effect>::default();
    let mut before = Model::default();
    app.update(
        Event::VehicleSaved(Some(VehicleId::new("tata-nexon-ev"))),
        &mut before,
    );
    app.update(Event::BatteryLevelSet(15), &mut before);
    app.update(
        Event::CurrentLocationReceived(Ok(Position {
            latitude: 13.08,
            longitude: 80.27,
            accuracy_m: None,
        })),
        &mut before,
    );
    let station = before.session.stations()[0].id.clone();
    app.update(Event::StationSelected(station), &mut before);
    assert!(before.session.selected_station().is_some());
    assert_ne!(before.session.user_location(), DEFAULT_LOCATION);

    let stored: Vec<_> = StorageKey::ALL
        .into_iter()
        .map(|key| (key, persistence::snapshot(&before, key).unwrap()))
        .collect();

    let mut after = Model::default();
    app.update(Event::AppStarted, &mut after);
    for (key, bytes) in stored {
        app.update(Event::StorageLoaded { key, result: Ok(bytes) }, &mut after);
    }

    assert_eq!(after.session.selected_vehicle(), before.session.selected_vehicle());
    assert_eq!(after.session.notifications(), before.session.notifications());
    assert_eq!(after.session.battery().percentage(), 75);
    assert!(after.session.stations().is_empty());
    assert!(after.session.selected_station().is_none());
    assert!(after.session.route().is_none());
    assert_eq!(after.session.user_location(), DEFAULT_LOCATION);
}

#[test]
fn stored_token_is_probed_on_restore() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(
        Event::StorageLoaded {
            key: StorageKey::MapboxToken,
            result: Ok(Some(br#""pk.saved""#.to_vec())),
        },
        &mut model,
    );

    assert!(update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
    assert_eq!(model.credentials.token_status(), TokenStatus::Validating);
}

#[test]
fn malformed_or_failed_reads_keep_defaults() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(
        Event::StorageLoaded {
            key: StorageKey::Notifications,
            result: Ok(Some(b"not json".to_vec())),
        },
        &mut model,
    );
    app.update(
        Event::StorageLoaded {
            key: StorageKey::SelectedVehicle,
            result: Err("storage unavailable".into()),
        },
        &mut model,
    );

    assert!(model.session.notifications().is_empty());
    assert!(model.session.selected_vehicle().is_none());
}

#[test]
fn clearing_the_token_deletes_it() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(Event::AccessTokenSubmitted("pk.one".into()), &mut model);

    let update = app.update(Event::AccessTokenSubmitted(String::new()), &mut model);

    let ops = kv_operations(update.effects);
    assert_matches!(&ops[..], [KeyValueOperation::Delete { key }] if key == "mapboxToken");
    assert_eq!(model.credentials.token_status(), TokenStatus::Missing);
}

#[test]
fn api_token_lifecycle_is_persisted() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(
        Event::ApiTokenCreateRequested { name: "  fleet sync ".into() },
        &mut model,
    );
    assert_matches!(&kv_operations(update.effects)[..], [KeyValueOperation::Set { key, .. }] if key == "apiTokens");

    let view = app.view(&model);
    assert_eq!(view.api_tokens.len(), 1);
    let token = &view.api_tokens[0];
    assert_eq!(token.name, "fleet sync");
    assert!(token.token.expose_secret().starts_with("tk_"));
    assert_eq!(token.token.expose_secret().len(), 35);

    let update = app.update(Event::ApiTokenCreateRequested { name: " ".into() }, &mut model);
    assert!(kv_operations(update.effects).is_empty());
    assert_eq!(model.credentials.api_tokens().len(), 1);

    let id = token.id.clone();
    app.update(Event::ApiTokenUsed(id.clone()), &mut model);
    assert!(model.credentials.api_tokens().iter().next().unwrap().last_used.is_some());

    let update = app.update(Event::ApiTokenDeleted(id), &mut model);
    assert_eq!(kv_operations(update.effects).len(), 1);
    assert!(model.credentials.api_tokens().is_empty());
}

#[test]
fn vehicle_filter_narrows_catalog() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    let all = app.view(&model).vehicles.len();

    app.update(
        Event::VehicleFilterChanged(VehicleFilter::Only(VehicleCategory::TwoWheeler)),
        &mut model,
    );

    let view = app.view(&model);
    assert!(view.vehicles.len() < all);
    assert!(view
        .vehicles
        .iter()
        .all(|v| v.category == VehicleCategory::TwoWheeler));
}

#[test]
fn alert_raised_before_load_survives_restore() {
    let app = AppTester::<App, Effect>::default();
    let mut previous = Model::default();
    app.update(Event::TestNotificationRequested, &mut previous);
    let stored = persistence::snapshot(&previous, StorageKey::Notifications).unwrap();

    let mut model = Model::default();
    app.update(Event::AppStarted, &mut model);
    app.update(Event::BatteryLevelSet(15), &mut model);
    let update = app.update(
        Event::StorageLoaded {
            key: StorageKey::Notifications,
            result: Ok(stored),
        },
        &mut model,
    );

    let titles: Vec<_> = model
        .session
        .notifications()
        .iter()
        .map(|n| n.title.clone())
        .collect();
    assert_eq!(titles.len(), 2);
    assert_eq!(titles[0], "Low Battery Warning");
    assert_matches!(
        &kv_operations(update.effects)[..],
        [KeyValueOperation::Set { key, .. }] if key == "evChargingAppNotifications"
    );
}
