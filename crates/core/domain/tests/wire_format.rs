use domain::redfish::{ComputerSystem, Thermal};
use domain::{Connection, ConnectionKind, Scheme};

#[test]
fn connection_accepts_legacy_field_names() {
    let raw = r#"{
        "id": "conn-1700000000000-abc",
        "name": "r740-01",
        "host": "10.0.1.50",
        "port": 443,
        "protocol": "https",
        "username": "root",
        "password": "calvin",
        "type": "ipmi",
        "enabled": true,
        "pollInterval": 60
    }"#;
    let connection: Connection = serde_json::from_str(raw).expect("legacy connection");
    assert_eq!(connection.secret, "calvin");
    assert_eq!(connection.kind, ConnectionKind::IpmiViaRedfish);
    assert_eq!(connection.poll_interval_seconds, 60);
    assert_eq!(connection.protocol, Scheme::Https);
    assert!(connection.last_polled_at_ms.is_none());
}

#[test]
fn connection_serializes_with_current_field_names() {
    let raw = r#"{
        "id": "conn-1",
        "name": "ilo",
        "host": "10.0.1.51",
        "port": 443,
        "protocol": "https",
        "username": "admin",
        "secret": "s3cret",
        "kind": "ilo",
        "enabled": false,
        "pollIntervalSeconds": 30,
        "lastPolledAt": 1700000000000,
        "lastError": "redfish api error: 401 Unauthorized"
    }"#;
    let connection: Connection = serde_json::from_str(raw).expect("connection");
    let value = serde_json::to_value(&connection).expect("serialize");
    assert_eq!(value["secret"], "s3cret");
    assert_eq!(value["kind"], "ilo");
    assert_eq!(value["pollIntervalSeconds"], 30);
    assert_eq!(value["lastPolledAt"], 1_700_000_000_000_i64);
    assert!(value.get("password").is_none());
}

#[test]
fn redfish_documents_tolerate_missing_fields() {
    let system: ComputerSystem =
        serde_json::from_str(r#"{"PowerState":"On","Status":{"Health":"OK"}}"#)
            .expect("system");
    assert_eq!(system.power_state.as_deref(), Some("On"));
    assert!(system.manufacturer.is_none());

    let thermal: Thermal = serde_json::from_str(
        r#"{"Temperatures":[{"Name":"CPU1 Temp","ReadingCelsius":61}]}"#,
    )
    .expect("thermal");
    assert_eq!(thermal.temperatures.len(), 1);
    assert!(thermal.fans.is_empty());
}
