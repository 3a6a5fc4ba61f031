use api_contract::{ConnectionDto, ConnectionRequest, UpdateConnectionRequest};
use domain::{Connection, ConnectionDraft, ConnectionKind, Scheme};

fn connection() -> Connection {
    let mut connection = Connection::from_draft(
        "conn-1",
        ConnectionDraft {
            name: "rack-a".to_string(),
            host: "10.0.1.50".to_string(),
            port: 443,
            protocol: Scheme::Https,
            username: "root".to_string(),
            secret: "calvin".to_string(),
            kind: ConnectionKind::Idrac,
            enabled: true,
            poll_interval_seconds: 30,
        },
    );
    connection.last_polled_at_ms = Some(1_700_000_000_000);
    connection
}

#[test]
fn connection_dto_omits_secret() {
    let value = serde_json::to_value(ConnectionDto::from(connection())).expect("serialize");
    assert_eq!(value["id"], "conn-1");
    assert_eq!(value["type"], "idrac");
    assert_eq!(value["pollIntervalSeconds"], 30);
    assert_eq!(value["lastPolledAt"], 1_700_000_000_000_i64);
    assert!(value.get("secret").is_none());
    assert!(value.get("password").is_none());
    assert!(!value.to_string().contains("calvin"));
}

#[test]
fn connection_request_accepts_minimal_body() {
    let payload = r#"{"host":"10.0.1.51","username":"admin","password":"pw"}"#;
    let req: ConnectionRequest = serde_json::from_str(payload).expect("parse");
    assert_eq!(req.host, "10.0.1.51");
    assert_eq!(req.password, "pw");
    assert!(req.name.is_none());
    assert!(req.port.is_none());
    assert!(req.kind.is_none());
    assert!(req.poll_interval_seconds.is_none());
}

#[test]
fn connection_request_accepts_legacy_names() {
    let payload = r#"{
        "name": "ilo-7",
        "host": "10.0.1.52",
        "port": 8443,
        "protocol": "https",
        "username": "Administrator",
        "secret": "pw",
        "kind": "ilo",
        "pollInterval": 120
    }"#;
    let req: ConnectionRequest = serde_json::from_str(payload).expect("parse");
    assert_eq!(req.kind, Some(ConnectionKind::Ilo));
    assert_eq!(req.password, "pw");
    assert_eq!(req.poll_interval_seconds, Some(120));
    assert_eq!(req.port, Some(8443));
}

#[test]
fn update_request_leaves_missing_fields_empty() {
    let req: UpdateConnectionRequest =
        serde_json::from_str(r#"{"enabled":false}"#).expect("parse");
    assert_eq!(req.enabled, Some(false));
    assert!(req.name.is_none());
    assert!(req.password.is_none());
    assert!(req.poll_interval_seconds.is_none());
}
