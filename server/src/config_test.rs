use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn empty_environment_uses_defaults() {
    let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, ServerConfig::default());
    assert_eq!(config.port, 3000);
    assert!(config.database_url.is_none());
    assert_eq!(config.flush_interval, Duration::from_millis(100));
}

#[test]
fn values_override_defaults() {
    let config = ServerConfig::from_lookup(lookup(&[
        ("PORT", "8080"),
        ("DATABASE_URL", "postgres://db/canvas"),
        ("DB_MAX_CONNECTIONS", "12"),
        ("ELEMENT_FLUSH_INTERVAL_MS", " 250 "),
        ("CLIENT_CHANNEL_CAPACITY", "64"),
    ]))
    .unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.database_url.as_deref(), Some("postgres://db/canvas"));
    assert_eq!(config.db_max_connections, 12);
    assert_eq!(config.flush_interval, Duration::from_millis(250));
    assert_eq!(config.client_channel_capacity, 64);
}

#[test]
fn blank_database_url_means_memory_store() {
    let config = ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
    assert!(config.database_url.is_none());
}

#[test]
fn malformed_port_is_rejected() {
    let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "PORT", value: "eighty".into() });
}

#[test]
fn zero_flush_interval_is_rejected() {
    let err = ServerConfig::from_lookup(lookup(&[("ELEMENT_FLUSH_INTERVAL_MS", "0")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "ELEMENT_FLUSH_INTERVAL_MS", .. }));
}

#[test]
fn zero_channel_capacity_is_rejected() {
    assert!(ServerConfig::from_lookup(lookup(&[("CLIENT_CHANNEL_CAPACITY", "0")])).is_err());
}
