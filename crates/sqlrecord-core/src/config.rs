//! Connection configuration.
//!
//! A [`Config`] is an ordinary value handed to the connection registry. It
//! holds the named connection strings, the default connection name, the
//! optional statement logger and the date class used to materialize
//! timestamps.

use crate::Result;
use crate::datetime::{DateClass, DateTime};
use crate::error::{ConfigErrorKind, Error};
use crate::logger::Logger;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of the default connection until one is configured.
pub const DEFAULT_CONNECTION: &str = "development";

/// The date class timestamps are materialized through.
#[derive(Clone, Copy)]
pub struct DateClassDescriptor {
    name: &'static str,
    parse: fn(&str, &str) -> Option<DateTime>,
}

impl DateClassDescriptor {
    pub fn of<D>() -> Self
    where
        D: DateClass + Into<DateTime> + 'static,
    {
        Self {
            name: std::any::type_name::<D>(),
            parse: parse_with::<D>,
        }
    }

    /// Type name of the date class.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build a value of the date class from `input` laid out as `pattern`.
    pub fn parse(&self, pattern: &str, input: &str) -> Option<DateTime> {
        (self.parse)(pattern, input)
    }
}

impl Default for DateClassDescriptor {
    fn default() -> Self {
        Self::of::<DateTime>()
    }
}

impl fmt::Debug for DateClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DateClassDescriptor").field(&self.name).finish()
    }
}

fn parse_with<D: DateClass + Into<DateTime>>(pattern: &str, input: &str) -> Option<DateTime> {
    D::create_from_format(pattern, input).map(Into::into)
}

/// Connection list, default connection, logging and date class.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    default_connection: String,
    connections: BTreeMap<String, String>,
    logging: bool,
    #[serde(skip)]
    logger: Option<Arc<dyn Logger>>,
    #[serde(skip)]
    date_class: DateClassDescriptor,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_connection: DEFAULT_CONNECTION.to_string(),
            connections: BTreeMap::new(),
            logging: false,
            logger: None,
            date_class: DateClassDescriptor::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("default_connection", &self.default_connection)
            .field("connections", &self.connections.keys().collect::<Vec<_>>())
            .field("logging", &self.logging)
            .field("logger", &self.logger.is_some())
            .field("date_class", &self.date_class)
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON document such as
    /// `{"default_connection": "test", "connections": {"test": "sqlite://:memory:"}}`.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        if let Some(connections) = value.get("connections") {
            let well_formed = connections
                .as_object()
                .is_some_and(|map| map.values().all(serde_json::Value::is_string));
            if !well_formed {
                return Err(Error::config(
                    ConfigErrorKind::InvalidConnections,
                    "Connections must be a map of connection names to connection strings",
                ));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_json_value(serde_json::from_str(text)?)
    }

    /// Replace the connection list.
    ///
    /// `default` changes the default connection name; without it the current
    /// default is kept.
    pub fn set_connections<I, K, V>(&mut self, connections: I, default: Option<&str>) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.connections = connections
            .into_iter()
            .map(|(name, url)| (name.into(), url.into()))
            .collect();
        if let Some(default) = default {
            self.default_connection = default.to_string();
        }
        self
    }

    /// Add or replace one named connection.
    pub fn add_connection(&mut self, name: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.connections.insert(name.into(), url.into());
        self
    }

    pub fn connections(&self) -> &BTreeMap<String, String> {
        &self.connections
    }

    /// Connection string registered under `name`.
    pub fn get_connection(&self, name: &str) -> Option<&str> {
        self.connections.get(name).map(String::as_str)
    }

    pub fn set_default_connection(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_connection = name.into();
        self
    }

    pub fn default_connection(&self) -> &str {
        &self.default_connection
    }

    /// Connection string of the default connection.
    pub fn default_connection_string(&self) -> Option<&str> {
        self.get_connection(&self.default_connection)
    }

    pub fn set_logging(&mut self, enabled: bool) -> &mut Self {
        self.logging = enabled;
        self
    }

    pub fn logging(&self) -> bool {
        self.logging
    }

    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) -> &mut Self {
        self.logger = Some(logger);
        self
    }

    pub fn logger(&self) -> Option<&Arc<dyn Logger>> {
        self.logger.as_ref()
    }

    /// Use `D` to materialize timestamps read from the database.
    pub fn set_date_class<D>(&mut self) -> &mut Self
    where
        D: DateClass + Into<DateTime> + 'static,
    {
        self.date_class = DateClassDescriptor::of::<D>();
        self
    }

    pub fn date_class(&self) -> DateClassDescriptor {
        self.date_class
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_default_connection_is_development() {
        let config = Config::new();
        assert_eq!(config.default_connection(), "development");
        assert_eq!(config.default_connection_string(), None);
    }

    #[test]
    fn test_set_connections_keeps_default_unless_given() {
        let mut config = Config::new();
        config.set_connections([("development", "mysql://localhost/dev")], None);
        assert_eq!(config.default_connection(), "development");
        assert_eq!(
            config.default_connection_string(),
            Some("mysql://localhost/dev")
        );

        config.set_connections(
            [("development", "mysql://localhost/dev"), ("test", "sqlite://:memory:")],
            Some("test"),
        );
        assert_eq!(config.default_connection(), "test");
        assert_eq!(config.default_connection_string(), Some("sqlite://:memory:"));
    }

    #[test]
    fn test_get_connection_unknown_is_none() {
        let mut config = Config::new();
        config.add_connection("mysql", "mysql://localhost/test");
        assert_eq!(config.get_connection("mysql"), Some("mysql://localhost/test"));
        assert_eq!(config.get_connection("nope"), None);
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json_str(
            r#"{"default_connection": "test", "logging": true,
                "connections": {"test": "sqlite://:memory:"}}"#,
        )
        .expect("valid config");
        assert_eq!(config.default_connection(), "test");
        assert!(config.logging());
        assert_eq!(config.default_connection_string(), Some("sqlite://:memory:"));
    }

    #[test]
    fn test_from_json_rejects_non_map_connections() {
        let err = Config::from_json_value(serde_json::json!({"connections": "sqlite://x"}))
            .expect_err("connections must be a map");
        assert!(matches!(
            err,
            Error::Config(ref c) if c.kind == ConfigErrorKind::InvalidConnections
        ));

        let err = Config::from_json_value(serde_json::json!({"connections": {"a": 1}}))
            .expect_err("connection strings must be strings");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_logger_is_stored() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let mut config = Config::new();
        config
            .set_logging(true)
            .set_logger(Arc::new(move |_: &str| *counter.lock().expect("lock") += 1));
        if let Some(logger) = config.logger() {
            logger.log("SELECT 1");
        }
        assert_eq!(*seen.lock().expect("lock"), 1);
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Stamp(DateTime);

    impl DateClass for Stamp {
        fn format(&self, pattern: &str) -> String {
            self.0.format(pattern)
        }

        fn create_from_format(pattern: &str, input: &str) -> Option<Self> {
            DateTime::create_from_format(pattern, input).map(|mut dt| {
                dt = dt.with_micro(1);
                Stamp(dt)
            })
        }
    }

    impl From<Stamp> for DateTime {
        fn from(stamp: Stamp) -> Self {
            stamp.0
        }
    }

    #[test]
    fn test_custom_date_class() {
        let mut config = Config::new();
        assert!(config.date_class().name().ends_with("DateTime"));
        config.set_date_class::<Stamp>();
        assert!(config.date_class().name().ends_with("Stamp"));
        let parsed = config
            .date_class()
            .parse("Y-m-d H:i:s", "2009-01-01 01:01:01")
            .expect("parses");
        assert_eq!(parsed.micro(), 1);
    }
}
