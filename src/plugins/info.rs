//! Persisted plugin state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::membership::ConfigMap;

/// Prefix of the membership store key holding a plugin's state.
pub const PLUGIN_KEY_PREFIX: &str = "Plugin-";

/// Membership store key of a plugin.
#[must_use]
pub fn plugin_key(name: &str) -> String {
    format!("{PLUGIN_KEY_PREFIX}{name}")
}

/// State of one plugin as stored in the membership store.
///
/// A missing record reads as disabled. Records written by older
/// releases store the flag as a `"true"`/`"false"` string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Whether the plugin is enabled.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub enabled: bool,
    /// Version of the plugin that last changed the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// When the record last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Plugin specific keys, kept untouched.
    #[serde(flatten)]
    pub extra: ConfigMap,
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::String(s) => Ok(s.eq_ignore_ascii_case("true")),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid enabled flag: {other}"))),
    }
}

impl PluginInfo {
    /// Parses a stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has an unusable shape.
    pub fn from_config(config: ConfigMap) -> Result<Self> {
        serde_json::from_value(Value::Object(config))
            .map_err(|e| StoreError::serialization(format!("Invalid plugin record: {e}")).into())
    }

    /// Merges this state into an existing record.
    pub fn merge_into(&self, config: &mut ConfigMap) {
        config.insert(String::from("enabled"), Value::Bool(self.enabled));
        if let Some(version) = &self.version {
            config.insert(String::from("version"), Value::String(version.clone()));
        }
        if let Some(updated_at) = &self.updated_at {
            config.insert(String::from("updated_at"), Value::String(updated_at.to_rfc3339()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ConfigMap {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn test_plugin_key() {
        assert_eq!(plugin_key("ldap"), "Plugin-ldap");
    }

    #[test]
    fn test_missing_record_is_disabled() {
        let info = PluginInfo::from_config(ConfigMap::new()).expect("info");
        assert!(!info.enabled);
        assert!(info.version.is_none());
    }

    #[test]
    fn test_legacy_string_flags() {
        let on = PluginInfo::from_config(record(json!({"enabled": "true", "version": "0.0.1"})))
            .expect("info");
        assert!(on.enabled);
        assert_eq!(on.version.as_deref(), Some("0.0.1"));

        let off = PluginInfo::from_config(record(json!({"enabled": "False"}))).expect("info");
        assert!(!off.enabled);
    }

    #[test]
    fn test_invalid_flag_is_rejected() {
        let result = PluginInfo::from_config(record(json!({"enabled": 3})));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_keeps_other_keys() {
        let mut config = record(json!({"enabled": "true", "domains": ["dom1"]}));
        let info = PluginInfo {
            enabled: false,
            version: Some(String::from("0.0.2")),
            ..PluginInfo::default()
        };
        info.merge_into(&mut config);

        assert_eq!(
            Value::Object(config),
            json!({"enabled": false, "version": "0.0.2", "domains": ["dom1"]})
        );
    }
}
