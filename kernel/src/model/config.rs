use std::collections::HashMap;

use chrono::Duration;
use derive_new::new;

/// One row of the access settings table.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct ConfigEntry {
    pub key: String,
    pub value: i64,
    pub description: String,
}

/// Threshold names understood by the access core, with their deployment defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    MaxAuthorizationsPerFamily,
    MaxExtensionHours,
    MaxVisitHours,
    ExitGraceMinutes,
}

impl ConfigKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::MaxAuthorizationsPerFamily => "MAX_AUTORIZACIONES_POR_FAMILIA",
            ConfigKey::MaxExtensionHours => "MAX_HORAS_EXTENSION",
            ConfigKey::MaxVisitHours => "TIEMPO_MAXIMO_VISITA",
            ConfigKey::ExitGraceMinutes => "TIEMPO_GRACIA_SALIDA",
        }
    }

    pub fn default_value(self) -> i64 {
        match self {
            ConfigKey::MaxAuthorizationsPerFamily => 10,
            ConfigKey::MaxExtensionHours => 24,
            ConfigKey::MaxVisitHours => 12,
            ConfigKey::ExitGraceMinutes => 30,
        }
    }
}

/// Immutable snapshot of the access settings.
///
/// Reads never fail: an absent key yields the caller's default. The adapter
/// replaces the whole snapshot when it reloads from storage.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    entries: HashMap<String, ConfigEntry>,
}

impl ConfigStore {
    pub fn new(entries: impl IntoIterator<Item = ConfigEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key.clone(), entry))
                .collect(),
        }
    }

    pub fn get(&self, key: &str, default: i64) -> i64 {
        self.entries.get(key).map(|e| e.value).unwrap_or(default)
    }

    pub fn description(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.description.as_str())
    }

    fn value_of(&self, key: ConfigKey) -> i64 {
        self.get(key.as_str(), key.default_value())
    }

    pub fn max_authorizations_per_family(&self) -> i64 {
        self.value_of(ConfigKey::MaxAuthorizationsPerFamily)
    }

    // 表現できない値は既定値として扱う
    fn hours_of(&self, key: ConfigKey) -> Duration {
        Duration::try_hours(self.value_of(key))
            .unwrap_or_else(|| Duration::hours(key.default_value()))
    }

    pub fn max_extension(&self) -> Duration {
        self.hours_of(ConfigKey::MaxExtensionHours)
    }

    pub fn max_visit_duration(&self) -> Duration {
        self.hours_of(ConfigKey::MaxVisitHours)
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::try_minutes(self.value_of(ConfigKey::ExitGraceMinutes))
            .unwrap_or_else(|| Duration::minutes(ConfigKey::ExitGraceMinutes.default_value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_fall_back_to_defaults() {
        let store = ConfigStore::default();
        assert_eq!(store.get("UNKNOWN", 7), 7);
        assert_eq!(store.max_authorizations_per_family(), 10);
        assert_eq!(store.max_extension(), Duration::hours(24));
        assert_eq!(store.max_visit_duration(), Duration::hours(12));
        assert_eq!(store.exit_grace(), Duration::minutes(30));
    }

    #[test]
    fn stored_values_override_defaults() {
        let store = ConfigStore::new([
            ConfigEntry::new("TIEMPO_GRACIA_SALIDA".into(), 5, "grace".into()),
            ConfigEntry::new("MAX_AUTORIZACIONES_POR_FAMILIA".into(), 2, "quota".into()),
        ]);
        assert_eq!(store.exit_grace(), Duration::minutes(5));
        assert_eq!(store.max_authorizations_per_family(), 2);
        assert_eq!(store.max_extension(), Duration::hours(24));
        assert_eq!(store.description("TIEMPO_GRACIA_SALIDA"), Some("grace"));
    }

    #[test]
    fn unrepresentable_durations_fall_back_to_defaults() {
        let store = ConfigStore::new([
            ConfigEntry::new("MAX_HORAS_EXTENSION".into(), i64::MAX, "ext".into()),
            ConfigEntry::new("TIEMPO_GRACIA_SALIDA".into(), i64::MIN, "grace".into()),
        ]);
        assert_eq!(store.max_extension(), Duration::hours(24));
        assert_eq!(store.exit_grace(), Duration::minutes(30));
    }
}
