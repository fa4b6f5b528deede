use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use sous_llm::{CapabilityConfig, DEFAULT_GEMINI_MODEL, GEMINI_PROVIDER_ID};

pub const SETTINGS_DIRECTORY_NAME: &str = "sous";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
/// Environment fallback consulted when the settings file carries no key.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_ENV_VAR: &str = "GEMINI_MODEL";

/// Persisted widget configuration.
///
/// This is the explicit dependency the widget is constructed from; tests
/// bypass it entirely by injecting a fake generation capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSettings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: String::new(),
            model_id: default_model_id(),
        }
    }
}

impl WidgetSettings {
    pub fn is_valid(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn to_capability_config(&self) -> CapabilityConfig {
        CapabilityConfig::new(&self.provider_id, &self.api_key, &self.model_id)
    }

    pub fn normalized(mut self) -> Self {
        self.provider_id = if self.provider_id.trim().is_empty() {
            default_provider_id()
        } else {
            self.provider_id.trim().to_string()
        };
        self.api_key = self.api_key.trim().to_string();
        self.model_id = if self.model_id.trim().is_empty() {
            default_model_id()
        } else {
            self.model_id.trim().to_string()
        };

        self
    }
}

fn default_provider_id() -> String {
    GEMINI_PROVIDER_ID.to_string()
}

fn default_model_id() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

/// Settings persistence: figment-loaded JSON under the user config dir,
/// swapped atomically in memory and written atomically on disk.
pub struct SettingsStore {
    settings: Arc<ArcSwap<WidgetSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".sous"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<WidgetSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: WidgetSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &PathBuf) -> WidgetSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return WidgetSettings::default();
        }

        let figment =
            Figment::from(Serialized::defaults(WidgetSettings::default())).merge(Json::file(path));

        match figment.extract::<WidgetSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                WidgetSettings::default()
            }
        }
    }

    fn persist(&self, settings: &WidgetSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to move settings file from {from:?} to {to:?} on `{stage}`: {source}"))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SettingsStore::new(dir.path().join("settings.json"));

        let settings = store.settings();
        assert_eq!(*settings, WidgetSettings::default());
        assert!(!settings.is_valid());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone());
        store
            .update(WidgetSettings {
                provider_id: "gemini".to_string(),
                api_key: "  secret  ".to_string(),
                model_id: "gemini-1.5-pro".to_string(),
            })
            .expect("persist settings");

        // Normalization happens before the in-memory swap and the write.
        assert_eq!(store.settings().api_key, "secret");

        let reloaded = SettingsStore::new(path);
        assert_eq!(reloaded.settings().api_key, "secret");
        assert!(reloaded.settings().is_valid());
    }

    #[test]
    fn normalization_fills_blank_fields_with_defaults() {
        let settings = WidgetSettings {
            provider_id: "   ".to_string(),
            api_key: " key ".to_string(),
            model_id: "".to_string(),
        }
        .normalized();

        assert_eq!(settings.provider_id, GEMINI_PROVIDER_ID);
        assert_eq!(settings.api_key, "key");
        assert_eq!(settings.model_id, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn capability_config_carries_settings_fields() {
        let config = WidgetSettings {
            provider_id: "gemini".to_string(),
            api_key: "key".to_string(),
            model_id: "gemini-1.5-pro".to_string(),
        }
        .to_capability_config();

        assert_eq!(config.provider_id, "gemini");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.model_id, "gemini-1.5-pro");
    }
}
