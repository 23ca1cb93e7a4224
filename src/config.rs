use serde::Deserialize;

use crate::error::ConfigError;

pub const STORAGE_KEY: &str = "dataMBG";
/// Portions per bundle ("isi per ikat").
pub const BUNDLE_SIZE: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Key the record array is persisted under.
    pub storage_key: String,
    pub bundle_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            bundle_size: BUNDLE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Parses a JSON object; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when a field is out of range.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a blank key or a zero bundle size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage key is empty".to_string()));
        }
        if self.bundle_size == 0 {
            return Err(ConfigError::Invalid(
                "bundle size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
