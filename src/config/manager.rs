use super::{evolution::EvolutionConfig, refiner::RefinerConfig, traits::ConfigSection};
use crate::error::EvotreeError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub refiner: RefinerConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EvotreeError> {
        self.evolution.validate()?;
        self.refiner.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvotreeError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EvotreeError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| EvotreeError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.config.write().unwrap() = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvotreeError> {
        let config = self.config.read().unwrap();
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| EvotreeError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| EvotreeError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn update<F>(&self, f: F) -> Result<(), EvotreeError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap();
        f(&mut config);
        config.validate()?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "evotree-config-{}.toml",
            std::process::id()
        ));

        let manager = ConfigManager::new();
        manager
            .update(|cfg| {
                cfg.evolution.pop_size = 33;
                cfg.refiner.batch_size = 7;
            })
            .unwrap();
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::new();
        loaded.load_from_file(&path).unwrap();
        assert_eq!(loaded.get().evolution.pop_size, 33);
        assert_eq!(loaded.get().refiner.batch_size, 7);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_update_rejects_invalid_state() {
        let manager = ConfigManager::new();
        let result = manager.update(|cfg| cfg.evolution.elitism = 2.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_is_a_config_error() {
        let manager = ConfigManager::new();
        let result = manager.load_from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(EvotreeError::Configuration(_))));
    }
}
