use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

/// Wall-clock duration one session is allowed to sample frames.
pub const DEFAULT_FRAME_BUDGET_MS: u64 = 2_000;
/// A session passes when at least this share of frames saw exactly one circlip.
pub const DEFAULT_PASS_THRESHOLD_PERCENT: f64 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlcConfig {
    pub host: String,
    pub port: u16,
    pub register: String,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            host: "192.168.3.250".into(),
            port: 1025,
            register: "D1".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionConfig {
    pub camera_index: u32,
    pub frame_budget_ms: u64,
    pub pass_threshold_percent: f64,
    pub audible_alerts: bool,
    pub plc: PlcConfig,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
            pass_threshold_percent: DEFAULT_PASS_THRESHOLD_PERCENT,
            audible_alerts: true,
            plc: PlcConfig::default(),
        }
    }
}

impl InspectionConfig {
    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }
}

/// JSON-file-backed configuration, loaded once and shared with the shell.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<InspectionConfig>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            InspectionConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> InspectionConfig {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, config: InspectionConfig) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = config;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &InspectionConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write config to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir().join(format!("circlip-config-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn defaults_match_deployment_parity() {
        let config = InspectionConfig::default();
        assert_eq!(config.frame_budget_ms, 2_000);
        assert_eq!(config.pass_threshold_percent, 60.0);
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.plc.register, "D1");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let store = ConfigStore::new(temp_config_path()).unwrap();
        assert_eq!(store.current().frame_budget_ms, DEFAULT_FRAME_BUDGET_MS);
    }

    #[test]
    fn update_persists_and_reloads() {
        let path = temp_config_path();
        let store = ConfigStore::new(path.clone()).unwrap();

        let mut config = store.current();
        config.pass_threshold_percent = 75.0;
        config.plc.register = "D5".into();
        store.update(config).unwrap();

        let reloaded = ConfigStore::new(path.clone()).unwrap();
        assert_eq!(reloaded.current().pass_threshold_percent, 75.0);
        assert_eq!(reloaded.current().plc.register, "D5");

        let _ = fs::remove_file(path);
    }
}
