use crate::domain::{config::BridgeConfig, error::{SerBridgeError, SerBridgeResult}};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const PROJECT_DIR: &str = ".serbridge";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
///
/// Settings come from defaults, then the global file, then the nearest project
/// file. Later sources override individual keys, not whole sections.
pub struct ConfigManager {
    global_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> Self {
        Self {
            global_config_path: Self::default_global_config_path(),
            project_config_path: Self::find_project_config_path(),
        }
    }

    /// Manager reading from explicit locations
    pub fn with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            global_config_path: global,
            project_config_path: project,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> SerBridgeResult<BridgeConfig> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        for path in [&self.global_config_path, &self.project_config_path]
            .into_iter()
            .flatten()
        {
            if path.exists() {
                debug!("Loading configuration from {}", path.display());
                merge_values(&mut merged, Self::read_value(path)?);
            }
        }

        merged.try_into().map_err(|e: toml::de::Error| SerBridgeError::Config {
            message: format!("Invalid configuration: {}", e),
        })
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> SerBridgeResult<BridgeConfig> {
        let content = fs::read_to_string(path).map_err(|e| SerBridgeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| SerBridgeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &BridgeConfig) -> SerBridgeResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| SerBridgeError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SerBridgeError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        fs::write(path, content).map_err(|e| SerBridgeError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration under `dir/.serbridge`
    pub fn init_project_config(&self, dir: &Path) -> SerBridgeResult<PathBuf> {
        let config_file = dir.join(PROJECT_DIR).join(CONFIG_FILE);

        if config_file.exists() {
            return Err(SerBridgeError::Config {
                message: format!(
                    "Project configuration already exists at {}",
                    config_file.display()
                ),
            });
        }

        self.save_config_to_path(&config_file, &BridgeConfig::default())?;
        Ok(config_file)
    }

    fn default_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("serbridge").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    fn read_value(path: &Path) -> SerBridgeResult<toml::Value> {
        let content = fs::read_to_string(path).map_err(|e| SerBridgeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        content.parse::<toml::Value>().map_err(|e| SerBridgeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let manager = ConfigManager::with_paths(None, None);
        let config = manager.load_config().unwrap();

        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_project_overrides_single_keys() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");

        fs::write(
            &global,
            "[serial]\ndevice = \"/dev/ttyUSB0\"\nbaud_rate = 115200\n\n[server]\nport = \"9000\"\n",
        )
        .unwrap();
        fs::write(&project, "[serial]\nbaud_rate = 57600\n").unwrap();

        let manager = ConfigManager::with_paths(Some(global), Some(project));
        let config = manager.load_config().unwrap();

        assert_eq!(config.serial.device, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.server.port, "9000");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[serial\n").unwrap();

        let manager = ConfigManager::with_paths(Some(path.clone()), None);
        assert!(matches!(manager.load_config(), Err(SerBridgeError::Config { .. })));
        assert!(manager.load_config_from_path(&path).is_err());
    }

    #[test]
    fn test_init_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_paths(None, None);

        let config_file = manager.init_project_config(temp_dir.path()).unwrap();
        assert_eq!(config_file, temp_dir.path().join(".serbridge").join("config.toml"));

        let config = manager.load_config_from_path(&config_file).unwrap();
        assert_eq!(config, BridgeConfig::default());

        // Refuses to overwrite
        assert!(manager.init_project_config(temp_dir.path()).is_err());
    }
}
