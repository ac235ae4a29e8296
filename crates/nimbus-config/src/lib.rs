pub mod error;

pub use error::*;

use nimbus_cloud::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable read for the token when none is configured
pub const DEFAULT_TOKEN_ENV: &str = "NIMBUS_TOKEN";

const CANDIDATES: [&str; 4] = [
    "nimbus.local.yaml",
    ".nimbus.local.yaml",
    "nimbus.yaml",
    ".nimbus.yaml",
];

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

/// Provider configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Managed database API base URL
    pub endpoint: String,

    /// Operation service base URL, defaults to `endpoint`
    #[serde(default)]
    pub operation_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Folder the managed clusters should live in
    #[serde(default)]
    pub folder_id: Option<String>,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl ProviderConfig {
    pub fn operation_endpoint(&self) -> &str {
        self.operation_endpoint.as_deref().unwrap_or(&self.endpoint)
    }

    /// Configured token, falling back to the `token_env` variable
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingToken(self.token_env.clone()))
    }
}

/// Locate the provider configuration file.
///
/// Search order:
/// 1. `NIMBUS_CONFIG_PATH` environment variable
/// 2. current directory: nimbus.local.yaml, .nimbus.local.yaml, nimbus.yaml, .nimbus.yaml
/// 3. the same names inside `./.nimbus/`
/// 4. `~/.config/nimbus/nimbus.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("NIMBUS_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let nimbus_dir = current_dir.join(".nimbus");
    if nimbus_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = nimbus_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("nimbus").join("nimbus.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Parse a configuration file and resolve its token
pub fn load_config(path: &Path) -> Result<ProviderConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: ProviderConfig = serde_yaml::from_str(&content)?;

    if config.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("endpoint must not be empty".to_string()));
    }
    config.token = Some(config.resolve_token()?);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::time::Duration;

    const MINIMAL: &str = "endpoint: https://mdb.example.test\ntoken: secret\n";

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("nimbus.yaml"), MINIMAL).unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file();

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with("nimbus.yaml"));
    }

    #[test]
    #[serial]
    fn test_local_file_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("nimbus.yaml"), MINIMAL).unwrap();
        fs::write(temp_dir.path().join(".nimbus.local.yaml"), MINIMAL).unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file();

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with(".nimbus.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_nimbus_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let nimbus_dir = temp_dir.path().join(".nimbus");
        fs::create_dir(&nimbus_dir).unwrap();
        fs::write(nimbus_dir.join("nimbus.yaml"), MINIMAL).unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file();

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with(".nimbus/nimbus.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, MINIMAL).unwrap();

        unsafe {
            std::env::set_var("NIMBUS_CONFIG_PATH", config_path.to_str().unwrap());
        }

        let result = find_config_file();

        unsafe {
            std::env::remove_var("NIMBUS_CONFIG_PATH");
        }
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_load_config_with_engine_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nimbus.yaml");
        fs::write(
            &path,
            r#"
endpoint: https://mdb.example.test
operation_endpoint: https://operation.example.test
token: secret
folder_id: f1
engine:
  retry:
    max_attempts: 5
  timeouts:
    update: 600000
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.operation_endpoint(), "https://operation.example.test");
        assert_eq!(config.folder_id.as_deref(), Some("f1"));
        assert_eq!(config.engine.retry.max_attempts, 5);
        assert_eq!(config.engine.timeouts.update, Duration::from_secs(600));
        assert_eq!(config.engine.timeouts.read, Duration::from_secs(60));
        assert_eq!(config.token_env, DEFAULT_TOKEN_ENV);
    }

    #[test]
    #[serial]
    fn test_token_from_environment() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nimbus.yaml");
        fs::write(
            &path,
            "endpoint: https://mdb.example.test\ntoken_env: NIMBUS_TEST_TOKEN\n",
        )
        .unwrap();

        unsafe {
            std::env::remove_var("NIMBUS_TEST_TOKEN");
        }
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::MissingToken(var)) if var == "NIMBUS_TEST_TOKEN"
        ));

        unsafe {
            std::env::set_var("NIMBUS_TEST_TOKEN", "from-env");
        }
        let config = load_config(&path);
        unsafe {
            std::env::remove_var("NIMBUS_TEST_TOKEN");
        }

        let config = config.unwrap();
        assert_eq!(config.token.as_deref(), Some("from-env"));
        assert_eq!(config.operation_endpoint(), "https://mdb.example.test");
    }

    #[test]
    fn test_empty_endpoint_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nimbus.yaml");
        fs::write(&path, "endpoint: ''\ntoken: secret\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Invalid(_))));
    }
}
