use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Configuration file not found. Looked in:\n\
        - current directory: nimbus.local.yaml, .nimbus.local.yaml, nimbus.yaml, .nimbus.yaml\n\
        - ./.nimbus/ directory\n\
        - ~/.config/nimbus/nimbus.yaml\n\
        Set NIMBUS_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("No API token: set `token` in the configuration or the {0} environment variable")]
    MissingToken(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
