use skyfleet_core::CoreError;
use std::env;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub repo_root: PathBuf,
    pub git_server_address: String,
    pub git_server_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, CoreError> {
        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_default()
                .parse()
                .unwrap_or(8080),
            mqtt_host: env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".to_string()),
            mqtt_port: env::var("MQTT_PORT")
                .unwrap_or_default()
                .parse()
                .unwrap_or(1883),
            repo_root: env::var("REPO_ROOT")
                .unwrap_or_else(|_| "repositories".to_string())
                .into(),
            git_server_address: env::var("GIT_SERVER_ADDRESS")
                .unwrap_or_else(|_| "ssh://git@localhost:2222".to_string()),
            git_server_key: env::var("GIT_SERVER_KEY").map_err(|_| {
                CoreError::Config("GIT_SERVER_KEY must be set to the store host key".to_string())
            })?,
        })
    }
}
