use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_to_file: bool,
    pub log_file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_to_file: false,
            log_file_path: "soap-gateway.log".to_string(),
        }
    }
}
