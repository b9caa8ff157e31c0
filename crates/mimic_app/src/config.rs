use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mimic_engine::{ApiSettings, PollSettings, WorkflowSettings, DEFAULT_BASE_URL};
use mimic_logging::DEFAULT_LOG_FILE;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CONFIG_FILE: &str = "./mimic.ron";

/// Settings read from the RON config file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub request_timeout_secs: u64,
    pub output_dir: PathBuf,
    pub log: String,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: 3_000,
            poll_max_attempts: 100,
            request_timeout_secs: 30,
            output_dir: PathBuf::from("./scripts"),
            log: "terminal".to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl AppConfig {
    pub(crate) fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..ApiSettings::default()
        }
    }

    pub(crate) fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            poll: PollSettings {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.poll_max_attempts.max(1),
            },
            ..WorkflowSettings::default()
        }
    }

    pub(crate) fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
    }
}

/// Loads the config file, falling back to defaults.
///
/// Runs before the logger exists, so problems come back as warnings for the
/// caller to log once logging is up.
pub(crate) fn load_config(path: &Path) -> (AppConfig, Vec<String>) {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return (AppConfig::default(), Vec::new());
        }
        Err(err) => {
            return (
                AppConfig::default(),
                vec![format!("Failed to read config from {:?}: {}", path, err)],
            );
        }
    };

    match ron::from_str::<AppConfig>(&content) {
        Ok(config) => (config, Vec::new()),
        Err(err) => (
            AppConfig::default(),
            vec![format!("Failed to parse config from {:?}: {}", path, err)],
        ),
    }
}
