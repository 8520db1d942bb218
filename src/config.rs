use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::env;
use std::fs;
use std::path::Path;

use crate::Result;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::new());
}

const CONFIG_PATHS: [&str; 2] = ["./nalflow.toml", "./config.toml"];

/// Decoder settings shared by every [`Decoder`](crate::Decoder) built without
/// an explicit engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Width reported for frames produced by the passthrough engine
    pub frame_width: u32,
    /// Height reported for frames produced by the passthrough engine
    pub frame_height: u32,
    /// Name given to the engine worker thread
    pub worker_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_width: 1920,
            frame_height: 1080,
            worker_name: String::from("nalflow-decode"),
        }
    }
}

impl Config {
    fn new() -> Self {
        let mut config = Config::default();

        // Environment first, then the config file on top
        if let Ok(width) = env::var("NALFLOW_FRAME_WIDTH") {
            config.apply("frame_width", &width);
        }
        if let Ok(height) = env::var("NALFLOW_FRAME_HEIGHT") {
            config.apply("frame_height", &height);
        }
        if let Ok(name) = env::var("NALFLOW_WORKER_NAME") {
            config.apply("worker_name", &name);
        }

        for path in &CONFIG_PATHS {
            if let Ok(content) = fs::read_to_string(path) {
                config.merge_toml_str(&content);
            }
        }

        config
    }

    /// Builds a config from defaults plus the `key = value` lines in `content`
    pub fn from_toml_str(content: &str) -> Self {
        let mut config = Config::default();
        config.merge_toml_str(content);
        config
    }

    fn merge_toml_str(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                self.apply(key.trim(), value);
            }
        }
    }

    fn apply(&mut self, key: &str, value: &str) {
        if let Err(e) = self.try_apply(key, value) {
            log::warn!("ignoring config value {} = {:?}: {}", key, value, e);
        }
    }

    fn try_apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "frame_width" => self.frame_width = value.trim().parse()?,
            "frame_height" => self.frame_height = value.trim().parse()?,
            "worker_name" if !value.is_empty() => self.worker_name = value.to_string(),
            _ => log::debug!("unknown config key: {}", key),
        }
        Ok(())
    }

    /// Re-reads environment and config files into the process-wide config
    pub fn reload() {
        let new_config = Config::new();
        *CONFIG.write() = new_config;
    }
}

/// Returns a snapshot of the process-wide configuration
pub fn get_config() -> Config {
    CONFIG.read().clone()
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# nalflow configuration

# Dimensions reported by the passthrough engine
frame_width = 1920
frame_height = 1080

# Engine worker thread name
worker_name = "nalflow-decode"
"#;
        fs::write(path, template)?;
    }
    Ok(())
}
