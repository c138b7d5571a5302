use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub poll: PollConfig,
    pub visual: VisualConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VisualConfig {
    pub ring_radius: f64,
    pub node_radius: f64,
    /// Animation clock period (~30 fps), independent of the poll interval.
    pub frame_interval_ms: u64,
    pub particle_speed_min: f64,
    pub particle_speed_max: f64,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            ring_radius: 180.0,
            node_radius: 22.0,
            frame_interval_ms: 33,
            particle_speed_min: 0.02,
            particle_speed_max: 0.04,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let cfg: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(cfg)
    }

    /// Missing config file is not an error; every field has a default.
    pub fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
