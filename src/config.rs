// Configuration module for the panel link

use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_IDENTIFIER: &str = "SHB1000";
pub const DEFAULT_CHARACTERISTIC_UUID: &str = "f62a9f56-f29e-48a8-a317-47ee37a58999";
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub bluetooth: BluetoothConfig,
    pub target: TargetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter name, e.g. "hci0". First available adapter when unset.
    pub adapter: Option<String>,
    pub scan_timeout_secs: u64,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            scan_timeout_secs: DEFAULT_SCAN_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub identifier: String,
    pub characteristic_uuid: String,
    pub selection_default: SelectionDefault,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_TARGET_IDENTIFIER.to_string(),
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID.to_string(),
            selection_default: SelectionDefault::default(),
        }
    }
}

/// Which index the interactive device prompt offers when the user just
/// presses Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionDefault {
    First,
    #[default]
    Last,
}

impl SelectionDefault {
    pub fn index(self, count: usize) -> usize {
        match self {
            Self::First => 0,
            Self::Last => count.saturating_sub(1),
        }
    }
}

/// Layers an optional `simionic.{toml,json,yaml}` file and `SIMIONIC_*`
/// environment variables over the compiled defaults.
pub fn load() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("simionic").required(false))
        .add_source(
            config::Environment::with_prefix("SIMIONIC")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize()
}
