use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use winsnap_platform::{RowOrder, TargetSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapConfig {
    /// Window title to capture, or "desktop"
    #[serde(default = "default_target")]
    pub target: String,

    /// Output path prefix; captures after the first get "(N)" appended
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Output file extension
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Input that ends the interactive loop
    #[serde(default = "default_stop_token")]
    pub stop_token: String,

    /// Write top-down rows (negative height) instead of bottom-up
    #[serde(default)]
    pub top_down: bool,
}

fn default_target() -> String {
    "desktop".to_string()
}
fn default_output_prefix() -> String {
    "capture".to_string()
}
fn default_extension() -> String {
    "bmp".to_string()
}
fn default_stop_token() -> String {
    "q".to_string()
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            output_prefix: default_output_prefix(),
            extension: default_extension(),
            stop_token: default_stop_token(),
            top_down: false,
        }
    }
}

impl SnapConfig {
    /// Default config file path for this platform
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "winsnap", "winsnap") {
            dirs.config_dir().join("config.json")
        } else {
            PathBuf::from("winsnap-config.json")
        }
    }

    /// Load config from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&data).with_context(|| "failed to parse config JSON")?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create config dir {}", parent.display()))?;
            }
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn target_spec(&self) -> TargetSpec {
        self.target
            .parse::<TargetSpec>()
            .unwrap_or(TargetSpec::Desktop)
    }

    pub fn row_order(&self) -> RowOrder {
        if self.top_down {
            RowOrder::TopDown
        } else {
            RowOrder::BottomUp
        }
    }
}
