use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::brush::BrushSettings;
use crate::error::ConfigError;
use crate::flood_fill::FillSettings;
use crate::gradient::GradientSettings;
use crate::gradient_cycle::CycleSettings;

/// Every tool's settings, persisted together as JSON. Missing keys fall back
/// to defaults so older files keep loading.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub brush: BrushSettings,
    pub fill: FillSettings,
    pub gradient: GradientSettings,
    pub cycle: CycleSettings,
}

impl ToolSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "tool settings loaded");
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
