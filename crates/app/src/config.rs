use std::path::Path;

use anyhow::Context;
use meisai_ocr::{ConverterConfig, OcrSettings};
use serde::Deserialize;

/// Everything read from `--config`. Missing tables and keys fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub converter: ConverterConfig,
    pub ocr: OcrSettings,
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_content)
    }
}
