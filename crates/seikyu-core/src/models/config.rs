//! Configuration structures for the extraction pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeikyuError};

/// Main configuration for seikyu.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeikyuConfig {
    /// Invoice extraction configuration.
    pub extraction: ExtractionConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Currency used unless the document names another one.
    pub default_currency: String,

    /// Tax rate (percent) assumed when totals carry no rate annotation.
    pub default_tax_rate: u32,

    /// Maximum number of line items read from one table (10 - 20).
    pub max_line_items: usize,

    /// Lines scanned after an anchor keyword such as 請求先.
    pub anchor_lookahead: usize,

    /// Results scoring below this are marked for review.
    pub review_threshold: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_currency: "JPY".to_string(),
            default_tax_rate: 10,
            max_line_items: 20,
            anchor_lookahead: 3,
            review_threshold: 0.5,
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of documents processed concurrently.
    pub jobs: usize,

    /// Keep going when a file fails.
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            continue_on_error: false,
        }
    }
}

impl ExtractionConfig {
    /// Check that all values are within their allowed ranges.
    pub fn validate(&self) -> Result<()> {
        if self.default_currency.len() != 3
            || !self.default_currency.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(SeikyuError::Config(format!(
                "default_currency must be a 3-letter ISO code, got {:?}",
                self.default_currency
            )));
        }
        if self.default_tax_rate > 100 {
            return Err(SeikyuError::Config(format!(
                "default_tax_rate must be a percentage, got {}",
                self.default_tax_rate
            )));
        }
        if !(10..=20).contains(&self.max_line_items) {
            return Err(SeikyuError::Config(format!(
                "max_line_items must be between 10 and 20, got {}",
                self.max_line_items
            )));
        }
        if self.anchor_lookahead == 0 {
            return Err(SeikyuError::Config("anchor_lookahead must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.review_threshold) {
            return Err(SeikyuError::Config(format!(
                "review_threshold must be between 0 and 1, got {}",
                self.review_threshold
            )));
        }
        Ok(())
    }
}

impl SeikyuConfig {
    /// Load and validate configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;
        if self.batch.jobs == 0 {
            return Err(SeikyuError::Config("batch.jobs must be at least 1".to_string()));
        }
        Ok(())
    }
}
