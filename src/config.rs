//! File-based settings.
//!
//! Groups the strategy, benchmark and pipeline configuration in one TOML
//! document. Every section has defaults, so a file only names what it
//! changes:
//!
//! ```toml
//! tokenizer = "word"
//!
//! [strategy]
//! chunk_size = 256
//! boundary_policy = "sentence"
//!
//! [[benchmark.strategies]]
//! name = "fixed-128"
//! strategy = "fixed"
//! chunk_size = 128
//!
//! [pipeline]
//! max_concurrency = 8
//! ```

use crate::benchmark::BenchmarkConfig;
use crate::chunking::StrategyConfig;
use crate::error::{Error, Result};
use crate::pipeline::PipelineConfig;
use crate::tokenizer::{SharedTokenizer, create_tokenizer};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default tokenizer name.
pub const DEFAULT_TOKENIZER: &str = "word";

/// Complete settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tokenizer name (see [`crate::tokenizer::available_tokenizers`]).
    pub tokenizer: String,
    /// Strategy used by the pipeline.
    pub strategy: StrategyConfig,
    /// Benchmark settings.
    pub benchmark: BenchmarkConfig,
    /// Pipeline settings.
    pub pipeline: PipelineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tokenizer: DEFAULT_TOKENIZER.to_string(),
            strategy: StrategyConfig::default(),
            benchmark: BenchmarkConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TOML is malformed or has
    /// values of the wrong type.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Ok(toml::from_str(toml)?)
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Writes the settings to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails, or an I/O error if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Builds the configured tokenizer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown tokenizer name.
    pub fn tokenizer(&self) -> Result<SharedTokenizer> {
        create_tokenizer(&self.tokenizer).map_err(|e| Error::config(e.to_string()))
    }

    /// Validates the tokenizer, strategy and pipeline sections, and the
    /// benchmark section when it names any strategy.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<()> {
        self.tokenizer()?;
        self.strategy.validate()?;
        self.pipeline.validate()?;
        if !self.benchmark.strategies.is_empty() {
            self.benchmark.validate()?;
        }
        Ok(())
    }
}
