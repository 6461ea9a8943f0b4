use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_CHARS: usize = 800;
pub const DEFAULT_TAIL_WINDOW_CHARS: usize = 100;
pub const DEFAULT_ANNEX_MAX_LOSS_RATIO: f64 = 0.05;
pub const DEFAULT_ANNEX_HEADER_EXCERPT_CHARS: usize = 400;
pub const DEFAULT_QA_MATCH_THRESHOLD: f64 = 0.95;
pub const DEFAULT_QA_COVERAGE_THRESHOLD: f64 = 0.90;
pub const DEFAULT_QA_ANNEX_MODE_MIN_REFERENCE_CHARS: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    pub annex: AnnexConfig,
    pub qa: QaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub target_chars: usize,
    pub tail_window_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_chars: DEFAULT_TARGET_CHARS,
            tail_window_chars: DEFAULT_TAIL_WINDOW_CHARS,
        }
    }
}

/// What the assembler emits for an annex whose decomposition lost too much text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnexFallback {
    #[default]
    SingleChunk,
    KeepSubChunks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnexConfig {
    pub max_loss_ratio: f64,
    pub header_excerpt_chars: usize,
    pub fallback: AnnexFallback,
}

impl Default for AnnexConfig {
    fn default() -> Self {
        Self {
            max_loss_ratio: DEFAULT_ANNEX_MAX_LOSS_RATIO,
            header_excerpt_chars: DEFAULT_ANNEX_HEADER_EXCERPT_CHARS,
            fallback: AnnexFallback::SingleChunk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub match_threshold: f64,
    pub coverage_threshold: f64,
    pub annex_mode_min_reference_chars: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_QA_MATCH_THRESHOLD,
            coverage_threshold: DEFAULT_QA_COVERAGE_THRESHOLD,
            annex_mode_min_reference_chars: DEFAULT_QA_ANNEX_MODE_MIN_REFERENCE_CHARS,
        }
    }
}

pub fn load_pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "qa": { "match_threshold": 0.9 }, "annex": { "fallback": "keep_sub_chunks" } }"#)
                .expect("partial config should deserialize");

        assert_eq!(config.qa.match_threshold, 0.9);
        assert_eq!(config.qa.coverage_threshold, DEFAULT_QA_COVERAGE_THRESHOLD);
        assert_eq!(config.annex.fallback, AnnexFallback::KeepSubChunks);
        assert_eq!(config.annex.max_loss_ratio, DEFAULT_ANNEX_MAX_LOSS_RATIO);
        assert_eq!(config.chunker, ChunkerConfig::default());
    }

    #[test]
    fn missing_config_path_yields_defaults() {
        let config = load_pipeline_config(None).expect("defaults should load");
        assert_eq!(config, PipelineConfig::default());
    }
}
