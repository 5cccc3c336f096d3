//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Connection settings for the remote solving backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing slash
    /// (e.g. `http://localhost:8000`).
    pub base_url: String,
    /// Path of the solve endpoint, appended to `base_url`.
    pub solve_path: String,
    /// Path of the health-check endpoint, appended to `base_url`.
    pub health_path: String,
    /// Maximum seconds to wait for a backend response before timing out.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            solve_path: "/api/solve".into(),
            health_path: "/api/health".into(),
            timeout_secs: 120,
        }
    }
}

impl BackendConfig {
    /// Full URL of the solve endpoint.
    pub fn solve_url(&self) -> String {
        join_url(&self.base_url, &self.solve_path)
    }

    /// Full URL of the health-check endpoint.
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// HitlConfig
// ---------------------------------------------------------------------------

/// Human-in-the-loop review policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HitlConfig {
    /// Image / voice samples with a confidence strictly below this value are
    /// flagged for human review.
    pub threshold: f32,
}

impl Default for HitlConfig {
    fn default() -> Self {
        Self { threshold: 0.75 }
    }
}

// ---------------------------------------------------------------------------
// OcrConfig
// ---------------------------------------------------------------------------

/// Settings passed to the OCR collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language tag handed to the OCR engine (e.g. `"eng"`).
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AsrConfig
// ---------------------------------------------------------------------------

/// Settings for speech-recognition acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Recognition language as a BCP-47 tag (e.g. `"en-US"`).
    pub language: String,
    /// Confidence assumed for a final result that carries none.
    ///
    /// Kept separate from [`HitlConfig::threshold`] even though both default
    /// to 0.75.
    pub default_confidence: f32,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            language: "en-US".into(),
            default_confidence: 0.75,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Stage-replay settings for the pipeline orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Milliseconds a stage stays `Running` before it is marked `Completed`.
    /// `0` replays the stages without pausing.
    pub stage_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_interval_ms: 600,
        }
    }
}

impl PipelineConfig {
    pub fn stage_interval(&self) -> Duration {
        Duration::from_millis(self.stage_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use math_mentor::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote solving backend.
    pub backend: BackendConfig,
    /// Review gating.
    pub hitl: HitlConfig,
    /// OCR acquisition.
    pub ocr: OcrConfig,
    /// Speech acquisition.
    pub asr: AsrConfig,
    /// Stage replay pacing.
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
