//! Loop configuration stored in `codeloop.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::language::SourceLanguage;
use crate::core::verdict::{DEFAULT_CLEAN_PATTERN, DEFAULT_DIAGNOSTIC_PATTERN, VerdictRules};

pub const DEFAULT_CONFIG_FILE: &str = "codeloop.toml";

/// Loop configuration (TOML).
///
/// Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoopConfig {
    /// Generation rounds before the loop gives up.
    pub max_attempts: u32,

    /// Directory that receives unit files, the transcript and round logs.
    pub output_dir: PathBuf,

    /// Transcript file name inside `output_dir`.
    pub transcript_file: String,

    pub language: SourceLanguage,

    /// First message of every conversation.
    pub system_prompt: String,

    pub model: ModelConfig,

    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    /// OpenAI-compatible API root (without `/chat/completions`).
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Argv to run per unit file. `{file}` is replaced by the unit path; when
    /// absent, the path is appended.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Capture budget for the merged stdout/stderr report.
    pub output_limit_bytes: usize,
    pub clean_pattern: String,
    pub diagnostic_pattern: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            output_dir: PathBuf::from("output"),
            transcript_file: "dialogue_log.txt".to_string(),
            language: SourceLanguage::Java,
            system_prompt: "You are a helpful assistant.".to_string(),
            model: ModelConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: ["infer", "run", "--", "javac", "{file}"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout_secs: 600,
            output_limit_bytes: 100_000,
            clean_pattern: DEFAULT_CLEAN_PATTERN.to_string(),
            diagnostic_pattern: DEFAULT_DIAGNOSTIC_PATTERN.to_string(),
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must not be empty"));
        }
        if self.transcript_file.trim().is_empty() {
            return Err(anyhow!("transcript_file must not be empty"));
        }
        if self.model.name.trim().is_empty() {
            return Err(anyhow!("model.name must not be empty"));
        }
        if self.model.api_key_env.trim().is_empty() {
            return Err(anyhow!("model.api_key_env must not be empty"));
        }
        if self.model.request_timeout_secs == 0 {
            return Err(anyhow!("model.request_timeout_secs must be > 0"));
        }
        self.analyzer.validate()
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.output_dir.join(&self.transcript_file)
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(anyhow!("analyzer.command must be a non-empty array"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("analyzer.timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("analyzer.output_limit_bytes must be > 0"));
        }
        self.rules().map(|_| ())
    }

    pub fn rules(&self) -> Result<VerdictRules> {
        VerdictRules::new(&self.clean_pattern, &self.diagnostic_pattern)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LoopConfig::default()`.
pub fn load_config(path: &Path) -> Result<LoopConfig> {
    if !path.exists() {
        let cfg = LoopConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LoopConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &LoopConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
