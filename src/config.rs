//! TOML configuration.
//!
//! Only `[db]` is required; every other section falls back to defaults.
//! See `config/kb.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::extract::{PdfBackend, DEFAULT_MAX_ENTRY_BYTES};
use kb_harness_core::chunk::DEFAULT_MAX_LEN;
use kb_harness_core::search::DEFAULT_TOP_K;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

fn default_max_len() -> usize {
    DEFAULT_MAX_LEN
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Off by default: only `.docx`, `.xlsx`/`.xls` and `.txt` are accepted
    /// unless PDF extraction is switched on.
    #[serde(default)]
    pub pdf_enabled: bool,
    #[serde(default)]
    pub pdf_backend: PdfBackend,
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdf_enabled: false,
            pdf_backend: PdfBackend::Raw,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

fn default_max_entry_bytes() -> u64 {
    DEFAULT_MAX_ENTRY_BYTES
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".to_string()
}
fn default_model() -> String {
    "z-ai/glm4_7".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Name of the environment variable holding the admin bearer token.
    #[serde(default = "default_admin_token_env")]
    pub admin_token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            admin_token_env: default_admin_token_env(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_admin_token_env() -> String {
    "KB_ADMIN_TOKEN".to_string()
}

impl Config {
    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_len == 0 {
            anyhow::bail!("chunking.max_len must be > 0");
        }
        if self.retrieval.top_k < 1 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }
        if self.extraction.max_entry_bytes == 0 {
            anyhow::bail!("extraction.max_entry_bytes must be > 0");
        }
        if self.llm.base_url.trim().is_empty() {
            anyhow::bail!("llm.base_url must not be empty");
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = parse_config("[db]\npath = \"./data/kb.sqlite\"\n").unwrap();
        assert_eq!(cfg.chunking.max_len, 500);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert!(!cfg.extraction.pdf_enabled);
        assert_eq!(cfg.extraction.pdf_backend, PdfBackend::Raw);
        assert_eq!(cfg.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(cfg.server.admin_token_env, "KB_ADMIN_TOKEN");
    }

    #[test]
    fn test_full_config() {
        let cfg = parse_config(
            r#"
[db]
path = "/tmp/kb.sqlite"

[chunking]
max_len = 300

[retrieval]
top_k = 3

[extraction]
pdf_enabled = true
pdf_backend = "pdf-extract"

[llm]
model = "gpt-4o-mini"
base_url = "https://api.openai.com/v1"

[server]
bind = "0.0.0.0:9000"
"#,
        )
        .unwrap();
        assert_eq!(cfg.chunking.max_len, 300);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert!(cfg.extraction.pdf_enabled);
        assert_eq!(cfg.extraction.pdf_backend, PdfBackend::PdfExtract);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_rejects_zero_max_len() {
        let err = parse_config("[db]\npath = \"x\"\n[chunking]\nmax_len = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_len"));
    }

    #[test]
    fn test_rejects_zero_top_k() {
        assert!(parse_config("[db]\npath = \"x\"\n[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_pdf_backend() {
        assert!(parse_config("[db]\npath = \"x\"\n[extraction]\npdf_backend = \"ocr\"\n").is_err());
    }

    #[test]
    fn test_missing_db_section_is_error() {
        assert!(parse_config("[chunking]\nmax_len = 10\n").is_err());
    }
}
