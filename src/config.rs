use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub pdf_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub port: u16,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl GeminiConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("GEMINI_API_KEY must be set (environment or .env file)"))?;

        Ok(Self {
            api_key,
            api_url: var_or("GEMINI_API_URL", DEFAULT_API_URL),
            model: var_or("GEMINI_MODEL", DEFAULT_MODEL),
            embedding_model: var_or("GEMINI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT") {
            Ok(p) => p.trim().parse().map_err(|e| anyhow!("Invalid PORT {:?}: {}", p, e))?,
            Err(_) => 3000,
        };

        Ok(Self {
            gemini: GeminiConfig::from_env()?,
            pdf_dir: PathBuf::from(var_or("PDF_DIR", "./pdfs")),
            snapshot_path: PathBuf::from(var_or("SNAPSHOT_PATH", "documents.json")),
            port,
        })
    }
}
