//! Environment-driven configuration.
//!
//! All settings come from environment variables, optionally seeded from a
//! `.env` file in the working directory. Required values that are missing make
//! [`Config::from_env`] fail, and the binary refuses to start.

use crate::types::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PINECONE_CONTROLLER_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAIConfig,
    pub pinecone: PineconeConfig,
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body for uploads, in bytes.
    pub max_upload_bytes: usize,
    /// Optional timeout applied to every outbound API request.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub api_base: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub chat_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PineconeConfig {
    pub api_key: String,
    pub environment: String,
    pub index_name: String,
    /// Data-plane host of the index. Resolved through the control plane when unset.
    pub host: Option<String>,
    pub controller_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub top_k: usize,
    /// Directory holding `uploaded_files.json` and `chunk_log.json`.
    pub data_dir: PathBuf,
    /// Directory uploads are spooled to during extraction. System temp dir when unset.
    pub spool_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment (after reading `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                AppError::Configuration(format!("missing required environment variable {}", key))
            })
        };

        Ok(Config {
            server: ServerConfig {
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(get("PORT"), "PORT", 8080)?,
                max_upload_bytes: parse_or(
                    get("MAX_UPLOAD_BYTES"),
                    "MAX_UPLOAD_BYTES",
                    DEFAULT_MAX_UPLOAD_BYTES,
                )?,
                request_timeout_secs: get("REQUEST_TIMEOUT_SECS")
                    .map(|v| parse_value(&v, "REQUEST_TIMEOUT_SECS"))
                    .transpose()?,
            },
            openai: OpenAIConfig {
                api_key: required("OPENAI_API_KEY")?,
                api_base: get("OPENAI_API_BASE")
                    .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string()),
                embedding_model: get("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                embedding_dimensions: parse_or(
                    get("EMBEDDING_DIMENSIONS"),
                    "EMBEDDING_DIMENSIONS",
                    DEFAULT_EMBEDDING_DIMENSIONS,
                )?,
                chat_model: get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            },
            pinecone: PineconeConfig {
                api_key: required("PINECONE_API_KEY")?,
                environment: required("PINECONE_ENVIRONMENT")?,
                index_name: required("PINECONE_INDEX")?,
                host: get("PINECONE_HOST"),
                controller_url: get("PINECONE_CONTROLLER_URL")
                    .unwrap_or_else(|| DEFAULT_PINECONE_CONTROLLER_URL.to_string()),
            },
            rag: RagConfig {
                chunk_size: non_zero(
                    parse_or(get("CHUNK_SIZE"), "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
                    "CHUNK_SIZE",
                )?,
                top_k: non_zero(parse_or(get("TOP_K"), "TOP_K", DEFAULT_TOP_K)?, "TOP_K")?,
                data_dir: get("DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
                spool_dir: get("SPOOL_DIR").map(PathBuf::from),
            },
        })
    }
}

fn parse_value<T: FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Configuration(format!("invalid value for {}: {:?}", key, value)))
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(v) => parse_value(&v, key),
        None => Ok(default),
    }
}

fn non_zero(value: usize, key: &str) -> Result<usize> {
    if value == 0 {
        return Err(AppError::Configuration(format!("{} must be greater than zero", key)));
    }
    Ok(value)
}
