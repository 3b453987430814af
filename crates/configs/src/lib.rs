//! # configs
//!
//! Layered settings for the Letterbox binary: built-in defaults, then an
//! optional `letterbox.toml`, then `LETTERBOX__*` environment variables
//! (after `.env` has been read).
//!
//! ```text
//! LETTERBOX__NAMESPACE=letterbox
//! LETTERBOX__LOG__FILTER=services=debug,info
//! LETTERBOX__IDENTITY__ADDRESS=@cinn.bxxxx
//! LETTERBOX__IDENTITY__SECRET=...
//! ```

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use domains::{
    AuthorKeypair, LayerConfig, DEFAULT_DOC_FORMAT, DEFAULT_DRAFT_PROBE_LIMIT, DEFAULT_NAMESPACE,
};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "LETTERBOX";
const DEFAULT_FILE: &str = "letterbox";

#[derive(Error, Debug)]
pub enum ConfigsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySettings {
    pub address: String,
    pub secret: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub namespace: String,
    pub doc_format: String,
    pub draft_probe_limit: u32,
    pub log: LogSettings,
    #[serde(default)]
    pub identity: Option<IdentitySettings>,
    /// The `.env` file that was read, if any. Loading happens before
    /// logging is set up, so the caller reports it.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

impl Settings {
    /// Loads `.env`, then `letterbox.toml` from the working directory if it
    /// exists, then the environment.
    pub fn load() -> Result<Self, ConfigsError> {
        let env_file = dotenvy::dotenv().ok();
        let mut settings = Self::build(File::with_name(DEFAULT_FILE).required(false))?;
        settings.env_file = env_file;
        Ok(settings)
    }

    /// Like [`Settings::load`] but with an explicit settings file, which
    /// must exist. Does not read `.env`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigsError> {
        Self::build(File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self, ConfigsError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings: Settings = Config::builder()
            .set_default("namespace", DEFAULT_NAMESPACE)?
            .set_default("doc_format", DEFAULT_DOC_FORMAT)?
            .set_default("draft_probe_limit", i64::from(DEFAULT_DRAFT_PROBE_LIMIT))?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigsError> {
        if self.namespace.is_empty()
            || self
                .namespace
                .contains(|c: char| matches!(c, '/' | '{' | '}' | '~' | ':'))
        {
            return Err(ConfigsError::Invalid {
                key: "namespace",
                reason: format!("{:?} must be non-empty and free of path delimiters", self.namespace),
            });
        }
        if self.doc_format.is_empty() {
            return Err(ConfigsError::Invalid {
                key: "doc_format",
                reason: "must not be empty".to_string(),
            });
        }
        if self.draft_probe_limit == 0 {
            return Err(ConfigsError::Invalid {
                key: "draft_probe_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The part of the settings the Letterbox layer itself consumes.
    pub fn layer_config(&self) -> LayerConfig {
        LayerConfig {
            namespace: self.namespace.clone(),
            doc_format: self.doc_format.clone(),
            draft_probe_limit: self.draft_probe_limit,
        }
    }

    pub fn keypair(&self) -> Option<AuthorKeypair> {
        self.identity.as_ref().map(|identity| AuthorKeypair {
            address: identity.address.as_str().into(),
            secret: identity.secret.clone(),
        })
    }
}
