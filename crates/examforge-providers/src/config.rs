//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examforge_core::traits::{Embedder, ItemGenerator};

use crate::anthropic::AnthropicWriter;
use crate::embedding::OpenAiEmbedder;
use crate::mock::MockGenerator;

/// Configuration for a single provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Embeddings {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Mock,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            ProviderConfig::Embeddings {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Embeddings")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            ProviderConfig::Mock => f.debug_struct("Mock").finish(),
        }
    }
}

/// Top-level `examforge.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamforgeConfig {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Name of the provider used for item generation.
    #[serde(default)]
    pub generator: Option<String>,
    /// Name of the provider used for embeddings.
    #[serde(default)]
    pub embedder: Option<String>,
}

/// Load configuration from a TOML file, expanding `${VAR}` references from
/// the environment.
pub fn load_config(path: &Path) -> Result<ExamforgeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let expanded = expand_env_vars(&content);
    let config: ExamforgeConfig =
        toml::from_str(&expanded).context("failed to parse config TOML")?;
    Ok(config)
}

/// Replace `${VAR}` with the environment variable's value; unset variables
/// expand to the empty string.
fn expand_env_vars(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                out.push_str(&std::env::var(var).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Instantiate the named generator provider.
pub fn create_generator(
    config: &ExamforgeConfig,
    name: &str,
) -> Result<Arc<dyn ItemGenerator>> {
    let provider = config
        .providers
        .get(name)
        .with_context(|| format!("provider '{name}' not found in config"))?;
    match provider {
        ProviderConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => {
            anyhow::ensure!(!api_key.is_empty(), "provider '{name}' has an empty API key");
            Ok(Arc::new(AnthropicWriter::new(
                api_key,
                base_url.clone(),
                model.clone(),
            )))
        }
        ProviderConfig::Mock => Ok(Arc::new(MockGenerator::new())),
        ProviderConfig::Embeddings { .. } => {
            anyhow::bail!("provider '{name}' is an embeddings provider, not a generator")
        }
    }
}

/// Instantiate the named embedding provider.
pub fn create_embedder(config: &ExamforgeConfig, name: &str) -> Result<Arc<dyn Embedder>> {
    let provider = config
        .providers
        .get(name)
        .with_context(|| format!("provider '{name}' not found in config"))?;
    match provider {
        ProviderConfig::Embeddings {
            api_key,
            base_url,
            model,
        } => {
            anyhow::ensure!(!api_key.is_empty(), "provider '{name}' has an empty API key");
            Ok(Arc::new(OpenAiEmbedder::new(
                api_key,
                base_url.clone(),
                model.clone(),
            )))
        }
        _ => anyhow::bail!("provider '{name}' is not an embeddings provider"),
    }
}
