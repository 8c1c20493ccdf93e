//! Required API keys read from the process environment.

use std::fmt;

use super::config::GatewayConfig;
use crate::error::ConfigError;

pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const GATEWAY_API_KEY: &str = "OPENAI_API_KEY";
pub const GATEWAY_API_BASE: &str = "OPENAI_API_BASE";

/// The two secrets the pipeline cannot run without.
#[derive(Clone)]
pub struct Secrets {
    pub pinecone_api_key: String,
    pub gateway_api_key: String,
}

impl Secrets {
    /// Read both keys from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read both keys through `lookup`, failing on the first one that is
    /// missing or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pinecone_api_key = require(&lookup, PINECONE_API_KEY, "your Pinecone API key")?;
        let gateway_api_key = require(&lookup, GATEWAY_API_KEY, "your OpenRouter API key")?;

        Ok(Self {
            pinecone_api_key,
            gateway_api_key,
        })
    }

    /// Publish the keys and the gateway base URL to the process environment
    /// for libraries that only read configuration from there.
    ///
    /// Must run once at startup, before any other thread exists.
    pub fn export(&self, gateway: &GatewayConfig) {
        // SAFETY: called from main before the pipeline spawns any work.
        unsafe {
            std::env::set_var(PINECONE_API_KEY, &self.pinecone_api_key);
            std::env::set_var(GATEWAY_API_KEY, &self.gateway_api_key);
            std::env::set_var(GATEWAY_API_BASE, &gateway.base_url);
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("pinecone_api_key", &"<redacted>")
            .field("gateway_api_key", &"<redacted>")
            .finish()
    }
}

fn require<F>(lookup: &F, name: &'static str, what: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingSecret {
            name,
            hint: format!("Add {what} to your .env ({name}=...) or export it in the shell"),
        }),
    }
}
