//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services. Nothing in
//! the request path reads the process environment. Parsing goes through a lookup function so the
//! rules can be tested without touching real environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use grokdoc_llm::Provider;

use crate::constants::{
    DEFAULT_ADVANCED_MODEL, DEFAULT_DATA_DIR, DEFAULT_GEO_TIMEOUT_MS, DEFAULT_MAX_TOKENS,
    DEFAULT_REST_ADDR, DEFAULT_SEARCH_RADIUS_M,
};
use crate::{CoreError, CoreResult};

pub const REST_ADDR_VAR: &str = "GROKDOC_REST_ADDR";
pub const FAST_PROVIDER_VAR: &str = "GROKDOC_FAST_PROVIDER";
pub const FAST_MODEL_VAR: &str = "GROKDOC_FAST_MODEL";
pub const ADVANCED_PROVIDER_VAR: &str = "GROKDOC_ADVANCED_PROVIDER";
pub const ADVANCED_MODEL_VAR: &str = "GROKDOC_ADVANCED_MODEL";
pub const MAX_TOKENS_VAR: &str = "GROKDOC_MAX_TOKENS";
pub const GOOGLE_MAPS_API_KEY_VAR: &str = "GOOGLE_MAPS_API_KEY";
pub const SEARCH_RADIUS_VAR: &str = "GROKDOC_SEARCH_RADIUS_M";
pub const GEO_TIMEOUT_VAR: &str = "GROKDOC_GEO_TIMEOUT_MS";
pub const DATA_DIR_VAR: &str = "GROKDOC_DATA_DIR";

/// Which vendor and model serve one tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: Provider,
    pub model_id: String,
}

/// Configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    rest_addr: String,
    fast: ModelSpec,
    advanced: ModelSpec,
    max_tokens: u32,
    openai_api_key: Option<String>,
    xai_api_key: Option<String>,
    google_maps_api_key: Option<String>,
    search_radius_m: u32,
    geo_timeout: Duration,
    data_dir: PathBuf,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a provider name, falling back to `default` when unset.
pub fn provider_from_env_value(
    var: &str,
    value: Option<String>,
    default: Provider,
) -> CoreResult<Provider> {
    match non_blank(value) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| CoreError::InvalidConfig(format!("{var}: {e}"))),
    }
}

/// Parse a positive integer, falling back to `default` when unset.
pub fn positive_from_env_value<T>(var: &str, value: Option<String>, default: T) -> CoreResult<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match non_blank(value) {
        None => Ok(default),
        Some(raw) => match raw.parse::<T>() {
            Ok(parsed) if parsed > T::default() => Ok(parsed),
            _ => Err(CoreError::InvalidConfig(format!(
                "{var} must be a positive integer, got '{raw}'"
            ))),
        },
    }
}

impl AppConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from any name-to-value lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let fast_provider =
            provider_from_env_value(FAST_PROVIDER_VAR, lookup(FAST_PROVIDER_VAR), Provider::XAi)?;
        let fast_model = non_blank(lookup(FAST_MODEL_VAR))
            .unwrap_or_else(|| fast_provider.default_fast_model().to_string());

        let advanced_provider = provider_from_env_value(
            ADVANCED_PROVIDER_VAR,
            lookup(ADVANCED_PROVIDER_VAR),
            Provider::OpenAi,
        )?;
        let advanced_model = non_blank(lookup(ADVANCED_MODEL_VAR))
            .unwrap_or_else(|| DEFAULT_ADVANCED_MODEL.to_string());

        let geo_timeout_ms =
            positive_from_env_value(GEO_TIMEOUT_VAR, lookup(GEO_TIMEOUT_VAR), DEFAULT_GEO_TIMEOUT_MS)?;

        Ok(Self {
            rest_addr: non_blank(lookup(REST_ADDR_VAR))
                .unwrap_or_else(|| DEFAULT_REST_ADDR.to_string()),
            fast: ModelSpec {
                provider: fast_provider,
                model_id: fast_model,
            },
            advanced: ModelSpec {
                provider: advanced_provider,
                model_id: advanced_model,
            },
            max_tokens: positive_from_env_value(
                MAX_TOKENS_VAR,
                lookup(MAX_TOKENS_VAR),
                DEFAULT_MAX_TOKENS,
            )?,
            openai_api_key: non_blank(lookup(Provider::OpenAi.api_key_var())),
            xai_api_key: non_blank(lookup(Provider::XAi.api_key_var())),
            google_maps_api_key: non_blank(lookup(GOOGLE_MAPS_API_KEY_VAR)),
            search_radius_m: positive_from_env_value(
                SEARCH_RADIUS_VAR,
                lookup(SEARCH_RADIUS_VAR),
                DEFAULT_SEARCH_RADIUS_M,
            )?,
            geo_timeout: Duration::from_millis(geo_timeout_ms),
            data_dir: non_blank(lookup(DATA_DIR_VAR))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        })
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }

    pub fn fast(&self) -> &ModelSpec {
        &self.fast
    }

    pub fn advanced(&self) -> &ModelSpec {
        &self.advanced
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// The key for `provider`, or an error naming the variable to set.
    pub fn api_key_for(&self, provider: Provider) -> CoreResult<&str> {
        let key = match provider {
            Provider::OpenAi => self.openai_api_key.as_deref(),
            Provider::XAi => self.xai_api_key.as_deref(),
        };
        key.ok_or_else(|| {
            CoreError::InvalidConfig(format!(
                "{} is not set (required for the {} provider)",
                provider.api_key_var(),
                provider
            ))
        })
    }

    pub fn google_maps_api_key(&self) -> CoreResult<&str> {
        self.google_maps_api_key.as_deref().ok_or_else(|| {
            CoreError::InvalidConfig(format!(
                "{GOOGLE_MAPS_API_KEY_VAR} is not set (required for facility search)"
            ))
        })
    }

    pub fn search_radius_m(&self) -> u32 {
        self.search_radius_m
    }

    pub fn geo_timeout(&self) -> Duration {
        self.geo_timeout
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> CoreResult<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();

        assert_eq!(cfg.rest_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.fast().provider, Provider::XAi);
        assert_eq!(cfg.fast().model_id, "grok-2-latest");
        assert_eq!(cfg.advanced().provider, Provider::OpenAi);
        assert_eq!(cfg.advanced().model_id, "o1-preview");
        assert_eq!(cfg.max_tokens(), 2000);
        assert_eq!(cfg.search_radius_m(), 5000);
        assert_eq!(cfg.geo_timeout(), Duration::from_millis(5000));
        assert_eq!(cfg.data_dir(), Path::new(".grokdoc"));
    }

    #[test]
    fn fast_model_default_follows_the_provider() {
        let cfg = config(&[(FAST_PROVIDER_VAR, "openai")]).unwrap();
        assert_eq!(cfg.fast().model_id, "chatgpt-4o-latest");

        let cfg = config(&[(FAST_PROVIDER_VAR, "openai"), (FAST_MODEL_VAR, "gpt-4o")]).unwrap();
        assert_eq!(cfg.fast().model_id, "gpt-4o");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = config(&[(ADVANCED_PROVIDER_VAR, "acme")]).expect_err("should fail");
        assert!(matches!(err, CoreError::InvalidConfig(msg) if msg.contains(ADVANCED_PROVIDER_VAR)));
    }

    #[test]
    fn numbers_must_be_positive() {
        assert!(config(&[(MAX_TOKENS_VAR, "0")]).is_err());
        assert!(config(&[(SEARCH_RADIUS_VAR, "far")]).is_err());
        assert_eq!(
            config(&[(SEARCH_RADIUS_VAR, " 2500 ")]).unwrap().search_radius_m(),
            2500
        );
    }

    #[test]
    fn missing_keys_are_reported_with_the_variable_name() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-test"), (REST_ADDR_VAR, "  ")]).unwrap();

        assert_eq!(cfg.api_key_for(Provider::OpenAi).unwrap(), "sk-test");
        let err = cfg.api_key_for(Provider::XAi).expect_err("xai key missing");
        assert!(err.to_string().contains("XAI_API_KEY"));
        assert!(cfg.google_maps_api_key().is_err());
        assert_eq!(cfg.rest_addr(), "0.0.0.0:3000");
    }
}
