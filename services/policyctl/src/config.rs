use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

// policyctl configuration sourced from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyCtlConfig {
    pub policy_file: Option<PathBuf>,
    pub model_file: Option<PathBuf>,
    pub log_filter: String,
}

#[derive(Debug, Deserialize)]
struct PolicyCtlConfigOverride {
    policy_file: Option<PathBuf>,
    model_file: Option<PathBuf>,
    log: Option<String>,
}

impl PolicyCtlConfig {
    pub fn from_env() -> Self {
        let policy_file = std::env::var_os("KALM_POLICY_FILE").map(PathBuf::from);
        let model_file = std::env::var_os("KALM_MODEL_FILE").map(PathBuf::from);
        let log_filter = std::env::var("KALM_LOG").unwrap_or_else(|_| "warn".to_string());
        Self {
            policy_file,
            model_file,
            log_filter,
        }
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env();
        if let Ok(path) = std::env::var("KALM_POLICYCTL_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read KALM_POLICYCTL_CONFIG: {path}"))?;
            let override_cfg: PolicyCtlConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse policyctl config yaml")?;
            if let Some(value) = override_cfg.policy_file {
                config.policy_file = Some(value);
            }
            if let Some(value) = override_cfg.model_file {
                config.model_file = Some(value);
            }
            if let Some(value) = override_cfg.log {
                config.log_filter = value;
            }
        }
        Ok(config)
    }

    /// Apply command-line flags, which win over every other source.
    pub fn with_flags(mut self, policy_file: Option<PathBuf>, model_file: Option<PathBuf>) -> Self {
        if policy_file.is_some() {
            self.policy_file = policy_file;
        }
        if model_file.is_some() {
            self.model_file = model_file;
        }
        self
    }
}
