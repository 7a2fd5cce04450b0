//! Layered configuration for the certification runtimes.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file (optional)
//! 3. Environment variables (`CERTFLOW_*` prefix, `__` separates nesting)

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::path::Path;

use certflow_kernel_contracts::role::{
    Role, ROLE_ADMIN, ROLE_AUDIT, ROLE_BOARD, ROLE_ORGANIZER, ROLE_TALLY,
};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Example: `CERTFLOW_RESET__UNLOCK_SCORES=false` -> `reset.unlock_scores`
pub const ENV_PREFIX: &str = "CERTFLOW_";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {details}")]
    Load { details: String },
    #[error("invalid configuration {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Persisted role required to submit final certification.
    pub audit_role: String,
    pub tally_role: String,
    /// Any sign-off from one of these roles marks board completeness.
    pub board_roles: BTreeSet<String>,
    pub reset_roles: BTreeSet<String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            audit_role: ROLE_AUDIT.to_string(),
            tally_role: ROLE_TALLY.to_string(),
            board_roles: [ROLE_BOARD, ROLE_ORGANIZER, ROLE_ADMIN]
                .into_iter()
                .map(str::to_string)
                .collect(),
            reset_roles: [ROLE_ADMIN, ROLE_ORGANIZER, ROLE_BOARD]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl RoleConfig {
    pub fn is_audit_role(&self, role: &str) -> bool {
        self.audit_role == role
    }

    pub fn is_tally_role(&self, role: &str) -> bool {
        self.tally_role == role
    }

    pub fn is_board_role(&self, role: &str) -> bool {
        self.board_roles.contains(role)
    }

    pub fn may_reset(&self, role: &str) -> bool {
        self.reset_roles.contains(role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Clear `is_locked` along with the certification flags.
    pub unlock_scores: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            unlock_scores: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertflowConfig {
    pub roles: RoleConfig,
    pub reset: ResetConfig,
}

impl CertflowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |field: &'static str, role: &str| {
            Role::new(role).map(|_| ()).map_err(|v| ConfigError::Invalid {
                field,
                reason: v.to_string(),
            })
        };
        check("roles.audit_role", &self.roles.audit_role)?;
        check("roles.tally_role", &self.roles.tally_role)?;
        for r in &self.roles.board_roles {
            check("roles.board_roles", r)?;
        }
        for r in &self.roles.reset_roles {
            check("roles.reset_roles", r)?;
        }
        if self.roles.board_roles.is_empty() {
            return Err(ConfigError::Invalid {
                field: "roles.board_roles",
                reason: "must not be empty".to_string(),
            });
        }
        if self.roles.reset_roles.is_empty() {
            return Err(ConfigError::Invalid {
                field: "roles.reset_roles",
                reason: "must not be empty".to_string(),
            });
        }
        if self.roles.audit_role == self.roles.tally_role {
            return Err(ConfigError::Invalid {
                field: "roles.audit_role",
                reason: "must differ from roles.tally_role".to_string(),
            });
        }
        if self.roles.board_roles.contains(&self.roles.audit_role)
            || self.roles.board_roles.contains(&self.roles.tally_role)
        {
            return Err(ConfigError::Invalid {
                field: "roles.board_roles",
                reason: "must not contain the audit or tally role".to_string(),
            });
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<CertflowConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(CertflowConfig::default()));
    if let Some(path) = path {
        debug!(path = %path.display(), "merging certflow config file");
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: CertflowConfig = figment.extract().map_err(|e| ConfigError::Load {
        details: e.to_string(),
    })?;
    config.validate()?;
    info!(
        audit_role = %config.roles.audit_role,
        tally_role = %config.roles.tally_role,
        unlock_scores = config.reset.unlock_scores,
        "certflow config loaded"
    );
    Ok(config)
}
