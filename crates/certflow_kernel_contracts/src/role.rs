#![forbid(unsafe_code)]

use serde::Serialize;

use crate::{ContractViolation, Validate};

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_ORGANIZER: &str = "ORGANIZER";
pub const ROLE_BOARD: &str = "BOARD";
pub const ROLE_AUDIT: &str = "AUDIT";
pub const ROLE_TALLY: &str = "TALLY";
pub const ROLE_JUDGE: &str = "JUDGE";

/// Caller or signer role. Comparisons are exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(role: impl Into<String>) -> Result<Self, ContractViolation> {
        let r = Self(role.into());
        r.validate()?;
        Ok(r)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Validate for Role {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "role",
                reason: "must not be empty",
            });
        }
        if self.0.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "role",
                reason: "must be <= 32 chars",
            });
        }
        if !self
            .0
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(ContractViolation::InvalidValue {
                field: "role",
                reason: "must be an ASCII token",
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
