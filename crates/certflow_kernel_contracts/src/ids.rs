#![forbid(unsafe_code)]

use serde::Serialize;

use crate::common::validate_id;
use crate::{ContractViolation, Validate};

pub const ID_MAX_LEN: usize = 64;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
                let v = Self(id.into());
                v.validate()?;
                Ok(v)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Validate for $name {
            fn validate(&self) -> Result<(), ContractViolation> {
                validate_id($field, &self.0, ID_MAX_LEN)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(EventId, "event_id");
string_id!(ContestId, "contest_id");
string_id!(
    /// Unit of judged competition; every ledger row is keyed by one.
    CategoryId,
    "category_id"
);
string_id!(JudgeId, "judge_id");
string_id!(ContestantId, "contestant_id");
string_id!(CriterionId, "criterion_id");
string_id!(
    /// Authenticated account. Judges sign with the user id mirroring their judge id.
    UserId,
    "user_id"
);
