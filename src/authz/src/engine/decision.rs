//! Authorization decision types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a decision came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    /// At least one matching Deny statement
    ExplicitDeny,
    /// At least one matching Allow statement and no Deny
    ExplicitAllow,
    /// Nothing matched
    DefaultDeny,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitDeny => f.write_str("EXPLICIT_DENY"),
            Self::ExplicitAllow => f.write_str("EXPLICIT_ALLOW"),
            Self::DefaultDeny => f.write_str("DEFAULT_DENY"),
        }
    }
}

/// Authorization decision
///
/// Only constructible through the reason-specific constructors, which keeps
/// `allowed` true exactly when the reason is [`DecisionReason::ExplicitAllow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDecision")]
pub struct Decision {
    allowed: bool,
    reason: DecisionReason,
    matched_statements: Vec<String>,
}

impl Decision {
    /// Deny caused by matching Deny statements
    pub fn explicit_deny(matched_statements: Vec<String>) -> Self {
        Self {
            allowed: false,
            reason: DecisionReason::ExplicitDeny,
            matched_statements,
        }
    }

    /// Allow granted by matching Allow statements
    pub fn explicit_allow(matched_statements: Vec<String>) -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::ExplicitAllow,
            matched_statements,
        }
    }

    /// Deny because nothing matched
    pub fn default_deny() -> Self {
        Self {
            allowed: false,
            reason: DecisionReason::DefaultDeny,
            matched_statements: Vec::new(),
        }
    }

    pub fn allowed(&self) -> bool {
        self.allowed
    }

    pub fn reason(&self) -> DecisionReason {
        self.reason
    }

    /// Identifiers of the statements that produced this decision
    pub fn matched_statements(&self) -> &[String] {
        &self.matched_statements
    }

    pub fn into_matched_statements(self) -> Vec<String> {
        self.matched_statements
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matched_statements.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{} [{}]", self.reason, self.matched_statements.join(", "))
        }
    }
}

/// Wire shape accepted when reading decisions back (e.g. from an audit sink)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDecision {
    allowed: bool,
    reason: DecisionReason,
    #[serde(default)]
    matched_statements: Vec<String>,
}

impl TryFrom<RawDecision> for Decision {
    type Error = String;

    fn try_from(raw: RawDecision) -> Result<Self, Self::Error> {
        if raw.allowed != (raw.reason == DecisionReason::ExplicitAllow) {
            return Err(format!("allowed={} is inconsistent with reason {}", raw.allowed, raw.reason));
        }
        Ok(Self {
            allowed: raw.allowed,
            reason: raw.reason,
            matched_statements: raw.matched_statements,
        })
    }
}
