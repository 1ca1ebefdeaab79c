//! Policy document definition
//!
//! Documents use the IAM-style JSON layout, with case-sensitive field names:
//!
//! ```json
//! {
//!   "Version": "2024-01-01",
//!   "Statement": [
//!     { "Sid": "ReadOwn", "Effect": "Allow", "Action": "document:read",
//!       "Resource": ["document/*"],
//!       "Condition": { "StringEquals": { "resource.ownerId": "${principal.id}" } } }
//!   ]
//! }
//! ```

pub mod validate;

pub use validate::{validate_document, validate_value};

use crate::condition::ConditionBlock;
use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("Allow"),
            Self::Deny => f.write_str("Deny"),
        }
    }
}

/// One pattern or a list of patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternList {
    One(String),
    Many(Vec<String>),
}

impl PatternList {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(pattern) => std::slice::from_ref(pattern),
            Self::Many(patterns) => patterns,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.as_slice().iter()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<'a> IntoIterator for &'a PatternList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<&str> for PatternList {
    fn from(pattern: &str) -> Self {
        Self::One(pattern.to_string())
    }
}

impl From<String> for PatternList {
    fn from(pattern: String) -> Self {
        Self::One(pattern)
    }
}

impl From<Vec<String>> for PatternList {
    fn from(patterns: Vec<String>) -> Self {
        Self::Many(patterns)
    }
}

impl From<Vec<&str>> for PatternList {
    fn from(patterns: Vec<&str>) -> Self {
        Self::Many(patterns.into_iter().map(str::to_string).collect())
    }
}

/// A single Allow/Deny rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Optional statement identifier, reported in decisions
    #[serde(rename = "Sid", default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    #[serde(rename = "Effect")]
    pub effect: Effect,

    /// Action patterns (e.g., "erp:invoice:*")
    #[serde(rename = "Action")]
    pub actions: PatternList,

    /// Resource patterns (e.g., "invoice/*")
    #[serde(rename = "Resource")]
    pub resources: PatternList,

    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionBlock>,
}

impl Statement {
    pub fn new(effect: Effect, actions: impl Into<PatternList>, resources: impl Into<PatternList>) -> Self {
        Self {
            sid: None,
            effect,
            actions: actions.into(),
            resources: resources.into(),
            condition: None,
        }
    }

    pub fn allow(actions: impl Into<PatternList>, resources: impl Into<PatternList>) -> Self {
        Self::new(Effect::Allow, actions, resources)
    }

    pub fn deny(actions: impl Into<PatternList>, resources: impl Into<PatternList>) -> Self {
        Self::new(Effect::Deny, actions, resources)
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_condition(mut self, condition: ConditionBlock) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Identifier used for decision tracing: the `Sid`, or `stmt#<index>`
    pub fn id(&self, index: usize) -> Cow<'_, str> {
        match &self.sid {
            Some(sid) => Cow::Borrowed(sid),
            None => Cow::Owned(format!("stmt#{}", index)),
        }
    }
}

/// A set of statements evaluated together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(rename = "Statement")]
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Parse and validate a JSON policy document
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| AuthzError::validation(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Validate a JSON value, then convert it
    pub fn from_value(value: Value) -> Result<Self> {
        validate_value(&value)?;
        Self::from_value_trusted(value)
    }

    /// Parse without the structural check, for pre-trusted documents
    ///
    /// Shape errors that prevent deserialization are still reported as a
    /// validation error.
    pub fn parse_trusted(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AuthzError::validation(e.to_string()))
    }

    pub fn from_value_trusted(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| AuthzError::validation(e.to_string()))
    }

    /// Serialize to the JSON wire format
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
