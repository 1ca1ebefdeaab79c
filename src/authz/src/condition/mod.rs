//! Statement condition blocks
//!
//! A block maps operator names to `{context-path: expected}` entries:
//!
//! ```json
//! {
//!   "StringEquals": { "resource.ownerId": "${principal.id}" },
//!   "IpMatch":      { "request.ip": "10.0.0.0/8" }
//! }
//! ```
//!
//! Every operator and every entry must pass (implicit AND). An empty block
//! passes.

pub mod operator;

pub use operator::ConditionOperator;

use crate::context::ContextView;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

/// Operator name → (context path → expected value)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionBlock(BTreeMap<String, BTreeMap<String, Value>>);

impl ConditionBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry under an operator
    pub fn with(mut self, operator: ConditionOperator, path: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.0
            .entry(operator.as_str().to_string())
            .or_default()
            .insert(path.into(), expected.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }

    /// Operator names as written, in sorted order
    pub fn operator_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Resolve every operator name, failing on the first unknown one
    pub fn operators(&self) -> Result<Vec<(ConditionOperator, &BTreeMap<String, Value>)>> {
        self.0
            .iter()
            .map(|(name, entries)| Ok((name.parse::<ConditionOperator>()?, entries)))
            .collect()
    }

    /// Evaluate the block against a context view
    ///
    /// Operator names are checked before anything is compared, so an unknown
    /// operator is reported even when another entry would already fail.
    pub fn evaluate(&self, view: &ContextView) -> Result<bool> {
        let operators = self.operators()?;

        for (operator, entries) in operators {
            for (path, expected) in entries {
                let expected = view.resolve_value(expected);
                let actual = view.get_path(path);
                if !operator.evaluate(&expected, actual) {
                    trace!(%operator, path = %path, "condition entry failed");
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }
}

impl From<BTreeMap<String, BTreeMap<String, Value>>> for ConditionBlock {
    fn from(map: BTreeMap<String, BTreeMap<String, Value>>) -> Self {
        Self(map)
    }
}
