//! Policy evaluation engine
//!
//! Evaluates policy documents against an `(action, resource, context)`
//! triple:
//!
//! ```text
//! statements ─ match action/resource ─ condition ─┬─ Deny  bucket ─┐
//!                                                 └─ Allow bucket ─┴─ Decision
//! ```
//!
//! Any matching Deny wins over any number of Allows, within one document
//! ([`PolicyEvaluator::evaluate`]) and across documents
//! ([`PolicyEvaluator::evaluate_all`]). With no match the decision is a
//! default deny. Evaluation is synchronous, holds no state between calls and
//! never mutates its inputs, so one evaluator can be shared across threads.

pub mod decision;

pub use decision::{Decision, DecisionReason};

use crate::context::{ContextView, EvaluationContext};
use crate::error::{ForbiddenError, Result};
use crate::matcher::{match_action, match_resource};
use crate::policy::{validate_document, Effect, PolicyDocument};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Evaluator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Run the structural check on every document before evaluating it.
    /// Disable only for documents that were validated when loaded.
    pub validate_documents: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            validate_documents: true,
        }
    }
}

/// Statement evaluator and multi-policy combinator
#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    config: EvaluatorConfig,
}

impl PolicyEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Evaluator that skips document validation
    pub fn trusted() -> Self {
        Self::new(EvaluatorConfig {
            validate_documents: false,
        })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate one policy document
    ///
    /// # Errors
    ///
    /// [`AuthzError::Validation`](crate::AuthzError::Validation) for a malformed
    /// document (when validation is enabled) and
    /// [`AuthzError::UnknownOperator`](crate::AuthzError::UnknownOperator) when a
    /// matching statement uses an unregistered condition operator.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_authz::{EvaluationContext, PolicyDocument, PolicyEvaluator, PrincipalContext, Statement};
    ///
    /// let policy = PolicyDocument::new()
    ///     .with_statement(Statement::allow("erp:invoice:create", "invoice/*"));
    /// let ctx = EvaluationContext::new(PrincipalContext::new("u-1"));
    ///
    /// let decision = PolicyEvaluator::default()
    ///     .evaluate("erp:invoice:create", "invoice/123", &policy, &ctx)
    ///     .unwrap();
    /// assert!(decision.allowed());
    /// assert_eq!(decision.matched_statements(), ["stmt#0"]);
    /// ```
    pub fn evaluate(
        &self,
        action: &str,
        resource: &str,
        policy: &PolicyDocument,
        ctx: &EvaluationContext,
    ) -> Result<Decision> {
        let view = ctx.view();
        let decision = self.evaluate_document(action, resource, policy, &view)?;

        debug!(action, resource, decision = %decision, "policy evaluated");
        Ok(decision)
    }

    /// Evaluate an ordered collection of documents with deny-overrides
    ///
    /// `None` entries are skipped. The first document producing an explicit
    /// deny ends evaluation; the deny then carries every statement id matched
    /// so far. Otherwise any explicit allow yields an allow with all matched
    /// ids, and no match at all is a default deny.
    pub fn evaluate_all<'a, I>(
        &self,
        action: &str,
        resource: &str,
        policies: I,
        ctx: &EvaluationContext,
    ) -> Result<Decision>
    where
        I: IntoIterator,
        I::Item: Into<Option<&'a PolicyDocument>>,
    {
        let view = ctx.view();
        let mut matched = Vec::new();
        let mut allowed = false;

        for (idx, policy) in policies.into_iter().enumerate() {
            let Some(policy) = policy.into() else {
                continue;
            };

            let decision = self.evaluate_document(action, resource, policy, &view)?;
            match decision.reason() {
                DecisionReason::ExplicitDeny => {
                    matched.extend(decision.into_matched_statements());
                    debug!(action, resource, policy_index = idx, "explicit deny, skipping remaining policies");
                    return Ok(Decision::explicit_deny(matched));
                }
                DecisionReason::ExplicitAllow => {
                    allowed = true;
                    matched.extend(decision.into_matched_statements());
                }
                DecisionReason::DefaultDeny => {}
            }
        }

        let decision = if allowed {
            Decision::explicit_allow(matched)
        } else {
            Decision::default_deny()
        };

        debug!(action, resource, decision = %decision, "policies evaluated");
        Ok(decision)
    }

    fn evaluate_document(
        &self,
        action: &str,
        resource: &str,
        policy: &PolicyDocument,
        view: &ContextView,
    ) -> Result<Decision> {
        if self.config.validate_documents {
            validate_document(policy)?;
        }

        let mut deny_ids = Vec::new();
        let mut allow_ids = Vec::new();

        for (idx, statement) in policy.statements.iter().enumerate() {
            if !match_action(action, &statement.actions) || !match_resource(resource, &statement.resources) {
                continue;
            }

            if let Some(condition) = &statement.condition {
                let holds = condition.evaluate(view).inspect_err(|e| {
                    warn!(statement = %statement.id(idx), error = %e, "condition definition error");
                })?;
                if !holds {
                    continue;
                }
            }

            let id = statement.id(idx).into_owned();
            match statement.effect {
                Effect::Deny => deny_ids.push(id),
                Effect::Allow => allow_ids.push(id),
            }
        }

        Ok(if !deny_ids.is_empty() {
            Decision::explicit_deny(deny_ids)
        } else if !allow_ids.is_empty() {
            Decision::explicit_allow(allow_ids)
        } else {
            Decision::default_deny()
        })
    }
}

/// Evaluate one document with the default (validating) evaluator
pub fn evaluate(action: &str, resource: &str, policy: &PolicyDocument, ctx: &EvaluationContext) -> Result<Decision> {
    PolicyEvaluator::default().evaluate(action, resource, policy, ctx)
}

/// Evaluate several documents with the default (validating) evaluator
pub fn evaluate_all<'a, I>(action: &str, resource: &str, policies: I, ctx: &EvaluationContext) -> Result<Decision>
where
    I: IntoIterator,
    I::Item: Into<Option<&'a PolicyDocument>>,
{
    PolicyEvaluator::default().evaluate_all(action, resource, policies, ctx)
}

/// Turn a deny into a [`ForbiddenError`] for imperative call sites
pub fn assert_allowed(decision: &Decision, message: Option<&str>) -> std::result::Result<(), ForbiddenError> {
    if decision.allowed() {
        return Ok(());
    }

    Err(ForbiddenError {
        message: message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Access denied ({})", decision.reason())),
        decision: decision.clone(),
    })
}
