//! Resolve-then-evaluate façade
//!
//! Ties a [`PolicyProvider`] to a [`PolicyEvaluator`]: the principal's own
//! policies plus those of its roles and groups are resolved in the request
//! scope, then combined with deny-overrides. This is the entry point request
//! adapters (middleware, route guards) call.

use crate::context::EvaluationContext;
use crate::engine::{assert_allowed, Decision, PolicyEvaluator};
use crate::error::Result;
use crate::provider::{PolicyProvider, PolicyQuery};
use crate::types::{PrincipalRef, Scope};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// One authorization question
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Scope policies are resolved in
    pub scope: Scope,
    pub action: String,
    pub resource: String,
    /// Principal (with roles and groups) and attributes for conditions
    pub context: EvaluationContext,
}

impl AuthorizationRequest {
    pub fn new(scope: Scope, action: impl Into<String>, resource: impl Into<String>, context: EvaluationContext) -> Self {
        Self {
            scope,
            action: action.into(),
            resource: resource.into(),
            context,
        }
    }

    /// Resolution query for the request principal
    pub fn query(&self) -> PolicyQuery {
        let principal = &self.context.principal;
        PolicyQuery::new(self.scope.clone(), PrincipalRef::user(principal.id.as_str()))
            .with_roles(principal.roles.iter().cloned())
            .with_groups(principal.groups.iter().cloned())
    }
}

/// Authorization entry point
#[derive(Clone)]
pub struct Authorizer {
    provider: Arc<dyn PolicyProvider>,
    evaluator: PolicyEvaluator,
}

impl Authorizer {
    pub fn new(provider: Arc<dyn PolicyProvider>) -> Self {
        Self::with_evaluator(provider, PolicyEvaluator::default())
    }

    pub fn with_evaluator(provider: Arc<dyn PolicyProvider>, evaluator: PolicyEvaluator) -> Self {
        Self { provider, evaluator }
    }

    pub fn provider(&self) -> &Arc<dyn PolicyProvider> {
        &self.provider
    }

    /// Resolve the applicable policies and evaluate them
    ///
    /// When the context carries no scope, the request scope is exposed to
    /// conditions as `scope.*`.
    pub async fn authorize(&self, request: &AuthorizationRequest) -> Result<Decision> {
        let start = Instant::now();

        let sources = self.provider.get_policies(&request.query()).await?;

        let context = match request.context.scope {
            Some(_) => Cow::Borrowed(&request.context),
            None => Cow::Owned(request.context.clone().with_scope(request.scope.clone())),
        };

        let decision = self.evaluator.evaluate_all(
            &request.action,
            &request.resource,
            sources.iter().map(|source| &*source.document),
            &context,
        )?;

        debug!(
            principal = %request.context.principal.id,
            scope = %request.scope,
            action = %request.action,
            resource = %request.resource,
            policies = sources.len(),
            decision = %decision,
            latency_us = start.elapsed().as_micros() as u64,
            "authorization decided"
        );
        Ok(decision)
    }

    /// Authorize, turning a deny into [`AuthzError::Forbidden`](crate::AuthzError::Forbidden)
    pub async fn check(&self, request: &AuthorizationRequest) -> Result<Decision> {
        let decision = self.authorize(request).await?;
        assert_allowed(&decision, None)?;
        Ok(decision)
    }

    /// Fail-closed boolean check: any error counts as a deny
    pub async fn is_allowed(&self, request: &AuthorizationRequest) -> bool {
        match self.authorize(request).await {
            Ok(decision) => decision.allowed(),
            Err(e) => {
                warn!(
                    action = %request.action,
                    resource = %request.resource,
                    error = %e,
                    "authorization failed, denying"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ConditionBlock, ConditionOperator};
    use crate::context::PrincipalContext;
    use crate::engine::DecisionReason;
    use crate::error::AuthzError;
    use crate::policy::{PolicyDocument, Statement};
    use crate::provider::{InMemoryPolicyProvider, PolicyRecord};
    use crate::types::Attachment;

    async fn setup() -> (Authorizer, Arc<InMemoryPolicyProvider>) {
        let provider = Arc::new(InMemoryPolicyProvider::new());
        let t1 = Scope::tenant("t1");

        provider
            .add_policy(
                PolicyRecord::new(
                    "invoices",
                    t1.clone(),
                    PolicyDocument::new().with_statement(Statement::allow("erp:invoice:*", "invoice/*")),
                ),
                None,
            )
            .await
            .unwrap();
        provider
            .add_policy(
                PolicyRecord::new(
                    "no-delete",
                    t1.clone(),
                    PolicyDocument::new()
                        .with_statement(Statement::deny("erp:invoice:delete", "*").with_sid("NoDelete")),
                ),
                None,
            )
            .await
            .unwrap();
        provider
            .attach_policies(vec![
                Attachment::new("invoices", t1.clone(), PrincipalRef::role("accountant")),
                Attachment::new("no-delete", t1, PrincipalRef::group("contractors")),
            ])
            .await
            .unwrap();

        (Authorizer::new(provider.clone()), provider)
    }

    fn request(action: &str, principal: PrincipalContext) -> AuthorizationRequest {
        AuthorizationRequest::new(Scope::tenant("t1"), action, "invoice/42", EvaluationContext::new(principal))
    }

    #[tokio::test]
    async fn test_roles_and_groups_are_resolved() {
        let (authz, _) = setup().await;
        let accountant = PrincipalContext::new("alice").with_role("accountant");
        let contractor = accountant.clone().with_group("contractors");

        assert!(authz.is_allowed(&request("erp:invoice:delete", accountant.clone())).await);
        assert!(!authz.is_allowed(&request("erp:invoice:delete", contractor.clone())).await);
        assert!(authz.is_allowed(&request("erp:invoice:read", contractor)).await);
        assert!(!authz.is_allowed(&request("erp:invoice:read", PrincipalContext::new("bob"))).await);
    }

    #[tokio::test]
    async fn test_check_raises_forbidden() {
        let (authz, _) = setup().await;
        let contractor = PrincipalContext::new("alice").with_role("accountant").with_group("contractors");

        let err = authz.check(&request("erp:invoice:delete", contractor)).await.unwrap_err();
        match err {
            AuthzError::Forbidden(forbidden) => {
                assert_eq!(forbidden.decision.reason(), DecisionReason::ExplicitDeny);
                assert!(forbidden.decision.matched_statements().contains(&"NoDelete".to_string()));
            }
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_scope_is_visible_to_conditions() {
        let (authz, provider) = setup().await;
        let t1 = Scope::tenant("t1");
        provider
            .add_policy(
                PolicyRecord::new(
                    "tenant-reports",
                    t1.clone(),
                    PolicyDocument::new().with_statement(
                        Statement::allow("report:read", "*")
                            .with_condition(ConditionBlock::new().with(ConditionOperator::StringEquals, "scope.id", "t1")),
                    ),
                ),
                None,
            )
            .await
            .unwrap();
        provider
            .attach_policy(Attachment::new("tenant-reports", t1, PrincipalRef::user("carol")))
            .await
            .unwrap();

        let decision = authz
            .check(&request("report:read", PrincipalContext::new("carol")))
            .await
            .unwrap();
        assert_eq!(decision.reason(), DecisionReason::ExplicitAllow);
    }

    struct UnavailableProvider;

    #[async_trait::async_trait]
    impl PolicyProvider for UnavailableProvider {
        async fn get_policies(&self, _query: &PolicyQuery) -> Result<Vec<crate::provider::PolicySource>> {
            Err(AuthzError::Storage("connection refused".to_string()))
        }
        async fn add_policy(&self, _policy: PolicyRecord, _ttl: Option<std::time::Duration>) -> Result<()> {
            Ok(())
        }
        async fn attach_policy(&self, _attachment: Attachment) -> Result<()> {
            Ok(())
        }
        async fn detach_policy(&self, _attachment: &Attachment) -> Result<()> {
            Ok(())
        }
        async fn delete_policy(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn get_policy(&self, _id: &str) -> Result<Option<PolicyRecord>> {
            Ok(None)
        }
        async fn list_policies(&self, _scope: &Scope) -> Result<Vec<PolicyRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_is_allowed_fails_closed() {
        let authz = Authorizer::new(Arc::new(UnavailableProvider));
        let req = AuthorizationRequest::new(
            Scope::platform(),
            "x",
            "y",
            EvaluationContext::new(PrincipalContext::new("u")),
        );

        assert!(matches!(authz.authorize(&req).await, Err(AuthzError::Storage(_))));
        assert!(!authz.is_allowed(&req).await);
    }
}
