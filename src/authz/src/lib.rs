//! # Warden Authorization Engine
//!
//! Scoped, IAM-style policy evaluation.
//!
//! ## Features
//!
//! - **JSON policy documents** with Allow/Deny statements, `*` wildcards
//!   on actions and resources, and typed condition operators
//! - **Deny overrides allow** within a document and across documents
//! - **Variable references** (`${principal.id}`) in condition values
//! - **Scoped resolution** of policies attached to a principal, its roles
//!   and its groups, with no cross-scope leakage
//! - **Async provider trait** with an in-memory reference implementation
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_authz::{
//!     Attachment, AuthorizationRequest, Authorizer, EvaluationContext, InMemoryPolicyProvider,
//!     PolicyDocument, PolicyProvider, PolicyRecord, PrincipalContext, PrincipalRef, Scope, Statement,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Arc::new(InMemoryPolicyProvider::new());
//!     let tenant = Scope::tenant("acme");
//!
//!     let policy = PolicyDocument::new().with_statement(Statement::allow("erp:invoice:*", "invoice/*"));
//!     provider.add_policy(PolicyRecord::new("invoices", tenant.clone(), policy), None).await?;
//!     provider
//!         .attach_policy(Attachment::new("invoices", tenant.clone(), PrincipalRef::role("accountant")))
//!         .await?;
//!
//!     let authorizer = Authorizer::new(provider);
//!     let ctx = EvaluationContext::new(PrincipalContext::new("alice").with_role("accountant"));
//!     let request = AuthorizationRequest::new(tenant, "erp:invoice:create", "invoice/123", ctx);
//!
//!     let decision = authorizer.authorize(&request).await?;
//!     assert!(decision.allowed());
//!
//!     Ok(())
//! }
//! ```

pub mod authorizer;
pub mod condition;
pub mod context;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod policy;
pub mod provider;
pub mod types;

// Re-export commonly used types
pub use authorizer::{AuthorizationRequest, Authorizer};
pub use condition::{ConditionBlock, ConditionOperator};
pub use context::{ContextView, EvaluationContext, PrincipalContext, RequestContext, ResourceContext};
pub use engine::{
    assert_allowed, evaluate, evaluate_all, Decision, DecisionReason, EvaluatorConfig, PolicyEvaluator,
};
pub use error::{AuthzError, ForbiddenError, Result};
pub use matcher::{match_action, match_resource};
pub use policy::{Effect, PatternList, PolicyDocument, Statement};
pub use provider::{
    InMemoryPolicyProvider, MemoryProviderConfig, PolicyProvider, PolicyQuery, PolicyRecord, PolicySource,
};
pub use types::{Attachment, GroupId, PolicyId, PrincipalRef, PrincipalType, RoleId, Scope, ScopeType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
