//! Principal → policy resolution
//!
//! A provider stores policy documents and their attachments, and answers
//! "which documents apply to this principal in this scope". Storage backends
//! implement [`PolicyProvider`]; [`InMemoryPolicyProvider`] is the reference
//! implementation used by tests and single-process deployments.

pub mod memory;

pub use memory::{InMemoryPolicyProvider, MemoryProviderConfig};

use crate::error::Result;
use crate::policy::PolicyDocument;
use crate::types::{Attachment, GroupId, PolicyId, PrincipalRef, RoleId, Scope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A resolved policy, ready for evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySource {
    pub id: PolicyId,
    pub document: Arc<PolicyDocument>,
}

/// A stored policy document and the scope it lives in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub scope: Scope,
    pub document: PolicyDocument,
}

impl PolicyRecord {
    pub fn new(id: impl Into<PolicyId>, scope: Scope, document: PolicyDocument) -> Self {
        Self {
            id: id.into(),
            scope,
            document,
        }
    }
}

/// Resolution input: who is asking, and in which scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyQuery {
    pub scope: Scope,
    pub principal: PrincipalRef,
    pub role_ids: Vec<RoleId>,
    pub group_ids: Vec<GroupId>,
}

impl PolicyQuery {
    pub fn new(scope: Scope, principal: PrincipalRef) -> Self {
        Self {
            scope,
            principal,
            role_ids: Vec::new(),
            group_ids: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        self.role_ids.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<GroupId>,
    {
        self.group_ids.extend(groups.into_iter().map(Into::into));
        self
    }

    /// The principal itself, then one `ROLE` ref per role id, then one `GROUP`
    /// ref per group id
    pub fn candidates(&self) -> Vec<PrincipalRef> {
        std::iter::once(self.principal.clone())
            .chain(self.role_ids.iter().map(PrincipalRef::role))
            .chain(self.group_ids.iter().map(PrincipalRef::group))
            .collect()
    }
}

/// Policy storage and resolution
///
/// Reads must not return documents from another scope, and every id appears
/// at most once in a [`get_policies`](PolicyProvider::get_policies) result.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
    /// Documents attached to the principal, its roles or its groups, in the
    /// query scope only
    async fn get_policies(&self, query: &PolicyQuery) -> Result<Vec<PolicySource>>;

    /// Store (or replace) a policy, optionally expiring after `ttl`
    async fn add_policy(&self, policy: PolicyRecord, ttl: Option<Duration>) -> Result<()>;

    async fn attach_policy(&self, attachment: Attachment) -> Result<()>;

    async fn detach_policy(&self, attachment: &Attachment) -> Result<()>;

    /// Remove a policy and every attachment that references it
    async fn delete_policy(&self, id: &str) -> Result<()>;

    async fn get_policy(&self, id: &str) -> Result<Option<PolicyRecord>>;

    /// Every live policy stored under `scope`
    async fn list_policies(&self, scope: &Scope) -> Result<Vec<PolicyRecord>>;

    async fn attach_policies(&self, attachments: Vec<Attachment>) -> Result<()> {
        for attachment in attachments {
            self.attach_policy(attachment).await?;
        }
        Ok(())
    }

    async fn detach_policies(&self, attachments: &[Attachment]) -> Result<()> {
        for attachment in attachments {
            self.detach_policy(attachment).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_candidates() {
        let query = PolicyQuery::new(Scope::tenant("t1"), PrincipalRef::user("alice"))
            .with_roles(["admin", "auditor"])
            .with_groups(vec!["sales".to_string()]);

        assert_eq!(
            query.candidates(),
            vec![
                PrincipalRef::user("alice"),
                PrincipalRef::role("admin"),
                PrincipalRef::role("auditor"),
                PrincipalRef::group("sales"),
            ]
        );
    }
}
